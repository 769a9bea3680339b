use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type Decimal = rust_decimal::Decimal;

/// yoctoNEAR per NEAR.
pub const YOCTO_PER_NEAR: u128 = 1_000_000_000_000_000_000_000_000;
pub const DISPLAY_SCALE: u32 = 4;

// 10^(24 - DISPLAY_SCALE): yocto per displayed 0.0001 NEAR
const YOCTO_PER_DISPLAY_UNIT: u128 = 100_000_000_000_000_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount {0:?}")]
    Parse(String),

    #[error("balance overflow")]
    Overflow,
}

/// An exact amount in yoctoNEAR, the smallest indivisible unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YoctoAmount(pub u128);

impl YoctoAmount {
    pub const ZERO: YoctoAmount = YoctoAmount(0);

    pub fn checked_add(self, other: YoctoAmount) -> Result<YoctoAmount, AmountError> {
        self.0.checked_add(other.0).map(YoctoAmount).ok_or(AmountError::Overflow)
    }

    pub fn saturating_sub(self, other: YoctoAmount) -> YoctoAmount {
        YoctoAmount(self.0.saturating_sub(other.0))
    }

    /// NEAR with four fractional digits, rounded half-up.
    pub fn to_near(self) -> Result<Decimal, AmountError> {
        let whole = self.0 / YOCTO_PER_DISPLAY_UNIT;
        let rest = self.0 % YOCTO_PER_DISPLAY_UNIT;
        let rounded = if rest >= YOCTO_PER_DISPLAY_UNIT / 2 { whole + 1 } else { whole };
        let mantissa = i128::try_from(rounded).map_err(|_| AmountError::Overflow)?;
        Decimal::try_from_i128_with_scale(mantissa, DISPLAY_SCALE).map_err(|_| AmountError::Overflow)
    }
}

impl FromStr for YoctoAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Parse(s.to_string()));
        }
        trimmed
            .parse::<u128>()
            .map(YoctoAmount)
            .map_err(|_| AmountError::Parse(s.to_string()))
    }
}

impl fmt::Display for YoctoAmount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RPC nodes send balances as decimal strings since they exceed JSON number precision.
impl<'de> Deserialize<'de> for YoctoAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse::<YoctoAmount>().map_err(de::Error::custom)
    }
}

/// Raw liquid and delegated amounts, before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawBalance {
    pub available: YoctoAmount,
    pub staked: YoctoAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceRecord {
    pub available: String,
    pub staked: String,
    pub total: String,
}

impl BalanceRecord {
    /// Total is summed in yoctoNEAR before any rounding.
    pub fn from_raw(raw: &RawBalance) -> Result<BalanceRecord, AmountError> {
        let total = raw.available.checked_add(raw.staked)?;
        Ok(BalanceRecord {
            available: raw.available.to_near()?.to_string(),
            staked: raw.staked.to_near()?.to_string(),
            total: total.to_near()?.to_string(),
        })
    }
}
