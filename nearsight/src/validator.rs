use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const EMPTY_MESSAGE: &str = "please enter an identifier";
pub const INVALID_MESSAGE: &str = "invalid account identifier: expected a 64-character hex implicit address, \
a named account ending in .near or .testnet, or an 0x-prefixed 40-character hex address";

static IMPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{64}$").unwrap()
});

static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9_-]+\.)+(?:near|testnet)$").unwrap()
});

static ETH_IMPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^0x[0-9a-f]{40}$").unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountKind {
    /// 64 hex characters derived from an ed25519 public key.
    Implicit,
    /// Dot separated labels under a top-level `near`/`testnet` account.
    Named,
    /// `0x` followed by 40 hex characters.
    EthImplicit,
}

/// A trimmed identifier that matched one of the accepted account shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountIdentifier {
    value: String,
    kind: AccountKind,
}

impl AccountIdentifier {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }
}

impl fmt::Display for AccountIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl AsRef<str> for AccountIdentifier {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(AccountIdentifier),
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }
}

/// Classifies raw user input. Pure and cheap enough to run on every keystroke.
pub fn validate(raw: &str) -> ValidationResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ValidationResult::Invalid(EMPTY_MESSAGE.to_string());
    }

    let kind = if IMPLICIT.is_match(trimmed) {
        AccountKind::Implicit
    } else if ETH_IMPLICIT.is_match(trimmed) {
        AccountKind::EthImplicit
    } else if NAMED.is_match(trimmed) {
        AccountKind::Named
    } else {
        return ValidationResult::Invalid(INVALID_MESSAGE.to_string());
    };

    ValidationResult::Valid(AccountIdentifier {
        value: trimmed.to_string(),
        kind,
    })
}
