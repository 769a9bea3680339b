use crate::accounts::{AccountReader, RawDataQuery};
use crate::errors::{FetchError, RpcError};
use crate::models::{BalanceRecord, RawBalance, YoctoAmount};
use crate::near::near_models::{AccountView, BlockReference, CallResult, ProtocolConfigView, RpcQuery, ValidatorsView};
use crate::near::provider_pool::ProviderPool;
use crate::settings::{Network, Settings};
use crate::validator::AccountIdentifier;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use log::{debug, trace, warn};
use serde_json::json;
use tokio::join;
use tokio_util::sync::CancellationToken;

const POOL_BALANCE_METHOD: &str = "get_account_total_balance";
const MAX_POOL_QUERIES: usize = 16;

/// An account the network confirmed to exist.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    pub account_id: String,
    pub view: AccountView,
}

pub struct BalanceFetcher {
    pool: ProviderPool,
    network: Network,
}

impl BalanceFetcher {
    pub fn new(pool: ProviderPool, network: Network) -> BalanceFetcher {
        BalanceFetcher { pool, network }
    }

    pub fn from_settings(settings: &Settings) -> Result<BalanceFetcher, FetchError> {
        let pool = ProviderPool::from_settings(settings)?;
        Ok(BalanceFetcher::new(pool, settings.network))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Resolves the account, then joins the liquid and staked lookups and converts the sum.
    ///
    /// The token is checked before resolving, before the sub-queries and after the join;
    /// in-flight calls are not aborted, their results are dropped.
    pub async fn fetch_balance(
        &self,
        account: &AccountIdentifier,
        cancel: &CancellationToken,
    ) -> Result<BalanceRecord, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let handle = self.resolve_account(account).await?;

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let raw = self.query_raw_data(&handle, cancel).await?;

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.account_balance(&raw)
    }

    pub async fn resolve_account(&self, account: &AccountIdentifier) -> Result<AccountHandle, FetchError> {
        let view: AccountView = self
            .pool
            .query_as(&RpcQuery::ViewAccount(account.to_string()))
            .await?;
        trace!("resolved {} at block {}", account, view.block_height);
        Ok(AccountHandle {
            account_id: account.to_string(),
            view,
        })
    }

    /// Spendable balance: total minus whatever is reserved by stake or storage, whichever is larger.
    ///
    /// Uses the view the account resolved with; the storage price is read at the same block.
    pub async fn liquid_balance(&self, handle: &AccountHandle) -> Result<YoctoAmount, FetchError> {
        let config: ProtocolConfigView = self.pool.query_as(&RpcQuery::ProtocolConfig(handle.view.block())).await?;
        let view = &handle.view;

        let storage_price = config.runtime_config.storage_amount_per_byte.0;
        let storage_staked = YoctoAmount(
            storage_price
                .checked_mul(u128::from(view.storage_usage))
                .ok_or_else(|| FetchError::Other(String::from("storage cost overflow")))?,
        );
        let total = view.amount.checked_add(view.locked)?;
        Ok(total.saturating_sub(view.locked.max(storage_staked)))
    }

    /// Sum of the account's deposits in every active staking pool.
    ///
    /// Pools whose contract rejects the call are skipped. Running out of providers on any pool,
    /// or on the validator listing, fails the lookup. Stops issuing pool calls once cancelled.
    pub async fn delegated_stake(
        &self,
        handle: &AccountHandle,
        cancel: &CancellationToken,
    ) -> Result<YoctoAmount, FetchError> {
        let validators: ValidatorsView = self.pool.query_as(&RpcQuery::Validators).await?;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let pools = validators.pool_ids();
        trace!("checking {} staking pools for {}", pools.len(), handle.account_id);

        let block = handle.view.block();
        let block = &block;
        let results: Vec<(String, Result<YoctoAmount, RpcError>)> = stream::iter(pools)
            .map(|pool| async move {
                let stake = self.pool_balance(&pool, &handle.account_id, block).await;
                (pool, stake)
            })
            .buffer_unordered(MAX_POOL_QUERIES)
            .take_until(cancel.cancelled())
            .collect()
            .await;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let mut staked = YoctoAmount::ZERO;
        for (pool, result) in results {
            match result {
                Ok(amount) => {
                    if amount > YoctoAmount::ZERO {
                        trace!("{} stakes {} in {}", handle.account_id, amount, pool);
                    }
                    staked = staked.checked_add(amount)?;
                }
                Err(e @ (RpcError::Handler(_) | RpcError::AccountNotFound(_) | RpcError::Payload(_))) => {
                    debug!("skip staking pool {}: {}", pool, e)
                }
                Err(e) => {
                    warn!("staking pool {} unreachable for {}: {}", pool, handle.account_id, e);
                    return Err(e.into());
                }
            }
        }
        Ok(staked)
    }

    async fn pool_balance(&self, pool: &str, account_id: &str, block: &BlockReference) -> Result<YoctoAmount, RpcError> {
        let query = RpcQuery::CallView {
            contract: pool.to_string(),
            method: POOL_BALANCE_METHOD.to_string(),
            args: json!({ "account_id": account_id }),
            block: block.clone(),
        };
        let call: CallResult = self.pool.query_as(&query).await?;
        if let Some(error) = call.error {
            return Err(RpcError::Handler(error));
        }
        serde_json::from_slice::<YoctoAmount>(&call.result).map_err(|e| RpcError::Payload(e.to_string()))
    }
}

#[async_trait]
impl RawDataQuery<AccountHandle, RawBalance> for BalanceFetcher {
    async fn query_raw_data(&self, handle: &AccountHandle, cancel: &CancellationToken) -> Result<RawBalance, FetchError> {
        let (available_res, staked_res) = join!(
            self.liquid_balance(handle),
            self.delegated_stake(handle, cancel)
        );

        Ok(RawBalance {
            available: available_res?,
            staked: staked_res?,
        })
    }
}

impl AccountReader<RawBalance> for BalanceFetcher {
    fn account_balance(&self, raw_data: &RawBalance) -> Result<BalanceRecord, FetchError> {
        Ok(BalanceRecord::from_raw(raw_data)?)
    }
}
