use crate::errors::FetchError;
use crate::models::BalanceRecord;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/** Reads the raw smallest-unit data for one resolved account.

`H` is the resolved handle, `X` the raw shape handed to an [`AccountReader`].
*/
#[async_trait]
pub trait RawDataQuery<H: Sync, X> {
    async fn query_raw_data(&self, handle: &H, cancel: &CancellationToken) -> Result<X, FetchError>;
}


pub trait AccountReader<X> {
    fn account_balance(&self, raw_data: &X) -> Result<BalanceRecord, FetchError>;
}
