use crate::errors::{RpcError, TransportError};
use crate::near::near_models::{is_handler_cause, RpcQuery, UNKNOWN_ACCOUNT};
use crate::near::near_rpc::{HttpTransport, RpcTransport};
use crate::settings::Settings;
use log::{trace, warn};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub url: Url,
}

impl ProviderEndpoint {
    pub fn new(url: Url) -> ProviderEndpoint {
        ProviderEndpoint { url }
    }
}

impl fmt::Display for ProviderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Ordered list of interchangeable RPC endpoints with linear failover.
///
/// Every query starts again at the first endpoint; nothing is pinned between calls.
#[derive(Clone)]
pub struct ProviderPool {
    endpoints: Arc<[ProviderEndpoint]>,
    transport: Arc<dyn RpcTransport>,
}

impl ProviderPool {
    pub fn new(endpoints: Vec<ProviderEndpoint>, transport: Arc<dyn RpcTransport>) -> ProviderPool {
        ProviderPool {
            endpoints: endpoints.into(),
            transport,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<ProviderPool, RpcError> {
        let transport = HttpTransport::new(settings).map_err(|e| RpcError::Network(e.to_string()))?;
        Ok(ProviderPool::new(settings.endpoints.clone(), Arc::new(transport)))
    }

    pub fn endpoints(&self) -> &[ProviderEndpoint] {
        &self.endpoints
    }

    pub async fn query(&self, query: &RpcQuery) -> Result<serde_json::Value, RpcError> {
        self.query_as(query).await
    }

    /// Runs `query` against each endpoint in order until one answers with a payload that decodes as `T`.
    pub async fn query_as<T: DeserializeOwned>(&self, query: &RpcQuery) -> Result<T, RpcError> {
        let request = query.to_request();
        let mut attempts = 0;
        for endpoint in self.endpoints.iter() {
            attempts += 1;
            trace!("{} attempt {} on {}", request.method, attempts, endpoint);
            let failure = match self.transport.call(endpoint, &request).await {
                Ok(value) => match serde_json::from_value::<T>(value) {
                    Ok(decoded) => return Ok(decoded),
                    Err(e) => TransportError::Malformed(e.to_string()),
                },
                Err(TransportError::Rpc { name, message }) if name == UNKNOWN_ACCOUNT => {
                    let account = query.account_id().unwrap_or_default();
                    trace!("{} reports unknown account {}: {}", endpoint, account, message);
                    return Err(RpcError::AccountNotFound(account.to_string()));
                }
                Err(TransportError::Rpc { name, message }) if is_handler_cause(&name) => {
                    return Err(RpcError::Handler(message));
                }
                Err(TransportError::Builder(message)) => return Err(RpcError::Network(message)),
                Err(e) => e,
            };
            warn!("rpc provider {} failed for {}: {}", endpoint, request.method, failure);
        }
        Err(RpcError::ProvidersExhausted { attempts })
    }
}
