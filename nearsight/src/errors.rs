use crate::models::AmountError;
use crate::settings::Network;
use thiserror::Error;

pub const TIMEOUT_MESSAGE: &str = "Request timed out. The network may be slow. Please try again.";
pub const PROVIDERS_EXHAUSTED_MESSAGE: &str =
    "All RPC providers failed. The network may be experiencing issues. Please try again later.";
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const FALLBACK_MESSAGE: &str = "An error occurred while fetching the balance.";

/// Failure of a single endpoint call, as reported by an `RpcTransport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request could not be built: {0}")]
    Builder(String),

    #[error("http status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("rpc error {name}: {message}")]
    Rpc { name: String, message: String },
}

/// Failure of a logical query against the provider pool.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("account {0} does not exist")]
    AccountNotFound(String),

    #[error("all {attempts} rpc providers failed")]
    ProvidersExhausted { attempts: usize },

    #[error("{0}")]
    Handler(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("unexpected rpc payload: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error("account {0} does not exist")]
    AccountNotFound(String),

    #[error("all {attempts} rpc providers failed")]
    ProvidersExhausted { attempts: usize },

    #[error("network failure: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl From<RpcError> for FetchError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::AccountNotFound(account) => FetchError::AccountNotFound(account),
            RpcError::ProvidersExhausted { attempts } => FetchError::ProvidersExhausted { attempts },
            RpcError::Network(message) => FetchError::Network(message),
            RpcError::Handler(message) => FetchError::Other(message),
            RpcError::Payload(message) => FetchError::Other(message),
        }
    }
}

impl From<AmountError> for FetchError {
    fn from(error: AmountError) -> Self {
        FetchError::Other(error.to_string())
    }
}

/// Maps a fetch failure to the message shown to the user.
///
/// Cancelled requests return `None`: they are bookkeeping and never displayed.
pub fn classify(error: &FetchError, network: Network) -> Option<String> {
    let message = match error {
        FetchError::Cancelled => return None,
        FetchError::Timeout => TIMEOUT_MESSAGE.to_string(),
        FetchError::AccountNotFound(account) => {
            format!("Account \"{}\" does not exist on {}.", account, network.display_name())
        }
        FetchError::ProvidersExhausted { .. } => PROVIDERS_EXHAUSTED_MESSAGE.to_string(),
        FetchError::Network(_) => NETWORK_MESSAGE.to_string(),
        FetchError::Other(message) if message.trim().is_empty() => FALLBACK_MESSAGE.to_string(),
        FetchError::Other(message) => format!("Error: {}", message),
    };
    Some(message)
}
