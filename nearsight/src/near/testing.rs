use crate::errors::TransportError;
use crate::near::near_models::{JsonRpcRequest, UNKNOWN_ACCOUNT};
use crate::near::near_rpc::RpcTransport;
use crate::near::provider_pool::ProviderEndpoint;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub(crate) const BLOCK_HASH: &str = "56xEo2LorUFVNbkFhCncFSWNiobdp1kzm14nZ47b5JVW";

pub(crate) fn endpoints(n: usize) -> Vec<ProviderEndpoint> {
    (0..n)
        .map(|i| ProviderEndpoint::new(Url::parse(&format!("https://rpc{i}.example.org")).unwrap()))
        .collect()
}

/// In-memory NEAR node answering the handful of calls a balance lookup makes.
#[derive(Clone)]
pub(crate) struct FakeNode {
    pub amount: String,
    pub locked: String,
    pub storage_usage: u64,
    pub storage_price: String,
    pub pools: Vec<(String, Result<String, String>)>,
    pub unknown_account: bool,
}

impl FakeNode {
    pub fn new(amount: &str) -> FakeNode {
        FakeNode {
            amount: amount.to_string(),
            locked: "0".to_string(),
            storage_usage: 0,
            storage_price: "10000000000000000000".to_string(),
            pools: vec![],
            unknown_account: false,
        }
    }

    pub fn with_pool(mut self, pool: &str, stake: &str) -> FakeNode {
        self.pools.push((pool.to_string(), Ok(stake.to_string())));
        self
    }

    pub fn with_broken_pool(mut self, pool: &str) -> FakeNode {
        self.pools.push((pool.to_string(), Err("MethodNotFound".to_string())));
        self
    }

    pub fn answer(&self, request: &JsonRpcRequest) -> Result<Value, TransportError> {
        match request.method.as_str() {
            "EXPERIMENTAL_protocol_config" => Ok(json!({
                "runtime_config": {"storage_amount_per_byte": self.storage_price}
            })),
            "validators" => {
                let validators: Vec<Value> = self.pools.iter().map(|(p, _)| json!({"account_id": p})).collect();
                Ok(json!({"current_validators": validators, "next_validators": [], "current_proposals": []}))
            }
            "query" => match request.params["request_type"].as_str() {
                Some("view_account") if self.unknown_account => Err(TransportError::Rpc {
                    name: UNKNOWN_ACCOUNT.to_string(),
                    message: "account does not exist while viewing".to_string(),
                }),
                Some("view_account") => Ok(json!({
                    "amount": self.amount,
                    "locked": self.locked,
                    "storage_usage": self.storage_usage,
                    "block_hash": BLOCK_HASH,
                    "block_height": 104821530,
                })),
                Some("call_function") => {
                    let pool = request.params["account_id"].as_str().unwrap_or_default();
                    match self.pools.iter().find(|(p, _)| p == pool) {
                        Some((_, Ok(stake))) => Ok(json!({
                            "result": serde_json::to_vec(stake).unwrap(),
                            "logs": [],
                        })),
                        Some((_, Err(message))) => Err(TransportError::Rpc {
                            name: "CONTRACT_EXECUTION_ERROR".to_string(),
                            message: message.clone(),
                        }),
                        None => Err(TransportError::Rpc {
                            name: UNKNOWN_ACCOUNT.to_string(),
                            message: format!("account {pool} does not exist while viewing"),
                        }),
                    }
                }
                other => Err(TransportError::Malformed(format!("unsupported request type {:?}", other))),
            },
            other => Err(TransportError::Malformed(format!("unsupported method {other}"))),
        }
    }
}

type Handler = Box<dyn Fn(&ProviderEndpoint, &JsonRpcRequest) -> Result<Value, TransportError> + Send + Sync>;
type Delay = Box<dyn Fn(&JsonRpcRequest) -> Duration + Send + Sync>;

/// Transport driven by a closure, optionally sleeping before each answer.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    delay: Delay,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> ScriptedTransport
    where
        F: Fn(&ProviderEndpoint, &JsonRpcRequest) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        ScriptedTransport {
            handler: Box::new(handler),
            delay: Box::new(|_: &JsonRpcRequest| Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn node(node: FakeNode) -> ScriptedTransport {
        ScriptedTransport::new(move |_, request| node.answer(request))
    }

    pub fn with_delay(self, delay: Duration) -> ScriptedTransport {
        self.with_delay_fn(move |_| delay)
    }

    pub fn with_delay_fn<F>(mut self, delay: F) -> ScriptedTransport
    where
        F: Fn(&JsonRpcRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcTransport for ScriptedTransport {
    async fn call(&self, endpoint: &ProviderEndpoint, request: &JsonRpcRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = (self.delay)(request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(endpoint, request)
    }
}
