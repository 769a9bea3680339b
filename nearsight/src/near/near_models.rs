use crate::errors::TransportError;
use crate::models::YoctoAmount;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const UNKNOWN_ACCOUNT: &str = "UNKNOWN_ACCOUNT";

// causes describing the request itself; every node answers them the same way
const HANDLER_CAUSES: [&str; 7] = [
    "CONTRACT_EXECUTION_ERROR",
    "INVALID_ACCOUNT",
    "NO_CONTRACT_CODE",
    "PARSE_ERROR",
    "TOO_LARGE_CONTRACT_STATE",
    "UNKNOWN_ACCESS_KEY",
    "UNKNOWN_CONTRACT_CODE",
];

/// Whether an RPC error cause is final for the query. Unknown or missing causes are not:
/// lagging nodes, rate limiters and gateways report those, and another node may answer.
pub fn is_handler_cause(name: &str) -> bool {
    HANDLER_CAUSES.contains(&name)
}

/// Block a query is evaluated at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BlockReference {
    #[default]
    Final,
    Hash(String),
}

impl BlockReference {
    fn apply(&self, params: &mut Value) {
        match self {
            BlockReference::Final => params["finality"] = json!("final"),
            BlockReference::Hash(hash) => params["block_id"] = json!(hash),
        }
    }
}

/// Read-only operations the balance lookup issues against a NEAR node.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcQuery {
    ViewAccount(String),
    ProtocolConfig(BlockReference),
    Validators,
    CallView {
        contract: String,
        method: String,
        args: Value,
        block: BlockReference,
    },
}

impl RpcQuery {
    /// The account an `UNKNOWN_ACCOUNT` answer refers to.
    pub fn account_id(&self) -> Option<&str> {
        match self {
            RpcQuery::ViewAccount(account) => Some(account),
            RpcQuery::CallView { contract, .. } => Some(contract),
            RpcQuery::ProtocolConfig(_) | RpcQuery::Validators => None,
        }
    }

    pub fn to_request(&self) -> JsonRpcRequest {
        let (method, params) = match self {
            RpcQuery::ViewAccount(account) => (
                "query",
                json!({
                    "request_type": "view_account",
                    "finality": "final",
                    "account_id": account,
                }),
            ),
            RpcQuery::ProtocolConfig(block) => {
                let mut params = json!({});
                block.apply(&mut params);
                ("EXPERIMENTAL_protocol_config", params)
            }
            // validator sets only change at epoch boundaries, and nodes refuse block ids that do not end one
            RpcQuery::Validators => ("validators", json!([null])),
            RpcQuery::CallView { contract, method, args, block } => {
                let mut params = json!({
                    "request_type": "call_function",
                    "account_id": contract,
                    "method_name": method,
                    "args_base64": STANDARD.encode(args.to_string()),
                });
                block.apply(&mut params);
                ("query", params)
            }
        };
        JsonRpcRequest::new(method, params)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: String::from("2.0"),
            id: String::from("dontcare"),
            method: String::from(method),
            params,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

impl JsonRpcResponse {
    pub fn into_result(self) -> Result<Value, TransportError> {
        if let Some(error) = self.error {
            return Err(error.to_transport_error());
        }
        match self.result {
            Some(result) => Ok(result),
            None => Err(TransportError::Malformed(String::from("response carries neither result nor error"))),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct RpcErrorBody {
    pub name: Option<String>,
    pub cause: Option<ErrorCause>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct ErrorCause {
    pub name: String,
    #[serde(default)]
    pub info: Option<Value>,
}

impl RpcErrorBody {
    /// `UNKNOWN_ACCOUNT` or a handler cause: asking another node would not change the answer.
    pub fn is_terminal(&self) -> bool {
        let name = self.cause_name();
        name == UNKNOWN_ACCOUNT || is_handler_cause(&name)
    }

    pub fn to_transport_error(&self) -> TransportError {
        TransportError::Rpc {
            name: self.cause_name(),
            message: self.message(),
        }
    }

    /// Structured cause name; older nodes only describe a missing account in `data`.
    pub fn cause_name(&self) -> String {
        if let Some(cause) = &self.cause {
            return cause.name.clone();
        }
        let data = self.data_text();
        if data.contains("does not exist while viewing") {
            return String::from(UNKNOWN_ACCOUNT);
        }
        self.name.clone().unwrap_or_default()
    }

    pub fn message(&self) -> String {
        let data = self.data_text();
        if !data.is_empty() {
            return data;
        }
        self.message.clone().unwrap_or_default()
    }

    fn data_text(&self) -> String {
        match &self.data {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AccountView {
    pub amount: YoctoAmount,
    pub locked: YoctoAmount,
    pub storage_usage: u64,
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: Option<String>,
}

impl AccountView {
    /// The block this view was read at, so follow-up reads see the same state.
    pub fn block(&self) -> BlockReference {
        match &self.block_hash {
            Some(hash) => BlockReference::Hash(hash.clone()),
            None => BlockReference::Final,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ProtocolConfigView {
    pub runtime_config: RuntimeConfigView,
}

#[derive(Deserialize, Debug)]
pub struct RuntimeConfigView {
    pub storage_amount_per_byte: YoctoAmount,
}

#[derive(Deserialize, Debug)]
pub struct ValidatorInfo {
    pub account_id: String,
}

#[derive(Deserialize, Debug)]
pub struct ValidatorsView {
    #[serde(default)]
    pub current_validators: Vec<ValidatorInfo>,
    #[serde(default)]
    pub next_validators: Vec<ValidatorInfo>,
    #[serde(default)]
    pub current_proposals: Vec<ValidatorInfo>,
}

impl ValidatorsView {
    /// Every staking pool that is validating, about to validate, or proposing.
    pub fn pool_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .current_validators
            .iter()
            .chain(self.next_validators.iter())
            .chain(self.current_proposals.iter())
            .map(|v| v.account_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Result of a `call_function` query; `result` holds the raw bytes the contract returned.
#[derive(Deserialize, Debug)]
pub struct CallResult {
    #[serde(default)]
    pub result: Vec<u8>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}
