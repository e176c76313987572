//! RPC envelope encoding and reply classification.

use mtg_execution::{TerminalError, TerminalResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RpcCall<'a> {
    pub method: &'a str,
    pub params: Value,
}

/// Terminal diagnostic as the bridge reports it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
}

impl From<RpcFault> for TerminalError {
    fn from(f: RpcFault) -> Self {
        TerminalError::new(f.code, f.message)
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcReply {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcFault>,
}

/// Turn a bridge reply into the method's return value.
///
/// An `error` member wins over `result`. A missing or `null` result decodes
/// as JSON `null`, so `Option<T>` targets see `None`.
pub fn decode_reply<T: DeserializeOwned>(method: &str, reply: RpcReply) -> TerminalResult<T> {
    if let Some(fault) = reply.error {
        return Err(fault.into());
    }
    let value = reply.result.unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| TerminalError::transport(format!("{method}: unexpected result shape: {e}")))
}
