//! Blocking JSON-RPC 2.0 transport

use crate::error::{Result, TpkmError};
use serde_json::{json, Value};
use std::time::Duration;

/// Error object from a JSON-RPC response, kept raw for the translator
#[derive(Debug, Clone)]
pub struct RawRpcError {
    pub code: Option<i64>,
    pub message: String,
    pub data: Option<Value>,
}

/// A failed RPC round trip: either the transport broke or the node answered
/// with an error object
#[derive(Debug)]
pub enum RpcError {
    Transport(String),
    Rpc(RawRpcError),
}

pub struct RpcClient {
    url: String,
    http: reqwest::blocking::Client,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<RpcClient> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TpkmError::Unknown(format!("cannot build HTTP client: {e}")))?;
        Ok(RpcClient {
            url: url.to_string(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One JSON-RPC call. The caller owns classification of the error.
    pub fn call(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        log::debug!("rpc {method} -> {}", self.url);
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .map_err(|e| RpcError::Transport(format!("HTTP {status}: {e}")))?;

        if let Some(error) = payload.get("error") {
            return Err(RpcError::Rpc(RawRpcError {
                code: error.get("code").and_then(Value::as_i64),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown RPC error")
                    .to_string(),
                data: error.get("data").cloned(),
            }));
        }
        match payload.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(RpcError::Transport(format!(
                "HTTP {status}: response has neither result nor error"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction() {
        let client = RpcClient::new("http://127.0.0.1:8545").unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8545");
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        // Port 1 on loopback refuses immediately
        let client = RpcClient::new("http://127.0.0.1:1/").unwrap();
        match client.call("eth_chainId", json!([])) {
            Err(RpcError::Transport(_)) => {}
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
