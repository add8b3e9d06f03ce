//! # Transport
//!
//! JSON-RPC 2.0 over HTTP. The wallet endpoint doubles as the signer for
//! `eth_sendTransaction`, the same way an injected browser provider would.
//!
//! Every request is bounded by a timeout. A hung endpoint surfaces as
//! [`ChainError::Timeout`] instead of blocking the caller forever.
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use alloy_primitives::{Address, hex};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::timeout;
use tracing::debug;

use crate::error::ChainError;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

const USER_REJECTED: i64 = 4001;
const EXECUTION_REVERTED: i64 = 3;
pub const METHOD_NOT_FOUND: i64 = -32601;

pub trait Transport: Send + Sync {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ChainError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, ChainError>> + Send {
        (**self).request(method, params)
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    timeout: Duration,
    next_id: Arc<AtomicU64>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self::with_client(Client::new(), url, timeout)
    }

    pub fn with_client(client: Client, url: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: url.to_string(),
            timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            return Err(ChainError::Connection(format!("HTTP {status}: {error_text}")));
        }

        let response: RpcResponse = response.json().await?;

        if let Some(error) = response.error {
            return Err(classify(error.code, error.message));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        #[cfg(feature = "verbose")]
        debug!("RPC {} {}", method, params);

        timeout(self.timeout, self.send(method, params))
            .await
            .map_err(|_| {
                debug!("RPC {method} timed out after {:?}", self.timeout);
                ChainError::Timeout(self.timeout)
            })?
    }
}

/// Maps a JSON-RPC error object onto the error kinds callers branch on.
pub fn classify(code: i64, message: String) -> ChainError {
    if code == USER_REJECTED {
        ChainError::Rejected(message)
    } else if code == EXECUTION_REVERTED || message.to_lowercase().contains("revert") {
        ChainError::Reverted(message)
    } else {
        ChainError::Rpc { code, message }
    }
}

pub fn parse_quantity(value: &Value) -> Result<u64, ChainError> {
    let text = value
        .as_str()
        .ok_or_else(|| ChainError::Decode(format!("Expected hex quantity, got {value}")))?;

    u64::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::Decode(format!("Invalid hex quantity {text}: {e}")))
}

pub async fn chain_id<T: Transport>(transport: &T) -> Result<u64, ChainError> {
    let value = transport.request("eth_chainId", json!([])).await?;

    parse_quantity(&value)
}

pub async fn eth_call<T: Transport>(
    transport: &T,
    to: Address,
    data: &[u8],
) -> Result<Vec<u8>, ChainError> {
    let params = json!([
        { "to": to.to_string(), "data": hex::encode_prefixed(data) },
        "latest"
    ]);

    let value = transport.request("eth_call", params).await?;
    let text = value
        .as_str()
        .ok_or_else(|| ChainError::Decode(format!("Expected call output, got {value}")))?;

    hex::decode(text).map_err(|e| ChainError::Decode(format!("Invalid call output: {e}")))
}
