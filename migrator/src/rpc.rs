//! JSON-RPC 2.0 transports: plain HTTP for queries and a WebSocket
//! subscription for watching a submitted extrinsic until finality.

use {
    crate::error::RpcError,
    futures_util::{SinkExt, StreamExt},
    log::*,
    serde::de::DeserializeOwned,
    serde_json::{json, Value},
    std::{
        sync::atomic::{AtomicU64, Ordering},
        time::Duration,
    },
    tokio_tungstenite::{connect_async, tungstenite::Message},
};

/// Turns a JSON-RPC response object into its `result`, or the remote error.
pub fn parse_response<T: DeserializeOwned>(mut response: Value) -> Result<T, RpcError> {
    if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
        return Err(RpcError::Remote {
            code: error["code"].as_i64().unwrap_or_default(),
            message: error["message"].as_str().unwrap_or_default().to_string(),
        });
    }
    let result = response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RpcError::UnexpectedResponse(response.to_string()))?;
    Ok(serde_json::from_value(result)?)
}

fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

pub struct HttpClient {
    client: reqwest::Client,
    url: String,
    request_id: AtomicU64,
}

impl HttpClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        debug!("rpc {} -> {} {}", self.url, method, params);
        let response = self
            .client
            .post(&self.url)
            .json(&request(id, method, params))
            .send()
            .await
            .map_err(|e| {
                warn!("rpc {}: {} failed: {:?}", self.url, method, e);
                e
            })?;
        let body: Value = response.json().await?;
        parse_response(body)
    }
}

/// Progress of a watched extrinsic, as reported by `author_extrinsicUpdate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Future,
    Ready,
    Broadcast,
    InBlock(String),
    Retracted(String),
    FinalityTimeout(String),
    Finalized(String),
    Usurped(String),
    Dropped,
    Invalid,
}

impl TransactionStatus {
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(status) = value.as_str() {
            return match status {
                "future" => Some(Self::Future),
                "ready" => Some(Self::Ready),
                "dropped" => Some(Self::Dropped),
                "invalid" => Some(Self::Invalid),
                _ => None,
            };
        }
        let (key, inner) = value.as_object()?.iter().next()?;
        let hash = || inner.as_str().unwrap_or_default().to_string();
        match key.as_str() {
            "broadcast" => Some(Self::Broadcast),
            "inBlock" => Some(Self::InBlock(hash())),
            "retracted" => Some(Self::Retracted(hash())),
            "finalityTimeout" => Some(Self::FinalityTimeout(hash())),
            "finalized" => Some(Self::Finalized(hash())),
            "usurped" => Some(Self::Usurped(hash())),
            _ => None,
        }
    }

    /// `Some(Ok(block))` once finalized, `Some(Err(_))` once the pool gave up.
    pub fn outcome(&self) -> Option<Result<String, RpcError>> {
        match self {
            Self::Finalized(block) => Some(Ok(block.clone())),
            Self::Invalid => Some(Err(RpcError::ExtrinsicRejected("invalid".to_string()))),
            Self::Dropped => Some(Err(RpcError::ExtrinsicRejected("dropped".to_string()))),
            Self::Usurped(hash) => Some(Err(RpcError::ExtrinsicRejected(format!("usurped by {hash}")))),
            Self::FinalityTimeout(block) => Some(Err(RpcError::ExtrinsicRejected(format!(
                "finality timeout in block {block}"
            )))),
            _ => None,
        }
    }
}

pub struct WsClient {
    url: String,
    timeout: Duration,
}

impl WsClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submits a SCALE encoded extrinsic and waits for the block it is
    /// finalized in. `timeout` bounds the whole exchange.
    pub async fn submit_and_watch(&self, extrinsic_hex: &str) -> Result<String, RpcError> {
        tokio::time::timeout(self.timeout, self.submit_and_watch_inner(extrinsic_hex))
            .await
            .map_err(|_| RpcError::Timeout)?
    }

    async fn submit_and_watch_inner(&self, extrinsic_hex: &str) -> Result<String, RpcError> {
        let (mut socket, _) = connect_async(self.url.as_str()).await?;
        let subscribe = request(1, "author_submitAndWatchExtrinsic", json!([extrinsic_hex]));
        socket.send(Message::Text(subscribe.to_string())).await?;

        let mut subscription: Option<Value> = None;
        while let Some(message) = socket.next().await {
            let text = match message? {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    return Err(RpcError::UnexpectedResponse(format!("connection closed: {frame:?}")))
                }
                _ => continue,
            };
            let value: Value = serde_json::from_str(&text)?;

            if subscription.is_none() && value.get("id").and_then(Value::as_u64) == Some(1) {
                let id: Value = parse_response(value)?;
                debug!("watching extrinsic, subscription {}", id);
                subscription = Some(id);
                continue;
            }

            if value["method"] != "author_extrinsicUpdate" {
                continue;
            }
            let params = &value["params"];
            if subscription.as_ref() != Some(&params["subscription"]) {
                continue;
            }
            let Some(status) = TransactionStatus::from_value(&params["result"]) else {
                warn!("unknown extrinsic status {}", params["result"]);
                continue;
            };
            info!("extrinsic status: {:?}", status);
            if let Some(outcome) = status.outcome() {
                let _ = socket.close(None).await;
                return outcome;
            }
        }
        Err(RpcError::UnexpectedResponse(
            "connection ended before the extrinsic was finalized".to_string(),
        ))
    }
}
