use crate::core::error::RpcError;
use crate::models::file_item::Settings;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// JSON-RPC client for the local daemon
pub struct DaemonClient {
    client: reqwest::Client,
    endpoint: String,
}

/// Paged list result shared by `file_list`, `claim_search`, `peer_list` and friends
#[derive(Debug, Deserialize)]
pub struct ItemPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total_items: Option<i64>,
    #[serde(default)]
    pub total_pages: Option<i64>,
}

impl DaemonClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call a method and return the raw `result` value
    pub async fn call_value(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, endpoint = %self.endpoint, "daemon call");

        let body = json!({ "method": method, "params": params });
        post_envelope(&self.client, &self.endpoint, method, &body).await
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let value = self.call_value(method, params).await?;
        decode(method, value)
    }

    /// Call a paged method; a result without `items` counts as an empty page
    pub async fn items<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<ItemPage<T>, RpcError> {
        let value = self.call_value(method, params).await?;
        if value.is_null() {
            return Ok(ItemPage {
                items: Vec::new(),
                total_items: Some(0),
                total_pages: Some(0),
            });
        }
        decode(method, value)
    }

    /// Only checks that something answers on the endpoint
    pub async fn server_exists(&self) -> Result<(), RpcError> {
        self.client
            .post(&self.endpoint)
            .send()
            .await
            .map_err(|source| RpcError::Connection {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        Ok(())
    }

    /// Read a `streaming_url` to the end, which makes the daemon fetch
    /// every blob without saving the media file
    pub async fn stream(&self, url: &str) -> Result<u64, RpcError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RpcError::Connection {
                endpoint: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| RpcError::Connection {
            endpoint: url.to_string(),
            source,
        })?;
        Ok(body.len() as u64)
    }

    pub async fn settings(&self) -> Result<Settings, RpcError> {
        self.call("settings_get", json!({})).await
    }
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    builder.build().context("Failed to create HTTP client")
}

pub(crate) async fn post_envelope(
    client: &reqwest::Client,
    endpoint: &str,
    method: &str,
    body: &Value,
) -> Result<Value, RpcError> {
    let response = client
        .post(endpoint)
        .json(body)
        .send()
        .await
        .map_err(|source| RpcError::Connection {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let status = response.status();

    // Error envelopes may come with a non-2xx status, so read the body first
    let envelope: Value = match response.json().await {
        Ok(value) => value,
        Err(e) if status.is_success() => {
            return Err(RpcError::Malformed {
                method: method.to_string(),
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(RpcError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            })
        }
    };

    parse_envelope(method, envelope)
}

/// Split a `{"result"}` / `{"error"}` envelope
pub(crate) fn parse_envelope(method: &str, mut envelope: Value) -> Result<Value, RpcError> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        return Err(envelope_error(method, error));
    }

    match envelope.as_object_mut().and_then(|obj| obj.remove("result")) {
        Some(result) => Ok(result),
        None => Err(RpcError::Malformed {
            method: method.to_string(),
            reason: "no 'result' in response".to_string(),
        }),
    }
}

fn envelope_error(method: &str, error: &Value) -> RpcError {
    let name = error
        .pointer("/data/name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| error.get("code").map(|c| c.to_string()))
        .unwrap_or_else(|| "Error".to_string());

    let message = match error {
        Value::String(s) => s.clone(),
        _ => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    };

    RpcError::Envelope {
        method: method.to_string(),
        name,
        message,
    }
}

pub(crate) fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Malformed {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ok, rpc_error, FakeServer};

    #[test]
    fn test_client_creation() {
        let client = DaemonClient::new("http://localhost:5279", 30);
        assert!(client.is_ok());

        // Timeout disabled
        assert!(DaemonClient::new("http://localhost:5279", 0).is_ok());
    }

    #[test]
    fn test_parse_envelope_result() {
        let value = parse_envelope("status", json!({"result": {"ok": true}})).unwrap();
        assert_eq!(value, json!({"ok": true}));

        // Null result is still a result
        let value = parse_envelope("status", json!({"result": null})).unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_parse_envelope_error() {
        let err = parse_envelope(
            "resolve",
            json!({"error": {"message": "bad", "data": {"name": "ValueError"}}}),
        )
        .unwrap_err();

        match err {
            RpcError::Envelope { name, message, .. } => {
                assert_eq!(name, "ValueError");
                assert_eq!(message, "bad");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Comment server style error
        let err = parse_envelope("comment.List", json!({"error": {"code": -32602, "message": "x"}}))
            .unwrap_err();
        assert!(err.to_string().contains("-32602"));
    }

    #[test]
    fn test_parse_envelope_missing_result() {
        let err = parse_envelope("status", json!({"id": 1})).unwrap_err();
        assert!(matches!(err, RpcError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_call_against_fake_daemon() {
        let server = FakeServer::spawn(|method, _params| match method {
            "settings_get" => ok(json!({"data_dir": "/data", "download_dir": "/dl"})),
            _ => rpc_error("UnknownMethod", "no such method"),
        })
        .await;

        let client = DaemonClient::new(&server.url, 5).unwrap();
        let settings = client.settings().await.unwrap();
        assert_eq!(settings.blob_dir(), std::path::PathBuf::from("/data/blobfiles"));

        let err = client.call_value("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, RpcError::Envelope { .. }));

        assert_eq!(server.methods(), vec!["settings_get", "nope"]);
    }

    #[tokio::test]
    async fn test_items_defaults_to_empty() {
        let server = FakeServer::spawn(|_, _| ok(json!({"total_items": 0}))).await;
        let client = DaemonClient::new(&server.url, 5).unwrap();

        let page: ItemPage<Value> = client.items("file_list", json!({})).await.unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Nothing listens on the discard port
        let client = DaemonClient::new("http://127.0.0.1:9", 2).unwrap();
        let err = client.server_exists().await.unwrap_err();
        assert!(matches!(err, RpcError::Connection { .. }));
    }
}
