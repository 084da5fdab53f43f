use crate::api::client::{build_http_client, decode, post_envelope};
use crate::core::error::RpcError;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// JSON-RPC 2.0 client for the comment server
pub struct CommentClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CommentClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn call_value(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, endpoint = %self.endpoint, "comment server call");

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        post_envelope(&self.client, &self.endpoint, method, &body).await
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let value = self.call_value(method, params).await?;
        decode(method, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ok, FakeServer};

    #[tokio::test]
    async fn test_sends_jsonrpc_envelope() {
        let server = FakeServer::spawn(|method, params| {
            assert_eq!(method, "comment.List");
            ok(json!({"echo": params["claim_id"]}))
        })
        .await;

        let client = CommentClient::new(&server.url, 5).unwrap();
        let value = client
            .call_value("comment.List", json!({"claim_id": "abc"}))
            .await
            .unwrap();

        assert_eq!(value["echo"], "abc");
        assert_eq!(server.methods(), vec!["comment.List"]);
    }
}
