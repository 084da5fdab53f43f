// Fake JSON-RPC server for tests

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&str, &Value) -> Value + Send + Sync;

struct FakeState {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, Value)>>,
}

/// Serves canned responses on 127.0.0.1 and records every call
pub struct FakeServer {
    pub url: String,
    state: Arc<FakeState>,
}

impl FakeServer {
    /// `handler` receives the method and params and returns the whole
    /// response envelope
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let state = Arc::new(FakeState {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/"),
            state,
        }
    }

    pub fn methods(&self) -> Vec<String> {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.calls.lock().unwrap().clone()
    }
}

async fn handle(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Json<Value> {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body.get("params").cloned().unwrap_or(Value::Null);

    state
        .calls
        .lock()
        .unwrap()
        .push((method.clone(), params.clone()));

    Json((state.handler)(&method, &params))
}

pub fn ok(result: Value) -> Value {
    json!({ "result": result })
}

pub fn rpc_error(name: &str, message: &str) -> Value {
    json!({ "error": { "message": message, "data": { "name": name } } })
}

/// A minimal stream claim with the given id and sd hash
pub fn stream_claim(claim_id: &str, name: &str, sd_hash: &str) -> Value {
    json!({
        "claim_id": claim_id,
        "name": name,
        "canonical_url": format!("lbry://@chan#1/{name}#{}", &claim_id[..1]),
        "value_type": "stream",
        "value": {
            "title": name,
            "release_time": "1600000000",
            "source": {"sd_hash": sd_hash, "size": "1048576", "media_type": "video/mp4"},
            "video": {"duration": 90}
        },
        "signing_channel": {"claim_id": "1111", "name": "@chan", "canonical_url": "lbry://@chan#1"},
        "meta": {"creation_timestamp": 1600000000, "support_amount": "0.0"},
        "amount": "0.1"
    })
}
