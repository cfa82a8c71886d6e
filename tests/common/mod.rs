#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    routing::post,
};
use chat_relay::config::Config;
use serde_json::{Value, json};

pub const TEST_KEY: &str = "test-key";
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub fn test_config(api_url: &str, timeout: Duration, max_retries: u32) -> Config {
    Config {
        api_key: TEST_KEY.to_string(),
        api_url: api_url.to_string(),
        model: "deepseek-chat".to_string(),
        timeout,
        max_retries,
        app_secret: None,
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// What the fake upstream answers for one attempt.
#[derive(Clone)]
pub struct Scripted {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Scripted {
    pub fn reply(content: &str) -> Self {
        Self::json(StatusCode::OK, completion_body(content))
    }

    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::raw(status, &body.to_string())
    }

    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct FakeUpstream {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeUpstream {
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serve a local chat-completion endpoint. `script` gets the 1-based attempt
/// number and decides the answer.
///
/// httpmock answers every hit of a mock the same way, so tests that need a
/// different answer per attempt, or a slow answer, use this server instead.
/// Single-answer tests that assert on request matching use httpmock.
pub async fn spawn_upstream<F>(script: F) -> FakeUpstream
where
    F: Fn(usize) -> Scripted + Send + Sync + 'static,
{
    let requests: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));
    let script = Arc::new(script);

    let handler = {
        let requests = requests.clone();
        move |headers: HeaderMap, Json(body): Json<Value>| {
            let requests = requests.clone();
            let script = script.clone();
            async move {
                let attempt = {
                    let mut guard = requests.lock().unwrap();
                    guard.push(Recorded {
                        authorization: headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                        body,
                    });
                    guard.len()
                };
                let answer = (*script)(attempt);
                tokio::time::sleep(answer.delay).await;
                (
                    answer.status,
                    [(header::CONTENT_TYPE, "application/json")],
                    answer.body,
                )
            }
        }
    };

    let app = Router::new().route(COMPLETIONS_PATH, post(handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeUpstream {
        url: format!("http://{addr}{COMPLETIONS_PATH}"),
        requests,
    }
}

/// An address nothing listens on.
pub fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{COMPLETIONS_PATH}")
}

/// Answer with `status_line` and a `content-length` of 100, send only a few
/// body bytes, then stall.
pub async fn spawn_stalled_upstream(status_line: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "{status_line}\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{{\"err\""
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(10)).await;
            });
        }
    });

    format!("http://{addr}{COMPLETIONS_PATH}")
}
