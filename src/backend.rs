use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub inference_time: String,
}

// FastAPI error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn with_config(base_url: &str, timeout_secs: Option<u64>) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(BackendClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn check_status(&self) -> Result<StatusResponse, BackendError> {
        let url = format!("{}/status", self.base_url);
        debug!(%url, "checking backend status");

        let response = self.client.get(&url).send().await?;
        let status: StatusResponse = decode(response).await?;

        info!(status = %status.status, "backend status received");
        Ok(status)
    }

    pub async fn ask_question(&self, text: &str) -> Result<AskResponse, BackendError> {
        let url = format!("{}/ask", self.base_url);
        debug!(%url, question = text, "submitting question");

        let response = self
            .client
            .post(&url)
            .json(&AskRequest { query: text })
            .send()
            .await?;
        let answer: AskResponse = decode(response).await?;

        info!(inference_time = %answer.inference_time, "answer received");
        Ok(answer)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let code = response.status();
    let body = response.text().await?;

    if !code.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.detail)
            .unwrap_or_else(|_| code.canonical_reason().unwrap_or("request failed").to_string());
        warn!(code = code.as_u16(), %detail, "backend request failed");
        return Err(BackendError::Status { code: code.as_u16(), detail });
    }

    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn ready_backend() -> Router {
        Router::new()
            .route(
                "/status",
                get(|| async { Json(json!({"status": "ready", "message": "RAG system initialized and ready."})) }),
            )
            .route(
                "/ask",
                post(|Json(body): Json<Value>| async move {
                    let query = body["query"].as_str().unwrap_or_default().to_string();
                    Json(json!({"answer": format!("echo: {query}"), "inference_time": "0.42 seconds"}))
                }),
            )
    }

    #[tokio::test]
    async fn test_check_status_ready() {
        let url = spawn_backend(ready_backend()).await;
        let client = BackendClient::with_config(&url, None).unwrap();

        let status = client.check_status().await.unwrap();
        assert!(status.is_ready());
        assert_eq!(status.message.as_deref(), Some("RAG system initialized and ready."));
    }

    #[tokio::test]
    async fn test_check_status_initializing_without_message() {
        let router = Router::new().route("/status", get(|| async { Json(json!({"status": "initializing"})) }));
        let url = spawn_backend(router).await;
        let client = BackendClient::with_config(&url, None).unwrap();

        let status = client.check_status().await.unwrap();
        assert!(!status.is_ready());
        assert_eq!(status.message, None);
    }

    #[tokio::test]
    async fn test_ask_question_sends_query_payload() {
        let url = spawn_backend(ready_backend()).await;
        let client = BackendClient::with_config(&url, Some(5)).unwrap();

        let answer = client.ask_question("What is Ubestream?").await.unwrap();
        assert_eq!(answer.answer, "echo: What is Ubestream?");
        assert_eq!(answer.inference_time, "0.42 seconds");
    }

    #[tokio::test]
    async fn test_ask_question_surfaces_detail() {
        let router = Router::new().route(
            "/ask",
            post(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"detail": "RAG system not initialized. Please check server logs."})),
                )
            }),
        );
        let url = spawn_backend(router).await;
        let client = BackendClient::with_config(&url, None).unwrap();

        match client.ask_question("hello").await {
            Err(BackendError::Status { code, detail }) => {
                assert_eq!(code, 503);
                assert!(detail.contains("not initialized"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let router = Router::new().route("/status", get(|| async { "not json" }));
        let url = spawn_backend(router).await;
        let client = BackendClient::with_config(&url, None).unwrap();

        assert!(matches!(client.check_status().await, Err(BackendError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BackendClient::with_config(&format!("http://{addr}"), Some(2)).unwrap();
        assert!(matches!(client.check_status().await, Err(BackendError::Network(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = BackendClient::with_config("http://localhost:8006///", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8006");
    }
}
