use serde::{Deserialize, Serialize};

use crate::client::{CompletionClient, CompletionRequest};
use crate::config::ModelConfig;
use crate::error::ModelError;

/// OpenAI-compatible `POST /chat/completions` client (Groq, GitHub Models,
/// OpenRouter, local servers).
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

// ── Wire types ──

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait::async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        let model = if request.model.is_empty() {
            self.config.default_model.as_str()
        } else {
            request.model.as_str()
        };
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.config.temperature,
        };

        let resp = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| ModelError::Decode(e.to_string()))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ModelError::EmptyCompletion);
        }
        Ok(text)
    }
}

impl ChatCompletionsClient {
    fn classify(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::Timeout(self.config.timeout)
        } else {
            ModelError::Http(err)
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::time::Duration;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "sys".into(),
            user: "usr".into(),
            model: "llama-test".into(),
        }
    }

    fn client(base_url: String) -> ChatCompletionsClient {
        ChatCompletionsClient::new(ModelConfig {
            base_url,
            api_key: "secret".into(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer secret");
                assert_eq!(body["model"], "llama-test");
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "usr");
                Json(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  [1]  " } }]
                }))
            }),
        );
        let base = spawn(app).await;
        let text = client(base).complete(&request()).await.unwrap();
        assert_eq!(text, "[1]");
    }

    #[tokio::test]
    async fn sends_configured_temperature() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                let t = body["temperature"].as_f64().unwrap();
                Json(serde_json::json!({
                    "choices": [{ "message": { "content": format!("{t:.2}") } }]
                }))
            }),
        );
        let base = spawn(app).await;
        let c = ChatCompletionsClient::new(ModelConfig {
            base_url: base,
            temperature: 0.7,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.complete(&request()).await.unwrap(), "0.70");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn(app).await;
        let err = client(base).complete(&request()).await.unwrap_err();
        match err {
            ModelError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_empty_completion() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({ "choices": [] })) }),
        );
        let base = spawn(app).await;
        let err = client(base).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyCompletion));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!({ "choices": [] }))
            }),
        );
        let base = spawn(app).await;
        let c = ChatCompletionsClient::new(ModelConfig {
            base_url: base,
            timeout: Duration::from_millis(100),
            ..Default::default()
        })
        .unwrap();
        let err = c.complete(&request()).await.unwrap_err();
        assert!(matches!(err, ModelError::Timeout(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ñandú", 3), "ñan…");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
