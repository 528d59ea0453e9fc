//! # Completion Client
//!
//! File: bot/src/qa/completion.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Sends one prompt to a chat-completion endpoint and returns the text of the
//! first candidate. Request parameters are fixed at construction time from
//! `CompletionSettings` (model, token cap, candidate count, temperature).
//!
//! ## Architecture
//!
//! - `CompletionClient`: the seam the conversation handler depends on
//! - `OpenAiClient`: the `reqwest` implementation for OpenAI-compatible APIs
//! - `CompletionError`: why a completion failed
//!
//! The client reports failures instead of hiding them; the conversation
//! handler decides what the user sees. Nothing is retried.
//!
use crate::core::config::CompletionSettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a completion request produced no answer.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("request to completion provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion provider returned {status}: {message}")]
    Provider { status: StatusCode, message: String },

    #[error("completion provider sent an unreadable response: {0}")]
    MalformedResponse(String),

    #[error("completion provider returned no candidates")]
    EmptyResponse,
}

/// Anything that can turn a prompt into answer text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends `prompt` and returns the trimmed text of the first candidate.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    n: u32,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ProviderErrorDetail {
    message: String,
}

/// Chat-completion client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    client: Client,
    settings: CompletionSettings,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(settings: CompletionSettings) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(seconds) = settings.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build()?;
        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.trim_end_matches('/')
        );
        debug!("Completion endpoint: {}", endpoint);
        Ok(Self {
            client,
            settings,
            endpoint,
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            n: self.settings.n,
            temperature: self.settings.temperature,
        };

        debug!(
            "Requesting completion from {} (model {}, {} prompt bytes)",
            self.endpoint,
            self.settings.model,
            prompt.len()
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Provider {
                status,
                message: provider_message(&text),
            });
        }

        parse_first_candidate(&text)
    }
}

/// Pulls `error.message` out of a provider error body, falling back to the raw body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<ProviderErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn parse_first_candidate(body: &str) -> Result<String, CompletionError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or(CompletionError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Starts a throwaway provider on an ephemeral port that records each
    /// request body and answers with `status` / `reply`.
    async fn stub_provider(
        status: StatusCode,
        reply: Value,
    ) -> (String, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
        let seen: Arc<Mutex<Vec<(Option<String>, Value)>>> = Arc::default();
        let recorder = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorder.lock().unwrap().push((auth, body));
                    (status, Json(reply))
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), seen)
    }

    fn settings(base_url: String) -> CompletionSettings {
        CompletionSettings {
            api_key: Some("sk-test".into()),
            base_url,
            ..CompletionSettings::default()
        }
    }

    #[tokio::test]
    async fn test_returns_trimmed_first_candidate() {
        let (base_url, seen) = stub_provider(
            StatusCode::OK,
            json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "  Acme Corp was founded in 1999.\n" } },
                    { "message": { "role": "assistant", "content": "ignored" } }
                ]
            }),
        )
        .await;
        let client = OpenAiClient::new(settings(base_url)).unwrap();

        let answer = client.complete("When was Acme founded?").await.unwrap();
        assert_eq!(answer, "Acme Corp was founded in 1999.");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(
            body,
            &json!({
                "model": "gpt-4",
                "messages": [{ "role": "user", "content": "When was Acme founded?" }],
                "max_tokens": 150,
                "n": 1,
                "temperature": 0.5
            })
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let (base_url, _) = stub_provider(
            StatusCode::UNAUTHORIZED,
            json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } }),
        )
        .await;
        let client = OpenAiClient::new(settings(base_url)).unwrap();

        match client.complete("hi").await {
            Err(CompletionError::Provider { status, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let (base_url, _) = stub_provider(StatusCode::OK, json!({ "choices": [] })).await;
        let client = OpenAiClient::new(settings(base_url)).unwrap();

        assert!(matches!(
            client.complete("hi").await,
            Err(CompletionError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_an_http_error() {
        // Bind then drop to get a port with nothing listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OpenAiClient::new(settings(format!("http://{}/v1", addr))).unwrap();
        assert!(matches!(
            client.complete("hi").await,
            Err(CompletionError::Http(_))
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_first_candidate("<html>502 Bad Gateway</html>"),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_null_content_is_empty() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(
            parse_first_candidate(body),
            Err(CompletionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_provider_message_falls_back_to_body() {
        assert_eq!(provider_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let client = OpenAiClient::new(settings("https://api.example.com/v1/".into())).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }
}
