//! Feedback generation
//!
//! One chat-completion request per essay against an OpenAI-compatible API.
//! The call never fails the caller: any problem (no key, transport error,
//! non-2xx status, unexpected body) is turned into a localized
//! [`Outcome::Degraded`] message. There are no retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::FeedbackConfig;
use crate::i18n::Messages;
use crate::models::Outcome;

/// Produces feedback text for an essay
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    /// Generate feedback for `text`. Failures come back as `Outcome::Degraded`.
    async fn generate(&self, text: &str) -> Outcome;
}

/// Reasons a feedback request did not produce text
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("response contained no choices")]
    EmptyChoices,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Error envelope used by OpenAI-compatible services
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Longest service error body quoted in a degraded message
const MAX_ERROR_BODY: usize = 300;

/// Chat-completions client
pub struct OpenAiFeedback {
    client: reqwest::Client,
    config: FeedbackConfig,
    messages: Messages,
}

impl OpenAiFeedback {
    pub fn new(config: FeedbackConfig, messages: Messages) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            config,
            messages,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Send the request and pull the reply text out of the first choice
    async fn request(&self, text: &str) -> Result<String, FeedbackError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(FeedbackError::MissingApiKey)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(FeedbackError::Status {
                status,
                message: error_message(&raw),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| FeedbackError::Malformed(e.to_string()))?;

        let choice = parsed.choices.into_iter().next().ok_or(FeedbackError::EmptyChoices)?;
        let content = choice
            .message
            .content
            .ok_or_else(|| FeedbackError::Malformed("choice has no message content".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl FeedbackGenerator for OpenAiFeedback {
    async fn generate(&self, text: &str) -> Outcome {
        match self.request(text).await {
            Ok(feedback) => {
                tracing::debug!(chars = feedback.len(), model = %self.config.model, "Feedback generated");
                Outcome::Complete(feedback)
            }
            Err(e) => {
                tracing::warn!(model = %self.config.model, "Feedback generation degraded: {}", e);
                Outcome::Degraded(self.messages.feedback_failed(e))
            }
        }
    }
}

/// Prefer the service's own error message; fall back to the raw body
fn error_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        return envelope.error.message;
    }
    let raw = raw.trim();
    match raw.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{closed_base_url, reply, spawn};
    use super::*;
    use crate::config::DEFAULT_SYSTEM_PROMPT;
    use crate::i18n::Locale;
    use axum::http::StatusCode;

    fn generator(base_url: String, api_key: Option<&str>, locale: Locale) -> OpenAiFeedback {
        let config = FeedbackConfig {
            api_key: api_key.map(str::to_string),
            base_url,
            ..FeedbackConfig::default()
        };
        OpenAiFeedback::new(config, Messages::new(locale)).unwrap()
    }

    #[tokio::test]
    async fn test_sends_fixed_prompt_and_returns_trimmed_reply() {
        let (base_url, captured) = spawn(StatusCode::OK, reply("\n  Nice structure.  \n")).await;
        let feedback = generator(base_url, Some("sk-test"), Locale::En);

        let outcome = feedback.generate("My essay about rivers.").await;
        assert_eq!(outcome, Outcome::Complete("Nice structure.".to_string()));

        let requests = captured.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], DEFAULT_SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "My essay about rivers.");
    }

    #[tokio::test]
    async fn test_error_status_degrades_with_service_message() {
        let error = serde_json::json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}});
        let (base_url, captured) = spawn(StatusCode::UNAUTHORIZED, error).await;
        let feedback = generator(base_url, Some("sk-bad"), Locale::En);

        let outcome = feedback.generate("essay").await;

        assert!(outcome.is_degraded());
        assert!(outcome.as_str().starts_with("Error while generating feedback: "));
        assert!(outcome.as_str().contains("Incorrect API key provided"));
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_choices_degrade() {
        let (base_url, _) = spawn(StatusCode::OK, serde_json::json!({"choices": []})).await;
        let outcome = generator(base_url, Some("sk"), Locale::En).generate("essay").await;

        assert!(outcome.is_degraded());
        assert!(outcome.as_str().contains("no choices"));
    }

    #[tokio::test]
    async fn test_malformed_body_degrades() {
        let (base_url, _) = spawn(StatusCode::OK, serde_json::json!({"unexpected": true})).await;
        let outcome = generator(base_url, Some("sk"), Locale::En).generate("essay").await;

        assert!(outcome.is_degraded());
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_in_locale() {
        let outcome = generator(closed_base_url().await, Some("sk"), Locale::Tr)
            .generate("deneme")
            .await;

        assert!(outcome.is_degraded());
        assert!(outcome.as_str().starts_with("Geribildirim oluşturulurken hata oluştu: "));
    }

    #[tokio::test]
    async fn test_missing_key_degrades_without_request() {
        let (base_url, captured) = spawn(StatusCode::OK, reply("unused")).await;
        let outcome = generator(base_url, None, Locale::En).generate("essay").await;

        assert!(outcome.is_degraded());
        assert!(!outcome.as_str().is_empty());
        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let feedback = generator("https://api.example.com/v1/".to_string(), None, Locale::En);
        assert_eq!(feedback.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_error_message_truncates_plain_bodies() {
        assert_eq!(error_message("  gateway down "), "gateway down");
        let long = "x".repeat(MAX_ERROR_BODY + 50);
        assert_eq!(error_message(&long).len(), MAX_ERROR_BODY + 3);
    }
}
