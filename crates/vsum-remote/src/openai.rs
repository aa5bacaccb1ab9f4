//! OpenAI chat-completions client for summary generation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vsum_models::SummarySettings;

use crate::error::{RemoteError, RemoteResult};
use crate::prompt::{build_user_prompt, summary_has_all_fields, SYSTEM_PROMPT};
use crate::SummaryGenerator;

/// OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key; absence is reported per call, not at startup
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OpenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("OPENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Summary generator backed by the OpenAI chat-completions API.
pub struct OpenAiSummaryGenerator {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiSummaryGenerator {
    pub fn new(config: OpenAiConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!("OPENAI_API_KEY not set; summary generation will fail until it is configured");
        }

        Ok(Self { config, client })
    }

    pub fn from_env() -> RemoteResult<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SummaryGenerator for OpenAiSummaryGenerator {
    async fn generate_summary(&self, transcript: &str, settings: &SummarySettings) -> RemoteResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| RemoteError::config_error("OPENAI_API_KEY not set"))?;

        let user_prompt = build_user_prompt(transcript, settings);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
        };

        info!(
            model = %self.config.model,
            length = %settings.length,
            language = %settings.language,
            "Requesting summary"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: ChatResponse = response.json().await?;
        let summary = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RemoteError::fatal("No content in completion response"))?;

        if !summary_has_all_fields(&summary) {
            debug!("Summary is missing one or more expected fields");
        }

        Ok(summary)
    }
}

fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let message = format!("OpenAI API returned {}: {}", status, body.trim());

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        RemoteError::transient(message)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        RemoteError::config_error(message)
    } else {
        RemoteError::fatal(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vsum_models::{FocusArea, Language, SummaryLength};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer, api_key: Option<&str>) -> OpenAiSummaryGenerator {
        OpenAiSummaryGenerator::new(OpenAiConfig {
            api_key: api_key.map(str::to_string),
            base_url: server.uri(),
            ..OpenAiConfig::default()
        })
        .unwrap()
    }

    fn settings() -> SummarySettings {
        SummarySettings::new(SummaryLength::Short, vec![FocusArea::KeyPoints], Language::default())
    }

    #[tokio::test]
    async fn test_generate_summary_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": " 1. Genre: Talk\n2. Emotion/tone: Calm\n3. Point-wise Summary: - hi\n4. Key takeaway: ok "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = generator(&server, Some("sk-test"))
            .generate_summary("hello world", &settings())
            .await
            .unwrap();

        assert!(summary.starts_with("1. Genre: Talk"));
        assert!(summary_has_all_fields(&summary));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let server = MockServer::start().await;

        let err = generator(&server, None)
            .generate_summary("hello", &settings())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Config(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = generator(&server, Some("sk-test"))
            .generate_summary("hello", &settings())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_bad_request_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("context length exceeded"))
            .mount(&server)
            .await;

        let err = generator(&server, Some("sk-test"))
            .generate_summary("hello", &settings())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Fatal(_)));
    }

    #[tokio::test]
    async fn test_empty_choices_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = generator(&server, Some("sk-test"))
            .generate_summary("hello", &settings())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Fatal(_)));
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(matches!(classify_status(StatusCode::UNAUTHORIZED, ""), RemoteError::Config(_)));
        assert!(matches!(classify_status(StatusCode::NOT_FOUND, ""), RemoteError::Fatal(_)));
    }
}
