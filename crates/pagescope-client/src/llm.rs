use std::time::Duration;

use pagescope_core::error::AppError;
use pagescope_core::traits::SchemaInferrer;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Connection settings for an OpenAI-compatible chat completions API.
///
/// Works with any such API, including:
/// - OpenAI directly (`https://api.openai.com/v1`)
/// - OpenRouter (`https://openrouter.ai/api/v1`)
/// - Gemini via compatibility layer (`https://generativelanguage.googleapis.com/v1beta/openai`)
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub system_prompt: String,
}

impl InferenceConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Defaults: OpenAI base URL, 120 s timeout, JSON-only system prompt.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(120),
            system_prompt: "You are a web data analyst. Answer with a single JSON object \
                in the requested format and nothing else."
                .to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Schema inferrer backed by a chat completions endpoint. Returns the raw
/// model text; JSON extraction happens in the inference loop.
#[derive(Clone)]
pub struct OpenAiSchemaInferrer {
    client: Client,
    config: InferenceConfig,
}

impl OpenAiSchemaInferrer {
    pub fn new(config: InferenceConfig) -> Result<Self, AppError> {
        if config.model.trim().is_empty() {
            return Err(AppError::ConfigError("model name is empty".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl SchemaInferrer for OpenAiSchemaInferrer {
    async fn infer(&self, prompt: &str) -> Result<String, AppError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        tracing::debug!(model = %self.config.model, prompt_bytes = prompt.len(), "Requesting schema");

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(self.config.timeout)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

            return Err(AppError::InferenceError {
                message,
                status_code,
                retryable: status_code == 429 || status_code >= 500,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("Failed to parse inference response: {e}")))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::InferenceError {
                message: "Empty response from model".into(),
                status_code: 200,
                retryable: true,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    fn inferrer(server: &MockServer) -> OpenAiSchemaInferrer {
        let config = InferenceConfig::new("sk-test", "gpt-4o-mini")
            .with_base_url(&format!("{}/v1/", server.uri()));
        OpenAiSchemaInferrer::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_infer_returns_raw_content_and_sends_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_string_contains("gpt-4o-mini"))
            .and(body_string_contains("### BLOCK 1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("```json\n{}\n```")))
            .expect(1)
            .mount(&server)
            .await;

        let raw = inferrer(&server).infer("### BLOCK 1\n<div>x</div>").await.unwrap();
        assert_eq!(raw, "```json\n{}\n```");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({"error": {"message": "slow down"}})),
            )
            .mount(&server)
            .await;

        match inferrer(&server).infer("p").await.unwrap_err() {
            AppError::InferenceError {
                message,
                status_code,
                retryable,
            } => {
                assert_eq!(message, "slow down");
                assert_eq!(status_code, 429);
                assert!(retryable);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = inferrer(&server).infer("p").await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("HTTP 401: nope"));
    }

    #[tokio::test]
    async fn test_empty_choice_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        assert!(matches!(
            inferrer(&server).infer("p").await,
            Err(AppError::InferenceError { status_code: 200, .. })
        ));
    }

    #[test]
    fn test_blank_model_is_config_error() {
        assert!(matches!(
            OpenAiSchemaInferrer::new(InferenceConfig::new("k", "  ")),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn test_completions_url_ignores_trailing_slash() {
        let config = InferenceConfig::new("k", "m").with_base_url("https://openrouter.ai/api/v1/");
        assert_eq!(config.completions_url(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(
            InferenceConfig::new("k", "m").completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
