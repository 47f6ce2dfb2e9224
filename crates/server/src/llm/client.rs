//! `OpenAI` chat-completions client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::OpenAiConfig;

use super::ChatModel;
use super::error::{ApiErrorResponse, ModelError};
use super::types::{ChatMessage, ChatRequest, ChatResponse, FunctionDefinition};

/// Chat-completions client for `OpenAI` and compatible endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    inner: Arc<OpenAiClientInner>,
}

struct OpenAiClientInner {
    client: reqwest::Client,
    model: String,
    endpoint: String,
    timeout_secs: u64,
}

impl OpenAiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if the API key is not a valid
    /// header value or the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> Result<Self, ModelError> {
        let bearer = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth = HeaderValue::from_str(&bearer).map_err(|_| {
            ModelError::InvalidConfig("API key is not a valid header value".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(OpenAiClientInner {
                client,
                model: config.model.clone(),
                endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
                timeout_secs: config.timeout.as_secs(),
            }),
        })
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ChatResponse, ModelError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ModelError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ModelError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ModelError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ModelError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => {
                let message = serde_json::from_str::<ApiErrorResponse>(&body)
                    .map_or(body, |envelope| envelope.error.message);
                ModelError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
            Err(e) => ModelError::Http(e),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn model_id(&self) -> &str {
        &self.inner.model
    }

    #[instrument(
        skip(self, messages, functions),
        fields(model = %self.inner.model, messages = messages.len())
    )]
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        functions: Vec<FunctionDefinition>,
    ) -> Result<ChatResponse, ModelError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            messages,
            functions,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.inner.timeout_secs)
                } else {
                    ModelError::Http(e)
                }
            })?;

        self.handle_response(response).await
    }
}
