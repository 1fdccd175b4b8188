//! OpenAI-compatible backend.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, and any endpoint exposing
//! `/v1/chat/completions`. The ReAct agents drive it with a single user
//! message per completion and rely on stop sequences to end the turn
//! before the model invents its own observation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwise_core::error::ProviderError;
use stepwise_core::llm::Llm;
use tracing::{debug, warn};

pub struct OpenAiCompatLlm {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatLlm {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            client,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, prompt: &str, stop: &[String]) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: Some(prompt.to_string()),
            }],
            temperature: self.temperature,
            // The API accepts at most four stop sequences.
            stop: stop.iter().take(4).cloned().collect(),
        }
    }
}

#[async_trait]
impl Llm for OpenAiCompatLlm {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_chat(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(prompt, stop);

        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        first_content(api_response)
    }
}

fn first_content(response: ApiResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| ProviderError::ApiError {
            status_code: 200,
            message: "No choices in response".into(),
        })
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
