//! Generation client for OpenAI-compatible chat completions endpoints.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::GenerationClient;
use super::error::GenerationError;
use crate::config::schema::GenerationConfig;
use crate::sanitize::redact_url;

/// Maximum length for upstream error bodies kept in job records and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_error_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions client.
///
/// Agent configs may override `model`, `temperature`, `maxTokens` and
/// `systemPrompt` per job.
pub struct HttpGenerationClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl HttpGenerationClient {
    pub fn new(
        settings: &GenerationConfig,
        api_key: Option<SecretString>,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim().to_string(),
            model: settings.model.clone(),
            api_key,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: settings.timeout(),
        })
    }

    fn build_request(&self, prompt: &str, agent_config: &Value) -> ChatRequest {
        let model = agent_config
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.model)
            .to_string();
        let temperature = agent_config
            .get("temperature")
            .and_then(Value::as_f64)
            .or(self.temperature.map(f64::from));
        let max_tokens = agent_config
            .get("maxTokens")
            .and_then(Value::as_u64)
            .or(self.max_tokens.map(u64::from));

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = agent_config.get("systemPrompt").and_then(Value::as_str) {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.to_string(),
        });

        ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

fn parse_response(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::ResponseParse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| GenerationError::ResponseParse("response contained no content".to_string()))
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(&self, prompt: &str, agent_config: &Value) -> Result<String, GenerationError> {
        if !self.is_configured() {
            return Err(GenerationError::NotConfigured(
                "endpoint and API key are required".to_string(),
            ));
        }

        let request = self.build_request(prompt, agent_config);
        debug!(
            "Sending generation request to {} (model {}, {} prompt bytes)",
            redact_url(&self.endpoint),
            request.model,
            prompt.len()
        );

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        parse_response(&body)
    }

    fn is_configured(&self) -> bool {
        let has_key = self
            .api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty());
        !self.endpoint.is_empty() && has_key
    }
}
