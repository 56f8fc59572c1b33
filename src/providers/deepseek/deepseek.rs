use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::error::{RagError, Result};
use crate::providers::traits::{GenerationBackend, GenerationRequest};

/// Chat backend for DeepSeek and other OpenAI-compatible HTTP endpoints.
#[derive(Clone)]
pub struct DeepSeekBackend {
    api_key: String,
    client: Client,
    config: ProviderConfig,
}

impl DeepSeekBackend {
    pub fn new(api_key: String, config: ProviderConfig) -> Self {
        Self {
            api_key,
            client: Client::new(),
            config,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl GenerationBackend for DeepSeekBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.api_url.trim_end_matches('/')
            ))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(request.prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::external(
                self.name(),
                format!("API request failed: Status {}, Body: {}", status, error_text),
            ));
        }

        let response_json: Value = response.json().await?;

        // Check for API-level errors
        if let Some(error) = response_json.get("error") {
            return Err(RagError::external(
                self.name(),
                format!("API returned error: {}", error),
            ));
        }

        extract_message_content(&response_json).ok_or_else(|| {
            let debug_json = serde_json::to_string(&response_json).unwrap_or_default();
            RagError::external(
                self.name(),
                format!("Invalid response format. Response JSON: {}", debug_json),
            )
        })
    }
}

fn extract_message_content(response: &Value) -> Option<String> {
    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(temperature: Option<f32>) -> DeepSeekBackend {
        DeepSeekBackend::new(
            "key".to_string(),
            ProviderConfig {
                model: "deepseek-chat".to_string(),
                api_url: "https://api.deepseek.com/v1/".to_string(),
                temperature,
                max_tokens: Some(300),
            },
        )
    }

    #[test]
    fn test_request_body_sends_prompt_as_user_message() {
        let body = backend(Some(0.2)).request_body("What is the leave policy?");
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "What is the leave policy?");
        assert_eq!(body["max_tokens"], 300);
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn test_request_body_omits_unset_temperature() {
        let body = backend(None).request_body("q");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_extract_message_content() {
        let response = json!({ "choices": [{ "message": { "content": "  20 days  " } }] });
        assert_eq!(extract_message_content(&response).as_deref(), Some("20 days"));
        assert!(extract_message_content(&json!({ "choices": [] })).is_none());
    }
}
