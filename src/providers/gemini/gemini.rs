use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::error::{RagError, Result};
use crate::llm::embeddings::EmbeddingProvider;
use crate::providers::traits::{GenerationBackend, GenerationRequest};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reads a successful JSON body or turns the status and body into an error.
async fn read_json(service: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(RagError::external(
            service,
            format!("API request failed: Status {}, Body: {}", status, error_text),
        ));
    }

    let response_json: Value = response.json().await?;
    if let Some(error) = response_json.get("error") {
        return Err(RagError::external(service, format!("API returned error: {}", error)));
    }
    Ok(response_json)
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

/// Gemini `generateContent` backend.
#[derive(Clone)]
pub struct GeminiBackend {
    name: String,
    api_key: String,
    client: Client,
    config: ProviderConfig,
}

impl GeminiBackend {
    pub fn new(api_key: String, config: ProviderConfig) -> Self {
        Self {
            name: "gemini-pro".to_string(),
            api_key,
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        let base = if self.config.api_url.is_empty() {
            GEMINI_API_URL
        } else {
            self.config.api_url.trim_end_matches('/')
        };
        format!("{}/{}:generateContent", base, model_path(&self.config.model))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }]
        });
        if let Some(temperature) = self.config.temperature {
            body["generationConfig"] = json!({ "temperature": temperature });
        }

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let response_json = read_json(&self.name, response).await?;

        extract_candidate_text(&response_json)
            .ok_or_else(|| RagError::external(&self.name, "Invalid response format"))
    }
}

/// Joins every text part of the first candidate.
fn extract_candidate_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    Some(text.trim().to_string())
}

/// Gemini `embedContent` embeddings (`text-embedding-004` by default).
#[derive(Clone)]
pub struct GeminiEmbedder {
    api_key: String,
    client: Client,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = model_path(&self.model);
        let response = self
            .client
            .post(format!("{}/{}:embedContent", GEMINI_API_URL, model))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "model": model,
                "content": { "parts": [{ "text": text }] }
            }))
            .send()
            .await?;

        let response_json = read_json("Gemini embeddings", response).await?;
        parse_embedding(&response_json)
            .ok_or_else(|| RagError::external("Gemini embeddings", "No embedding values returned"))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn parse_embedding(response: &Value) -> Option<Vec<f32>> {
    let values = response["embedding"]["values"].as_array()?;
    let vector: Vec<f32> = values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();
    if vector.is_empty() || vector.len() != values.len() {
        return None;
    }
    Some(vector)
}
