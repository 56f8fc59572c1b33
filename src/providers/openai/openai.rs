use async_trait::async_trait;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs, EmbeddingInput,
    },
    Client,
};

use crate::config::ProviderConfig;
use crate::error::{RagError, Result};
use crate::llm::embeddings::EmbeddingProvider;
use crate::providers::traits::{GenerationBackend, GenerationRequest};

fn client_for(api_key: &str, api_base: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base.filter(|b| !b.is_empty()) {
        config = config.with_api_base(base);
    }
    Client::with_config(config)
}

/// Chat-completion backend. One instance per model, so `gpt-4o-mini` and
/// `o4-mini` are separate entries in the fallback chain.
#[derive(Clone)]
pub struct OpenAIBackend {
    name: String,
    client: Client<OpenAIConfig>,
    config: ProviderConfig,
}

impl OpenAIBackend {
    pub fn new(api_key: String, config: ProviderConfig) -> Self {
        Self {
            name: config.model.clone(),
            client: client_for(&api_key, Some(&config.api_url)),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationBackend for OpenAIBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                request.prompt.to_string(),
            ))
            .build()?
            .into();

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.config.model).messages(vec![message]);
        if let Some(temperature) = self.config.temperature {
            args.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            args.max_tokens(max_tokens);
        }

        let response = self.client.chat().create(args.build()?).await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| RagError::external(&self.name, "No response content"))
    }
}

/// Embeddings through the OpenAI embeddings endpoint.
#[derive(Clone)]
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: client_for(&api_key, None),
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|embedding| embedding.embedding)
            .ok_or_else(|| RagError::external("OpenAI embeddings", "No embedding returned"))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
