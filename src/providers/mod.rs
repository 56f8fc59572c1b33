pub mod deepseek;
pub mod extractive;
pub mod gemini;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::{ProviderConfig, Settings};
use deepseek::deepseek::DeepSeekBackend;
use gemini::gemini::GeminiBackend;
use openai::openai::OpenAIBackend;
use traits::GenerationBackend;

/// Builds the generative chain in the configured priority order. Backends
/// without credentials, and unknown names, are left out. The extractive
/// fallback is not part of this list; the orchestrator always ends with it.
pub fn backends_from_settings(settings: &Settings) -> Vec<Arc<dyn GenerationBackend>> {
    let mut backends: Vec<Arc<dyn GenerationBackend>> = Vec::new();

    for name in &settings.backends {
        let backend: Option<Arc<dyn GenerationBackend>> = match name.as_str() {
            "openai" | "gpt-4o-mini" | "o4-mini" => {
                let provider = if name == "o4-mini" { "o4-mini" } else { "openai" };
                settings.openai_api_key.clone().map(|key| {
                    Arc::new(OpenAIBackend::new(key, ProviderConfig::from_env(provider)))
                        as Arc<dyn GenerationBackend>
                })
            }
            "gemini" => settings.gemini_api_key.clone().map(|key| {
                Arc::new(GeminiBackend::new(key, ProviderConfig::from_env("gemini")))
                    as Arc<dyn GenerationBackend>
            }),
            "deepseek" => settings.deepseek_api_key.clone().map(|key| {
                Arc::new(DeepSeekBackend::new(key, ProviderConfig::from_env("deepseek")))
                    as Arc<dyn GenerationBackend>
            }),
            other => {
                tracing::warn!("Unknown backend '{}' in RAG_BACKENDS, ignoring", other);
                continue;
            }
        };

        match backend {
            Some(backend) => backends.push(backend),
            None => tracing::info!("No credentials for backend '{}', leaving it out", name),
        }
    }

    backends
}
