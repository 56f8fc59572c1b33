use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Per-provider generation settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub api_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u16>,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase().replace('-', "_");

        let model = env::var(format!("{}_MODEL", prefix))
            .unwrap_or_else(|_| match provider {
                "openai" => "gpt-4o-mini".to_string(),
                "o4-mini" => "o4-mini".to_string(),
                "gemini" => "gemini-pro-latest".to_string(),
                "deepseek" => "deepseek-chat".to_string(),
                _ => String::new(),
            });

        let api_url = env::var(format!("{}_API_URL", prefix))
            .unwrap_or_else(|_| match provider {
                "openai" | "o4-mini" => "https://api.openai.com/v1".to_string(),
                "gemini" => "https://generativelanguage.googleapis.com/v1beta".to_string(),
                "deepseek" => "https://api.deepseek.com/v1".to_string(),
                _ => String::new(),
            });

        // Reasoning models reject sampling parameters.
        let sampling = provider != "o4-mini";

        let temperature = env::var(format!("{}_TEMPERATURE", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .or(if sampling { Some(0.2) } else { None });

        let max_tokens = env::var(format!("{}_MAX_TOKENS", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .or(if sampling { Some(300) } else { None });

        Self {
            model,
            api_url,
            temperature,
            max_tokens,
        }
    }
}

/// Which service produces embeddings for both index build and query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Gemini,
    OpenAI,
}

impl EmbedderKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(EmbedderKind::Gemini),
            "openai" => Some(EmbedderKind::OpenAI),
            _ => None,
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub index_dir: PathBuf,
    pub chunks_dir: PathBuf,
    pub top_k: usize,
    pub embed_delay: Duration,
    pub backend_timeout: Duration,
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub prompt_warn_chars: usize,
    /// Backend names in priority order. The extractive fallback is always appended.
    pub backends: Vec<String>,
    pub embedder: EmbedderKind,
    pub embedding_model: String,
    pub frontend_origin: String,
    pub sensitive_keywords: Vec<String>,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("data/index"),
            chunks_dir: PathBuf::from("data/chunks"),
            top_k: 5,
            embed_delay: Duration::from_millis(50),
            backend_timeout: Duration::from_secs(30),
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            prompt_warn_chars: 24_000,
            backends: vec![
                "openai".to_string(),
                "gemini".to_string(),
                "o4-mini".to_string(),
            ],
            embedder: EmbedderKind::Gemini,
            embedding_model: "text-embedding-004".to_string(),
            frontend_origin: "http://localhost:3000".to_string(),
            sensitive_keywords: [
                "harassment",
                "discrimination",
                "termination",
                "legal",
                "compliance",
                "salary",
                "bonus",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            openai_api_key: None,
            gemini_api_key: None,
            deepseek_api_key: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let embedder = env::var("RAG_EMBEDDER")
            .ok()
            .and_then(|v| EmbedderKind::parse(&v))
            .unwrap_or(defaults.embedder);

        let embedding_model = env::var("RAG_EMBEDDING_MODEL").unwrap_or_else(|_| match embedder {
            EmbedderKind::Gemini => defaults.embedding_model.clone(),
            EmbedderKind::OpenAI => env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
        });

        let backends = env::var("RAG_BACKENDS")
            .map(|b| {
                b.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.backends);

        Self {
            index_dir: env::var("RAG_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_dir),
            chunks_dir: env::var("RAG_CHUNKS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.chunks_dir),
            top_k: parse_var("RAG_TOP_K").unwrap_or(defaults.top_k),
            embed_delay: parse_var("RAG_EMBED_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.embed_delay),
            backend_timeout: parse_var("RAG_BACKEND_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.backend_timeout),
            failure_threshold: parse_var("RAG_FAILURE_THRESHOLD")
                .unwrap_or(defaults.failure_threshold),
            cooldown: parse_var("RAG_COOLDOWN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cooldown),
            prompt_warn_chars: parse_var("RAG_PROMPT_WARN_CHARS")
                .unwrap_or(defaults.prompt_warn_chars),
            backends,
            embedder,
            embedding_model,
            frontend_origin: env::var("RAG_FRONTEND_ORIGIN")
                .unwrap_or(defaults.frontend_origin),
            sensitive_keywords: defaults.sensitive_keywords,
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            gemini_api_key: non_empty_var("GEMINI_API_KEY")
                .or_else(|| non_empty_var("GOOGLE_API_KEY")),
            deepseek_api_key: non_empty_var("DEEPSEEK_API_KEY"),
        }
    }

    /// Returns the first sensitive keyword contained in `text`, if any.
    pub fn sensitive_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.sensitive_keywords
            .iter()
            .find(|k| lowered.contains(k.as_str()))
            .map(|k| k.as_str())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
