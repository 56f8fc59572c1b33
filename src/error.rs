use thiserror::Error;

/// Errors raised by the retrieval-and-answer pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("Index not loaded: call load_documents() before querying")]
    IndexNotLoaded,

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("No chunk could be embedded; refusing to write an empty index")]
    EmptyIndex,

    #[error("{0} timed out")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),
}

impl RagError {
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;
