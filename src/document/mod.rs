pub mod chunker;
pub mod source;

pub use chunker::{infer_risk_level, Chunk, Chunker, ChunkerConfig, RiskLevel};
pub use source::SourceDocument;
