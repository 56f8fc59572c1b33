//! Splits source documents into bounded, metadata-tagged chunks.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::source::SourceDocument;

pub const MIN_WORDS: usize = 150;
pub const MAX_WORDS: usize = 800;

const DEFAULT_HEADING: &str = "General";

const HIGH_RISK_KEYWORDS: [&str; 6] = [
    "termination",
    "harassment",
    "disciplinary",
    "violation",
    "investigation",
    "legal action",
];

const MEDIUM_RISK_KEYWORDS: [&str; 6] = [
    "leave",
    "benefits",
    "performance",
    "working hours",
    "promotion",
    "compensation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        };
        write!(f, "{}", label)
    }
}

/// Tags text by keyword presence. The high tier is checked first.
pub fn infer_risk_level(text: &str) -> RiskLevel {
    let lowered = text.to_lowercase();
    if HIGH_RISK_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        RiskLevel::High
    } else if MEDIUM_RISK_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub source: String,
    pub path: String,
    pub heading: String,
    pub text: String,
    pub risk_level: RiskLevel,
}

impl Chunk {
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub min_words: usize,
    pub max_words: usize,
    pub section_marker: String,
    pub subsection_marker: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_words: MIN_WORDS,
            max_words: MAX_WORDS,
            section_marker: "## ".to_string(),
            subsection_marker: "### ".to_string(),
        }
    }
}

/// Stateful splitter. The id counter lives on the value, so ids keep
/// increasing across every document fed to the same `Chunker`.
pub struct Chunker {
    config: ChunkerConfig,
    next_id: u64,
}

/// A surviving piece of a section, before it is assigned an id.
struct Part {
    heading: String,
    text: String,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config, next_id: 1 }
    }

    /// Continues numbering from a previously persisted counter.
    pub fn with_start_id(mut self, next_id: u64) -> Self {
        self.next_id = next_id.max(1);
        self
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Produces the chunks of one document lazily. Ids are only consumed for
    /// chunks actually pulled from the iterator.
    pub fn chunk_document<'a>(
        &'a mut self,
        doc: &'a SourceDocument,
    ) -> impl Iterator<Item = Chunk> + 'a {
        let parts = if doc.body.trim().is_empty() {
            tracing::debug!("Skipping empty document {}", doc.source);
            Vec::new()
        } else {
            self.split_parts(&doc.body)
        };

        parts.into_iter().map(move |part| {
            let chunk_id = format!("chunk_{:06}", self.next_id);
            self.next_id += 1;
            Chunk {
                chunk_id,
                source: doc.source.clone(),
                path: doc.path.clone(),
                heading: part.heading,
                risk_level: infer_risk_level(&part.text),
                text: part.text,
            }
        })
    }

    fn split_parts(&self, body: &str) -> Vec<Part> {
        let min = self.config.min_words;
        let max = self.config.max_words;
        let mut parts = Vec::new();

        for section in split_on_marker(body, &self.config.section_marker) {
            let section = section.trim();
            if section.is_empty() {
                continue;
            }

            let (heading, section_body) = match section.split_once('\n') {
                Some((first, rest)) if first.starts_with(&self.config.section_marker) => {
                    (heading_text(first, &self.config.section_marker), rest.trim())
                }
                None if section.starts_with(&self.config.section_marker) => {
                    (heading_text(section, &self.config.section_marker), "")
                }
                _ => (DEFAULT_HEADING.to_string(), section),
            };

            let words = word_count(section_body);
            if words < min {
                continue;
            }

            let subsections = if words > max {
                split_on_marker(section_body, &self.config.subsection_marker)
            } else {
                vec![section_body]
            };

            for sub in subsections {
                let sub = sub.trim();
                if sub.is_empty() {
                    continue;
                }

                let pieces = if word_count(sub) > max {
                    hard_split(sub, max)
                } else {
                    vec![sub.to_string()]
                };

                for text in pieces {
                    if word_count(&text) < min {
                        continue;
                    }
                    parts.push(Part {
                        heading: heading.clone(),
                        text,
                    });
                }
            }
        }

        parts
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits before every line that starts with `marker`. The marker line stays
/// at the head of its piece.
fn split_on_marker<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if offset > 0 && line.starts_with(marker) {
            pieces.push(&text[start..offset]);
            start = offset;
        }
        offset += line.len();
    }
    pieces.push(&text[start..]);
    pieces
}

fn heading_text(line: &str, marker: &str) -> String {
    line.trim_start_matches(marker.trim_end()).trim().to_string()
}

/// Word-boundary split every `max_words` words; the last piece may be short.
fn hard_split(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words.max(1))
        .map(|window| window.join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, word: &str) -> String {
        vec![word; n].join(" ")
    }

    fn doc(body: String) -> SourceDocument {
        SourceDocument::new("handbook.md", "people/handbook.md", body)
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(infer_risk_level("Grounds for Termination"), RiskLevel::High);
        assert_eq!(infer_risk_level("Parental leave policy"), RiskLevel::Medium);
        assert_eq!(infer_risk_level("Office snacks"), RiskLevel::Low);
        // High tier wins even when medium keywords also appear.
        assert_eq!(
            infer_risk_level("leave during an investigation"),
            RiskLevel::High
        );
    }

    #[test]
    fn test_risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
        assert_eq!(RiskLevel::High.to_string(), "high");
    }

    #[test]
    fn test_sections_below_minimum_are_dropped() {
        let body = format!("## Tiny\n{}\n## Big\n{}", words(20, "a"), words(200, "b"));
        let mut chunker = Chunker::default();
        let chunks: Vec<Chunk> = chunker.chunk_document(&doc(body)).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, "Big");
        assert_eq!(chunks[0].word_count(), 200);
        assert_eq!(chunks[0].source, "handbook.md");
        assert_eq!(chunks[0].path, "people/handbook.md");
    }

    #[test]
    fn test_unmarked_section_uses_general_heading() {
        let mut chunker = Chunker::default();
        let chunks: Vec<Chunk> = chunker.chunk_document(&doc(words(160, "x"))).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, "General");
        assert_eq!(chunks[0].word_count(), 160);
    }

    #[test]
    fn test_oversized_section_hard_split_drops_short_remainder() {
        let body = format!("## Policy\n{}", words(900, "w"));
        let mut chunker = Chunker::default();
        let chunks: Vec<Chunk> = chunker.chunk_document(&doc(body)).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count(), 800);
    }

    #[test]
    fn test_oversized_section_splits_on_subheadings() {
        let body = format!(
            "## Benefits\n### Health\n{}\n### Dental\n{}",
            words(500, "h"),
            words(450, "d")
        );
        let mut chunker = Chunker::default();
        let chunks: Vec<Chunk> = chunker.chunk_document(&doc(body)).collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("### Health"));
        assert!(chunks[1].text.starts_with("### Dental"));
        assert!(chunks.iter().all(|c| c.heading == "Benefits"));
    }

    #[test]
    fn test_every_chunk_within_bounds() {
        let body = format!(
            "{}\n## One\n{}\n## Two\n### A\n{}\n### B\n{}\n## Three\n{}",
            words(10, "p"),
            words(2000, "o"),
            words(1700, "a"),
            words(90, "b"),
            words(151, "t")
        );
        let mut chunker = Chunker::default();
        let chunks: Vec<Chunk> = chunker.chunk_document(&doc(body)).collect();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            let n = chunk.word_count();
            assert!((MIN_WORDS..=MAX_WORDS).contains(&n), "{} words", n);
        }
    }

    #[test]
    fn test_ids_are_sequential_across_documents() {
        let mut chunker = Chunker::default();
        let first: Vec<Chunk> = chunker.chunk_document(&doc(words(200, "a"))).collect();
        let second: Vec<Chunk> = chunker.chunk_document(&doc(words(200, "b"))).collect();
        assert_eq!(first[0].chunk_id, "chunk_000001");
        assert_eq!(second[0].chunk_id, "chunk_000002");
        assert_eq!(chunker.next_id(), 3);
    }

    #[test]
    fn test_with_start_id_continues_numbering() {
        let mut chunker = Chunker::default().with_start_id(42);
        let chunks: Vec<Chunk> = chunker.chunk_document(&doc(words(200, "a"))).collect();
        assert_eq!(chunks[0].chunk_id, "chunk_000042");
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        let mut chunker = Chunker::default();
        assert_eq!(chunker.chunk_document(&doc(String::new())).count(), 0);
        assert_eq!(chunker.next_id(), 1);
    }

    #[test]
    fn test_split_on_marker_keeps_marker_lines() {
        let pieces = split_on_marker("intro\n## A\nbody\n## B\nmore", "## ");
        assert_eq!(pieces, vec!["intro\n", "## A\nbody\n", "## B\nmore"]);
    }
}
