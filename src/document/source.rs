//! Source document preparation: header parsing, template filtering and
//! splitting a compiled handbook dump into per-source documents.

use serde::{Deserialize, Serialize};

/// Minimum characters of real content a filtered source must keep.
pub const MIN_SOURCE_CHARS: usize = 500;

const UNKNOWN: &str = "unknown";

/// Line prefixes of template/markup noise that never carry policy text.
const NOISE_PREFIXES: [&str; 4] = ["{%", "{{", "<", ">"];

/// A normalized document: `SOURCE:`/`PATH:` header stripped, body kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source: String,
    pub path: String,
    pub body: String,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            body: body.into(),
        }
    }

    /// Parses a raw source file.
    ///
    /// Header lines (`SOURCE:` and `PATH:`) run until the first blank line.
    /// A file without a blank line has no recognizable body and yields `None`,
    /// as does a file whose body is empty after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let lines: Vec<&str> = raw.lines().collect();
        let mut source = UNKNOWN.to_string();
        let mut path = UNKNOWN.to_string();
        let mut content_start = None;

        for (i, line) in lines.iter().enumerate() {
            if let Some(rest) = line.strip_prefix("SOURCE:") {
                source = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("PATH:") {
                path = rest.trim().to_string();
            } else if line.trim().is_empty() {
                content_start = Some(i + 1);
                break;
            }
        }

        let body = lines[content_start?..].join("\n").trim().to_string();
        if body.is_empty() {
            return None;
        }

        Some(Self { source, path, body })
    }

    /// Renders the document back into the on-disk header format.
    pub fn render(&self) -> String {
        format!("SOURCE: {}\nPATH: {}\n\n{}", self.source, self.path, self.body)
    }
}

/// Drops template and markup lines. Returns `None` when fewer than
/// [`MIN_SOURCE_CHARS`] characters survive.
pub fn filter_noise(text: &str) -> Option<String> {
    let content: String = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !NOISE_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .collect::<Vec<_>>()
        .join("\n");

    if content.chars().count() < MIN_SOURCE_CHARS {
        return None;
    }
    Some(content)
}

/// Splits a compiled handbook into one document per source block.
///
/// Blocks look like:
///
/// ```text
/// ==========
/// SOURCE: leave.md
/// PATH: handbook/people/leave.md
/// ==========
/// body...
/// ```
///
/// Malformed blocks (no closing delimiter) are skipped.
pub fn split_compiled(text: &str) -> Vec<SourceDocument> {
    let lines: Vec<&str> = text.lines().collect();
    let mut docs = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let starts_block = is_delimiter(lines[i])
            && lines
                .get(i + 1)
                .map_or(false, |next| next.starts_with("SOURCE:"));
        if !starts_block {
            i += 1;
            continue;
        }

        let source = lines[i + 1].trim_start_matches("SOURCE:").trim().to_string();
        let mut j = i + 2;
        let mut path = UNKNOWN.to_string();
        if let Some(rest) = lines.get(j).and_then(|l| l.strip_prefix("PATH:")) {
            path = rest.trim().to_string();
            j += 1;
        }
        while j < lines.len() && !is_delimiter(lines[j]) {
            j += 1;
        }
        if j >= lines.len() {
            tracing::warn!("Skipping unterminated source block for {}", source);
            break;
        }

        let body_start = j + 1;
        let mut end = body_start;
        while end < lines.len() {
            let next_block = is_delimiter(lines[end])
                && lines
                    .get(end + 1)
                    .map_or(false, |next| next.starts_with("SOURCE:"));
            if next_block {
                break;
            }
            end += 1;
        }

        let body = lines[body_start..end].join("\n").trim().to_string();
        docs.push(SourceDocument { source, path, body });
        i = end;
    }

    docs
}

fn is_delimiter(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '=')
}

/// File name used for a split source: `<n>_<source with dots replaced>.txt`.
pub fn source_file_name(index: usize, source: &str) -> String {
    format!("{}_{}.txt", index, source.replace('.', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_header() {
        let raw = "SOURCE: leave.md\nPATH: people/leave.md\n\n## Leave\nBody text";
        let doc = SourceDocument::parse(raw).unwrap();
        assert_eq!(doc.source, "leave.md");
        assert_eq!(doc.path, "people/leave.md");
        assert_eq!(doc.body, "## Leave\nBody text");
    }

    #[test]
    fn test_parse_missing_header_fields_default_to_unknown() {
        let doc = SourceDocument::parse("\nJust a body").unwrap();
        assert_eq!(doc.source, "unknown");
        assert_eq!(doc.path, "unknown");
    }

    #[test]
    fn test_parse_rejects_empty_or_headerless_documents() {
        assert!(SourceDocument::parse("SOURCE: a.md\nPATH: a.md\n\n   \n").is_none());
        assert!(SourceDocument::parse("SOURCE: a.md\nPATH: a.md").is_none());
        assert!(SourceDocument::parse("").is_none());
    }

    #[test]
    fn test_render_round_trips_through_parse() {
        let doc = SourceDocument::new("a.md", "x/a.md", "body line");
        assert_eq!(SourceDocument::parse(&doc.render()), Some(doc));
    }

    #[test]
    fn test_filter_noise_drops_template_lines() {
        let mut text = String::from("{% include x %}\n<div>\n> quote\n{{ var }}\n");
        text.push_str(&"policy ".repeat(100));
        let filtered = filter_noise(&text).unwrap();
        assert!(!filtered.contains("{%"));
        assert!(!filtered.contains("<div>"));
        assert!(filtered.starts_with("policy"));
    }

    #[test]
    fn test_filter_noise_rejects_short_content() {
        assert!(filter_noise("short policy").is_none());
    }

    #[test]
    fn test_split_compiled_blocks() {
        let text = "preamble\n\
            ==========\nSOURCE: leave.md\nPATH: people/leave.md\n==========\nLeave body\n\
            ==========\nSOURCE: pay.md\nPATH: people/pay.md\n==========\nPay body\nmore";
        let docs = split_compiled(text);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "leave.md");
        assert_eq!(docs[0].body, "Leave body");
        assert_eq!(docs[1].path, "people/pay.md");
        assert_eq!(docs[1].body, "Pay body\nmore");
        assert_eq!(source_file_name(1, &docs[1].source), "1_pay_md.txt");
    }
}
