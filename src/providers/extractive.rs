use crate::llm::semantic_search::SearchHit;

pub const EXTRACTIVE_BACKEND: &str = "extractive-only";

/// Number of leading hits quoted by the fallback.
pub const EXTRACTIVE_CHUNKS: usize = 3;

/// Characters kept from each quoted hit.
pub const EXTRACTIVE_CHAR_BUDGET: usize = 800;

const PREAMBLE: &str = "Based on the policy documents:\n\n";

/// Deterministic answer quoting the top retrieved text. Pure string work on
/// data already in hand, so it cannot fail; `None` only when there is
/// nothing to quote.
pub fn extractive_answer(hits: &[SearchHit]) -> Option<String> {
    let quoted: Vec<String> = hits
        .iter()
        .take(EXTRACTIVE_CHUNKS)
        .map(|hit| hit.entry.text.trim())
        .filter(|text| !text.is_empty())
        .map(|text| format!("- {}", truncate_chars(text, EXTRACTIVE_CHAR_BUDGET)))
        .collect();

    if quoted.is_empty() {
        return None;
    }
    Some(format!("{}{}", PREAMBLE, quoted.join("\n\n")))
}

/// Truncates on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
