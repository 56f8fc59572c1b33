use crate::llm::semantic_search::SearchHit;

/// Sentence backends must emit verbatim when the context has no answer.
pub const NO_GUIDANCE_ANSWER: &str =
    "No specific policy guidance was found in the provided documents.";

/// Renders retrieved hits as `[n] (heading | source)\ntext`, blank-line separated,
/// in retrieval order.
pub fn render_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] ({} | {})\n{}",
                i + 1,
                hit.entry.heading,
                hit.entry.source,
                hit.entry.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the instruction prompt shared by every generative backend.
/// Chunk text is never truncated here.
pub fn build_prompt(question: &str, hits: &[SearchHit]) -> String {
    format!(
        r#"You are a policy assistant.

This is a POLICY QUESTION answering system.
Only describe explicit rules, requirements, or documented practices.
Do NOT give general opinions, benefits, or cultural explanations unless explicitly stated in policy documents.

Rules:
- Answer ONLY using the provided context
- If the answer is not present, say so clearly
- Be concise and factual

If no explicit policy rules are found in the context, respond:
"{fallback}"

Question:
{question}

Context:
{context}

Answer:"#,
        fallback = NO_GUIDANCE_ANSWER,
        question = question,
        context = render_context(hits),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::index_store::IndexEntry;

    fn hit(heading: &str, source: &str, text: &str) -> SearchHit {
        SearchHit {
            entry: IndexEntry {
                chunk_id: "chunk_000001".to_string(),
                source: source.to_string(),
                path: "handbook".to_string(),
                heading: heading.to_string(),
                text: text.to_string(),
            },
            score: 0.1,
        }
    }

    #[test]
    fn test_context_enumerates_in_order() {
        let hits = vec![
            hit("Leave", "leave.md", "Twenty days."),
            hit("Pay", "pay.md", "Monthly."),
        ];
        assert_eq!(
            render_context(&hits),
            "[1] (Leave | leave.md)\nTwenty days.\n\n[2] (Pay | pay.md)\nMonthly."
        );
    }

    #[test]
    fn test_prompt_contains_contract_parts() {
        let long_text = "word ".repeat(2000);
        let hits = vec![hit("Leave", "leave.md", &long_text)];
        let prompt = build_prompt("How many leave days?", &hits);

        assert!(prompt.starts_with("You are a policy assistant."));
        assert!(prompt.contains("Answer ONLY using the provided context"));
        assert!(prompt.contains("Question:\nHow many leave days?\n"));
        assert!(prompt.contains(&format!("\"{}\"", NO_GUIDANCE_ANSWER)));
        assert!(prompt.contains(&long_text));
        assert!(prompt.ends_with("Answer:"));
        assert!(prompt.find("Question:") < prompt.find("Context:"));
    }
}
