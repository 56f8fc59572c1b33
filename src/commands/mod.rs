use colored::Colorize;
use std::sync::Arc;

use crate::llm::{AnswerResult, RagEngine, SearchHit};
use crate::providers::extractive::truncate_chars;

pub mod document;
pub mod system;

pub use system::Flow;

const PREVIEW_CHARS: usize = 160;

pub struct CommandHandler {
    engine: Arc<RagEngine>,
}

impl CommandHandler {
    pub fn new(engine: Arc<RagEngine>) -> Self {
        Self { engine }
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<Flow, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Flow::Continue);
        }

        match input.to_lowercase().as_str() {
            "help" | "exit" | "quit" => return system::handle_command(input),
            "status" => {
                self.print_status();
                return Ok(Flow::Continue);
            }
            "reload" => {
                let summary = self
                    .engine
                    .load_documents()
                    .map_err(|e| format!("Failed to reload index: {}", e))?;
                println!(
                    "🔄 Reloaded {} chunks (dim {})",
                    summary.chunks.to_string().cyan(),
                    summary.embedding_dim
                );
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        if let Some(question) = input.strip_prefix("search ") {
            let hits = self
                .engine
                .search(question.trim(), self.engine.top_k())
                .await
                .map_err(|e| format!("Search failed: {}", e))?;
            print_hits(&hits);
            return Ok(Flow::Continue);
        }

        let answer = self.engine.answer(input).await;
        print_answer(&answer);
        Ok(Flow::Continue)
    }

    fn print_status(&self) {
        match self.engine.embedding_dim() {
            Some(dim) => println!("📦 Index: {} (dim {})", "loaded".green(), dim),
            None => println!("📦 Index: {}", "not loaded".red()),
        }
        let mut chain = self.engine.orchestrator().backend_names();
        chain.push("extractive-only");
        println!("🤖 Backend chain: {}", chain.join(" → ").cyan());
    }
}

pub fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matching chunks found.");
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. {} | {} (score {:.4}, relevance {:.2})",
            rank + 1,
            hit.entry.heading.bright_yellow(),
            hit.entry.source,
            hit.score,
            hit.relevance()
        );
        println!("   {}", truncate_chars(&hit.entry.text, PREVIEW_CHARS).dimmed());
    }
}

pub fn print_answer(answer: &AnswerResult) {
    let text = if answer.is_unanswerable() {
        answer.answer_text.red()
    } else {
        answer.answer_text.truecolor(255, 236, 179)
    };
    println!("{}", text);
    println!("\n🤖 Answered by: {}", answer.backend_name.cyan());
    println!();
}
