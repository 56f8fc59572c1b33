//! Ordered fallback over generation backends.
//!
//! Backends are tried strictly in priority order and the first non-empty
//! answer wins. A failing backend (error, timeout or empty text) is logged
//! and the next one is tried. When every backend has failed the
//! extractive fallback quotes the retrieved text, and when there is nothing
//! to quote the sentinel answer is returned. `run` never returns an error.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::RagError;
use crate::llm::prompt::build_prompt;
use crate::llm::semantic_search::SearchHit;
use crate::providers::extractive::{extractive_answer, EXTRACTIVE_BACKEND};
use crate::providers::traits::{GenerationBackend, GenerationRequest};

pub const UNANSWERABLE: &str = "Unable to answer the question.";
pub const NO_BACKEND: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer_text: String,
    pub backend_name: String,
}

impl AnswerResult {
    pub fn new(answer_text: impl Into<String>, backend_name: impl Into<String>) -> Self {
        Self {
            answer_text: answer_text.into(),
            backend_name: backend_name.into(),
        }
    }

    pub fn unanswerable() -> Self {
        Self::new(UNANSWERABLE, NO_BACKEND)
    }

    pub fn is_unanswerable(&self) -> bool {
        self.backend_name == NO_BACKEND
    }
}

/// Skips a backend for `cooldown` once it has failed `threshold` times in a
/// row. After the cooldown a single trial call is let through; everyone else
/// keeps skipping until it reports back. A trial that never reports (its
/// caller was dropped) is given up after `trial_timeout`.
#[derive(Debug)]
struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    trial_timeout: Duration,
    state: Mutex<BreakerState>,
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    trial_started: Option<Instant>,
}

impl CircuitBreaker {
    fn new(threshold: u32, cooldown: Duration, trial_timeout: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            trial_timeout,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Whether this caller may call the backend now.
    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();
        match state.open_until {
            None => true,
            Some(until) if now < until => false,
            Some(_) => match state.trial_started {
                Some(started) if now.duration_since(started) < self.trial_timeout => false,
                _ => {
                    state.trial_started = Some(now);
                    true
                }
            },
        }
    }

    fn record_success(&self) {
        let mut state = self.state.lock();
        *state = BreakerState::default();
    }

    fn record_failure(&self) {
        if self.threshold == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.trial_started = None;
        state.consecutive_failures += 1;
        // Still at or over the threshold after a failed trial, so this re-opens.
        if state.consecutive_failures >= self.threshold {
            state.open_until = Some(Instant::now() + self.cooldown);
        }
    }
}

struct Slot {
    backend: Arc<dyn GenerationBackend>,
    breaker: CircuitBreaker,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub backend_timeout: Duration,
    /// Consecutive failures before a backend is skipped; `0` disables skipping.
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub prompt_warn_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(30),
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            prompt_warn_chars: 24_000,
        }
    }
}

pub struct AnswerOrchestrator {
    slots: Vec<Slot>,
    config: OrchestratorConfig,
}

impl AnswerOrchestrator {
    /// `backends` is the priority order, highest first.
    pub fn new(backends: Vec<Arc<dyn GenerationBackend>>, config: OrchestratorConfig) -> Self {
        let slots = backends
            .into_iter()
            .map(|backend| Slot {
                backend,
                breaker: CircuitBreaker::new(
                    config.failure_threshold,
                    config.cooldown,
                    config.backend_timeout,
                ),
            })
            .collect();
        Self { slots, config }
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.backend.name()).collect()
    }

    pub async fn run(&self, question: &str, hits: &[SearchHit]) -> AnswerResult {
        if hits.is_empty() {
            tracing::warn!("No context retrieved; returning sentinel answer");
            return AnswerResult::unanswerable();
        }

        let prompt = build_prompt(question, hits);
        if prompt.len() > self.config.prompt_warn_chars {
            tracing::warn!(
                "Prompt is {} chars, above the {} char soft limit",
                prompt.len(),
                self.config.prompt_warn_chars
            );
        }

        let request = GenerationRequest {
            question,
            hits,
            prompt: &prompt,
        };

        for slot in &self.slots {
            let name = slot.backend.name();
            if !slot.breaker.try_acquire() {
                tracing::info!("Skipping {}: circuit open after repeated failures", name);
                continue;
            }

            match self.attempt(slot, request).await {
                Ok(text) => {
                    slot.breaker.record_success();
                    tracing::info!("Answered with {}", name);
                    return AnswerResult::new(text, name);
                }
                Err(e) => {
                    slot.breaker.record_failure();
                    tracing::warn!("{} failed: {}", name, e);
                }
            }
        }

        match extractive_answer(hits) {
            Some(text) => AnswerResult::new(text, EXTRACTIVE_BACKEND),
            None => AnswerResult::unanswerable(),
        }
    }

    async fn attempt(&self, slot: &Slot, request: GenerationRequest<'_>) -> Result<String, RagError> {
        let name = slot.backend.name();
        let text = tokio::time::timeout(self.config.backend_timeout, slot.backend.generate(request))
            .await
            .map_err(|_| RagError::Timeout(name.to_string()))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(RagError::external(name, "empty answer"));
        }
        Ok(text.to_string())
    }
}
