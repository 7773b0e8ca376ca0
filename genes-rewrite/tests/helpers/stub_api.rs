//! Scripted generator backends
//!
//! No live network in tests: every call pops the next scripted outcome and
//! is recorded for later assertions.

use async_trait::async_trait;
use genes_rewrite::services::{ApiOutcome, ContentApi, GenerationRequest};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Backend returning scripted outcomes in order, then `fallback` forever
pub struct ScriptedApi {
    script: Mutex<VecDeque<ApiOutcome>>,
    fallback: ApiOutcome,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedApi {
    pub fn new(script: Vec<ApiOutcome>) -> Self {
        Self::with_fallback(
            script,
            ApiOutcome::Fatal("stub script exhausted".to_string()),
        )
    }

    pub fn with_fallback(script: Vec<ApiOutcome>, fallback: ApiOutcome) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always transient
    pub fn always_transient() -> Self {
        Self::with_fallback(Vec::new(), ApiOutcome::Transient("HTTP 529: overloaded".to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentApi for ScriptedApi {
    async fn generate(&self, request: &GenerationRequest) -> ApiOutcome {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }
}

/// A block that passes every validator check
pub fn clean_block(name: &str) -> String {
    format!(
        "===CULTIVAR: {}===\n\
         TAGLINE: A dependable garden form with a long flowering season.\n\
         DESCRIPTION: Medium pink semi-double blooms, opening midseason on an upright plant.\n\
         NOTES: Raised in a coastal nursery, this form has stayed popular with growers for decades. \
         Its blooms hold well in cool weather.\n\
         Source: International Camellia Register\n",
        name
    )
}

/// Generator response with one clean block per name and a short preamble
pub fn render_response(names: &[&str]) -> ApiOutcome {
    let blocks: Vec<String> = names.iter().map(|n| clean_block(n)).collect();
    ApiOutcome::Success(format!(
        "Here are the rewritten records.\n\n{}",
        blocks.join("\n")
    ))
}
