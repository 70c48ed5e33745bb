use async_trait::async_trait;
use std::sync::Mutex;

use crate::provider::LlmProvider;

/// Deterministic stand-in for [`LlmProvider`], used by downstream crates'
/// test suites so rule-based paths can be exercised without a live
/// Ollama. Grounded on the teacher's `skynet-agent::router` mock
/// providers (`AlwaysOk`/`AlwaysFail`), generalized to return a queue of
/// canned responses consumed in order, with the last response repeating
/// once the queue is exhausted.
pub struct StubProvider {
    responses: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    pub fn always(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }
}

#[async_trait]
impl LlmProvider for StubProvider {
    async fn generate(&self, _system: &str, _prompt: &str, _temperature: f32) -> String {
        let mut queue = self.responses.lock().unwrap();
        if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue.first().cloned().unwrap_or_default()
        }
    }
}
