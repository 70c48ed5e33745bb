use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors a provider can surface. Call sites in the engine/collector never
/// propagate these — every caller treats a `Err` (or an empty successful
/// response) as "unknown" and falls through to a conservative default, per
/// the error-handling design's TransientExternal policy.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Two primitives exposed by the LLM client, matching `ollama_client.py`.
///
/// `generate` builds a `<|system|>/<|user|>/<|assistant|>`-formatted
/// prompt and posts it with `stream: false`. `generate_json` prepends a
/// strict-JSON system preamble and retries a balanced-brace extraction on
/// parse failure, returning an empty object rather than erroring.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> String;

    async fn generate_json(&self, system: &str, prompt: &str) -> Value {
        let strict_preamble = "You are a strict JSON generator. Reply ONLY valid minified JSON without any prose. Do not include markdown, backticks, or explanations.";
        let combined_system = format!("{strict_preamble}\n\n{system}").trim().to_string();
        let text = self.generate(&combined_system, prompt, 0.0).await;
        parse_json_lenient(&text)
    }

    /// Best-effort liveness probe, grounded in `ollama_client.py::ok()`.
    async fn health_check(&self) -> bool {
        !self
            .generate("You just answer OK.", "Say OK once.", 0.0)
            .await
            .is_empty()
    }
}

/// Parses `text` as JSON; on failure, scans for the first balanced
/// `{...}` span and retries; on further failure returns an empty object.
/// Mirrors `ollama_client.py::generate_json`'s regex-fallback behavior,
/// but uses an explicit brace scan instead of a greedy `.*` regex so it
/// terminates at the first balanced object rather than the last `}` in
/// the text.
pub fn parse_json_lenient(text: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return v;
    }
    if let Some(span) = first_balanced_object(text) {
        if let Ok(v) = serde_json::from_str::<Value>(span) {
            return v;
        }
    }
    Value::Object(serde_json::Map::new())
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let v = parse_json_lenient(r#"{"a":1}"#);
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn extracts_balanced_object_from_prose() {
        let v = parse_json_lenient("Sure, here you go: {\"a\": 1, \"b\": {\"c\": 2}} thanks!");
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"]["c"], 2);
    }

    #[test]
    fn falls_back_to_empty_object() {
        let v = parse_json_lenient("not json at all");
        assert!(v.as_object().unwrap().is_empty());
    }
}
