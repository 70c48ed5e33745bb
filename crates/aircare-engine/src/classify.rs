use std::sync::OnceLock;

use aircare_core::Intent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use aircare_llm::LlmProvider;

fn additional_complaint_keywords() -> &'static [(&'static str, Intent)] {
    static LIST: OnceLock<Vec<(&'static str, Intent)>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            ("mati total", Intent::Mati),
            ("gak nyala", Intent::Mati),
            ("tidak menyala", Intent::Mati),
            ("bau", Intent::Bau),
            ("apek", Intent::Bau),
            ("bunyi", Intent::Bunyi),
            ("berisik", Intent::Bunyi),
            ("nge-trip", Intent::Mati),
        ]
    })
    .as_slice()
}

fn competitor_brands() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["daikin", "panasonic", "sharp", "lg electronics", "midea", "gree", "samsung"]).as_slice()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionKind {
    CompetitorMention,
    OffTopicSmallTalk,
    PricingQuestion,
    None,
}

/// Rule-based pass over a user message: does it mention a second,
/// different SOP intent on top of whatever's currently active, does it
/// name a competitor brand, or does it read as off-topic chatter /
/// pricing chit-chat rather than a troubleshooting reply. Grounded on
/// `engine.py`'s keyword scanners — these run before any LLM call so the
/// common cases never pay for one.
pub fn scan_additional_complaint(text: &str, active: Intent) -> Option<Intent> {
    let lower = text.to_lowercase();
    additional_complaint_keywords()
        .iter()
        .find(|(kw, intent)| *intent != active && lower.contains(kw))
        .map(|(_, intent)| *intent)
}

/// Same keyword scan but with no active intent to exclude — used to
/// detect the primary intent of a fresh complaint.
pub fn scan_any_intent(text: &str) -> Option<Intent> {
    let lower = text.to_lowercase();
    additional_complaint_keywords().iter().find(|(kw, _)| lower.contains(kw)).map(|(_, intent)| *intent)
}

pub fn classify_distraction(text: &str) -> DistractionKind {
    let lower = text.to_lowercase();
    if competitor_brands().iter().any(|b| lower.contains(b)) {
        return DistractionKind::CompetitorMention;
    }
    if lower.contains("harga") || lower.contains("berapa duit") || lower.contains("biaya") {
        return DistractionKind::PricingQuestion;
    }
    let troubleshooting_markers = ["eac", "unit", "mati", "bau", "bunyi", "filter", "remote", "mcb"];
    if !troubleshooting_markers.iter().any(|m| lower.contains(m))
        && (lower.contains("halo") || lower.contains("test") || lower.contains("apa kabar"))
    {
        return DistractionKind::OffTopicSmallTalk;
    }
    DistractionKind::None
}

/// The LLM-backed fallback classifier, used only when the rule-based
/// scanners above return nothing and the message still doesn't look
/// like a plain troubleshooting answer. Mirrors the JSON-contract shape
/// used throughout `engine.py`'s LLM-assisted branches: a small schema,
/// strict-JSON prompt, conservative default on any parse failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmClassification {
    pub intent: Option<String>,
    pub is_additional_complaint: bool,
    pub is_distraction: bool,
    pub confidence: f32,
}

impl Default for LlmClassification {
    fn default() -> Self {
        Self { intent: None, is_additional_complaint: false, is_distraction: false, confidence: 0.0 }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, active_intent: &str, chat_context: &str) -> LlmClassification;
}

pub struct LlmClassifier<'a> {
    pub provider: &'a dyn LlmProvider,
}

#[async_trait]
impl<'a> Classifier for LlmClassifier<'a> {
    async fn classify(&self, text: &str, active_intent: &str, chat_context: &str) -> LlmClassification {
        let system = "You classify a single customer message about an air cleaner troubleshooting conversation. \
            Reply with JSON: {\"intent\": \"mati|bau|bunyi|null\", \"is_additional_complaint\": bool, \"is_distraction\": bool, \"confidence\": 0..1}.";
        let prompt = format!(
            "Active intent: {active_intent}\nRecent context:\n{chat_context}\nMessage: {text}"
        );
        let value = self.provider.generate_json(system, &prompt).await;
        serde_json::from_value(value).unwrap_or_else(|_| {
            tracing::debug!("classifier returned unparseable JSON, defaulting conservatively");
            LlmClassification::default()
        })
    }
}

pub fn intent_label_json(intent: Intent) -> serde_json::Value {
    json!(intent.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_additional_complaint_when_different_from_active() {
        assert_eq!(scan_additional_complaint("oh iya unitnya juga bau apek", Intent::Mati), Some(Intent::Bau));
        assert_eq!(scan_additional_complaint("masih bau apek terus", Intent::Bau), None);
    }

    #[test]
    fn classifies_competitor_mention() {
        assert_eq!(classify_distraction("kalau dibanding daikin gimana ya"), DistractionKind::CompetitorMention);
    }

    #[test]
    fn classifies_pricing_question() {
        assert_eq!(classify_distraction("unit baru harganya berapa ya"), DistractionKind::PricingQuestion);
    }

    #[test]
    fn classifies_plain_troubleshooting_as_none() {
        assert_eq!(classify_distraction("unit saya mati total dari tadi"), DistractionKind::None);
    }
}
