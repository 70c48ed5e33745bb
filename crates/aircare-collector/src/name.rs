use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aircare_core::Gender;
use aircare_llm::LlmProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameExtraction {
    pub name: Option<String>,
    pub gender: Gender,
}

fn looks_like_bare_name(text: &str) -> bool {
    let trimmed = text.trim();
    let word_count = trimmed.split_whitespace().count();
    (1..=2).contains(&word_count)
        && trimmed.chars().all(|c| c.is_alphabetic() || c.is_whitespace() || c == '.')
}

/// When the user's whole reply is one or two alphabetic tokens ("Budi
/// Santoso"), that's almost certainly just their name — the collector
/// takes it directly rather than spending an LLM call, per the "name is
/// the easy field" framing of the original data-collection flow. Longer
/// or punctuated replies go through the LLM extractor instead, since
/// they likely embed the name inside a full sentence.
pub fn bare_name_bypass(text: &str) -> Option<String> {
    looks_like_bare_name(text).then(|| title_case(text.trim()))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// LLM-backed extraction for replies that embed the name in a full
/// sentence ("nama saya Budi Santoso ya"), plus a gender guess from
/// common Indonesian given-name conventions, per
/// `data_collector.py`'s name/gender extraction prompt.
pub async fn extract_name_via_llm(provider: &dyn LlmProvider, message: &str) -> NameExtraction {
    if let Some(bare) = bare_name_bypass(message) {
        return NameExtraction { name: Some(bare), gender: Gender::Unknown };
    }

    let system = "Kamu mengekstrak nama dan gender dari pesan pelanggan. Jawab HANYA JSON valid.";
    let prompt = format!(
        "Ekstrak informasi dari jawaban pelanggan berikut:\n\"{message}\"\n\n\
         Tugas:\n1. Identifikasi NAMA lengkap\n2. Tentukan GENDER berdasarkan nama (male/female/unknown)\n\n\
         Jawab HANYA JSON: {{\"name\": \"...\" atau null, \"gender\": \"male/female/unknown\"}}"
    );
    let value = provider.generate_json(system, &prompt).await;
    let name = value.get("name").and_then(|v| v.as_str()).map(|s| title_case(s.trim()));
    let gender = match value.get("gender").and_then(|v| v.as_str()) {
        Some("male") => Gender::Male,
        Some("female") => Gender::Female,
        _ => Gender::Unknown,
    };
    NameExtraction { name, gender }
}

#[async_trait]
pub trait NameExtractor: Send + Sync {
    async fn extract(&self, message: &str) -> NameExtraction;
}

#[cfg(test)]
mod tests {
    use super::*;
    use aircare_llm::StubProvider;

    #[test]
    fn bare_two_word_reply_bypasses_llm() {
        assert_eq!(bare_name_bypass("budi santoso"), Some("Budi Santoso".to_string()));
        assert_eq!(bare_name_bypass("halo apa kabar semuanya"), None);
    }

    #[tokio::test]
    async fn sentence_reply_uses_llm_extraction() {
        let provider = StubProvider::always(r#"{"name": "siti aminah", "gender": "female"}"#);
        let result = extract_name_via_llm(&provider, "nama saya siti aminah ya").await;
        assert_eq!(result.name.as_deref(), Some("Siti Aminah"));
        assert_eq!(result.gender, Gender::Female);
    }
}
