use std::sync::OnceLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use aircare_llm::LlmProvider;

pub fn jabodetabek_keywords() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "jakarta", "bogor", "depok", "tangerang", "bekasi", "jkt", "jaktim", "jakbar",
            "jaksel", "jakut", "jakpus", "tangsel", "tangerang selatan", "bintaro", "serpong",
            "bsd", "gading serpong", "alam sutera", "karawaci", "cibubur", "cimanggis",
            "margonda", "ui", "sawangan", "cibinong", "sentul", "gunung putri", "cileungsi",
            "pondok gede", "jatiasih", "jatisampurna", "mustika jaya", "rawamangun",
            "kelapa gading", "pluit", "pantai indah kapuk", "pik", "sunter", "kemayoran",
            "menteng", "kuningan", "sudirman", "senayan", "kebayoran", "cilandak",
            "lebak bulus", "fatmawati", "pondok indah", "pesanggrahan",
        ]
    })
    .as_slice()
}

fn street_markers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec!["jl.", "jl ", "jalan", "gang", "gg.", "gg ", "raya", "street", "boulevard", "blvd", "avenue", "ave", "jln", "jln."]
    })
    .as_slice()
}

fn complex_markers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["komplek", "kompleks", "perumahan", "perum", "cluster", "residence", "village", "town", "estate", "griya", "taman"])
        .as_slice()
}

fn marker_tokens() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["km ", "km.", "no.", "no ", "nomor", "blok", "rt ", "rt.", "rw ", "rw.", "rt/", "rw/", "#"]).as_slice()
}

fn city_keywords() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "jakarta", "bogor", "depok", "tangerang", "bekasi", "bandung", "surabaya", "medan",
            "semarang", "yogyakarta", "yogya", "jogja", "malang", "solo", "surakarta", "bali",
            "denpasar", "makassar", "palembang", "jaktim", "jakbar", "jaksel", "jakut", "jakpus",
            "tangsel", "tangerang selatan", "bsd", "serpong", "karawaci", "cibubur", "cimanggis",
            "margonda", "sawangan", "cibinong",
        ]
    })
    .as_slice()
}

pub fn is_jabodetabek(address: &str) -> bool {
    let lower = address.to_lowercase();
    jabodetabek_keywords().iter().any(|kw| lower.contains(kw))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressValidation {
    pub is_complete: bool,
    pub is_jabodetabek: bool,
    pub missing_info: Vec<String>,
    pub confidence: Confidence,
    pub reason: String,
}

/// Three-component scoring pass (street/complex marker, house-number-or-
/// landmark marker, city name), grounded on
/// `data_collector.py::validate_address_via_llm`'s short-circuit rules:
/// a score of 3 is high confidence, a score of 2 with both a city and a
/// street/complex marker is medium confidence, and a long address (5+
/// words) with both a city and a street/complex marker is also medium
/// confidence — all without ever calling the LLM. Only when none of
/// those apply does this fall through to the LLM fallback.
pub async fn validate_address(provider: &dyn LlmProvider, address: &str) -> AddressValidation {
    let lower = address.to_lowercase();

    let has_street = street_markers().iter().any(|m| lower.contains(m));
    let has_complex = complex_markers().iter().any(|m| lower.contains(m));
    let has_number_or_marker =
        marker_tokens().iter().any(|m| lower.contains(m)) || address.chars().any(|c| c.is_ascii_digit());
    let has_city = city_keywords().iter().any(|c| lower.contains(c));
    let jabodetabek = is_jabodetabek(address);

    let mut score = 0;
    if has_street || has_complex {
        score += 1;
    }
    if has_number_or_marker {
        score += 1;
    }
    if has_city {
        score += 1;
    }

    if score >= 3 {
        return AddressValidation {
            is_complete: true,
            is_jabodetabek: jabodetabek,
            missing_info: vec![],
            confidence: Confidence::High,
            reason: "alamat memiliki komponen lengkap (jalan/komplek + nomor + kota)".into(),
        };
    }
    if score == 2 && has_city && (has_street || has_complex) {
        return AddressValidation {
            is_complete: true,
            is_jabodetabek: jabodetabek,
            missing_info: vec![],
            confidence: Confidence::Medium,
            reason: "alamat memiliki kota dan jalan/komplek".into(),
        };
    }
    if address.split_whitespace().count() >= 5 && has_city && (has_street || has_complex) {
        return AddressValidation {
            is_complete: true,
            is_jabodetabek: jabodetabek,
            missing_info: vec![],
            confidence: Confidence::Medium,
            reason: "alamat cukup detail dengan kota dan lokasi".into(),
        };
    }

    let system = "Kamu adalah validator alamat. Jawab HANYA JSON valid.";
    let prompt = format!(
        "Analisis alamat berikut dan tentukan apakah lengkap untuk kunjungan teknisi dan apakah berada di Jabodetabek.\n\
         Alamat: \"{address}\"\n\
         Jawab HANYA JSON: {{\"is_complete\": true/false, \"is_jabodetabek\": true/false, \
         \"missing_info\": [], \"confidence\": \"high/medium/low\", \"reason\": \"...\"}}"
    );
    let value = provider.generate_json(system, &prompt).await;
    serde_json::from_value(value).unwrap_or(AddressValidation {
        is_complete: false,
        is_jabodetabek: jabodetabek,
        missing_info: vec!["alamat".into()],
        confidence: Confidence::Low,
        reason: "tidak dapat memvalidasi alamat secara otomatis".into(),
    })
}

#[async_trait]
pub trait AddressValidator: Send + Sync {
    async fn validate(&self, address: &str) -> AddressValidation;
}

#[cfg(test)]
mod tests {
    use super::*;
    use aircare_llm::StubProvider;

    #[tokio::test]
    async fn complete_address_short_circuits_without_llm() {
        let provider = StubProvider::always("{}");
        let v = validate_address(&provider, "Jl. Sudirman No. 12, Jakarta Selatan").await;
        assert!(v.is_complete);
        assert!(v.is_jabodetabek);
        assert_eq!(v.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn city_only_address_falls_back_to_llm() {
        let provider = StubProvider::always(
            r#"{"is_complete": false, "is_jabodetabek": true, "missing_info": ["jalan"], "confidence": "low", "reason": "no street"}"#,
        );
        let v = validate_address(&provider, "Jakarta Selatan").await;
        assert!(!v.is_complete);
    }

    #[test]
    fn jabodetabek_keyword_scan() {
        assert!(is_jabodetabek("BSD, Tangerang Selatan"));
        assert!(!is_jabodetabek("Jl. Merdeka, Surabaya"));
    }
}
