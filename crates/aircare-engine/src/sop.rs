use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use aircare_core::{AircareError, Intent, Result};

/// Per-answer branch, grounded on the `logic.on_answer_<value>` shape in
/// the data model. Field names match the spec's schema exactly so the
/// catalog JSON on disk is a direct transcription of §3.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnswerBranch {
    #[serde(default)]
    pub instruct: bool,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub offer: bool,
    #[serde(default)]
    pub resolve: bool,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub resolve_if_yes: bool,
    #[serde(default)]
    pub next_if_no: Option<String>,
    #[serde(default)]
    pub pending_if_no: bool,
    #[serde(default)]
    pub pending_on_first_ask: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StepLogic {
    #[serde(flatten)]
    pub branches: HashMap<String, AnswerBranch>,
}

impl StepLogic {
    pub fn branch_for(&self, answer: &str) -> Option<&AnswerBranch> {
        self.branches.get(&format!("on_answer_{answer}"))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    pub id: String,
    pub order: u32,
    #[serde(default)]
    pub ask_templates: Vec<String>,
    #[serde(default)]
    pub confirm_templates: Vec<String>,
    #[serde(default)]
    pub instruct_templates: Vec<String>,
    #[serde(default)]
    pub offer_templates: Vec<String>,
    #[serde(default)]
    pub resolve_templates: Vec<String>,
    #[serde(default)]
    pub pending_templates: Vec<String>,
    pub expected_result: Vec<String>,
    #[serde(default)]
    pub logic: StepLogic,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentSop {
    pub steps: Vec<Step>,
}

impl IntentSop {
    pub fn first_step(&self) -> Option<&Step> {
        self.steps.iter().min_by_key(|s| s.order)
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneralTemplates {
    #[serde(default)]
    pub clarify: Vec<String>,
    #[serde(default)]
    pub closing_resolved: Vec<String>,
    #[serde(default)]
    pub closing_pending: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SopMetadata {
    #[serde(default)]
    pub general_templates: GeneralTemplates,
}

/// The SOP catalog: loaded once at startup, treated as immutable
/// thereafter — concurrent readers never lock. Callers look up steps
/// exclusively by id/order; no step identifier is hard-coded in the
/// engine itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SopCatalog {
    pub mati: IntentSop,
    pub bau: IntentSop,
    pub bunyi: IntentSop,
    #[serde(default)]
    pub metadata: SopMetadata,
}

impl SopCatalog {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| AircareError::Config(format!("invalid sop catalog: {e}")))
    }

    pub fn intent_sop(&self, intent: Intent) -> &IntentSop {
        match intent {
            Intent::Mati => &self.mati,
            Intent::Bau => &self.bau,
            Intent::Bunyi => &self.bunyi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_catalog_path() -> std::path::PathBuf {
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("sop.json")
    }

    #[test]
    fn loads_reference_catalog_with_three_intents() {
        let sop = SopCatalog::load_from_file(reference_catalog_path()).unwrap();
        assert_eq!(sop.mati.steps.len(), 3);
        assert_eq!(sop.bau.steps.len(), 2);
        assert_eq!(sop.bunyi.steps.len(), 2);
        assert_eq!(sop.intent_sop(Intent::Mati).first_step().unwrap().id, "cek_tutup");
    }

    #[test]
    fn branch_lookup_resolves_on_answer_prefix() {
        let sop = SopCatalog::load_from_file(reference_catalog_path()).unwrap();
        let step = sop.mati.step("cek_tutup").unwrap();
        let branch = step.logic.branch_for("yes").unwrap();
        assert!(branch.instruct);
        assert_eq!(branch.next.as_deref(), Some("cek_remote_low"));
    }
}
