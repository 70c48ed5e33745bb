use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use aircare_core::{now_iso, Gender};

/// One history entry; `role` is a plain string (`"user"`/`"bot"`) rather
/// than `aircare_core::Role` so corrupted or future-extended persisted
/// records still deserialize (see `MemoryStore::load`'s per-record
/// recovery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub text: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

fn new_session_token() -> String {
    // Sixteen hex characters, same shape as `secrets.token_hex(8)`.
    format!("{:032x}", uuid::Uuid::new_v4().as_u128())[..16].to_string()
}

/// Mirrors `memory_store.py`'s `UserRecord.__dict__` field set exactly so
/// the persisted JSON shape (`memory.json`) stays compatible: every field
/// name here is part of the stable, externally observable contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub session_token: String,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub is_company: bool,
    pub greeting_name: Option<String>,
    pub product: Option<String>,
    pub serial: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub summary_context: Vec<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub last_answer: Option<String>,
    #[serde(default)]
    pub flags: HashMap<String, Value>,
    #[serde(default)]
    pub slots: HashMap<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = now_iso();
        let mut flags = HashMap::new();
        flags.insert("last_activity".to_string(), Value::String(now.clone()));
        Self {
            user_id: user_id.into(),
            session_token: new_session_token(),
            name: None,
            gender: None,
            is_company: false,
            greeting_name: None,
            product: None,
            serial: None,
            address: None,
            summary_context: Vec::new(),
            history: Vec::new(),
            last_answer: None,
            flags,
            slots: HashMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_iso();
    }

    pub fn regenerate_token(&mut self) {
        self.session_token = new_session_token();
        self.touch();
    }
}
