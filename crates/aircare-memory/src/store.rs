use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use aircare_core::{now_iso, Gender, Result};

use crate::record::{HistoryEntry, UserRecord};

const CORRUPTED_SUFFIX: &str = ".corrupted.backup";

fn atomic_write(path: &Path, data: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Durable per-user record store, grounded on `memory_store.py`.
///
/// Loaded once at startup into an in-memory map; every mutating operation
/// rewrites the whole map to `{path}.tmp` and atomically renames over
/// `path`, fsyncing before rename. A corrupt file on load is renamed to
/// `{path}.corrupted.backup` and the store restarts empty rather than
/// failing startup.
///
/// Per-user serialization is exposed via [`MemoryStore::user_lock`]: per
/// the concurrency model, the *caller* (the conversation engine) holds
/// this lock across the whole turn, including any LLM calls, so two
/// turns for the same user never interleave. `records` is a coarse
/// process-wide guard over the map itself, matching the source's
/// `_lock` around `_records`.
pub struct MemoryStore {
    path: PathBuf,
    max_history: usize,
    records: Mutex<HashMap<String, UserRecord>>,
    user_locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>, max_history: usize) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let records = Self::load(&path);
        Ok(Self {
            path,
            max_history,
            records: Mutex::new(records),
            user_locks: DashMap::new(),
        })
    }

    fn load(path: &Path) -> HashMap<String, UserRecord> {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return HashMap::new(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return HashMap::new();
        }
        match serde_json::from_str::<HashMap<String, UserRecord>>(trimmed) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "corrupt memory store, resetting to empty");
                let backup = PathBuf::from(format!("{}{}", path.display(), CORRUPTED_SUFFIX));
                let _ = fs::rename(path, &backup);
                let _ = atomic_write(path, "{}");
                HashMap::new()
            }
        }
    }

    fn save(&self, records: &HashMap<String, UserRecord>) {
        match serde_json::to_string_pretty(records) {
            Ok(data) => {
                if let Err(e) = atomic_write(&self.path, &data) {
                    tracing::warn!(error = %e, "failed to persist memory store");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize memory store"),
        }
    }

    /// Returns the per-user async lock, creating it on first use. Callers
    /// hold this for the duration of a whole turn.
    pub fn user_lock(&self, uid: &str) -> Arc<AsyncMutex<()>> {
        self.user_locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn with_record<T>(&self, uid: &str, f: impl FnOnce(&mut UserRecord) -> T) -> T {
        let mut guard = self.records.lock().unwrap();
        let rec = guard
            .entry(uid.to_string())
            .or_insert_with(|| UserRecord::new(uid));
        let out = f(rec);
        self.save(&guard);
        out
    }

    pub fn get(&self, uid: &str) -> UserRecord {
        let mut guard = self.records.lock().unwrap();
        guard
            .entry(uid.to_string())
            .or_insert_with(|| UserRecord::new(uid))
            .clone()
    }

    /// Generic patch entry point; unlike the Python source's
    /// dict-shaped `update(uid, patch)`, Rust's static typing makes a
    /// closure over `&mut UserRecord` the natural idiom for "apply some
    /// fields and persist."
    pub fn update(&self, uid: &str, f: impl FnOnce(&mut UserRecord)) -> UserRecord {
        self.with_record(uid, |rec| {
            f(rec);
            rec.touch();
            rec.clone()
        })
    }

    /// Per the Open Question in the design notes: the source's `clear()`
    /// regenerates the session token immediately before deleting the
    /// record, which is dead code (nothing observes the token after
    /// deletion). We preserve only the observable behavior: the record
    /// is removed.
    pub fn clear(&self, uid: &str) {
        let mut guard = self.records.lock().unwrap();
        guard.remove(uid);
        self.save(&guard);
    }

    pub fn reset_all(&self) {
        let mut guard = self.records.lock().unwrap();
        guard.clear();
        self.save(&guard);
    }

    pub fn append_history(&self, uid: &str, role: &str, text: &str, meta: Option<Value>) -> UserRecord {
        self.with_record(uid, |rec| {
            let entry = HistoryEntry {
                role: role.to_string(),
                text: text.trim().to_string(),
                ts: now_iso(),
                meta,
            };
            rec.history.push(entry);
            let max = self.max_history;
            if rec.history.len() > max {
                let drop = rec.history.len() - max;
                rec.history.drain(0..drop);
            }
            if role == "user" {
                rec.last_answer = Some(text.trim().to_string());
            }
            rec.touch();
            rec.clone()
        })
    }

    pub fn get_history(&self, uid: &str) -> Vec<HistoryEntry> {
        self.get(uid).history
    }

    /// Renders the last `n` history entries into one newline-joined
    /// string for the classifier prompt, grounded on
    /// `memory_store.py::get_chat_context`.
    pub fn chat_context_window(&self, uid: &str, n: usize) -> String {
        let rec = self.get(uid);
        if rec.history.is_empty() {
            return "(belum ada percakapan)".to_string();
        }
        let start = rec.history.len().saturating_sub(n);
        rec.history[start..]
            .iter()
            .map(|h| {
                let role = if h.role.is_empty() {
                    "user".to_string()
                } else {
                    let mut c = h.role.clone();
                    c.get_mut(0..1).map(|s| s.make_ascii_uppercase());
                    c
                };
                format!("[{}] {}: {}", h.ts, role, h.text.trim())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn set_flag(&self, uid: &str, key: &str, value: Value) -> UserRecord {
        self.with_record(uid, |rec| {
            rec.flags.insert(key.to_string(), value);
            rec.touch();
            rec.clone()
        })
    }

    pub fn clear_flag(&self, uid: &str, key: &str) -> UserRecord {
        self.with_record(uid, |rec| {
            rec.flags.remove(key);
            rec.touch();
            rec.clone()
        })
    }

    pub fn get_flag(&self, uid: &str, key: &str) -> Option<Value> {
        self.get(uid).flags.get(key).cloned()
    }

    pub fn set_slot(&self, uid: &str, key: &str, value: Value) -> UserRecord {
        self.with_record(uid, |rec| {
            rec.slots.insert(key.to_string(), value);
            rec.touch();
            rec.clone()
        })
    }

    pub fn get_slot(&self, uid: &str, key: &str) -> Option<Value> {
        self.get(uid).slots.get(key).cloned()
    }

    pub fn set_name(&self, uid: &str, name: &str) -> UserRecord {
        self.with_record(uid, |rec| {
            rec.name = Some(title_case(name.trim()));
            rec.touch();
            rec.clone()
        })
    }

    pub fn set_gender(&self, uid: &str, gender: Gender) -> UserRecord {
        self.with_record(uid, |rec| {
            rec.gender = Some(gender);
            rec.touch();
            rec.clone()
        })
    }

    pub fn set_product(&self, uid: &str, product: &str) -> UserRecord {
        self.with_record(uid, |rec| {
            rec.product = Some(product.trim().to_string());
            rec.touch();
            rec.clone()
        })
    }

    pub fn get_identity(&self, uid: &str) -> (Option<String>, Option<Gender>, Option<String>, Option<String>) {
        let rec = self.get(uid);
        (rec.name, rec.gender, rec.product, rec.address)
    }

    pub fn add_context_entry(&self, uid: &str, text: &str, max_items: usize) -> UserRecord {
        let s = text.trim().to_string();
        if s.is_empty() {
            return self.get(uid);
        }
        let rec = self.with_record(uid, |rec| {
            if !rec.summary_context.contains(&s) {
                rec.summary_context.push(s.clone());
            }
            if rec.summary_context.len() > max_items {
                let drop = rec.summary_context.len() - max_items;
                rec.summary_context.drain(0..drop);
            }
            rec.touch();
            rec.clone()
        });
        self.ensure_product_from_text(uid, &s);
        rec
    }

    /// Opportunistic product/serial inference from free text, grounded
    /// on `memory_store.py::ensure_product_from_text`. Runs outside the
    /// collector flow too — any mention of `EAC`/`F57A`/`F90A` fills the
    /// identity slot even before the data collector is triggered.
    pub fn ensure_product_from_text(&self, uid: &str, text: &str) {
        let lower = text.to_lowercase();
        let mut found_product = None;
        if lower.contains("electronic air cleaner") || lower.contains("eac") {
            found_product = Some("Electronic Air Cleaner".to_string());
        }
        let mut found_serials = Vec::new();
        for s in ["f57a", "f90a"] {
            if lower.contains(s) {
                found_serials.push(s.to_uppercase());
            }
        }
        if found_product.is_none() && found_serials.is_empty() {
            return;
        }
        self.with_record(uid, |rec| {
            if let Some(p) = found_product {
                rec.product = Some(p);
            }
            if !found_serials.is_empty() {
                let mut merged: Vec<String> = rec
                    .serial
                    .as_deref()
                    .map(|s| s.split(", ").map(|x| x.to_string()).collect())
                    .unwrap_or_default();
                for s in found_serials {
                    if !merged.contains(&s) {
                        merged.push(s);
                    }
                }
                merged.sort();
                rec.serial = Some(merged.join(", "));
            }
            rec.touch();
        });
    }

    pub fn get_last_bot_message(&self, uid: &str) -> Option<String> {
        self.get(uid)
            .history
            .iter()
            .rev()
            .find(|h| h.role == "bot" && !h.text.is_empty())
            .map(|h| h.text.clone())
    }

    pub fn get_last_user_answer(&self, uid: &str) -> Option<String> {
        self.get(uid).last_answer
    }

    pub fn refresh_session_token(&self, uid: &str) -> String {
        self.with_record(uid, |rec| {
            rec.regenerate_token();
            rec.session_token.clone()
        })
    }

    pub fn search(&self, keyword: &str) -> Vec<UserRecord> {
        let q = keyword.to_lowercase();
        let guard = self.records.lock().unwrap();
        guard
            .values()
            .filter(|rec| {
                rec.product.as_deref().unwrap_or("").to_lowercase().contains(&q)
                    || rec.summary_context.iter().any(|s| s.to_lowercase().contains(&q))
                    || rec.history.iter().any(|h| h.text.to_lowercase().contains(&q))
            })
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> Value {
        let guard = self.records.lock().unwrap();
        let total_messages: usize = guard.values().map(|r| r.history.len()).sum();
        let last_updated = guard.values().map(|r| r.updated_at.clone()).max();
        serde_json::json!({
            "total_users": guard.len(),
            "total_messages": total_messages,
            "last_updated": last_updated,
        })
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
