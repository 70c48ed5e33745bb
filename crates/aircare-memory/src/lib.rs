pub mod record;
pub mod store;

pub use record::{HistoryEntry, UserRecord};
pub use store::MemoryStore;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn atomic_writes_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        {
            let store = MemoryStore::new(&path, 50).unwrap();
            store.set_name("u1", "budi santoso");
            store.set_flag("u1", "active_intent", json!("mati"));
        }
        let reloaded = MemoryStore::new(&path, 50).unwrap();
        let rec = reloaded.get("u1");
        assert_eq!(rec.name.as_deref(), Some("Budi Santoso"));
        assert_eq!(reloaded.get_flag("u1", "active_intent"), Some(json!("mati")));
    }

    #[test]
    fn corrupt_file_resets_to_empty_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let store = MemoryStore::new(&path, 50).unwrap();
        assert!(store.get("anyone").history.is_empty());

        let backup = dir.path().join("memory.json.corrupted.backup");
        assert!(backup.exists());
    }

    #[test]
    fn history_trims_to_max() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path().join("memory.json"), 3).unwrap();
        for i in 0..5 {
            store.append_history("u1", "user", &format!("msg {i}"), None);
        }
        let hist = store.get_history("u1");
        assert_eq!(hist.len(), 3);
        assert_eq!(hist[0].text, "msg 2");
        assert_eq!(hist[2].text, "msg 4");
    }

    #[test]
    fn clear_removes_record_without_surfacing_new_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path().join("memory.json"), 50).unwrap();
        store.set_name("u1", "budi");
        store.clear("u1");
        // get() after clear recreates a fresh record (never auto-deleted
        // semantics apply only while present; accessor creates on demand).
        let rec = store.get("u1");
        assert_eq!(rec.name, None);
    }

    #[test]
    fn ensure_product_from_text_infers_serial() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new(dir.path().join("memory.json"), 50).unwrap();
        store.ensure_product_from_text("u1", "EAC saya tipe F57A rusak");
        let rec = store.get("u1");
        assert_eq!(rec.product.as_deref(), Some("Electronic Air Cleaner"));
        assert_eq!(rec.serial.as_deref(), Some("F57A"));
    }
}
