use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use aircare_core::Result;

/// Append-only daily JSON-lines chat log, grounded on `chat_logger.py`.
///
/// One record per turn side (`incoming`/`outgoing`), written under a
/// single mutex so lines never interleave; no buffering across process
/// restarts, matching the source's "no cross-process flush" behavior.
pub struct ChatLogger {
    log_dir: PathBuf,
    lock: Mutex<()>,
}

impl ChatLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Result<Self> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir)?;
        Ok(Self {
            log_dir,
            lock: Mutex::new(()),
        })
    }

    fn log_path(&self) -> PathBuf {
        let today = chrono::Utc::now().format("%Y-%m-%d");
        self.log_dir.join(format!("chat-{today}.jsonl"))
    }

    fn write_record(&self, record: Value) {
        let _guard = self.lock.lock().unwrap();
        let path = self.log_path();
        let line = match serde_json::to_string(&record) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize chat log record");
                return;
            }
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = result {
            tracing::warn!(error = %e, path = %path.display(), "failed to append chat log");
        }
    }

    pub fn log_incoming(&self, user_id: &str, message: &str, metadata: Value) {
        let record = json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "direction": "incoming",
            "user_id": user_id,
            "message": message,
            "message_length": message.chars().count(),
            "metadata": metadata,
        });
        self.write_record(record);
    }

    pub fn log_outgoing(&self, user_id: &str, response: &str, status: &str, metadata: Value) {
        let record = json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "direction": "outgoing",
            "user_id": user_id,
            "response": response,
            "response_length": response.chars().count(),
            "status": status,
            "metadata": metadata,
        });
        self.write_record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_jsonl_line_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ChatLogger::new(dir.path()).unwrap();
        logger.log_incoming("u1", "EAC saya mati", json!({"active_intent": null}));
        logger.log_outgoing("u1", "Covernya sudah rapat kak?", "open", json!({"intent": "mati"}));

        let path = logger.log_path();
        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["direction"], "incoming");
        assert_eq!(first["user_id"], "u1");

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["direction"], "outgoing");
        assert_eq!(second["status"], "open");
    }
}
