pub mod config;
pub mod error;
pub mod types;

pub use config::AircareConfig;
pub use error::{AircareError, Result};
pub use types::{Answer, Gender, Intent, Role, TurnStatus};

/// RFC3339 UTC "now", used everywhere a timestamp is persisted — matches
/// `memory_store.py`'s `_now_iso()` format (seconds precision, trailing Z).
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
