use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

const FLUSH_IDLE_SECS: i64 = 5;
const FLUSH_MAX_ENTRIES: usize = 5;
const COMPLETENESS_THRESHOLD: f32 = 0.6;

fn verbs() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "mati", "rusak", "bau", "bunyi", "nyala", "menyala", "berhenti", "bocor",
            "panas", "dingin", "berisik", "error", "trouble", "rewel", "nge-trip", "trip",
            "tidak", "gak", "ga", "kurang",
        ]
    })
    .as_slice()
}

fn subjects() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "eac", "unit", "alat", "mesin", "ac", "remote", "filter", "unitnya", "alatnya",
            "elektroniknya", "barangnya",
        ]
    })
    .as_slice()
}

fn temporal_markers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["kemarin", "tadi", "barusan", "sekarang", "hari ini", "sejak"]).as_slice()
}

fn modifiers() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["sangat", "agak", "cukup", "sedikit", "banget", "terus", "sering", "jarang"]).as_slice()
}

fn conjunctions() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["dan", "tapi", "tetapi", "jadi", "karena", "terus", "lalu"]).as_slice()
}

fn contains_any(lower: &str, list: &[&str]) -> bool {
    list.iter().any(|w| lower.contains(w))
}

/// Scores sentence-structure completeness on a 0.0-1.0 scale, grounded on
/// `engine.py`'s heuristic scorer: presence of a subject, a verb/complaint
/// word, sentence length, and bonus points for temporal/modifier/
/// conjunction markers that indicate the sentence isn't a dangling
/// fragment.
pub fn completeness_score(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let word_count = lower.split_whitespace().count();
    if word_count == 0 {
        return 0.0;
    }

    let mut score = 0.0f32;
    if contains_any(&lower, subjects()) {
        score += 3.0;
    }
    if contains_any(&lower, verbs()) {
        score += 3.0;
    }
    if word_count >= 3 {
        score += 2.0;
    }
    if contains_any(&lower, temporal_markers()) {
        score += 1.0;
    }
    if contains_any(&lower, modifiers()) {
        score += 1.0;
    }
    // A trailing conjunction suggests the sender is still typing.
    if let Some(last) = lower.split_whitespace().last() {
        if conjunctions().contains(&last) {
            score -= 2.0;
        }
    }

    (score / 10.0).clamp(0.0, 1.0)
}

/// Mirrors `engine.py::_is_incomplete_message`'s branch order: very short
/// single-word replies and known answer keywords are never buffered
/// (checked upstream by the caller before this runs); anything else is
/// judged by completeness score against the threshold, with a trailing
/// conjunction always forcing incompleteness regardless of score.
pub fn is_incomplete_message(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if let Some(last) = lower.split_whitespace().last() {
        if conjunctions().contains(&last) {
            return true;
        }
    }
    completeness_score(trimmed) < COMPLETENESS_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageBuffer {
    pub parts: Vec<String>,
    pub first_seen: Option<i64>,
}

pub enum BufferAction {
    /// Keep buffering; do not respond yet.
    Hold,
    /// Flush now — combine all parts (including `text`) into one message.
    Flush(String),
}

impl MessageBuffer {
    /// Feeds one incoming message at time `now` (unix-epoch seconds).
    /// Flushes when the combined text looks sentence-complete, the idle
    /// window since the first buffered part has elapsed, or the buffer
    /// has accumulated the maximum number of fragments.
    pub fn push(&mut self, text: &str, now: i64) -> BufferAction {
        if self.parts.is_empty() {
            self.first_seen = Some(now);
        }
        self.parts.push(text.trim().to_string());

        let combined = self.parts.join(" ");
        let idle_elapsed = self.first_seen.map(|t| now - t >= FLUSH_IDLE_SECS).unwrap_or(false);
        let at_capacity = self.parts.len() >= FLUSH_MAX_ENTRIES;
        let complete = !is_incomplete_message(&combined);

        if complete || idle_elapsed || at_capacity {
            self.parts.clear();
            self.first_seen = None;
            BufferAction::Flush(combined)
        } else {
            BufferAction::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_sentence_scores_above_threshold() {
        assert!(!is_incomplete_message("EAC saya mati total sejak kemarin"));
    }

    #[test]
    fn fragment_scores_below_threshold() {
        assert!(is_incomplete_message("jadi"));
        assert!(is_incomplete_message("terus"));
    }

    #[test]
    fn buffer_holds_fragments_then_flushes_on_completion() {
        let mut buf = MessageBuffer::default();
        match buf.push("eac saya", 0) {
            BufferAction::Hold => {}
            BufferAction::Flush(_) => panic!("should hold incomplete fragment"),
        }
        match buf.push("mati total sejak tadi malam", 1) {
            BufferAction::Flush(text) => assert!(text.contains("mati total")),
            BufferAction::Hold => panic!("should flush once sentence completes"),
        }
    }

    #[test]
    fn buffer_flushes_on_idle_timeout() {
        let mut buf = MessageBuffer::default();
        buf.push("eac", 0);
        match buf.push("saya", 10) {
            BufferAction::Flush(_) => {}
            BufferAction::Hold => panic!("idle window should force a flush"),
        }
    }
}
