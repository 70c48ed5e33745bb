use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

const WINDOW_SECS: i64 = 300;
/// Soft/medium thresholds key off the recent (windowed) count; hard keys
/// off the lifetime count — matches `engine.py::_get_spam_level`, which
/// checks `spam_total >= 10` before `recent_count >= 5`/`>= 3`.
const SOFT_THRESHOLD: u32 = 3;
const MEDIUM_THRESHOLD: u32 = 5;
const HARD_THRESHOLD: u32 = 10;
const HARD_BLOCK_SECS: i64 = 900;
/// `engine.py:3288` blocks medium-level spam for a full hour.
const MEDIUM_BLOCK_SECS: i64 = 3600;

/// Alphabetic tokens short enough to trip the nonsense-token heuristic but
/// that are legitimate replies, so they're exempted — matches
/// `engine.py::_check_spam_or_profanity`'s whitelist.
fn short_token_whitelist() -> &'static [&'static str] {
    &["eac", "iya", "ya", "ok", "oke"]
}

fn profanity_keywords() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "anjing", "anjir", "bangsat", "kontol", "memek", "goblok", "tolol", "bego",
            "tai", "bajingan", "asu", "jancok", "kampret", "sialan", "brengsek", "keparat",
        ]
    })
    .as_slice()
}

fn nonsense_patterns() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^(.)\1{4,}$|^[^a-zA-Z0-9\s]{5,}$").unwrap())
}

/// Escalation level attached to a single turn's abuse verdict, grounded on
/// `engine.py`'s spam-level thresholds (soft/medium/hard over a rolling
/// five-minute window plus a lifetime counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbuseLevel {
    None,
    Soft,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AbuseWindow {
    /// Unix-epoch seconds of each flagged turn within the rolling window.
    pub hits: Vec<i64>,
    pub lifetime_count: u32,
    /// Unix-epoch seconds after which the user is no longer blocked, if any.
    pub blocked_until: Option<i64>,
}

impl AbuseWindow {
    fn prune(&mut self, now: i64) {
        self.hits.retain(|t| now - t <= WINDOW_SECS);
    }
}

pub struct AbuseVerdict {
    pub level: AbuseLevel,
    pub blocked: bool,
    pub blocked_until: Option<i64>,
}

/// Result of scanning one turn for profanity and spam, mirroring
/// `engine.py::_check_spam_or_profanity`'s two independent flags —
/// profanity and spam are handled on separate paths downstream (the
/// former is never counted against the spam window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpamCheck {
    pub is_spam: bool,
    pub is_profanity: bool,
}

/// Scans `text` for profanity keywords and for spam heuristics: a
/// nonsense pattern (repeated single character, all-symbol gibberish), a
/// short message with no letters at all, or a short alphabetic token not
/// on the whitelist — matches `engine.py::_check_spam_or_profanity`.
pub fn check_spam_or_profanity(text: &str) -> SpamCheck {
    let lower = text.to_lowercase();
    let trimmed = lower.trim();

    let is_profanity = profanity_keywords()
        .iter()
        .any(|kw| trimmed.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == *kw));

    let mut is_spam = nonsense_patterns().is_match(text.trim());

    if !text.is_empty() && text.len() <= 3 && !text.chars().any(|c| c.is_alphabetic()) {
        is_spam = true;
    }

    let msg_clean: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if msg_clean.len() <= 3 && !msg_clean.is_empty() && msg_clean.chars().all(|c| c.is_alphabetic()) && !short_token_whitelist().contains(&msg_clean.as_str()) {
        is_spam = true;
    }

    SpamCheck { is_spam, is_profanity }
}

/// Records one turn and evaluates the resulting escalation level, given
/// the current wall-clock time as unix-epoch seconds (passed in rather
/// than computed internally, since this crate cannot call `SystemTime`
/// directly in a way that is test-deterministic).
pub fn record_turn(window: &mut AbuseWindow, now: i64, flagged: bool) -> AbuseVerdict {
    if let Some(until) = window.blocked_until {
        if now < until {
            return AbuseVerdict {
                level: AbuseLevel::Hard,
                blocked: true,
                blocked_until: Some(until),
            };
        }
        window.blocked_until = None;
    }

    window.prune(now);
    if !flagged {
        return AbuseVerdict {
            level: AbuseLevel::None,
            blocked: false,
            blocked_until: None,
        };
    }

    window.hits.push(now);
    window.lifetime_count += 1;
    let recent = window.hits.len() as u32;

    if window.lifetime_count >= HARD_THRESHOLD {
        let until = now + HARD_BLOCK_SECS;
        window.blocked_until = Some(until);
        AbuseVerdict { level: AbuseLevel::Hard, blocked: true, blocked_until: Some(until) }
    } else if recent >= MEDIUM_THRESHOLD {
        let until = now + MEDIUM_BLOCK_SECS;
        window.blocked_until = Some(until);
        AbuseVerdict { level: AbuseLevel::Medium, blocked: true, blocked_until: Some(until) }
    } else if recent >= SOFT_THRESHOLD {
        AbuseVerdict { level: AbuseLevel::Soft, blocked: false, blocked_until: None }
    } else {
        AbuseVerdict { level: AbuseLevel::None, blocked: false, blocked_until: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_profanity_word_boundaries() {
        assert!(check_spam_or_profanity("dasar anjing lu").is_profanity);
        assert!(!check_spam_or_profanity("unit eac saya agak berisik").is_profanity); // clean complaint, no keyword hit
    }

    #[test]
    fn detects_nonsense_repeated_chars() {
        assert!(check_spam_or_profanity("aaaaaaaaaa").is_spam);
        assert!(check_spam_or_profanity("????!!!!!!").is_spam);
        assert!(!check_spam_or_profanity("unit saya mati total").is_spam);
    }

    #[test]
    fn detects_short_no_letter_and_short_alpha_token_spam() {
        assert!(check_spam_or_profanity("a").is_spam);
        assert!(check_spam_or_profanity("...").is_spam);
        assert!(check_spam_or_profanity("ga").is_spam);
        assert!(!check_spam_or_profanity("oke").is_spam);
        assert!(!check_spam_or_profanity("eac").is_spam);
        assert!(!check_spam_or_profanity("saya mau lapor kendala EAC").is_spam);
    }

    #[test]
    fn escalates_through_soft_medium_hard() {
        let mut w = AbuseWindow::default();
        let mut last = AbuseLevel::None;
        for i in 0..10 {
            let v = record_turn(&mut w, 1_000 + i, true);
            last = v.level;
        }
        assert_eq!(last, AbuseLevel::Hard);
        assert!(w.blocked_until.is_some());
    }

    #[test]
    fn medium_fires_at_five_recent_before_hard() {
        let mut w = AbuseWindow::default();
        let mut levels = Vec::new();
        for i in 0..5 {
            levels.push(record_turn(&mut w, 1_000 + i, true).level);
        }
        assert_eq!(levels[2], AbuseLevel::Soft);
        assert_eq!(levels[4], AbuseLevel::Medium);
    }

    #[test]
    fn block_expires_after_window() {
        let mut w = AbuseWindow::default();
        for i in 0..16 {
            record_turn(&mut w, 1_000 + i, true);
        }
        let until = w.blocked_until.unwrap();
        let v = record_turn(&mut w, until + 1, false);
        assert!(!v.blocked);
    }
}
