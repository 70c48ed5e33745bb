use std::sync::OnceLock;

use aircare_core::Answer;

fn yes_phrases() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "sudah saya cek", "sudah dicek", "sudah dilakukan",
            "iya sudah", "betul sudah", "ya benar", "sudah kak", "sudah nih",
        ]
    })
    .as_slice()
}

fn no_phrases() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| {
        vec![
            "belum saya cek", "belum dicek", "belum dicoba", "belum sempat",
            "tidak sempat", "belum nih", "belum kak",
        ]
    })
    .as_slice()
}

fn yes_words() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["ya", "iya", "yes", "yoi", "yap", "betul", "benar", "oke", "ok", "sip"]).as_slice()
}

fn no_words() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["tidak", "ga", "gak", "nggak", "belum", "enggak", "no", "kagak"]).as_slice()
}

fn negative_context_words() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["belum", "tidak", "gak", "ga", "nggak", "enggak", "kagak", "masih"]).as_slice()
}

fn sering_words() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["sering", "terus", "selalu", "tiap", "setiap"]).as_slice()
}

fn jarang_words() -> &'static [&'static str] {
    static LIST: OnceLock<Vec<&'static str>> = OnceLock::new();
    LIST.get_or_init(|| vec!["jarang", "kadang", "sesekali", "sekali-sekali"]).as_slice()
}

fn contains_phrase(lower: &str, list: &[&str]) -> bool {
    list.iter().any(|p| lower.contains(p))
}

fn word_count_matches(lower: &str, list: &[&str]) -> usize {
    let words: Vec<&str> = lower.split_whitespace().collect();
    words
        .iter()
        .filter(|w| list.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
        .count()
}

/// Three-tier rule-based answer classifier:
/// 1. Direct multi-word phrase match ("sudah saya cek" beats a lone "ya").
/// 2. Single-word keyword match, when the whole trimmed message is one
///    word from the yes/no vocabulary.
/// 3. Multi-word count comparison, tie-broken toward "no" when a negative
///    context word (belum/tidak/...) appears anywhere in the message —
///    ambiguous replies like "ya tapi belum sempat" resolve to No.
///
/// When `expect_frequency` is set (the active step's `expected_result` is
/// `["sering", "jarang"]`), frequency vocabulary is checked first instead
/// of yes/no.
pub fn parse_answer(text: &str, expect_frequency: bool) -> Answer {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return Answer::Unclear;
    }

    if expect_frequency {
        let sering = contains_phrase(&lower, sering_words());
        let jarang = contains_phrase(&lower, jarang_words());
        return match (sering, jarang) {
            (true, false) => Answer::Sering,
            (false, true) => Answer::Jarang,
            _ => Answer::Unclear,
        };
    }

    // Tier 1: direct phrase match.
    if contains_phrase(&lower, yes_phrases()) {
        return Answer::Yes;
    }
    if contains_phrase(&lower, no_phrases()) {
        return Answer::No;
    }

    // Tier 2: whole message is exactly one keyword.
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() == 1 {
        let w = words[0].trim_matches(|c: char| !c.is_alphanumeric());
        if yes_words().contains(&w) {
            return Answer::Yes;
        }
        if no_words().contains(&w) {
            return Answer::No;
        }
    }

    // Tier 3: count keyword occurrences, tie-break toward No on any
    // negative-context word anywhere in the message.
    let yes_hits = word_count_matches(&lower, yes_words());
    let no_hits = word_count_matches(&lower, no_words());
    let has_negative_context = contains_phrase(&lower, negative_context_words());

    match (yes_hits, no_hits) {
        (0, 0) => Answer::Unclear,
        (y, n) if y > n && !has_negative_context => Answer::Yes,
        (y, n) if n > y => Answer::No,
        (y, n) if y == n && has_negative_context => Answer::No,
        (y, _) if y > 0 => Answer::Yes,
        _ => Answer::Unclear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_phrase_beats_lone_keyword() {
        assert_eq!(parse_answer("sudah saya cek kak, masih sama", false), Answer::Yes);
    }

    #[test]
    fn single_word_keyword_match() {
        assert_eq!(parse_answer("iya", false), Answer::Yes);
        assert_eq!(parse_answer("belum", false), Answer::No);
    }

    #[test]
    fn ambiguous_positive_with_negative_context_resolves_no() {
        assert_eq!(parse_answer("ya tapi belum sempat saya coba", false), Answer::No);
    }

    #[test]
    fn frequency_mode_picks_sering_or_jarang() {
        assert_eq!(parse_answer("sering banget kak", true), Answer::Sering);
        assert_eq!(parse_answer("jarang sih, sesekali aja", true), Answer::Jarang);
    }

    #[test]
    fn unrecognized_text_is_unclear() {
        assert_eq!(parse_answer("hmm gimana ya ini", false), Answer::Unclear);
    }
}
