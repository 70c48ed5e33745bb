use std::collections::HashMap;
use std::sync::OnceLock;

/// Token-by-token slang/typo canonicalizer, run before intent
/// classification and answer parsing.
///
/// `preserve_case` is accepted for API parity with the source this was
/// distilled from but, like the original, has no effect: normalization
/// always lowercases each token's dictionary lookup and returns the
/// mapped (lowercase) canonical form, or the original token unchanged
/// when no mapping applies. Kept as a documented no-op rather than
/// silently dropped, since callers may still pass it expecting parity.
pub struct TextNormalizer {
    slang_map: &'static HashMap<&'static str, &'static str>,
    typo_map: &'static HashMap<&'static str, &'static str>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            slang_map: slang_map(),
            typo_map: typo_map(),
        }
    }

    pub fn normalize_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        let trimmed = lower.trim();
        if let Some(&canon) = self.slang_map.get(trimmed) {
            return canon.to_string();
        }
        if let Some(&canon) = self.typo_map.get(trimmed) {
            return canon.to_string();
        }
        word.to_string()
    }

    pub fn normalize_text(&self, text: &str, _preserve_case: bool) -> String {
        if text.is_empty() {
            return text.to_string();
        }
        text.split_whitespace()
            .map(|w| self.normalize_word(w))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn normalize_for_intent(&self, text: &str) -> String {
        let normalized = self.normalize_text(text, false);
        normalized.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn slang_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("udh", "sudah"),
            ("udah", "sudah"),
            ("dah", "sudah"),
            ("blm", "belum"),
            ("blum", "belum"),
            ("gk", "gak"),
            ("ga", "gak"),
            ("ngga", "nggak"),
            ("tdk", "tidak"),
            ("bnr", "benar"),
            ("bgt", "banget"),
            ("bener", "benar"),
            ("gmn", "gimana"),
            ("gmna", "gimana"),
            ("bgmn", "bagaimana"),
            ("bgaimana", "bagaimana"),
            ("knp", "kenapa"),
            ("knapa", "kenapa"),
            ("mgkn", "mungkin"),
            ("krn", "karena"),
            ("karna", "karena"),
            ("trs", "terus"),
            ("trz", "terus"),
            ("hrs", "harus"),
            ("jg", "juga"),
            ("jgn", "jangan"),
            ("msh", "masih"),
            ("yg", "yang"),
            ("dgn", "dengan"),
            ("sm", "sama"),
            ("tp", "tapi"),
            ("klo", "kalau"),
            ("kl", "kalau"),
            ("ato", "atau"),
            ("atw", "atau"),
            ("bs", "bisa"),
            ("bsa", "bisa"),
            ("emg", "memang"),
            ("emang", "memang"),
            ("skrg", "sekarang"),
            ("skrang", "sekarang"),
            ("skg", "sekarang"),
            ("kmrn", "kemarin"),
            ("kyk", "kayak"),
            ("kaya", "kayak"),
            ("lg", "lagi"),
            ("lgi", "lagi"),
            ("pke", "pakai"),
            ("spt", "seperti"),
            ("ky", "kayak"),
            ("mksd", "maksud"),
            ("mksdnya", "maksudnya"),
            ("bbrp", "beberapa"),
            ("krng", "kurang"),
            ("jd", "jadi"),
            ("jdi", "jadi"),
            ("aj", "aja"),
            ("sy", "saya"),
            ("org", "orang"),
            ("nyala", "menyala"),
            ("gakbisa", "gak bisa"),
            ("gabisa", "ga bisa"),
            ("gatau", "ga tau"),
            ("gktau", "gak tau"),
        ])
    })
}

fn typo_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("suadh", "sudah"),
            ("sudha", "sudah"),
            ("bleum", "belum"),
            ("bunyii", "bunyi"),
            ("buniy", "bunyi"),
            ("bauu", "bau"),
            ("bua", "bau"),
            ("matii", "mati"),
            ("nyalaa", "nyala"),
            ("tiadk", "tidak"),
            ("tidka", "tidak"),
            ("tidaak", "tidak"),
            ("berisikk", "berisik"),
            ("berisiq", "berisik"),
            ("berisick", "berisik"),
            ("brisik", "berisik"),
            ("hidupp", "hidup"),
            ("idupp", "hidup"),
            ("rusaak", "rusak"),
            ("normall", "normal"),
            ("norml", "normal"),
            ("seringg", "sering"),
            ("srng", "sering"),
            ("jarangg", "jarang"),
            ("jarng", "jarang"),
            ("kadangg", "kadang"),
            ("kdang", "kadang"),
            ("kadng", "kadang"),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_slang_to_canonical() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize_word("udah"), "sudah");
        assert_eq!(n.normalize_word("blm"), "belum");
    }

    #[test]
    fn maps_typo_to_canonical() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize_word("matii"), "mati");
    }

    #[test]
    fn leaves_unknown_words_unchanged() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize_word("Sudirman"), "Sudirman");
    }

    #[test]
    fn normalizes_whole_sentence() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize_text("EAC udh mati blm nyala", false), "EAC sudah mati belum menyala");
    }

    #[test]
    fn normalize_for_intent_collapses_whitespace() {
        let n = TextNormalizer::new();
        assert_eq!(n.normalize_for_intent("EAC   udh mati"), "EAC sudah mati");
    }
}
