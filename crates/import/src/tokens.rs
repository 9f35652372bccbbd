use regex::Regex;
use std::collections::BTreeSet;

pub type TokenSet = BTreeSet<String>;

/// Reduces a bank narrative to a set of comparable words.
pub struct Tokenizer {
    reference_prefix: Regex,
    pos_prefix: Regex,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            reference_prefix: Regex::new(r"^AP#\d+\s*").expect("static regex"),
            pos_prefix: Regex::new(r"^POS W/D ").expect("static regex"),
        }
    }

    /// Strips the `AP#<digits>` and `POS W/D` prefixes, lowercases, drops
    /// everything except ASCII letters, digits and spaces, then splits.
    pub fn tokenize(&self, text: &str) -> TokenSet {
        let text = self.reference_prefix.replace(text, "");
        let text = self.pos_prefix.replace(&text, "");
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
            .collect();
        cleaned.split_whitespace().map(str::to_string).collect()
    }
}

/// Jaccard index of two token sets; `None` when either set is empty.
pub fn jaccard(a: &TokenSet, b: &TokenSet) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    Some(intersection as f64 / union as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> TokenSet {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn strips_reference_prefix() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize("AP#123 COFFEE SHOP"), set(&["coffee", "shop"]));
        assert_eq!(t.tokenize("AP#98765COFFEE"), set(&["coffee"]));
    }

    #[test]
    fn strips_point_of_sale_prefix() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize("POS W/D NEW WORLD-14:22"), set(&["new", "world1422"]));
    }

    #[test]
    fn prefixes_only_stripped_at_start() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize("PAID AP#12 POS W/D"), set(&["paid", "ap12", "pos", "wd"]));
    }

    #[test]
    fn removes_punctuation_and_collapses_duplicates() {
        let t = Tokenizer::new();
        assert_eq!(
            t.tokenize("Coffee, coffee & CO. Ltd!"),
            set(&["coffee", "co", "ltd"])
        );
    }

    #[test]
    fn only_punctuation_is_empty() {
        assert!(Tokenizer::new().tokenize("*** -- ***").is_empty());
        assert!(Tokenizer::new().tokenize("").is_empty());
    }

    #[test]
    fn jaccard_examples() {
        let a = set(&["coffee", "shop"]);
        let b = set(&["coffee", "shop", "ltd"]);
        assert_eq!(jaccard(&a, &b), Some(2.0 / 3.0));
        assert_eq!(jaccard(&a, &a), Some(1.0));
        assert_eq!(jaccard(&a, &set(&["rent"])), Some(0.0));
        assert_eq!(jaccard(&a, &TokenSet::new()), None);
    }

    #[test]
    fn jaccard_is_symmetric() {
        let t = Tokenizer::new();
        let samples = [
            "AP#1 COUNTDOWN METRO",
            "COUNTDOWN",
            "POS W/D Z ENERGY 2045",
            "Z ENERGY",
            "SPOTIFY P1234",
        ];
        for x in samples {
            for y in samples {
                assert_eq!(jaccard(&t.tokenize(x), &t.tokenize(y)), jaccard(&t.tokenize(y), &t.tokenize(x)));
            }
        }
    }
}
