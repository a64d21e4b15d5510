// ============================================================
// Layer 4 — Text Normalizer
// ============================================================
// Turns a raw movie line into the form the vocabulary is built on.
//
// Steps (applied in order):
//   1. Lowercase and trim
//   2. Decompose to NFD and drop combining marks, which folds
//      any accented letter to its base letter ("café" → "cafe",
//      "č" → "c", "ő" → "o")
//   3. Put a space before . ! ? so they become their own tokens
//   4. Replace every run of characters other than a-z . ! ?
//      with one space
//   5. Trim
//
// Example:
//   "Well, I thought we'd start with PRONUNCIATION!"
//   → "well i thought we d start with pronunciation !"
//
// Reference: Rust Book §8 (Strings in Rust)

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one sentence. The result has single spaces between
    /// tokens and no leading/trailing whitespace.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        // true while the last pushed character is a separator space
        let mut pending_space = false;

        let folded = text
            .trim()
            .chars()
            .flat_map(char::to_lowercase)
            .nfd()
            .filter(|c| !is_combining_mark(*c));

        for c in folded {
            match c {
                'a'..='z' => {
                    if pending_space && !out.is_empty() {
                        out.push(' ');
                    }
                    pending_space = false;
                    out.push(c);
                }
                '.' | '!' | '?' => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    pending_space = false;
                    out.push(c);
                }
                _ => pending_space = true,
            }
        }

        out
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_spaces_punctuation() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("Hello World!"), "hello world !");
        assert_eq!(n.normalize("Really?  Yes."), "really ? yes .");
    }

    #[test]
    fn test_non_letters_become_single_spaces() {
        let n = Normalizer::new();
        assert_eq!(
            n.normalize("Well, I thought we'd start with PRONUNCIATION!"),
            "well i thought we d start with pronunciation !"
        );
        assert_eq!(n.normalize("it's 10 o'clock"), "it s o clock");
    }

    #[test]
    fn test_folds_accents() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("Café Über"), "cafe uber");
    }

    #[test]
    fn test_folds_accents_outside_latin1() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("Dvořák čte Erdős"), "dvorak cte erdos");
        // already-decomposed input folds the same way
        assert_eq!(n.normalize("cafe\u{301}"), "cafe");
    }

    #[test]
    fn test_repeated_punctuation_is_tokenised() {
        let n = Normalizer::new();
        assert_eq!(n.normalize("what?!"), "what ? !");
        assert_eq!(n.normalize("..."), ". . .");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        let n = Normalizer::new();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("  -- 42 -- "), "");
    }
}
