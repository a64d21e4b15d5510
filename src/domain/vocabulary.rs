// ============================================================
// Layer 3 — Vocabulary Domain Type
// ============================================================
// A word-level vocabulary: token string ↔ contiguous integer index.
//
// Two types live here:
//
//   VocabularyBuilder — mutable, counts word frequencies while the
//                       corpus is being read
//   Vocabulary        — immutable, frozen from the builder (or from
//                       an explicit token list) and then shared by
//                       reference with every component that needs
//                       token/index translation
//
// Reserved tokens:
//   <pad>  padding inside a batch
//   <sos>  first decoder input
//   <eos>  appended to every sequence, stops decoding
//   <unk>  anything not in the vocabulary
//
// Reference: Rust Book §8 (HashMap), §5 (Structs)

use std::collections::HashMap;

use anyhow::{bail, Result};

pub const PAD_TOKEN: &str = "<pad>";
pub const SOS_TOKEN: &str = "<sos>";
pub const EOS_TOKEN: &str = "<eos>";
pub const UNK_TOKEN: &str = "<unk>";

/// Reserved tokens in the order a built vocabulary lays them out.
pub const RESERVED_TOKENS: [&str; 4] = [PAD_TOKEN, SOS_TOKEN, EOS_TOKEN, UNK_TOKEN];

// ─── VocabularyBuilder ───────────────────────────────────────────────────────
/// Counts words in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct VocabularyBuilder {
    order:  Vec<String>,
    counts: HashMap<String, usize>,
}

impl VocabularyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every space-separated word of an already normalized sentence.
    pub fn add_sentence(&mut self, sentence: &str) {
        for word in sentence.split_whitespace() {
            self.add_word(word);
        }
    }

    pub fn add_word(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.order.push(word.to_string());
                self.counts.insert(word.to_string(), 1);
            }
        }
    }

    /// Number of distinct words seen so far (reserved tokens excluded).
    pub fn distinct_words(&self) -> usize {
        self.order.len()
    }

    /// Freeze into a [`Vocabulary`], keeping only words seen at least
    /// `min_count` times. Kept words are renumbered contiguously after
    /// the reserved tokens, in first-seen order.
    pub fn build(self, min_count: usize) -> Vocabulary {
        let mut tokens: Vec<String> = RESERVED_TOKENS.iter().map(|t| t.to_string()).collect();
        let mut counts = vec![0usize; tokens.len()];

        for word in self.order {
            let count = self.counts[&word];
            if count >= min_count && !RESERVED_TOKENS.contains(&word.as_str()) {
                tokens.push(word);
                counts.push(count);
            }
        }

        let kept = tokens.len() - RESERVED_TOKENS.len();
        let seen = self.counts.len();
        tracing::info!(
            "Vocabulary trimmed to {}/{} words (min_count={})",
            kept, seen, min_count
        );

        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        Vocabulary { tokens, counts, index, pad: Some(0), sos: 1, eos: 2, unk: 3 }
    }
}

// ─── Vocabulary ───────────────────────────────────────────────────────────────
/// Immutable token ↔ index mapping.
///
/// Invariant: indices are `0..len()`, and `id(token(i)) == Some(i)`
/// for every index `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    counts: Vec<usize>,
    index:  HashMap<String, usize>,
    pad:    Option<usize>,
    sos:    usize,
    eos:    usize,
    unk:    usize,
}

impl Vocabulary {
    /// Build a vocabulary from an explicit, ordered token list.
    /// Index `i` is the position of the token in the list.
    ///
    /// `<sos>`, `<eos>` and `<unk>` must be present; `<pad>` is optional.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let counts = vec![0; tokens.len()];
        Self::assemble(tokens, counts)
    }

    /// Like [`Vocabulary::from_tokens`] but with per-token frequency counts.
    pub fn with_counts(tokens: Vec<String>, counts: Vec<usize>) -> Result<Self> {
        if tokens.len() != counts.len() {
            bail!(
                "vocabulary has {} tokens but {} counts",
                tokens.len(),
                counts.len()
            );
        }
        Self::assemble(tokens, counts)
    }

    fn assemble(tokens: Vec<String>, counts: Vec<usize>) -> Result<Self> {
        let mut index = HashMap::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if index.insert(token.clone(), i).is_some() {
                bail!("duplicate token '{}' in vocabulary", token);
            }
        }

        let reserved = |name: &str| -> Result<usize> {
            match index.get(name) {
                Some(&id) => Ok(id),
                None => bail!("vocabulary is missing reserved token '{}'", name),
            }
        };
        let sos = reserved(SOS_TOKEN)?;
        let eos = reserved(EOS_TOKEN)?;
        let unk = reserved(UNK_TOKEN)?;
        let pad = index.get(PAD_TOKEN).copied();

        Ok(Self { tokens, counts, index, pad, sos, eos, unk })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of non-reserved tokens.
    pub fn word_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| !RESERVED_TOKENS.contains(&t.as_str()))
            .count()
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Index of `token`, falling back to `<unk>`.
    pub fn id_or_unk(&self, token: &str) -> usize {
        self.id(token).unwrap_or(self.unk)
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn count(&self, token: &str) -> usize {
        self.id(token).map(|i| self.counts[i]).unwrap_or(0)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn pad_id(&self) -> Option<usize> { self.pad }
    pub fn sos_id(&self) -> usize { self.sos }
    pub fn eos_id(&self) -> usize { self.eos }
    pub fn unk_id(&self) -> usize { self.unk }

    pub fn is_reserved(&self, id: usize) -> bool {
        Some(id) == self.pad || id == self.sos || id == self.eos || id == self.unk
    }

    /// Encode a normalized sentence. Unknown words map to `<unk>`.
    pub fn encode(&self, sentence: &str) -> Vec<usize> {
        sentence
            .split_whitespace()
            .map(|w| self.id_or_unk(w))
            .collect()
    }

    /// Decode ids back to token strings. Ids outside the vocabulary
    /// decode as `<unk>`.
    pub fn decode(&self, ids: &[usize]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.token(id).unwrap_or(UNK_TOKEN).to_string())
            .collect()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
}
