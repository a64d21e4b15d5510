// ============================================================
// Layer 4 — Corpus Builder
// ============================================================
// Turns raw exchanges into the immutable training corpus:
//
//   RawExchange ─► normalize ─► length filter ─► count words
//        ─► freeze Vocabulary (min_count) ─► rare-word policy
//        ─► encode into DialoguePairs
//
// Length policy:
//   A side with N words is encoded as N ids plus one <eos>, so a
//   pair is kept only when both sides have 1..max_length words
//   (strictly fewer than max_length). Every encoded sequence,
//   <eos> included, is then at most max_length tokens.
//
// Rare-word policy:
//   DropPairs    — drop any pair containing a word that fell
//                  below min_count
//   MapToUnknown — keep the pair, the word becomes <unk>
//
// Every failure here is a configuration error: the run cannot
// produce a meaningful model and stops immediately.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::normalizer::Normalizer;
use crate::domain::{
    dialogue::{DialoguePair, RawExchange},
    vocabulary::{Vocabulary, VocabularyBuilder},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorpusError {
    #[error("the corpus contains no exchanges")]
    NoExchanges,
    #[error("none of the {total} exchanges fit within max_length={max_length}")]
    NoPairsWithinLength { total: usize, max_length: usize },
    #[error("no word reaches min_count={min_count}; the vocabulary would be empty")]
    EmptyVocabulary { min_count: usize },
    #[error("every pair contains a word below min_count={min_count}")]
    NoPairsAfterTrim { min_count: usize },
    #[error("max_length must be at least 2 (one word plus <eos>), got {0}")]
    MaxLengthTooSmall(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RareWordPolicy {
    #[default]
    DropPairs,
    MapToUnknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Maximum encoded sequence length, `<eos>` included
    pub max_length: usize,
    /// Words seen fewer times than this are trimmed from the vocabulary
    pub min_count: usize,
    pub rare_words: RareWordPolicy,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            max_length: 10,
            min_count:  3,
            rare_words: RareWordPolicy::DropPairs,
        }
    }
}

/// The frozen training corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub vocabulary: Vocabulary,
    pub pairs:      Vec<DialoguePair>,
}

pub struct CorpusBuilder {
    config:     CorpusConfig,
    normalizer: Normalizer,
}

impl CorpusBuilder {
    pub fn new(config: CorpusConfig) -> Self {
        Self { config, normalizer: Normalizer::new() }
    }

    pub fn build(&self, exchanges: &[RawExchange]) -> Result<Corpus, CorpusError> {
        let cfg = &self.config;
        if cfg.max_length < 2 {
            return Err(CorpusError::MaxLengthTooSmall(cfg.max_length));
        }
        if exchanges.is_empty() {
            return Err(CorpusError::NoExchanges);
        }

        // ── Normalize + length filter ─────────────────────────────────────────
        let normalized: Vec<(String, String)> = exchanges
            .iter()
            .map(|ex| (self.normalizer.normalize(&ex.prompt), self.normalizer.normalize(&ex.reply)))
            .filter(|(p, r)| self.within_length(p) && self.within_length(r))
            .collect();
        tracing::info!(
            "Kept {}/{} exchanges within max_length={}",
            normalized.len(), exchanges.len(), cfg.max_length
        );
        if normalized.is_empty() {
            return Err(CorpusError::NoPairsWithinLength {
                total:      exchanges.len(),
                max_length: cfg.max_length,
            });
        }

        // ── Vocabulary ────────────────────────────────────────────────────────
        let mut builder = VocabularyBuilder::new();
        for (p, r) in &normalized {
            builder.add_sentence(p);
            builder.add_sentence(r);
        }
        tracing::info!("Counted {} distinct words", builder.distinct_words());
        let vocabulary = builder.build(cfg.min_count);
        if vocabulary.word_count() == 0 {
            return Err(CorpusError::EmptyVocabulary { min_count: cfg.min_count });
        }

        // ── Rare words + encoding ─────────────────────────────────────────────
        let known = |s: &str| s.split_whitespace().all(|w| vocabulary.contains(w));
        let pairs: Vec<DialoguePair> = normalized
            .iter()
            .filter(|(p, r)| match cfg.rare_words {
                RareWordPolicy::DropPairs    => known(p) && known(r),
                RareWordPolicy::MapToUnknown => true,
            })
            .map(|(p, r)| DialoguePair::new(vocabulary.encode(p), vocabulary.encode(r)))
            .collect();
        tracing::info!(
            "Trimmed from {} pairs to {} ({:.4} of total)",
            normalized.len(),
            pairs.len(),
            pairs.len() as f64 / normalized.len() as f64
        );
        if pairs.is_empty() {
            return Err(CorpusError::NoPairsAfterTrim { min_count: cfg.min_count });
        }

        Ok(Corpus { vocabulary, pairs })
    }

    fn within_length(&self, sentence: &str) -> bool {
        let words = sentence.split_whitespace().count();
        words > 0 && words < self.config.max_length
    }
}
