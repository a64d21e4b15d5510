// ============================================================
// Layer 3 — Dialogue Domain Types
// ============================================================
// RawExchange  — a (prompt, reply) pair of text lines taken from
//                two consecutive utterances of one conversation
// DialoguePair — the same exchange after normalization and
//                encoding with the Vocabulary
//
// A DialoguePair does NOT carry the trailing <eos>; the batcher
// appends it, so every stored sequence is strictly shorter than
// the configured max_length.

use serde::{Deserialize, Serialize};

/// One prompt/reply exchange as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExchange {
    pub prompt: String,
    pub reply:  String,
}

impl RawExchange {
    pub fn new(prompt: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reply:  reply.into(),
        }
    }
}

/// An encoded training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialoguePair {
    /// Token ids of the prompt
    pub input: Vec<usize>,
    /// Token ids of the reply
    pub target: Vec<usize>,
}

impl DialoguePair {
    pub fn new(input: Vec<usize>, target: Vec<usize>) -> Self {
        Self { input, target }
    }
}
