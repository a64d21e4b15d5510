// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, not
// against concrete loaders or models:
//
//   ExchangeSource — anything that yields raw (prompt, reply) text
//                    pairs: the raw Cornell corpus directory, or a
//                    prepared tab-separated pairs file
//   Responder      — anything that turns a prompt into a reply
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::dialogue::RawExchange;

// ─── ExchangeSource ──────────────────────────────────────────────────────────
/// Implementations:
///   - CornellCorpus → movie_lines.txt + movie_conversations.txt
///   - PairsFile     → one `prompt<TAB>reply` per line
pub trait ExchangeSource {
    /// Load every exchange this source holds, in source order.
    fn load_exchanges(&self) -> Result<Vec<RawExchange>>;
}

// ─── Responder ───────────────────────────────────────────────────────────────
/// Implementations:
///   - ChatUseCase → restored checkpoint + greedy/beam decoding
pub trait Responder {
    /// Produce a display-ready reply to `prompt`.
    fn respond(&self, prompt: &str) -> Result<String>;
}
