// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Converts the raw Cornell corpus directory into a pairs file:
//
//   movie_lines.txt + movie_conversations.txt
//        → every consecutive (utterance, reply) exchange
//        → prompt<TAB>reply, one per line
//
// No normalization happens here; `train` normalizes and filters,
// so one prepared file can serve runs with different settings.

use anyhow::{ensure, Result};
use std::path::PathBuf;

use crate::data::loader::{CornellCorpus, PairsFile};
use crate::domain::traits::ExchangeSource;

pub struct PrepareUseCase {
    corpus_dir: PathBuf,
    output:     PathBuf,
}

impl PrepareUseCase {
    pub fn new(corpus_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self { corpus_dir: corpus_dir.into(), output: output.into() }
    }

    /// Returns the number of exchanges written.
    pub fn execute(&self) -> Result<usize> {
        self.prepare_from(&CornellCorpus::new(&self.corpus_dir))
    }

    pub fn prepare_from(&self, source: &dyn ExchangeSource) -> Result<usize> {
        let exchanges = source.load_exchanges()?;
        ensure!(!exchanges.is_empty(), "No exchanges found in '{}'", self.corpus_dir.display());

        PairsFile::new(&self.output).write(&exchanges)?;
        Ok(exchanges.len())
    }
}
