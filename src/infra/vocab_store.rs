// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the training vocabulary as vocab.json next to the
// model checkpoints, so `chat` translates words to exactly the
// ids the model was trained with.
//
// Format:
//   { "tokens": ["<pad>", "<sos>", ...], "counts": [0, 0, ..., 12, 7] }
//
// Token order is the id order.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::vocabulary::Vocabulary;

#[derive(Debug, Serialize, Deserialize)]
struct VocabFile {
    tokens: Vec<String>,
    counts: Vec<usize>,
}

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("vocab.json")
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        fs::create_dir_all(&self.dir).ok();
        let path = self.path();
        let file = VocabFile {
            tokens: vocab.tokens().to_vec(),
            counts: vocab.counts().to_vec(),
        };
        fs::write(&path, serde_json::to_string(&file)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;

        tracing::info!("Saved vocabulary ({} tokens) to '{}'", vocab.len(), path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Vocabulary> {
        let path = self.path();
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read vocabulary from '{}'. Have you run 'train' first?",
                    path.display()
                )
            })?;
        let file: VocabFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed vocabulary in '{}'", path.display()))?;

        Vocabulary::with_counts(file.tokens, file.counts)
            .with_context(|| format!("Invalid vocabulary in '{}'", path.display()))
    }
}
