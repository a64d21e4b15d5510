// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load raw exchanges         (Layer 4 - data)
//   Step 2: Normalize, filter, build   (Layer 4 - data)
//           the vocabulary and pairs
//   Step 3: Split train/validation     (Layer 4 - data)
//   Step 4: Build datasets             (Layer 4 - data)
//   Step 5: Save config + vocabulary   (Layer 6 - infra)
//   Step 6: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    corpus::{CorpusBuilder, CorpusConfig, RareWordPolicy},
    dataset::DialogueDataset,
    loader::PairsFile,
    splitter::split_train_val,
};
use crate::domain::traits::ExchangeSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::EpochMetrics,
    vocab_store::VocabStore,
};
use crate::ml::{
    attention::AttentionMethod,
    model::Seq2SeqConfig,
    trainer::run_training,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved as train_config.json so `chat` can rebuild the same model
// and apply the same max_length to prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub pairs_path:            PathBuf,
    pub checkpoint_dir:        PathBuf,
    /// Sequences (including <eos>) never exceed this many tokens
    pub max_length:            usize,
    pub min_count:             usize,
    pub keep_rare_words:       bool,
    pub batch_size:            usize,
    pub epochs:                usize,
    pub lr:                    f64,
    pub hidden_size:           usize,
    pub num_layers:            usize,
    pub dropout:               f64,
    pub attention:             AttentionMethod,
    pub teacher_forcing_ratio: f64,
    /// Maximum global gradient norm
    pub clip:                  f64,
    pub val_fraction:          f64,
    pub seed:                  u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            pairs_path:            PathBuf::from("data/formatted_movie_lines.txt"),
            checkpoint_dir:        PathBuf::from("checkpoints"),
            max_length:            10,
            min_count:             3,
            keep_rare_words:       false,
            batch_size:            64,
            epochs:                10,
            lr:                    1e-4,
            hidden_size:           256,
            num_layers:            2,
            dropout:               0.1,
            attention:             AttentionMethod::Dot,
            teacher_forcing_ratio: 1.0,
            clip:                  50.0,
            val_fraction:          0.1,
            seed:                  42,
        }
    }
}

impl TrainConfig {
    /// Reject settings that cannot produce a working run.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.max_length >= 2, "max_length must be at least 2, got {}", self.max_length);
        ensure!(self.hidden_size > 0, "hidden_size must be at least 1");
        ensure!(self.num_layers > 0, "num_layers must be at least 1");
        ensure!(self.lr > 0.0, "lr must be positive, got {}", self.lr);
        ensure!(self.clip > 0.0, "clip must be positive, got {}", self.clip);
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}", self.dropout
        );
        ensure!(
            (0.0..=1.0).contains(&self.teacher_forcing_ratio),
            "teacher_forcing_ratio must be in [0, 1], got {}", self.teacher_forcing_ratio
        );
        ensure!(
            (0.0..1.0).contains(&self.val_fraction),
            "val_fraction must be in [0, 1), got {}", self.val_fraction
        );
        Ok(())
    }

    pub fn model_config(&self, vocab_size: usize) -> Seq2SeqConfig {
        Seq2SeqConfig::new(vocab_size)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
            .with_attention(self.attention)
    }

    pub fn corpus_config(&self) -> CorpusConfig {
        CorpusConfig {
            max_length: self.max_length,
            min_count:  self.min_count,
            rare_words: if self.keep_rare_words {
                RareWordPolicy::MapToUnknown
            } else {
                RareWordPolicy::DropPairs
            },
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load exchanges ────────────────────────────────────────────
        tracing::info!("Loading exchanges from '{}'", cfg.pairs_path.display());
        let exchanges = PairsFile::new(&cfg.pairs_path).load_exchanges()?;
        tracing::info!("Loaded {} exchanges", exchanges.len());

        // ── Step 2: Vocabulary + encoded pairs ────────────────────────────────
        let corpus = CorpusBuilder::new(cfg.corpus_config())
            .build(&exchanges)
            .context("Cannot build a training corpus")?;
        tracing::info!(
            "Corpus: {} pairs, {} tokens",
            corpus.pairs.len(),
            corpus.vocabulary.len()
        );

        // ── Step 3: Train / validation split ──────────────────────────────────
        let (train_pairs, val_pairs) =
            split_train_val(corpus.pairs, 1.0 - cfg.val_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_pairs.len(),
            val_pairs.len()
        );
        ensure!(!train_pairs.is_empty(), "No training pairs left after the split");

        // ── Step 4: Build Burn datasets ───────────────────────────────────────
        let train_dataset = DialogueDataset::new(train_pairs);
        let val_dataset   = DialogueDataset::new(val_pairs);

        // ── Step 5: Save config + vocabulary for inference ────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;
        VocabStore::new(&cfg.checkpoint_dir).save(&corpus.vocabulary)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &corpus.vocabulary, train_dataset, val_dataset, &ckpt_manager)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { epochs: 0, ..TrainConfig::default() },
            TrainConfig { max_length: 1, ..TrainConfig::default() },
            TrainConfig { hidden_size: 0, ..TrainConfig::default() },
            TrainConfig { teacher_forcing_ratio: 1.5, ..TrainConfig::default() },
            TrainConfig { val_fraction: 1.0, ..TrainConfig::default() },
            TrainConfig { clip: 0.0, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_keep_rare_words_selects_policy() {
        let keep = TrainConfig { keep_rare_words: true, ..TrainConfig::default() };
        assert_eq!(keep.corpus_config().rare_words, RareWordPolicy::MapToUnknown);
        assert_eq!(TrainConfig::default().corpus_config().rare_words, RareWordPolicy::DropPairs);
    }

    #[test]
    fn test_model_config_carries_hyperparameters() {
        let cfg = TrainConfig {
            hidden_size: 32,
            num_layers:  3,
            attention:   AttentionMethod::Concat,
            ..TrainConfig::default()
        };
        let model = cfg.model_config(100);
        assert_eq!(model.vocab_size, 100);
        assert_eq!(model.hidden_size, 32);
        assert_eq!(model.num_layers, 3);
        assert_eq!(model.attention, AttentionMethod::Concat);
    }
}
