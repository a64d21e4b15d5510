// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw corpus files to tensor batches:
//
//   Cornell corpus / pairs file
//       │
//       ▼
//   loader            → RawExchange (prompt, reply) text pairs
//       │
//       ▼
//   normalizer        → lowercase, ASCII letters, spaced . ! ?
//       │
//       ▼
//   corpus            → length filter, Vocabulary, rare words,
//                       encoded DialoguePairs
//       │
//       ▼
//   splitter          → seeded train / validation split
//       │
//       ▼
//   dataset           → implements Burn's Dataset trait
//       │
//       ▼
//   batcher           → <eos>, padding, masks, lengths
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Cornell corpus and pairs-file readers
pub mod loader;

/// Sentence normalization
pub mod normalizer;

/// Vocabulary building, filtering and encoding
pub mod corpus;

/// Implements Burn's Dataset trait for dialogue pairs
pub mod dataset;

/// Implements Burn's Batcher trait with per-batch padding
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
