// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs   — Saving and loading full-precision model
//                     weights (NamedMpkGzFileRecorder), plus the
//                     TrainConfig JSON that lets `chat` rebuild
//                     the same model.
//
//   vocab_store.rs  — vocab.json, the word ↔ id mapping the
//                     model was trained with.
//
//   metrics.rs      — Per-epoch loss / accuracy CSV.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
