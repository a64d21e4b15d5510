// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model code.
//
// What's in this layer:
//
//   gru.rs             — One GRU step, plus a masked step that
//                        holds the state over padding
//
//   encoder.rs         — Stacked bidirectional GRU encoder
//
//   attention.rs       — Luong global attention (dot, general,
//                        concat scores)
//
//   decoder.rs         — Input-feeding GRU decoder, one token
//                        per step
//
//   model.rs           — Shared embedding + encoder + decoder,
//                        and the masked NLL training pass
//
//   teacher_forcing.rs — Per-step choice between true and
//                        predicted decoder inputs
//
//   search.rs          — Greedy and beam search over any
//                        step-wise decoder (no tensors)
//
//   trainer.rs         — The training loop: Adam, clipping,
//                        validation, checkpoints, metrics
//
//   inferencer.rs      — Checkpoint → model → reply text
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

/// Gated recurrent unit cell
pub mod gru;

/// Bidirectional GRU encoder
pub mod encoder;

/// Luong global attention
pub mod attention;

/// Attention decoder
pub mod decoder;

/// Seq2seq model and training loss
pub mod model;

/// Teacher forcing policies
pub mod teacher_forcing;

/// Greedy and beam decoding
pub mod search;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine: loads checkpoint and generates replies
pub mod inferencer;
