// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-level goal each:
//
//   prepare — raw corpus directory → pairs file
//   train   — pairs file → vocabulary + checkpoints
//   chat    — checkpoint → replies
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - Only workflow coordination

// Raw corpus → pairs file
pub mod prepare_use_case;

// The training workflow
pub mod train_use_case;

// The reply workflow
pub mod chat_use_case;
