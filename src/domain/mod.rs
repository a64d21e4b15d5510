// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts:
// the vocabulary, dialogue exchanges and pairs, and the traits
// the outer layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Token ↔ index mapping with reserved tokens
pub mod vocabulary;

// Raw text exchanges and encoded dialogue pairs
pub mod dialogue;

// Core abstractions (traits) that other layers implement
pub mod traits;
