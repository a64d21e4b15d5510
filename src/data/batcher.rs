// ============================================================
// Layer 4 — Dialogue Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<DialoguePair>
// into padded tensors.
//
// Unlike fixed-length inputs, dialogue pairs have different
// lengths, so padding happens here, per batch:
//
//   1. append <eos> to every input and target sequence
//   2. pad every input to the longest input in the batch,
//      every target to the longest target, using <pad>
//   3. record each sequence's true length and a 1/0 mask
//
// Example (pad=0, eos=2):
//   inputs  [5 6 7] [8]      →  [5 6 7 2] [8 2 0 0]
//   mask                     →  [1 1 1 1] [1 1 0 0]
//   lengths                  →  4, 2
//
// The encoder uses the input mask to hold its hidden state over
// padding, attention uses it to give padding zero weight, and
// the loss uses the target mask to ignore padded positions.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::dialogue::DialoguePair;

// ─── Host-side padding ────────────────────────────────────────────────────────
/// Padded sequences before they become tensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedSequences {
    /// Row-major `[batch, max_len]` token ids
    pub ids: Vec<usize>,
    /// Row-major `[batch, max_len]`, 1 = real token, 0 = padding
    pub mask: Vec<u8>,
    /// True length of each sequence, `<eos>` included
    pub lengths: Vec<usize>,
    pub max_len: usize,
}

/// Append `eos` to every sequence and pad them to a common length.
pub fn pad_sequences<'a, I>(sequences: I, eos: usize, pad: usize) -> PaddedSequences
where
    I: IntoIterator<Item = &'a [usize]>,
{
    let rows: Vec<&[usize]> = sequences.into_iter().collect();
    let lengths: Vec<usize> = rows.iter().map(|s| s.len() + 1).collect();
    let max_len = lengths.iter().copied().max().unwrap_or(0);

    let mut ids  = Vec::with_capacity(rows.len() * max_len);
    let mut mask = Vec::with_capacity(rows.len() * max_len);
    for (row, &len) in rows.iter().zip(&lengths) {
        ids.extend_from_slice(row);
        ids.push(eos);
        ids.extend(std::iter::repeat(pad).take(max_len - len));
        mask.extend(std::iter::repeat(1u8).take(len));
        mask.extend(std::iter::repeat(0u8).take(max_len - len));
    }

    PaddedSequences { ids, mask, lengths, max_len }
}

// ─── DialogueBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DialogueBatch<B: Backend> {
    /// `[batch, max_input_len]`
    pub inputs: Tensor<B, 2, Int>,
    /// `[batch, max_input_len]`, 1 = real token
    pub input_mask: Tensor<B, 2, Int>,
    /// True input lengths, `<eos>` included
    pub input_lengths: Vec<usize>,
    /// `[batch, max_target_len]`
    pub targets: Tensor<B, 2, Int>,
    /// `[batch, max_target_len]`, 1 = real token
    pub target_mask: Tensor<B, 2, Int>,
    pub max_target_len: usize,
}

// ─── DialogueBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct DialogueBatcher<B: Backend> {
    pub device: B::Device,
    pad_id:     usize,
    eos_id:     usize,
}

impl<B: Backend> DialogueBatcher<B> {
    pub fn new(device: B::Device, pad_id: usize, eos_id: usize) -> Self {
        Self { device, pad_id, eos_id }
    }

    fn int_tensor(&self, values: impl Iterator<Item = i32>, rows: usize, cols: usize) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = values.collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([rows, cols])
    }
}

impl<B: Backend> Batcher<DialoguePair, DialogueBatch<B>> for DialogueBatcher<B> {
    fn batch(&self, items: Vec<DialoguePair>) -> DialogueBatch<B> {
        let inputs  = pad_sequences(items.iter().map(|p| p.input.as_slice()), self.eos_id, self.pad_id);
        let targets = pad_sequences(items.iter().map(|p| p.target.as_slice()), self.eos_id, self.pad_id);
        let batch_size = items.len();

        DialogueBatch {
            inputs: self.int_tensor(inputs.ids.iter().map(|&x| x as i32), batch_size, inputs.max_len),
            input_mask: self.int_tensor(inputs.mask.iter().map(|&x| x as i32), batch_size, inputs.max_len),
            input_lengths: inputs.lengths,
            targets: self.int_tensor(targets.ids.iter().map(|&x| x as i32), batch_size, targets.max_len),
            target_mask: self.int_tensor(targets.mask.iter().map(|&x| x as i32), batch_size, targets.max_len),
            max_target_len: targets.max_len,
        }
    }
}
