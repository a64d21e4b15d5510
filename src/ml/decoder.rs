// ============================================================
// Layer 5 — Luong Attention Decoder
// ============================================================
// One call to step() produces the next-token distribution:
//
//   1. x   = [dropout(embed(y_{t-1})) ; h̃_{t-1}]     input feeding
//   2. h_t = GRU stack(x, h_{t-1})                   one step per layer
//   3. a_t, c_t = attention(h_t, encoder outputs)    global attention
//   4. h̃_t = tanh(W_c [h_t ; c_t])                   attentional vector
//   5. logits = W_o h̃_t                              vocabulary scores
//
// The previous attentional vector h̃_{t-1} carries the previous
// context into the recurrent step, so the decoder knows what it
// attended to last time. It starts at zero.
//
// The decoder hidden size equals the encoder output size
// (2 · encoder hidden) so the encoder's per-layer summaries can
// seed it directly and dot attention needs no projection.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::tanh,
};

use crate::ml::{
    attention::{AttentionMethod, LuongAttention, LuongAttentionConfig},
    encoder::EncoderOutput,
    gru::{GruCell, GruCellConfig},
};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub d_embedding: usize,
    pub d_hidden:    usize,
    pub vocab_size:  usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = "AttentionMethod::Dot")]
    pub attention: AttentionMethod,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let cells = (0..self.num_layers)
            .map(|l| {
                let d_in = if l == 0 { self.d_embedding + self.d_hidden } else { self.d_hidden };
                GruCellConfig::new(d_in, self.d_hidden).init(device)
            })
            .collect();

        Decoder {
            cells,
            attention: LuongAttentionConfig::new(self.d_hidden)
                .with_method(self.attention)
                .init(device),
            combine:  LinearConfig::new(2 * self.d_hidden, self.d_hidden).init(device),
            output:   LinearConfig::new(self.d_hidden, self.vocab_size).init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
            d_hidden: self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    cells:     Vec<GruCell<B>>,
    attention: LuongAttention<B>,
    combine:   Linear<B>,
    output:    Linear<B>,
    dropout:   Dropout,
    d_hidden:  usize,
}

/// Recurrent state carried from one decoder step to the next.
#[derive(Debug, Clone)]
pub struct DecoderState<B: Backend> {
    /// One `[batch, d_hidden]` state per layer, bottom first
    pub hidden: Vec<Tensor<B, 2>>,
    /// Previous attentional vector h̃, `[batch, d_hidden]`
    pub attentional: Tensor<B, 2>,
}

pub struct DecoderStep<B: Backend> {
    /// Unnormalized next-token scores, `[batch, vocab]`
    pub logits: Tensor<B, 2>,
    /// Attention over source positions, `[batch, src_len]`
    pub attention: Tensor<B, 2>,
    pub state: DecoderState<B>,
}

impl<B: Backend> Decoder<B> {
    /// Initial state: the encoder's per-layer summaries and a zero h̃.
    pub fn init_state(&self, encoder: &EncoderOutput<B>) -> DecoderState<B> {
        let [batch, _, _] = encoder.outputs.dims();
        let device = encoder.outputs.device();

        let hidden = (0..self.cells.len())
            .map(|l| match encoder.final_hidden.get(l) {
                Some(h) => h.clone(),
                None => Tensor::zeros([batch, self.d_hidden], &device),
            })
            .collect();

        DecoderState {
            hidden,
            attentional: Tensor::zeros([batch, self.d_hidden], &device),
        }
    }

    /// embedded: `[batch, d_embedding]`, the embedded previous token.
    pub fn step(
        &self,
        embedded: Tensor<B, 2>,
        state:    DecoderState<B>,
        encoder:  &EncoderOutput<B>,
    ) -> DecoderStep<B> {
        let num_layers = self.cells.len();
        let mut x = Tensor::cat(vec![self.dropout.forward(embedded), state.attentional], 1);

        let mut hidden = Vec::with_capacity(num_layers);
        for (layer, (cell, h)) in self.cells.iter().zip(state.hidden).enumerate() {
            let h = cell.forward(x, h);
            x = if layer + 1 < num_layers { self.dropout.forward(h.clone()) } else { h.clone() };
            hidden.push(h);
        }

        // x is now the top layer's hidden state
        let attn = self.attention.forward(x.clone(), encoder.outputs.clone(), encoder.mask.clone());
        let attentional = tanh(self.combine.forward(Tensor::cat(vec![x, attn.context], 1)));
        let logits = self.output.forward(attentional.clone());

        DecoderStep {
            logits,
            attention: attn.weights,
            state: DecoderState { hidden, attentional },
        }
    }
}
