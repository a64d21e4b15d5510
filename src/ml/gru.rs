// ============================================================
// Layer 5 — GRU Step
// ============================================================
// Burn's `nn::gru::Gru` advanced one time step per call.
//
// Gru::forward takes its hidden state for position t from slice t
// of the state tensor it is given, so it is driven here with
// sequences of length 1 and the carried state as that slice. The
// encoder needs this to hold state across padding, and the decoder
// needs it to feed attention back in between steps.
//
//   z  = σ(W_xz x + W_hz h + b_z)              update gate
//   r  = σ(W_xr x + W_hr h + b_r)              reset gate
//   n  = tanh(W_xn x + W_hn (r ⊙ h) + b_n)
//   h' = (1 − z) ⊙ n + z ⊙ h
//
// forward_masked() holds h unchanged wherever mask = 0. Run over
// a right-padded batch this gives every sequence exactly the
// hidden state it would have had without padding.

use burn::{
    nn::gru::{Gru, GruConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            gru: GruConfig::new(self.d_input, self.d_hidden, true).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    gru: Gru<B>,
}

impl<B: Backend> GruCell<B> {
    /// input: `[batch, d_input]`, hidden: `[batch, d_hidden]` → `[batch, d_hidden]`
    pub fn forward(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, d_input] = input.dims();
        let [_, d_hidden] = hidden.dims();

        self.gru
            .forward(
                input.reshape([batch, 1, d_input]),
                Some(hidden.reshape([batch, 1, d_hidden])),
            )
            .reshape([batch, d_hidden])
    }

    /// Like [`GruCell::forward`], but rows where `mask` (`[batch, 1]`,
    /// 1.0 = real token, 0.0 = padding) is zero keep `hidden`.
    pub fn forward_masked(
        &self,
        input:  Tensor<B, 2>,
        hidden: Tensor<B, 2>,
        mask:   Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let next = self.forward(input, hidden.clone());
        hidden.clone() + (next - hidden) * mask
    }
}
