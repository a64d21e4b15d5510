// ============================================================
// Layer 5 — Luong Global Attention
// ============================================================
// At every decoder step, score the decoder's current hidden
// state h against every encoder output e_s (Luong et al. 2015):
//
//   dot      score(h, e) = hᵀ e
//   general  score(h, e) = hᵀ W e
//   concat   score(h, e) = vᵀ tanh(W [h; e])
//
// Scores at padded source positions are replaced by a large
// negative number before the softmax, so every row of weights
// sums to 1 and padding receives exactly zero weight. The
// context vector is the weight-averaged encoder output.
//
// Shapes (D = decoder hidden size = encoder output size):
//   hidden           [batch, D]
//   encoder_outputs  [batch, src_len, D]
//   mask             [batch, src_len]     1 = real, 0 = padding
//   → weights        [batch, src_len]
//   → context        [batch, D]

use burn::{
    module::Param,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};
use serde::{Deserialize, Serialize};

/// Fill value for padded positions; exp() of it underflows to 0.
const MASK_FILL: f32 = -1.0e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttentionMethod {
    #[default]
    Dot,
    General,
    Concat,
}

#[derive(Config, Debug)]
pub struct LuongAttentionConfig {
    pub d_hidden: usize,
    #[config(default = "AttentionMethod::Dot")]
    pub method: AttentionMethod,
}

impl LuongAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LuongAttention<B> {
        let d = self.d_hidden;
        let (general, concat, v) = match self.method {
            AttentionMethod::Dot => (None, None, None),
            AttentionMethod::General => (Some(LinearConfig::new(d, d).init(device)), None, None),
            AttentionMethod::Concat => (
                None,
                Some(LinearConfig::new(2 * d, d).init(device)),
                Some(Initializer::Uniform { min: -0.1, max: 0.1 }.init([d], device)),
            ),
        };
        LuongAttention { general, concat, v, d_hidden: d }
    }
}

#[derive(Module, Debug)]
pub struct LuongAttention<B: Backend> {
    general:  Option<Linear<B>>,
    concat:   Option<Linear<B>>,
    v:        Option<Param<Tensor<B, 1>>>,
    d_hidden: usize,
}

pub struct AttentionOutput<B: Backend> {
    pub weights: Tensor<B, 2>,
    pub context: Tensor<B, 2>,
}

impl<B: Backend> LuongAttention<B> {
    pub fn method(&self) -> AttentionMethod {
        if self.general.is_some() {
            AttentionMethod::General
        } else if self.concat.is_some() {
            AttentionMethod::Concat
        } else {
            AttentionMethod::Dot
        }
    }

    pub fn forward(
        &self,
        hidden:          Tensor<B, 2>,
        encoder_outputs: Tensor<B, 3>,
        mask:            Tensor<B, 2, Int>,
    ) -> AttentionOutput<B> {
        let [batch, src_len, d] = encoder_outputs.dims();

        let scores = self.score(hidden, encoder_outputs.clone()).reshape([batch, src_len]);
        let scores = scores.mask_fill(mask.equal_elem(0), MASK_FILL);
        let weights = softmax(scores, 1);

        let context = (weights.clone().unsqueeze_dim::<3>(2) * encoder_outputs)
            .sum_dim(1)
            .reshape([batch, d]);

        AttentionOutput { weights, context }
    }

    /// Raw compatibility scores, `[batch, src_len, 1]`.
    fn score(&self, hidden: Tensor<B, 2>, encoder_outputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, src_len, d] = encoder_outputs.dims();
        let query = hidden.unsqueeze_dim::<3>(1); // [batch, 1, D]

        match (&self.general, &self.concat, &self.v) {
            (Some(w), _, _) => (w.forward(encoder_outputs) * query).sum_dim(2),
            (None, Some(w), Some(v)) => {
                let query = query.expand([batch, src_len, d]);
                let energy = tanh(w.forward(Tensor::cat(vec![query, encoder_outputs], 2)));
                (energy * v.val().reshape([1, 1, d])).sum_dim(2)
            }
            _ => (encoder_outputs * query).sum_dim(2),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TB = NdArray;

    fn check_weights(method: AttentionMethod) {
        let device = Default::default();
        let attn = LuongAttentionConfig::new(4).with_method(method).init::<TB>(&device);
        assert_eq!(attn.method(), method);

        let hidden = Tensor::<TB, 2>::random([2, 4], Distribution::Normal(0.0, 1.0), &device);
        let enc = Tensor::<TB, 3>::random([2, 5, 4], Distribution::Normal(0.0, 1.0), &device);
        // second sequence has two padded positions
        let mask = Tensor::<TB, 2, Int>::from_ints([[1, 1, 1, 1, 1], [1, 1, 1, 0, 0]], &device);

        let out = attn.forward(hidden, enc, mask);
        assert_eq!(out.context.dims(), [2, 4]);

        let w: Vec<f32> = out.weights.into_data().to_vec().unwrap();
        let row0: f32 = w[0..5].iter().sum();
        let row1: f32 = w[5..10].iter().sum();
        assert!((row0 - 1.0).abs() < 1e-5);
        assert!((row1 - 1.0).abs() < 1e-5);
        assert_eq!(w[8], 0.0);
        assert_eq!(w[9], 0.0);
    }

    #[test]
    fn test_dot_weights_sum_to_one_and_skip_padding() {
        check_weights(AttentionMethod::Dot);
    }

    #[test]
    fn test_general_weights_sum_to_one_and_skip_padding() {
        check_weights(AttentionMethod::General);
    }

    #[test]
    fn test_concat_weights_sum_to_one_and_skip_padding() {
        check_weights(AttentionMethod::Concat);
    }

    #[test]
    fn test_context_of_single_position_is_that_output() {
        // with one real position all weight lands on it
        let device = Default::default();
        let attn = LuongAttentionConfig::new(2).init::<TB>(&device);
        let enc = Tensor::<TB, 3>::from_floats([[[3.0, -1.0], [7.0, 7.0]]], &device);
        let mask = Tensor::<TB, 2, Int>::from_ints([[1, 0]], &device);

        let out = attn.forward(Tensor::ones([1, 2], &device), enc, mask);
        let ctx: Vec<f32> = out.context.into_data().to_vec().unwrap();
        assert!((ctx[0] - 3.0).abs() < 1e-5);
        assert!((ctx[1] + 1.0).abs() < 1e-5);
    }
}
