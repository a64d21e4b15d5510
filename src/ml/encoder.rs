// ============================================================
// Layer 5 — Bidirectional GRU Encoder
// ============================================================
// Reads the embedded prompt twice per layer, left-to-right and
// right-to-left, with one GRU cell per direction:
//
//   position:     x_1     x_2     x_3    <pad>
//   forward  ─►   f_1 ──► f_2 ──► f_3 ──► (f_3 held)
//   backward ◄─   b_1 ◄── b_2 ◄── b_3 ◄── (0 held)
//   output        [f_1;b_1] [f_2;b_2] [f_3;b_3] [0;0]
//
// Outputs are the concatenation of both directions, so their
// size is 2 · d_hidden. Padding is handled with masked GRU steps:
// the forward state freezes after the last real token and the
// backward state stays at zero until it reaches one. Outputs at
// padded positions are zero.
//
// The final summary of each layer is [last forward; first
// backward], which seeds the matching decoder layer.

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
};

use crate::ml::gru::{GruCell, GruCellConfig};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let layer_input = |layer: usize| if layer == 0 { self.d_input } else { 2 * self.d_hidden };
        let forward_cells = (0..self.num_layers)
            .map(|l| GruCellConfig::new(layer_input(l), self.d_hidden).init(device))
            .collect();
        let backward_cells = (0..self.num_layers)
            .map(|l| GruCellConfig::new(layer_input(l), self.d_hidden).init(device))
            .collect();

        Encoder {
            forward_cells,
            backward_cells,
            dropout:  DropoutConfig::new(self.dropout).init(),
            d_hidden: self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    forward_cells:  Vec<GruCell<B>>,
    backward_cells: Vec<GruCell<B>>,
    dropout:        Dropout,
    d_hidden:       usize,
}

/// Everything the decoder needs from one encoder pass.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// `[batch, src_len, 2 * d_hidden]`, zero at padded positions
    pub outputs: Tensor<B, 3>,
    /// One `[batch, 2 * d_hidden]` summary per layer, bottom first
    pub final_hidden: Vec<Tensor<B, 2>>,
    /// `[batch, src_len]`, 1 = real token
    pub mask: Tensor<B, 2, Int>,
}

impl<B: Backend> Encoder<B> {
    /// embedded: `[batch, src_len, d_input]`, mask: `[batch, src_len]`
    pub fn forward(&self, embedded: Tensor<B, 3>, mask: Tensor<B, 2, Int>) -> EncoderOutput<B> {
        let [batch, src_len, d_input] = embedded.dims();
        let device = embedded.device();

        let mask_f = mask.clone().float();
        let step_masks: Vec<Tensor<B, 2>> = (0..src_len)
            .map(|t| mask_f.clone().slice([0..batch, t..t + 1]))
            .collect();

        let mut layer_input: Vec<Tensor<B, 2>> = (0..src_len)
            .map(|t| embedded.clone().slice([0..batch, t..t + 1, 0..d_input]).reshape([batch, d_input]))
            .collect();

        let num_layers = self.forward_cells.len();
        let mut final_hidden = Vec::with_capacity(num_layers);

        for (layer, (fwd, bwd)) in self.forward_cells.iter().zip(&self.backward_cells).enumerate() {
            // ── left to right ─────────────────────────────────────────────────
            let mut h = Tensor::zeros([batch, self.d_hidden], &device);
            let mut fwd_out = Vec::with_capacity(src_len);
            for t in 0..src_len {
                h = fwd.forward_masked(layer_input[t].clone(), h, step_masks[t].clone());
                fwd_out.push(h.clone() * step_masks[t].clone());
            }
            let fwd_final = h;

            // ── right to left ─────────────────────────────────────────────────
            let mut h = Tensor::zeros([batch, self.d_hidden], &device);
            let mut bwd_out = Vec::with_capacity(src_len);
            for t in (0..src_len).rev() {
                h = bwd.forward_masked(layer_input[t].clone(), h, step_masks[t].clone());
                bwd_out.push(h.clone() * step_masks[t].clone());
            }
            bwd_out.reverse();
            let bwd_final = h;

            final_hidden.push(Tensor::cat(vec![fwd_final, bwd_final], 1));

            let is_last = layer + 1 == num_layers;
            layer_input = fwd_out
                .into_iter()
                .zip(bwd_out)
                .map(|(f, b)| {
                    let both = Tensor::cat(vec![f, b], 1);
                    if is_last { both } else { self.dropout.forward(both) }
                })
                .collect();
        }

        EncoderOutput {
            outputs: Tensor::stack(layer_input, 1),
            final_hidden,
            mask,
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

    #[test]
    fn test_output_shapes() {
        let device = Default::default();
        let enc = EncoderConfig::new(3, 4).with_num_layers(2).init::<TB>(&device);
        let x = Tensor::<TB, 3>::random([2, 5, 3], Distribution::Normal(0.0, 1.0), &device);
        let mask = Tensor::<TB, 2, Int>::ones([2, 5], &device);

        let out = enc.forward(x, mask);
        assert_eq!(out.outputs.dims(), [2, 5, 8]);
        assert_eq!(out.final_hidden.len(), 2);
        assert_eq!(out.final_hidden[1].dims(), [2, 8]);
    }

    #[test]
    fn test_padding_does_not_change_real_outputs() {
        let device = Default::default();
        let enc = EncoderConfig::new(3, 4).init::<TB>(&device);
        let x = Tensor::<TB, 3>::random([1, 3, 3], Distribution::Normal(0.0, 1.0), &device);

        // same sequence, once alone and once followed by two pad steps
        let alone = enc.forward(x.clone(), Tensor::ones([1, 3], &device));
        let padded_x = Tensor::cat(vec![x, Tensor::random([1, 2, 3], Distribution::Normal(0.0, 1.0), &device)], 1);
        let padded = enc.forward(padded_x, Tensor::<TB, 2, Int>::from_ints([[1, 1, 1, 0, 0]], &device));

        let a: Vec<f32> = alone.outputs.into_data().to_vec().unwrap();
        let p: Vec<f32> = padded.outputs.into_data().to_vec().unwrap();
        for i in 0..a.len() {
            assert!((a[i] - p[i]).abs() < 1e-5, "position {i} differs");
        }
        // padded positions are zero
        assert!(p[a.len()..].iter().all(|v| *v == 0.0));

        let ha: Vec<f32> = alone.final_hidden[0].clone().into_data().to_vec().unwrap();
        let hp: Vec<f32> = padded.final_hidden[0].clone().into_data().to_vec().unwrap();
        for (x, y) in ha.iter().zip(&hp) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}
