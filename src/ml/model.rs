// ============================================================
// Layer 5 — Seq2Seq Model
// ============================================================
// Shared embedding, bidirectional GRU encoder and attention
// decoder. forward_loss() is the training pass; inference drives
// encode() and decode_step() one token at a time.

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::batcher::DialogueBatch;
use crate::ml::{
    attention::AttentionMethod,
    decoder::{Decoder, DecoderConfig, DecoderState, DecoderStep},
    encoder::{Encoder, EncoderConfig, EncoderOutput},
    teacher_forcing::{ForcingPolicy, InputSource},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_size: usize,
    /// Embedding size and per-direction encoder GRU size; the decoder
    /// runs at twice this size
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = "AttentionMethod::Dot")]
    pub attention: AttentionMethod,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2Seq<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let encoder = EncoderConfig::new(self.hidden_size, self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_dropout(if self.num_layers > 1 { self.dropout } else { 0.0 })
            .init(device);
        let decoder = DecoderConfig::new(self.hidden_size, 2 * self.hidden_size, self.vocab_size)
            .with_num_layers(self.num_layers)
            .with_dropout(self.dropout)
            .with_attention(self.attention)
            .init(device);

        Seq2Seq { embedding, encoder, decoder }
    }
}

/// Encoder and decoder share one embedding table.
#[derive(Module, Debug)]
pub struct Seq2Seq<B: Backend> {
    pub embedding: Embedding<B>,
    pub encoder:   Encoder<B>,
    pub decoder:   Decoder<B>,
}

pub struct Seq2SeqOutput<B: Backend> {
    /// Mean negative log-likelihood over non-padding target positions
    pub loss: Tensor<B, 1>,
    /// Argmax token at every decoder step, `[batch, max_target_len]`
    pub predictions: Tensor<B, 2, Int>,
}

impl<B: Backend> Seq2Seq<B> {
    /// inputs, mask: `[batch, src_len]`
    pub fn encode(&self, inputs: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int>) -> EncoderOutput<B> {
        let embedded = self.embedding.forward(inputs);
        self.encoder.forward(embedded, mask)
    }

    pub fn start_decoding(&self, encoder: &EncoderOutput<B>) -> DecoderState<B> {
        self.decoder.init_state(encoder)
    }

    /// tokens: `[batch]`, the previous output token of each sequence.
    pub fn decode_step(
        &self,
        tokens:  Tensor<B, 1, Int>,
        state:   DecoderState<B>,
        encoder: &EncoderOutput<B>,
    ) -> DecoderStep<B> {
        let [batch] = tokens.dims();
        let embedded = self.embedding.forward(tokens.reshape([batch, 1]));
        let [_, _, d_embedding] = embedded.dims();
        self.decoder.step(embedded.reshape([batch, d_embedding]), state, encoder)
    }

    /// Teacher-forced training pass over one batch.
    ///
    /// The encoder runs once; the decoder runs once per target position.
    /// Step 0 is fed `sos_id`, later steps whatever `policy` picks.
    pub fn forward_loss<P: ForcingPolicy>(
        &self,
        batch:  &DialogueBatch<B>,
        sos_id: usize,
        policy: &mut P,
    ) -> Seq2SeqOutput<B> {
        let [batch_size, target_len] = batch.targets.dims();
        let device = batch.targets.device();

        let encoder = self.encode(batch.inputs.clone(), batch.input_mask.clone());
        let mut state = self.start_decoding(&encoder);
        let target_mask = batch.target_mask.clone().float();

        let mut input = Tensor::<B, 1, Int>::full([batch_size], sos_id as i64, &device);
        let mut nll = Tensor::<B, 1>::zeros([1], &device);
        let mut predictions = Vec::with_capacity(target_len);

        for t in 0..target_len {
            let step = self.decode_step(input, state, &encoder);
            state = step.state;

            let target_t = batch.targets.clone().slice([0..batch_size, t..t + 1]);
            let mask_t = target_mask.clone().slice([0..batch_size, t..t + 1]);
            let log_probs = log_softmax(step.logits.clone(), 1);
            nll = nll + masked_nll(log_probs, target_t.clone(), mask_t);

            let predicted = step.logits.argmax(1);
            predictions.push(predicted.clone());

            input = match policy.choose(t + 1) {
                InputSource::Target     => target_t.reshape([batch_size]),
                InputSource::Prediction => predicted.reshape([batch_size]),
            };
        }

        let loss = nll / target_mask.sum();
        Seq2SeqOutput {
            loss,
            predictions: Tensor::cat(predictions, 1),
        }
    }
}

/// Summed negative log-likelihood of `targets` (`[batch, 1]`) under
/// `log_probs` (`[batch, vocab]`), counting only rows where `mask`
/// (`[batch, 1]`) is 1.
pub fn masked_nll<B: Backend>(
    log_probs: Tensor<B, 2>,
    targets:   Tensor<B, 2, Int>,
    mask:      Tensor<B, 2>,
) -> Tensor<B, 1> {
    (log_probs.gather(1, targets) * mask).sum().neg()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::DialogueBatcher;
    use crate::domain::dialogue::DialoguePair;
    use crate::ml::teacher_forcing::{AlwaysForce, NeverForce};
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataloader::batcher::Batcher,
        tensor::activation::softmax,
    };

    type TB = NdArray;

    fn tiny(attention: AttentionMethod) -> Seq2SeqConfig {
        Seq2SeqConfig::new(9)
            .with_hidden_size(6)
            .with_num_layers(2)
            .with_dropout(0.0)
            .with_attention(attention)
    }

    fn batch<B: Backend>(device: &B::Device) -> DialogueBatch<B> {
        DialogueBatcher::<B>::new(device.clone(), 0, 2).batch(vec![
            DialoguePair::new(vec![4, 5, 6], vec![7]),
            DialoguePair::new(vec![8], vec![4, 5, 6, 7]),
        ])
    }

    #[test]
    fn test_masked_nll_ignores_padding() {
        let device = Default::default();
        let log_probs = log_softmax(
            Tensor::<TB, 2>::from_floats([[2.0, 0.5, -1.0], [0.1, 0.2, 0.3]], &device),
            1,
        );
        let targets = Tensor::<TB, 2, Int>::from_ints([[0], [2]], &device);

        let none = masked_nll(log_probs.clone(), targets.clone(), Tensor::zeros([2, 1], &device));
        assert_eq!(none.into_scalar(), 0.0);

        // only the first row counts
        let first = masked_nll(
            log_probs.clone(),
            targets.clone(),
            Tensor::from_floats([[1.0], [0.0]], &device),
        );
        let lp: Vec<f32> = log_probs.into_data().to_vec().unwrap();
        assert!((first.into_scalar() + lp[0]).abs() < 1e-5);
    }

    #[test]
    fn test_decoder_distribution_and_attention() {
        let device = Default::default();
        let model = tiny(AttentionMethod::General).init::<TB>(&device);
        let b = batch::<TB>(&device);

        let enc = model.encode(b.inputs.clone(), b.input_mask.clone());
        assert_eq!(enc.outputs.dims(), [2, 4, 12]);
        let state = model.start_decoding(&enc);
        let step = model.decode_step(Tensor::from_ints([1, 1], &device), state, &enc);

        let probs: Vec<f32> = softmax(step.logits, 1).into_data().to_vec().unwrap();
        for row in probs.chunks(9) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }

        // second prompt is [8, <eos>] padded to 4
        let w: Vec<f32> = step.attention.into_data().to_vec().unwrap();
        assert!((w[0..4].iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((w[4..8].iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(w[6], 0.0);
        assert_eq!(w[7], 0.0);
    }

    #[test]
    fn test_forward_loss_is_finite_and_positive() {
        let device = Default::default();
        for method in [AttentionMethod::Dot, AttentionMethod::General, AttentionMethod::Concat] {
            let model = tiny(method).init::<TB>(&device);
            let out = model.forward_loss(&batch::<TB>(&device), 1, &mut AlwaysForce);
            let loss = out.loss.into_scalar();
            assert!(loss.is_finite() && loss > 0.0, "{method:?} gave loss {loss}");
            assert_eq!(out.predictions.dims(), [2, 5]);
        }
    }

    #[test]
    fn test_forcing_policy_changes_nothing_at_step_zero() {
        // with a single-step target only <sos> is ever fed, so the
        // policy cannot matter
        let device = Default::default();
        let model = tiny(AttentionMethod::Dot).init::<TB>(&device);
        let b = DialogueBatcher::<TB>::new(device, 0, 2)
            .batch(vec![DialoguePair::new(vec![4, 5], vec![])]);

        let forced = model.forward_loss(&b, 1, &mut AlwaysForce).loss.into_scalar();
        let free = model.forward_loss(&b, 1, &mut NeverForce).loss.into_scalar();
        assert!((forced - free).abs() < 1e-6);
    }

    #[test]
    fn test_backward_pass_runs() {
        type AB = Autodiff<NdArray>;
        let device = Default::default();
        let model = tiny(AttentionMethod::Concat).init::<AB>(&device);
        let out = model.forward_loss(&batch::<AB>(&device), 1, &mut NeverForce);
        let grads = out.loss.backward();
        let grad = model.embedding.weight.grad(&grads);
        assert!(grad.is_some());
    }
}
