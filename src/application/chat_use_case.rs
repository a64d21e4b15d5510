// ============================================================
// Layer 2 — ChatUseCase
// ============================================================
// Restores the latest checkpoint (weights, config, vocabulary)
// and answers prompts with it.
//
// An empty prompt gets an empty reply without running the model.

use anyhow::Result;
use std::path::Path;

use crate::domain::traits::Responder;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    inferencer::{Inferencer, ModelDecoder},
    search::StepDecoder,
};

pub struct ChatUseCase<D: StepDecoder = ModelDecoder<burn::backend::Wgpu>> {
    inferencer: Inferencer<D>,
}

impl ChatUseCase {
    pub fn new(checkpoint_dir: impl AsRef<Path>, beam_width: usize) -> Result<Self> {
        let ckpt       = CheckpointManager::open(checkpoint_dir.as_ref())?;
        let inferencer = Inferencer::from_checkpoint(&ckpt, beam_width)?;
        tracing::info!(
            "Chat ready ({}), vocabulary of {} tokens",
            if beam_width > 1 { format!("beam width {beam_width}") } else { "greedy".to_string() },
            inferencer.vocabulary().len(),
        );
        Ok(Self { inferencer })
    }
}

impl<D: StepDecoder> ChatUseCase<D> {
    pub fn with_inferencer(inferencer: Inferencer<D>) -> Self {
        Self { inferencer }
    }
}

impl<D: StepDecoder> Responder for ChatUseCase<D> {
    fn respond(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Ok(String::new());
        }
        self.inferencer.reply(prompt)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::Vocabulary;
    use crate::ml::inferencer::DecodingStrategy;

    /// Always answers "i know ." then stops.
    struct Knowing;

    impl StepDecoder for Knowing {
        type State = usize;

        fn encode(&self, _prompt: &[usize]) -> Result<usize> {
            Ok(0)
        }

        fn step(&self, _token: usize, steps: &usize) -> Result<(Vec<f32>, usize)> {
            // ids: <pad> <sos> <eos> <unk> i know .
            let script = [4, 5, 6, 2];
            let mut log_probs = vec![-5.0; 7];
            log_probs[script[(*steps).min(3)]] = -0.1;
            Ok((log_probs, steps + 1))
        }
    }

    fn chat() -> ChatUseCase<Knowing> {
        let vocab = Vocabulary::from_tokens(
            ["<pad>", "<sos>", "<eos>", "<unk>", "i", "know", "."],
        ).unwrap();
        ChatUseCase::with_inferencer(Inferencer::new(Knowing, vocab, 10, DecodingStrategy::Greedy))
    }

    #[test]
    fn test_respond_formats_reply() {
        assert_eq!(chat().respond("Do you know?").unwrap(), "i know.");
    }

    #[test]
    fn test_blank_prompt_gets_blank_reply() {
        assert_eq!(chat().respond("   ").unwrap(), "");
    }

    #[test]
    fn test_missing_checkpoint_dir_is_left_alone() {
        let dir = std::env::temp_dir()
            .join(format!("seq2seq-chatbot-no-such-ckpt-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        assert!(ChatUseCase::new(&dir, 1).is_err());
        assert!(!dir.exists());
    }
}
