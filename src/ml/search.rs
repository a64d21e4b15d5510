// ============================================================
// Layer 5 — Decoding Search
// ============================================================
// Turns a step-wise decoder into a reply, one token at a time.
// The decoder is reached through the StepDecoder trait, so the
// search itself never touches tensors and can be driven by a
// scripted decoder in tests.
//
// Every decode moves through three states:
//
//   AwaitingFirst ──<sos>──► Generating{last} ──► Terminated(reason)
//                                 ▲      │
//                                 └──────┘ token ≠ <eos>, below cap
//
// Termination happens on <eos> (not part of the reply) or once
// max_length tokens have been produced.
//
// greedy: keep the single highest-probability token each step.
// beam:   keep the `width` best partial replies; finished replies
//         are ranked by log-probability per decoding step so short
//         replies are not favoured just for being short.

use anyhow::{ensure, Result};

/// Anything that can run one decoder step given the previous token.
pub trait StepDecoder {
    /// Recurrent state carried between steps; cloned when beams split.
    type State: Clone;

    /// Encode a prompt (already terminated by `<eos>`) into the
    /// initial decoder state.
    fn encode(&self, prompt: &[usize]) -> Result<Self::State>;

    /// Log-probabilities over the vocabulary for the token after
    /// `token`, and the updated state.
    fn step(&self, token: usize, state: &Self::State) -> Result<(Vec<f32>, Self::State)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfSequence,
    MaxLength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    AwaitingFirst,
    Generating { last: usize },
    Terminated(StopReason),
}

impl DecodeState {
    /// Token to feed next, or None once terminated.
    pub fn next_input(&self, sos: usize) -> Option<usize> {
        match self {
            DecodeState::AwaitingFirst        => Some(sos),
            DecodeState::Generating { last }  => Some(*last),
            DecodeState::Terminated(_)        => None,
        }
    }

    /// State after `token` was chosen, `produced` counting the reply
    /// tokens so far including this one unless it is `<eos>`.
    pub fn advance(self, token: usize, produced: usize, cfg: &SearchConfig) -> Self {
        if token == cfg.eos {
            DecodeState::Terminated(StopReason::EndOfSequence)
        } else if produced >= cfg.max_length {
            DecodeState::Terminated(StopReason::MaxLength)
        } else {
            DecodeState::Generating { last: token }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub sos:        usize,
    pub eos:        usize,
    /// Maximum number of reply tokens, `<eos>` excluded
    pub max_length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Reply token ids without `<sos>`/`<eos>`
    pub tokens: Vec<usize>,
    /// Sum of the chosen tokens' log-probabilities
    pub score:  f32,
    pub stop:   StopReason,
}

impl Decoded {
    fn steps(&self) -> usize {
        match self.stop {
            StopReason::EndOfSequence => self.tokens.len() + 1,
            StopReason::MaxLength     => self.tokens.len(),
        }
    }

    /// Log-probability per decoding step.
    pub fn normalized_score(&self) -> f32 {
        self.score / self.steps().max(1) as f32
    }
}

/// Always take the most likely next token.
pub fn greedy<D: StepDecoder>(decoder: &D, prompt: &[usize], cfg: &SearchConfig) -> Result<Decoded> {
    let mut state = decoder.encode(prompt)?;
    let mut phase = if cfg.max_length == 0 {
        DecodeState::Terminated(StopReason::MaxLength)
    } else {
        DecodeState::AwaitingFirst
    };
    let mut tokens = Vec::new();
    let mut score = 0.0f32;

    while let Some(input) = phase.next_input(cfg.sos) {
        let (log_probs, next_state) = decoder.step(input, &state)?;
        state = next_state;

        let token = argmax(&log_probs)?;
        score += log_probs[token];
        if token != cfg.eos {
            tokens.push(token);
        }
        phase = phase.advance(token, tokens.len(), cfg);
    }

    let stop = match phase {
        DecodeState::Terminated(reason) => reason,
        _ => StopReason::MaxLength,
    };
    tracing::debug!("greedy decode: {} tokens, stop={:?}", tokens.len(), stop);
    Ok(Decoded { tokens, score, stop })
}

struct Hypothesis<S> {
    tokens: Vec<usize>,
    score:  f32,
    state:  S,
    phase:  DecodeState,
}

/// Beam search keeping the `width` best partial replies.
///
/// Stops once `width` replies have finished or every live beam hit
/// the length cap, then returns the finished reply with the highest
/// normalized score. Width 1 reproduces `greedy`.
pub fn beam<D: StepDecoder>(
    decoder: &D,
    prompt:  &[usize],
    cfg:     &SearchConfig,
    width:   usize,
) -> Result<Decoded> {
    ensure!(width > 0, "beam width must be at least 1");
    if cfg.max_length == 0 {
        return Ok(Decoded { tokens: Vec::new(), score: 0.0, stop: StopReason::MaxLength });
    }

    let mut live = vec![Hypothesis {
        tokens: Vec::new(),
        score:  0.0,
        state:  decoder.encode(prompt)?,
        phase:  DecodeState::AwaitingFirst,
    }];
    let mut finished: Vec<Decoded> = Vec::new();

    while !live.is_empty() && finished.len() < width {
        // (parent, token, total score, state after step)
        let mut candidates: Vec<(usize, usize, f32, D::State)> = Vec::new();
        for (parent, hyp) in live.iter().enumerate() {
            let Some(input) = hyp.phase.next_input(cfg.sos) else { continue };
            let (log_probs, state) = decoder.step(input, &hyp.state)?;
            for token in top_k(&log_probs, width) {
                candidates.push((parent, token, hyp.score + log_probs[token], state.clone()));
            }
        }
        // stable: ties keep parent order, then token order
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut next = Vec::with_capacity(width);
        for (parent, token, score, state) in candidates.into_iter().take(width) {
            let mut tokens = live[parent].tokens.clone();
            if token != cfg.eos {
                tokens.push(token);
            }
            match live[parent].phase.advance(token, tokens.len(), cfg) {
                DecodeState::Terminated(stop) => finished.push(Decoded { tokens, score, stop }),
                phase => next.push(Hypothesis { tokens, score, state, phase }),
            }
        }
        live = next;
    }

    finished
        .into_iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            a.normalized_score()
                .total_cmp(&b.normalized_score())
                // earlier finisher wins ties
                .then(ib.cmp(ia))
        })
        .map(|(_, d)| d)
        .ok_or_else(|| anyhow::anyhow!("beam search produced no hypothesis"))
}

/// Index of the first maximum.
fn argmax(values: &[f32]) -> Result<usize> {
    ensure!(!values.is_empty(), "decoder returned an empty distribution");
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    Ok(best)
}

/// Indices of the `k` largest values, largest first, lower index on ties.
fn top_k(values: &[f32], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    idx.truncate(k);
    idx
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    // ids: <sos>=0 <eos>=1 a=2 b=3
    const CFG: SearchConfig = SearchConfig { sos: 0, eos: 1, max_length: 5 };

    /// Decoder whose next-token distribution depends only on the
    /// tokens fed so far (starting with <sos>).
    struct Scripted<F: Fn(&[usize]) -> [f32; 4]>(F);

    impl<F: Fn(&[usize]) -> [f32; 4]> StepDecoder for Scripted<F> {
        type State = Vec<usize>;

        fn encode(&self, _prompt: &[usize]) -> Result<Self::State> {
            Ok(Vec::new())
        }

        fn step(&self, token: usize, state: &Self::State) -> Result<(Vec<f32>, Self::State)> {
            let mut history = state.clone();
            history.push(token);
            let probs = (self.0)(&history);
            Ok((probs.iter().map(|p| p.ln()).collect(), history))
        }
    }

    /// Greedy walks a → a → <eos>; the better reply overall is b → <eos>.
    fn garden_path(history: &[usize]) -> [f32; 4] {
        match history {
            [0]       => [0.001, 0.099, 0.5, 0.4],
            [0, 2]    => [0.001, 0.299, 0.4, 0.3],
            [0, 2, 2] => [0.001, 0.97, 0.015, 0.014],
            [0, 3]    => [0.001, 0.9, 0.049, 0.05],
            _         => [0.001, 0.997, 0.001, 0.001],
        }
    }

    #[test]
    fn test_greedy_stops_at_eos() {
        let out = greedy(&Scripted(garden_path), &[2, 1], &CFG).unwrap();
        assert_eq!(out.tokens, vec![2, 2]);
        assert_eq!(out.stop, StopReason::EndOfSequence);
        let expected = (0.5f32).ln() + (0.4f32).ln() + (0.97f32).ln();
        assert!((out.score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_greedy_stops_at_max_length() {
        let chatty = Scripted(|_: &[usize]| [0.01, 0.01, 0.97, 0.01]);
        let cfg = SearchConfig { max_length: 3, ..CFG };
        let out = greedy(&chatty, &[2, 1], &cfg).unwrap();
        assert_eq!(out.tokens, vec![2, 2, 2]);
        assert_eq!(out.stop, StopReason::MaxLength);

        let out = beam(&chatty, &[2, 1], &cfg, 3).unwrap();
        assert_eq!(out.tokens.len(), 3);
        assert_eq!(out.stop, StopReason::MaxLength);
    }

    #[test]
    fn test_zero_max_length_produces_nothing() {
        let cfg = SearchConfig { max_length: 0, ..CFG };
        let out = greedy(&Scripted(garden_path), &[1], &cfg).unwrap();
        assert!(out.tokens.is_empty());
        assert_eq!(out.stop, StopReason::MaxLength);
    }

    #[test]
    fn test_beam_width_one_matches_greedy() {
        let d = Scripted(garden_path);
        assert_eq!(beam(&d, &[2, 1], &CFG, 1).unwrap(), greedy(&d, &[2, 1], &CFG).unwrap());
    }

    #[test]
    fn test_wider_beam_finds_better_reply() {
        let out = beam(&Scripted(garden_path), &[2, 1], &CFG, 2).unwrap();
        assert_eq!(out.tokens, vec![3]);
        assert_eq!(out.stop, StopReason::EndOfSequence);
    }

    #[test]
    fn test_beam_rejects_zero_width() {
        assert!(beam(&Scripted(garden_path), &[1], &CFG, 0).is_err());
    }

    #[test]
    fn test_decode_state_transitions() {
        let s = DecodeState::AwaitingFirst;
        assert_eq!(s.next_input(0), Some(0));
        let s = s.advance(2, 1, &CFG);
        assert_eq!(s, DecodeState::Generating { last: 2 });
        assert_eq!(s.next_input(0), Some(2));
        assert_eq!(s.advance(1, 1, &CFG), DecodeState::Terminated(StopReason::EndOfSequence));
        assert_eq!(s.advance(3, 5, &CFG), DecodeState::Terminated(StopReason::MaxLength));
        assert_eq!(DecodeState::Terminated(StopReason::MaxLength).next_input(0), None);
    }

    #[test]
    fn test_top_k_prefers_lower_index_on_ties() {
        assert_eq!(top_k(&[0.1, 0.5, 0.5, 0.2], 2), vec![1, 2]);
        assert_eq!(argmax(&[0.3, 0.7, 0.7]).unwrap(), 1);
    }
}
