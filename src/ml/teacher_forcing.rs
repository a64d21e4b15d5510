// ============================================================
// Layer 5 — Teacher Forcing Policy
// ============================================================
// During training the decoder input at step t > 0 comes from one
// of two sources:
//
//   Target     — the true previous target token (teacher forcing)
//   Prediction — the model's own argmax from step t-1
//
// The choice is made by a ForcingPolicy, asked once per step, so
// the decoding loop itself contains no randomness and tests can
// drive it with a fixed policy. Step 0 always feeds <sos> and the
// policy is not consulted for it.

use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Target,
    Prediction,
}

pub trait ForcingPolicy {
    /// Source of the decoder input for `step` (always ≥ 1).
    fn choose(&mut self, step: usize) -> InputSource;
}

/// Always feed the true previous token. Used for validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysForce;

impl ForcingPolicy for AlwaysForce {
    fn choose(&mut self, _step: usize) -> InputSource {
        InputSource::Target
    }
}

/// Always feed the model's own prediction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverForce;

impl ForcingPolicy for NeverForce {
    fn choose(&mut self, _step: usize) -> InputSource {
        InputSource::Prediction
    }
}

/// Feed the true token with probability `ratio`, independently per step.
#[derive(Debug, Clone)]
pub struct RatioForcing {
    ratio: f64,
    rng:   StdRng,
}

impl RatioForcing {
    pub fn new(ratio: f64, seed: u64) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            rng:   StdRng::seed_from_u64(seed),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl ForcingPolicy for RatioForcing {
    fn choose(&mut self, _step: usize) -> InputSource {
        if self.rng.gen_bool(self.ratio) {
            InputSource::Target
        } else {
            InputSource::Prediction
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policies() {
        assert_eq!(AlwaysForce.choose(3), InputSource::Target);
        assert_eq!(NeverForce.choose(3), InputSource::Prediction);
    }

    #[test]
    fn test_ratio_extremes_are_deterministic() {
        let mut always = RatioForcing::new(1.0, 0);
        let mut never  = RatioForcing::new(0.0, 0);
        for step in 1..100 {
            assert_eq!(always.choose(step), InputSource::Target);
            assert_eq!(never.choose(step), InputSource::Prediction);
        }
    }

    #[test]
    fn test_ratio_is_clamped() {
        assert_eq!(RatioForcing::new(1.7, 0).ratio(), 1.0);
        assert_eq!(RatioForcing::new(-0.2, 0).ratio(), 0.0);
    }

    #[test]
    fn test_same_seed_same_choices() {
        let mut a = RatioForcing::new(0.5, 9);
        let mut b = RatioForcing::new(0.5, 9);
        let xs: Vec<_> = (1..50).map(|s| a.choose(s)).collect();
        let ys: Vec<_> = (1..50).map(|s| b.choose(s)).collect();
        assert_eq!(xs, ys);
        assert!(xs.contains(&InputSource::Target));
        assert!(xs.contains(&InputSource::Prediction));
    }
}
