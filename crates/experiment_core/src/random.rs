//! Source of every random decision a run makes.

use rand::{rngs::StdRng, Rng, SeedableRng};

pub trait RandomSource: Send + Sync {
    /// Returns `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool;

    /// Uniform integer in `min..=max`.
    fn roll(&mut self, min: u8, max: u8) -> u8;
}

pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() {
            return false;
        }
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn roll(&mut self, min: u8, max: u8) -> u8 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}
