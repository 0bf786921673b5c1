//! Fading sources.
//!
//! Fading terms are drawn through [`RandomSource`] so runs can be replayed
//! from a seed and unit tests can switch fading off entirely.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Source of zero-mean Gaussian samples
pub trait RandomSource: Send {
    /// One sample from N(0, sigma²)
    fn gaussian(&mut self, sigma: f64) -> f64;
}

/// `StdRng`-backed Gaussian source
pub struct SeededGaussian {
    rng: StdRng,
}

impl SeededGaussian {
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

impl RandomSource for SeededGaussian {
    fn gaussian(&mut self, sigma: f64) -> f64 {
        if sigma <= 0.0 {
            return 0.0;
        }
        let z: f64 = StandardNormal.sample(&mut self.rng);
        z * sigma
    }
}

/// Always zero
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFading;

impl RandomSource for NoFading {
    fn gaussian(&mut self, _sigma: f64) -> f64 {
        0.0
    }
}
