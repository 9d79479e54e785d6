// src/source/random.rs - Pseudo-random train generation
use super::TrainSource;
use crate::config::SimConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Distribution parameters, all in hours.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomParams {
    pub mean_gap: f64,
    pub unloading: (f64, f64),
    pub initial_crew: (f64, f64),
    pub replacement: (f64, f64),
}

impl RandomParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            mean_gap: config.arrivals.mean_gap,
            unloading: (config.unloading.min, config.unloading.max),
            initial_crew: (config.crew.min_initial, config.crew.max_initial),
            replacement: (config.replacement.min, config.replacement.max),
        }
    }
}

/// Exponential inter-arrival gaps and uniform durations from a seeded RNG.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    params: RandomParams,
}

impl RandomSource {
    pub fn new(params: RandomParams, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            params,
        }
    }

    fn uniform(&mut self, (min, max): (f64, f64)) -> f64 {
        self.rng.random_range(min..=max)
    }

    /// Inverse-transform sample; `u` never reaches 0 so the log stays finite.
    fn exponential(&mut self, mean: f64) -> f64 {
        let u: f64 = self.rng.random_range(1e-12..=1.0);
        -u.ln() * mean
    }
}

impl TrainSource for RandomSource {
    fn next_inter_arrival_gap(&mut self) -> Option<f64> {
        Some(self.exponential(self.params.mean_gap))
    }

    fn next_unloading_duration(&mut self) -> Option<f64> {
        Some(self.uniform(self.params.unloading))
    }

    fn next_initial_crew_budget(&mut self) -> Option<f64> {
        Some(self.uniform(self.params.initial_crew))
    }

    fn next_replacement_duration(&mut self) -> Option<f64> {
        Some(self.uniform(self.params.replacement))
    }
}
