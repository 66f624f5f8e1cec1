//! Ambient noise sampling for points of interest.
//!
//! Places carry no noise measurement, so the validator assigns one drawn
//! uniformly from a range that depends on the kind of place. The draw is
//! behind [`AmbientNoiseSource`] so runs can be made reproducible (seeded
//! RNG) or fully deterministic (fixed value).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Inclusive decibel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRange {
    pub low: f64,
    pub high: f64,
}

impl NoiseRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Category → range table, checked in order. Categories compare lowercase.
const CATEGORY_RANGES: &[(&[&str], NoiseRange)] = &[
    (
        &["restaurant", "cafe", "bar", "fast_food"],
        NoiseRange::new(60.0, 85.0),
    ),
    (
        &["school", "university", "college"],
        NoiseRange::new(50.0, 75.0),
    ),
];

const DEFAULT_RANGE: NoiseRange = NoiseRange::new(40.0, 60.0);

/// The ambient range for a place category.
pub fn ambient_range(category: &str) -> NoiseRange {
    let category = category.to_lowercase();
    CATEGORY_RANGES
        .iter()
        .find(|(names, _)| names.contains(&category.as_str()))
        .map_or(DEFAULT_RANGE, |(_, range)| *range)
}

/// Source of ambient noise values.
pub trait AmbientNoiseSource {
    /// Draw a value within `range`.
    fn sample(&mut self, range: NoiseRange) -> f64;
}

/// Uniform draws from a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngNoise<R> {
    rng: R,
}

impl<R: Rng> RngNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngNoise<StdRng> {
    /// Reproducible across runs for the same seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Seeded from OS entropy; differs on every run.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Seeded when a seed is configured, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> AmbientNoiseSource for RngNoise<R> {
    fn sample(&mut self, range: NoiseRange) -> f64 {
        self.rng.gen_range(range.low..=range.high)
    }
}

/// Always returns the same value, clamped into the requested range.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl AmbientNoiseSource for FixedNoise {
    fn sample(&mut self, range: NoiseRange) -> f64 {
        self.0.clamp(range.low, range.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ranges() {
        assert_eq!(ambient_range("restaurant"), NoiseRange::new(60.0, 85.0));
        assert_eq!(ambient_range("Fast_Food"), NoiseRange::new(60.0, 85.0));
        assert_eq!(ambient_range("university"), NoiseRange::new(50.0, 75.0));
        assert_eq!(ambient_range("park"), NoiseRange::new(40.0, 60.0));
        assert_eq!(ambient_range(""), NoiseRange::new(40.0, 60.0));
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let range = ambient_range("bar");
        let mut a = RngNoise::seeded(42);
        let mut b = RngNoise::seeded(42);
        for _ in 0..32 {
            let x = a.sample(range);
            assert_eq!(x, b.sample(range));
            assert!(range.contains(x));
        }
    }

    #[test]
    fn test_entropy_sampling_stays_in_range() {
        let range = ambient_range("school");
        let mut source = RngNoise::from_seed_option(None);
        for _ in 0..64 {
            assert!(range.contains(source.sample(range)));
        }
    }

    #[test]
    fn test_fixed_noise_clamps() {
        let mut fixed = FixedNoise(70.0);
        assert_eq!(fixed.sample(NoiseRange::new(60.0, 85.0)), 70.0);
        assert_eq!(fixed.sample(NoiseRange::new(40.0, 60.0)), 60.0);
    }
}
