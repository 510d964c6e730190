//! Coherent noise used by the modifier stages.
//!
//! Modifiers must be deterministic functions of a point's pattern coordinate, so noise here
//! is a pure function of its input and the seed. No global state, no clock.
use ::noise::{NoiseFn, Perlin, Seedable};

/// Seed used by modifiers unless configured otherwise.
pub const DEFAULT_NOISE_SEED: u32 = 1337;

/// Seeded Perlin noise sampled in `f32`.
///
/// Output lies roughly in `[-1, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct PerlinNoise {
    inner: Perlin,
}

impl PerlinNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            inner: Perlin::new(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.inner.seed()
    }

    /// Samples 2D noise.
    pub fn sample_2d(&self, x: f32, y: f32) -> f32 {
        self.inner.get([x as f64, y as f64]) as f32
    }

    /// Samples 3D noise.
    pub fn sample_3d(&self, x: f32, y: f32, z: f32) -> f32 {
        self.inner.get([x as f64, y as f64, z as f64]) as f32
    }

    /// Samples 2D noise remapped to `[0, 1]`.
    pub fn sample_2d_01(&self, x: f32, y: f32) -> f32 {
        (self.sample_2d(x, y) * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

impl Default for PerlinNoise {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_values() {
        let a = PerlinNoise::new(42);
        let b = PerlinNoise::new(42);
        for i in 0..32 {
            let x = i as f32 * 0.37;
            assert_eq!(a.sample_3d(x, x * 0.5, -x), b.sample_3d(x, x * 0.5, -x));
        }
    }

    #[test]
    fn seeds_change_the_pattern() {
        let a = PerlinNoise::new(1);
        let b = PerlinNoise::new(2);
        let differs = (0..64).any(|i| {
            let x = i as f32 * 0.41 + 0.13;
            a.sample_2d(x, x * 0.7) != b.sample_2d(x, x * 0.7)
        });
        assert!(differs);
        assert_eq!(PerlinNoise::default().seed(), DEFAULT_NOISE_SEED);
    }

    #[test]
    fn values_stay_in_range() {
        let n = PerlinNoise::new(9);
        for i in 0..500 {
            let x = i as f32 * 0.173;
            let v = n.sample_3d(x, x * 1.31, x * 0.71);
            assert!((-1.5..=1.5).contains(&v), "{v}");
            let v01 = n.sample_2d_01(x, -x);
            assert!((0.0..=1.0).contains(&v01));
        }
    }

    #[test]
    fn noise_is_continuous() {
        let n = PerlinNoise::new(3);
        let a = n.sample_2d(1.25, 2.5);
        let b = n.sample_2d(1.2501, 2.5);
        assert!((a - b).abs() < 0.01);
    }
}
