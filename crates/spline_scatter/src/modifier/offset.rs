//! Positional offset stage.
use glam::Vec3;
use rayon::prelude::*;

use crate::modifier::{Modifier, ModifierEnv};
use crate::noise::{PerlinNoise, DEFAULT_NOISE_SEED};
use crate::point::PlacementPoint;

/// Basis the offset vector is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Space {
    /// The curve frame captured at distribution (right, up, forward).
    #[default]
    Curve,
    /// The point's current rotation axes.
    Local,
    World,
}

/// How the random component is interpolated between its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RandomMode {
    /// Coherent noise of the point's pattern coordinate picks a value in the range.
    #[default]
    RandomBetween,
    /// Runs of `frequency` points alternate between the two bounds.
    Alternate,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offset {
    pub space: Space,
    /// Constant offset.
    pub offset: Vec3,
    /// Per-axis noise amplitude. Axes with a non-positive amplitude get no noise.
    pub noise_amplitude: Vec3,
    pub noise_frequency: Vec3,
    pub noise_offset: Vec3,
    pub random_mode: RandomMode,
    pub random_min: Vec3,
    pub random_max: Vec3,
    pub randomness_frequency: f32,
    pub noise_seed: u32,
}

impl Offset {
    pub fn new(space: Space, offset: Vec3) -> Self {
        Self {
            space,
            offset,
            ..Default::default()
        }
    }

    pub fn with_noise(mut self, amplitude: Vec3, frequency: Vec3, offset: Vec3) -> Self {
        self.noise_amplitude = amplitude;
        self.noise_frequency = frequency;
        self.noise_offset = offset;
        self
    }

    pub fn with_random(mut self, mode: RandomMode, min: Vec3, max: Vec3, frequency: f32) -> Self {
        self.random_mode = mode;
        self.random_min = min;
        self.random_max = max;
        self.randomness_frequency = frequency;
        self
    }

    pub fn with_noise_seed(mut self, seed: u32) -> Self {
        self.noise_seed = seed;
        self
    }
}

impl Default for Offset {
    fn default() -> Self {
        Self {
            space: Space::Curve,
            offset: Vec3::ZERO,
            noise_amplitude: Vec3::ZERO,
            noise_frequency: Vec3::ONE,
            noise_offset: Vec3::ZERO,
            random_mode: RandomMode::RandomBetween,
            random_min: Vec3::ZERO,
            random_max: Vec3::ZERO,
            randomness_frequency: 10.0,
            noise_seed: DEFAULT_NOISE_SEED,
        }
    }
}

/// Stage parameters resolved once per run.
#[derive(Debug, Clone, Copy)]
struct OffsetParams {
    space: Space,
    offset: Vec3,
    noise_amplitude: Vec3,
    noise_frequency: Vec3,
    noise_offset: Vec3,
    random_mode: RandomMode,
    random_min: Vec3,
    random_max: Vec3,
    randomness_frequency: f32,
    alternate_run: usize,
}

impl OffsetParams {
    fn resolve(o: &Offset) -> Self {
        Self {
            space: o.space,
            offset: o.offset,
            noise_amplitude: o.noise_amplitude,
            noise_frequency: o.noise_frequency,
            noise_offset: o.noise_offset,
            random_mode: o.random_mode,
            random_min: o.random_min,
            random_max: o.random_max,
            randomness_frequency: o.randomness_frequency,
            alternate_run: (o.randomness_frequency.max(1.0) as usize).max(1),
        }
    }

    fn displacement(&self, index: usize, point: &PlacementPoint, noise: &PerlinNoise) -> Vec3 {
        let coord = point.context.noise_coord;

        let r = match self.random_mode {
            RandomMode::RandomBetween => {
                let c = coord * self.randomness_frequency;
                noise.sample_2d_01(c.x, c.y)
            }
            RandomMode::Alternate => ((index / self.alternate_run) % 2) as f32,
        };
        let random = self.random_min.lerp(self.random_max, r);

        let channel = |amplitude: f32, frequency: f32, offset: f32| {
            if amplitude > 0.0 {
                let x = coord.x * frequency + offset;
                let y = coord.y * frequency + offset;
                noise.sample_3d(x, y, y) * amplitude
            } else {
                0.0
            }
        };
        let jitter = Vec3::new(
            channel(self.noise_amplitude.x, self.noise_frequency.x, self.noise_offset.x),
            channel(self.noise_amplitude.y, self.noise_frequency.y, self.noise_offset.y),
            channel(self.noise_amplitude.z, self.noise_frequency.z, self.noise_offset.z),
        );

        let amount = self.offset + random + jitter;
        let (right, up, forward) = match self.space {
            Space::Curve => (point.context.right, point.context.up, point.context.forward),
            Space::Local => (
                point.rotation * Vec3::X,
                point.rotation * Vec3::Y,
                point.rotation * Vec3::Z,
            ),
            Space::World => (Vec3::X, Vec3::Y, Vec3::Z),
        };
        right * amount.x + up * amount.y + forward * amount.z
    }
}

impl Modifier for Offset {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn run(&self, points: &mut [PlacementPoint], _env: &ModifierEnv) {
        let params = OffsetParams::resolve(self);
        let noise = PerlinNoise::new(self.noise_seed);
        points
            .par_iter_mut()
            .enumerate()
            .filter(|(_, p)| p.valid)
            .for_each(|(i, p)| {
                p.position += params.displacement(i, p, &noise);
            });
    }
}
