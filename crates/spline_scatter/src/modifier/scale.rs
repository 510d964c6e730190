//! Random scale stage.
use glam::Vec3;
use rayon::prelude::*;

use crate::modifier::{Modifier, ModifierEnv};
use crate::noise::{PerlinNoise, DEFAULT_NOISE_SEED};
use crate::point::PlacementPoint;

/// Multiplies point scale by a factor picked between `min` and `max`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scale {
    pub min: Vec3,
    pub max: Vec3,
    /// One draw for all axes. Otherwise each axis gets its own noise channel.
    pub uniform: bool,
    pub randomness_frequency: f32,
    pub noise_seed: u32,
}

impl Scale {
    pub fn uniform(min: f32, max: f32) -> Self {
        Self {
            min: Vec3::splat(min),
            max: Vec3::splat(max),
            uniform: true,
            ..Default::default()
        }
    }

    pub fn non_uniform(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            uniform: false,
            ..Default::default()
        }
    }

    pub fn with_randomness_frequency(mut self, frequency: f32) -> Self {
        self.randomness_frequency = frequency;
        self
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            min: Vec3::ONE,
            max: Vec3::ONE,
            uniform: true,
            randomness_frequency: 10.0,
            noise_seed: DEFAULT_NOISE_SEED,
        }
    }
}

impl Modifier for Scale {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn run(&self, points: &mut [PlacementPoint], _env: &ModifierEnv) {
        let (min, max, uniform) = (self.min, self.max, self.uniform);
        let frequency = self.randomness_frequency;
        let noise = PerlinNoise::new(self.noise_seed);

        points.par_iter_mut().filter(|p| p.valid).for_each(|p| {
            let c = p.context.noise_coord * frequency;
            let t = if uniform {
                Vec3::splat(noise.sample_2d_01(c.x, c.y))
            } else {
                // Offset channels so the axes decorrelate.
                Vec3::new(
                    noise.sample_2d_01(c.x, c.y),
                    noise.sample_2d_01(c.x + 31.7, c.y + 11.3),
                    noise.sample_2d_01(c.x + 71.1, c.y + 53.9),
                )
            };
            p.scale *= min + (max - min) * t;
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::point::PointContext;

    fn points(n: usize) -> Vec<PlacementPoint> {
        (0..n)
            .map(|i| {
                PlacementPoint::new(Vec3::ZERO, 0)
                    .with_scale(Vec3::splat(2.0))
                    .with_context(PointContext {
                        noise_coord: Vec2::new(i as f32 * 0.13, 0.4),
                        ..Default::default()
                    })
            })
            .collect()
    }

    #[test]
    fn uniform_scale_keeps_proportions() {
        let mut pts = points(20);
        Scale::uniform(0.5, 1.5).run(&mut pts, &ModifierEnv::default());
        for p in &pts {
            assert!((p.scale.x - p.scale.y).abs() < 1e-6 && (p.scale.y - p.scale.z).abs() < 1e-6);
            assert!((1.0 - 1e-4..=3.0 + 1e-4).contains(&p.scale.x), "{}", p.scale.x);
        }
    }

    #[test]
    fn fixed_range_is_exact() {
        let mut pts = points(3);
        pts[0].invalidate();
        Scale::non_uniform(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, 3.0))
            .run(&mut pts, &ModifierEnv::default());
        assert_eq!(pts[0].scale, Vec3::splat(2.0));
        assert_eq!(pts[1].scale, Vec3::new(2.0, 4.0, 6.0));
    }
}
