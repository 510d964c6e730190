//! Fixed and noise-driven rotation stage.
use glam::{EulerRot, Quat, Vec3};
use rayon::prelude::*;

use crate::modifier::{Modifier, ModifierEnv, Space};
use crate::noise::{PerlinNoise, DEFAULT_NOISE_SEED};
use crate::point::PlacementPoint;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rotate {
    /// `Local` and `Curve` rotate around the point's own axes, `World` around world axes.
    pub space: Space,
    /// Constant Euler rotation in degrees (pitch, yaw, roll).
    pub rotation: Vec3,
    /// Lower bound of the random Euler rotation in degrees.
    pub random_min: Vec3,
    /// Upper bound of the random Euler rotation in degrees.
    pub random_max: Vec3,
    pub randomness_frequency: f32,
    pub noise_seed: u32,
}

impl Rotate {
    pub fn new(rotation: Vec3) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    pub fn with_random(mut self, min: Vec3, max: Vec3) -> Self {
        self.random_min = min;
        self.random_max = max;
        self
    }

    pub fn with_space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    pub fn with_randomness_frequency(mut self, frequency: f32) -> Self {
        self.randomness_frequency = frequency;
        self
    }
}

impl Default for Rotate {
    fn default() -> Self {
        Self {
            space: Space::Local,
            rotation: Vec3::ZERO,
            random_min: Vec3::ZERO,
            random_max: Vec3::ZERO,
            randomness_frequency: 10.0,
            noise_seed: DEFAULT_NOISE_SEED,
        }
    }
}

impl Modifier for Rotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn run(&self, points: &mut [PlacementPoint], _env: &ModifierEnv) {
        let rotation = self.rotation;
        let (min, max) = (self.random_min, self.random_max);
        let randomized = min != max;
        let frequency = self.randomness_frequency;
        let world = self.space == Space::World;
        let noise = PerlinNoise::new(self.noise_seed);

        points.par_iter_mut().filter(|p| p.valid).for_each(|p| {
            let mut euler = rotation;
            if randomized {
                let c = p.context.noise_coord * frequency;
                euler += min.lerp(max, noise.sample_2d_01(c.x, c.y));
            }
            let euler = euler * (std::f32::consts::PI / 180.0);
            let delta = Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z);
            p.rotation = if world {
                delta * p.rotation
            } else {
                p.rotation * delta
            }
            .normalize();
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::point::PointContext;

    #[test]
    fn fixed_yaw_turns_forward() {
        let mut pts = vec![PlacementPoint::new(Vec3::ZERO, 0); 2];
        pts[1].invalidate();
        Rotate::new(Vec3::new(0.0, 90.0, 0.0)).run(&mut pts, &ModifierEnv::default());
        assert!((pts[0].rotation * Vec3::Z - Vec3::X).length() < 1e-5);
        assert_eq!(pts[1].rotation, Quat::IDENTITY);
    }

    #[test]
    fn random_yaw_stays_in_range() {
        let mut pts: Vec<_> = (0..32)
            .map(|i| {
                PlacementPoint::new(Vec3::ZERO, 0).with_context(PointContext {
                    noise_coord: Vec2::new(i as f32 * 0.37, 0.1),
                    ..Default::default()
                })
            })
            .collect();
        Rotate::new(Vec3::ZERO)
            .with_random(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0))
            .run(&mut pts, &ModifierEnv::default());
        for p in &pts {
            let (yaw, _, _) = p.rotation.to_euler(EulerRot::YXZ);
            assert!((-1e-4..=std::f32::consts::FRAC_PI_2 + 1e-4).contains(&yaw), "{yaw}");
        }
    }
}
