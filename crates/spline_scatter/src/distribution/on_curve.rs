//! Points spaced along the curve.
use glam::{Vec2, Vec3};
use rand::Rng;

use crate::curve::CurveQuery;
use crate::distribution::{emit, rand01, step_count, Candidate, Distribute, MIN_CURVE_LENGTH};
use crate::placeable::DescriptorTable;
use crate::point::PlacementPoint;

const END_EPSILON: f32 = 1e-4;

/// Walks the curve at a fixed arc-length spacing.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnCurveDistribution {
    /// Arc-length distance between consecutive points.
    pub spacing: f32,
    /// Along-curve jitter in [0, 1] as a fraction of half the spacing.
    pub jitter: f32,
    /// Distance of the first point from the curve start.
    pub start_offset: f32,
}

impl OnCurveDistribution {
    pub fn new(spacing: f32) -> Self {
        Self {
            spacing,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_start_offset(mut self, start_offset: f32) -> Self {
        self.start_offset = start_offset.max(0.0);
        self
    }
}

impl Default for OnCurveDistribution {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            jitter: 0.0,
            start_offset: 0.0,
        }
    }
}

impl Distribute for OnCurveDistribution {
    fn generate(
        &self,
        curve: &dyn CurveQuery,
        descriptors: &DescriptorTable,
        rng: &mut dyn Rng,
    ) -> Vec<PlacementPoint> {
        let length = curve.length();
        if !(length >= MIN_CURVE_LENGTH) || self.start_offset > length + END_EPSILON {
            return Vec::new();
        }
        let Some(steps) = step_count(length - self.start_offset, self.spacing) else {
            return Vec::new();
        };

        let spacing = self.spacing;
        let jitter = self.jitter.clamp(0.0, 1.0) * spacing * 0.5;
        let closed = curve.is_closed();

        let mut points = Vec::with_capacity(steps + 1);
        for k in 0..=steps {
            let d = self.start_offset + k as f32 * spacing;
            if d > length + END_EPSILON {
                break;
            }
            // On a closed curve the end coincides with the start.
            if closed && k > 0 && (length - d).abs() <= END_EPSILON {
                break;
            }
            let d = if jitter > 0.0 {
                (d + (rand01(rng) * 2.0 - 1.0) * jitter).clamp(0.0, length)
            } else {
                d.min(length)
            };
            let sample = curve.sample_at(d);
            let candidate = Candidate {
                position: sample.position,
                curve_position: sample.position,
                forward: sample.tangent,
                up: Vec3::Y,
                noise_coord: Vec2::new(d / length, 0.0),
            };
            if let Some(p) = emit(candidate, descriptors, rng) {
                points.push(p);
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::curve::Polyline;
    use crate::placeable::Placeable;

    fn table() -> DescriptorTable {
        DescriptorTable::build(&[Placeable::new("post")]).unwrap()
    }

    #[test]
    fn spacing_five_on_length_twenty() {
        let line = Polyline::line(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(1);
        let pts = OnCurveDistribution::new(5.0).generate(&line, &table(), &mut rng);
        assert!(pts.len() == 4 || pts.len() == 5, "{}", pts.len());
        for pair in pts.windows(2) {
            let delta = pair[1].position.x - pair[0].position.x;
            assert!((delta - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn jitter_stays_within_bound() {
        let line = Polyline::line(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(9);
        let pts = OnCurveDistribution::new(5.0)
            .with_jitter(0.5)
            .generate(&line, &table(), &mut rng);
        assert_eq!(pts.len(), 5);
        for (k, p) in pts.iter().enumerate() {
            let nominal = k as f32 * 5.0;
            assert!((p.position.x - nominal).abs() <= 1.25 + 1e-4);
        }
    }

    #[test]
    fn closed_curve_skips_duplicate_end() {
        let square = Polyline::rectangle(Vec3::ZERO, Vec2::new(5.0, 5.0));
        let mut rng = StdRng::seed_from_u64(1);
        let pts = OnCurveDistribution::new(5.0).generate(&square, &table(), &mut rng);
        assert_eq!(pts.len(), 4);
    }

    #[test]
    fn short_curve_yields_nothing() {
        let line = Polyline::line(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(OnCurveDistribution::new(0.1)
            .generate(&line, &table(), &mut rng)
            .is_empty());
    }

    #[test]
    fn vanishing_spacing_yields_nothing() {
        let line = Polyline::line(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(OnCurveDistribution::new(1e-38)
            .generate(&line, &table(), &mut rng)
            .is_empty());
    }

    #[test]
    fn start_offset_past_the_end_yields_nothing() {
        let line = Polyline::line(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(OnCurveDistribution::new(2.0)
            .with_start_offset(25.0)
            .generate(&line, &table(), &mut rng)
            .is_empty());
    }

    #[test]
    fn points_face_along_tangent() {
        let line = Polyline::line(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0));
        let mut rng = StdRng::seed_from_u64(1);
        let pts = OnCurveDistribution::new(2.0).generate(&line, &table(), &mut rng);
        for p in &pts {
            assert!((p.rotation * Vec3::Z - Vec3::Z).length() < 1e-5);
            assert!((p.context.forward - Vec3::Z).length() < 1e-5);
        }
    }
}
