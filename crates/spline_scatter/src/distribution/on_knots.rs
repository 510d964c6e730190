//! One point per curve knot.
use glam::{Vec2, Vec3};
use rand::Rng;

use crate::curve::CurveQuery;
use crate::distribution::{emit, Candidate, Distribute};
use crate::placeable::DescriptorTable;
use crate::point::PlacementPoint;

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnKnotsDistribution {
    /// Skip the first knot.
    pub skip_first: bool,
    /// Skip the last knot.
    pub skip_last: bool,
}

impl OnKnotsDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_ends(mut self, skip_first: bool, skip_last: bool) -> Self {
        self.skip_first = skip_first;
        self.skip_last = skip_last;
        self
    }
}

impl Distribute for OnKnotsDistribution {
    fn min_knots(&self) -> usize {
        2
    }

    fn generate(
        &self,
        curve: &dyn CurveQuery,
        descriptors: &DescriptorTable,
        rng: &mut dyn Rng,
    ) -> Vec<PlacementPoint> {
        let count = curve.knot_count();
        if count < 2 {
            return Vec::new();
        }
        let last = count - 1;
        let mut points = Vec::with_capacity(count);
        for index in 0..count {
            if (self.skip_first && index == 0) || (self.skip_last && index == last) {
                continue;
            }
            let position = curve.knot(index);
            let nearest = curve.nearest_point(position);
            let candidate = Candidate {
                position,
                curve_position: position,
                forward: nearest.tangent,
                up: Vec3::Y,
                noise_coord: Vec2::new(index as f32 / last as f32, 0.0),
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

    #[test]
    fn one_point_per_knot() {
        let table = DescriptorTable::build(&[Placeable::new("lamp")]).unwrap();
        let path = Polyline::open(vec![
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(5.0, 0.0, 5.0),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let pts = OnKnotsDistribution::new().generate(&path, &table, &mut rng);
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[1].position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(pts[2].context.noise_coord, Vec2::new(1.0, 0.0));

        let mut rng = StdRng::seed_from_u64(1);
        let trimmed = OnKnotsDistribution::new()
            .with_skip_ends(true, true)
            .generate(&path, &table, &mut rng);
        assert_eq!(trimmed.len(), 1);
    }
}
