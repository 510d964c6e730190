//! Concentric rings around the curve footprint, clipped to the curve interior.
use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::curve::CurveQuery;
use crate::distribution::{
    emit, within_budget, Candidate, Distribute, MAX_CANDIDATES, MIN_CURVE_LENGTH, MIN_SPACING,
};
use crate::placeable::DescriptorTable;
use crate::point::PlacementPoint;

/// Border search accuracy for the inside-curve test.
///
/// Each tier multiplies the sample spacing to obtain the search interval handed to
/// [`CurveQuery::is_inside`]. Faster tiers use a coarser interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Accuracy {
    BestPerformance,
    PreferPerformance,
    #[default]
    Balanced,
    PreferAccuracy,
    HighestAccuracy,
}

impl Accuracy {
    pub const ALL: [Accuracy; 5] = [
        Accuracy::BestPerformance,
        Accuracy::PreferPerformance,
        Accuracy::Balanced,
        Accuracy::PreferAccuracy,
        Accuracy::HighestAccuracy,
    ];

    pub fn search_multiplier(self) -> f32 {
        match self {
            Accuracy::BestPerformance => 10.0,
            Accuracy::PreferPerformance => 7.0,
            Accuracy::Balanced => 5.0,
            Accuracy::PreferAccuracy => 2.0,
            Accuracy::HighestAccuracy => 1.0,
        }
    }
}

/// Ring layout parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadialDistribution {
    /// Empty radius kept clear around the center.
    pub min_radial_spacing: f32,
    /// Distance between rings.
    pub radial_spacing: f32,
    /// Arc distance between samples on a ring.
    pub spacing: f32,
    /// Allowed angle window in degrees (`x` = start, `y` = end).
    pub angle_range: Vec2,
    /// Extra rotation in degrees applied per ring (twist).
    pub angle_offset: f32,
    /// Height added at the outermost ring, interpolated inward.
    pub height_offset: f32,
    /// Offset of the ring center from the footprint center on the ground plane.
    pub center_offset: Vec2,
    pub accuracy: Accuracy,
}

impl RadialDistribution {
    pub fn new(min_radial_spacing: f32, radial_spacing: f32, spacing: f32) -> Self {
        Self {
            min_radial_spacing,
            radial_spacing,
            spacing,
            ..Default::default()
        }
    }

    pub fn with_angle_range(mut self, start_deg: f32, end_deg: f32) -> Self {
        self.angle_range = Vec2::new(start_deg, end_deg);
        self
    }

    pub fn with_angle_offset(mut self, angle_offset: f32) -> Self {
        self.angle_offset = angle_offset;
        self
    }

    pub fn with_height_offset(mut self, height_offset: f32) -> Self {
        self.height_offset = height_offset;
        self
    }

    pub fn with_center_offset(mut self, center_offset: Vec2) -> Self {
        self.center_offset = center_offset;
        self
    }

    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Footprint center (ground plane) and outer radius for `curve`.
    pub fn layout(&self, curve: &dyn CurveQuery) -> (Vec3, f32) {
        let bounds = curve.bounds();
        let size = bounds.size();
        let center = Vec3::new(
            bounds.min.x + size.x * 0.5 + self.center_offset.x,
            0.0,
            bounds.min.z + size.z * 0.5 + self.center_offset.y,
        );
        let radius = size.x.max(size.z) * 0.5
            + self.center_offset.x.abs()
            + self.center_offset.y.abs();
        (center, radius)
    }

    /// Number of rings for a footprint of `radius`, or 0 when degenerate.
    pub fn ring_count(&self, radius: f32) -> usize {
        if !(self.radial_spacing.is_finite() && self.radial_spacing >= MIN_SPACING) {
            return 0;
        }
        let effective = radius - self.min_radial_spacing;
        let rings = (effective / self.radial_spacing).ceil();
        if rings.is_finite() && rings > 0.0 && rings <= MAX_CANDIDATES as f32 {
            rings as usize
        } else {
            0
        }
    }
}

impl Default for RadialDistribution {
    fn default() -> Self {
        Self {
            min_radial_spacing: 0.0,
            radial_spacing: 2.0,
            spacing: 2.0,
            angle_range: Vec2::new(0.0, 360.0),
            angle_offset: 0.0,
            height_offset: 0.0,
            center_offset: Vec2::ZERO,
            accuracy: Accuracy::Balanced,
        }
    }
}

impl Distribute for RadialDistribution {
    fn min_knots(&self) -> usize {
        3
    }

    fn generate(
        &self,
        curve: &dyn CurveQuery,
        descriptors: &DescriptorTable,
        rng: &mut dyn Rng,
    ) -> Vec<PlacementPoint> {
        if !(curve.length() >= MIN_CURVE_LENGTH)
            || !(self.spacing.is_finite() && self.spacing >= MIN_SPACING)
        {
            return Vec::new();
        }

        let bounds = curve.bounds();
        let center_height = bounds.center().y;
        let (center, radius) = self.layout(curve);
        let rings = self.ring_count(radius);
        if rings == 0 {
            return Vec::new();
        }
        let outer_samples = (TAU * radius.max(0.0) / self.spacing).ceil();
        if !outer_samples.is_finite()
            || !within_budget(rings.saturating_mul(outer_samples as usize), "radial")
        {
            return Vec::new();
        }

        let effective = radius - self.min_radial_spacing;
        let search_interval = self.spacing * self.accuracy.search_multiplier();
        let mut points = Vec::new();

        for s in 1..=rings {
            let ring_t = s as f32 / rings as f32;
            let dist = self.min_radial_spacing + ring_t * effective;
            if dist <= self.min_radial_spacing {
                continue;
            }

            let circumference = TAU * dist;
            let samples = (circumference / self.spacing).ceil() as usize;
            if samples == 0 {
                continue;
            }
            let ring_rotation = self.angle_range.x - self.angle_offset * s as f32;

            for b in 0..samples {
                let t = b as f32 / samples as f32;
                let angle = t * 360.0 + ring_rotation;
                if angle > self.angle_range.y {
                    continue;
                }
                let rad = angle.to_radians();
                let mut position = center + Vec3::new(rad.sin(), 0.0, rad.cos()) * dist;

                if !bounds.contains_xz(position) {
                    continue;
                }
                if !curve.is_inside(position, search_interval) {
                    continue;
                }

                position.y = center_height + ring_t * self.height_offset;
                let nearest = curve.nearest_point(position);
                let inward = Vec3::new(center.x - position.x, 0.0, center.z - position.z);
                let candidate = Candidate {
                    position,
                    curve_position: nearest.position,
                    forward: inward,
                    up: Vec3::Y,
                    noise_coord: Vec2::new(t, ring_t),
                };
                if let Some(p) = emit(candidate, descriptors, rng) {
                    points.push(p);
                }
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
        DescriptorTable::build(&[Placeable::new("stone")]).unwrap()
    }

    #[test]
    fn ring_count_matches_layout_formula() {
        let circle = Polyline::circle(Vec3::ZERO, 11.0, 64);
        let radial = RadialDistribution::new(2.0, 3.0, 1.0);
        let (center, radius) = radial.layout(&circle);
        assert!(center.length() < 1e-4);
        assert!((radius - 11.0).abs() < 1e-4);
        assert_eq!(radial.ring_count(radius), 3);
    }

    #[test]
    fn accepted_points_lie_between_min_and_outer_radius() {
        let circle = Polyline::circle(Vec3::ZERO, 11.0, 64);
        let radial = RadialDistribution::new(2.0, 3.0, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let pts = radial.generate(&circle, &table(), &mut rng);
        assert!(!pts.is_empty());
        for p in &pts {
            let d = Vec2::new(p.position.x, p.position.z).length();
            assert!((2.0 - 1e-3..=11.0 + 1e-3).contains(&d), "{d}");
        }
    }

    #[test]
    fn zero_radial_spacing_is_degenerate() {
        let circle = Polyline::circle(Vec3::ZERO, 5.0, 16);
        let radial = RadialDistribution::new(0.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(radial.generate(&circle, &table(), &mut rng).is_empty());
    }

    #[test]
    fn vanishing_ring_spacing_yields_no_rings() {
        let radial = RadialDistribution::new(0.0, 1e-30, 1.0);
        assert_eq!(radial.ring_count(10.0), 0);
        let circle = Polyline::circle(Vec3::ZERO, 10.0, 32);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(RadialDistribution::new(0.0, 1.0, 1e-30)
            .generate(&circle, &table(), &mut rng)
            .is_empty());
    }

    #[test]
    fn min_spacing_beyond_radius_yields_nothing() {
        let circle = Polyline::circle(Vec3::ZERO, 5.0, 16);
        let radial = RadialDistribution::new(10.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(radial.generate(&circle, &table(), &mut rng).is_empty());
    }

    #[test]
    fn finer_accuracy_never_loses_points() {
        let circle = Polyline::circle(Vec3::ZERO, 12.0, 96);
        let mut previous = 0;
        for accuracy in Accuracy::ALL {
            let radial = RadialDistribution::new(1.0, 1.5, 1.0).with_accuracy(accuracy);
            let mut rng = StdRng::seed_from_u64(8);
            let count = radial.generate(&circle, &table(), &mut rng).len();
            assert!(count >= previous, "{accuracy:?}: {count} < {previous}");
            previous = count;
        }
    }

    #[test]
    fn points_face_the_center() {
        let circle = Polyline::circle(Vec3::ZERO, 10.0, 64);
        let radial = RadialDistribution::new(1.0, 3.0, 2.0);
        let mut rng = StdRng::seed_from_u64(2);
        for p in radial.generate(&circle, &table(), &mut rng) {
            let to_center = Vec3::new(-p.position.x, 0.0, -p.position.z).normalize();
            assert!((p.context.forward - to_center).length() < 1e-4);
        }
    }

    #[test]
    fn angle_range_limits_samples() {
        let circle = Polyline::circle(Vec3::ZERO, 10.0, 64);
        let full = RadialDistribution::new(1.0, 3.0, 1.0);
        let half = full.clone().with_angle_range(0.0, 180.0);
        let mut rng_a = StdRng::seed_from_u64(2);
        let mut rng_b = StdRng::seed_from_u64(2);
        let a = full.generate(&circle, &table(), &mut rng_a).len();
        let b = half.generate(&circle, &table(), &mut rng_b).len();
        assert!(b < a);
        assert!(b > 0);
    }
}
