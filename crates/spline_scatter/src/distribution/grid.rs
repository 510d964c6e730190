//! Regular lattice clipped to the curve interior.
use glam::{Vec2, Vec3};
use rand::Rng;

use crate::curve::CurveQuery;
use crate::distribution::{
    emit, step_count, within_budget, Candidate, Distribute, MIN_CURVE_LENGTH,
};
use crate::placeable::DescriptorTable;
use crate::point::PlacementPoint;

/// Lattice sampling.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridDistribution {
    /// Distance between lattice rows and columns.
    pub spacing: f32,
    /// Lattice rotation around the vertical axis, in degrees.
    pub rotation: f32,
    /// Lattice origin offset from the footprint center on the ground plane.
    pub offset: Vec2,
}

impl GridDistribution {
    pub fn new(spacing: f32) -> Self {
        Self {
            spacing,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }
}

impl Default for GridDistribution {
    fn default() -> Self {
        Self {
            spacing: 2.0,
            rotation: 0.0,
            offset: Vec2::ZERO,
        }
    }
}

impl Distribute for GridDistribution {
    fn min_knots(&self) -> usize {
        3
    }

    fn generate(
        &self,
        curve: &dyn CurveQuery,
        descriptors: &DescriptorTable,
        rng: &mut dyn Rng,
    ) -> Vec<PlacementPoint> {
        if !(curve.length() >= MIN_CURVE_LENGTH) {
            return Vec::new();
        }

        let bounds = curve.bounds();
        let size = bounds.size();
        let center = bounds.center();
        let origin = Vec3::new(center.x + self.offset.x, center.y, center.z + self.offset.y);

        // Half diagonal plus the offset covers the footprint under any rotation.
        let reach = Vec2::new(size.x, size.z).length() * 0.5 + self.offset.length();
        let Some(steps) = step_count(reach, self.spacing) else {
            return Vec::new();
        };
        let side = 2 * steps + 3;
        if !within_budget(side.saturating_mul(side), "grid") {
            return Vec::new();
        }
        let n = steps as i64 + 1;

        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let axis_x = Vec3::new(cos, 0.0, -sin);
        let axis_z = Vec3::new(sin, 0.0, cos);

        let mut points = Vec::new();
        for j in -n..=n {
            for i in -n..=n {
                let position = origin
                    + axis_x * (i as f32 * self.spacing)
                    + axis_z * (j as f32 * self.spacing);
                if !bounds.contains_xz(position) {
                    continue;
                }
                if !curve.is_inside(position, self.spacing) {
                    continue;
                }
                let nearest = curve.nearest_point(position);
                let candidate = Candidate {
                    position,
                    curve_position: nearest.position,
                    forward: axis_z,
                    up: Vec3::Y,
                    noise_coord: bounds.uv_xz(position),
                };
                if let Some(p) = emit(candidate, descriptors, rng) {
                    points.push(p);
                }
            }
        }
        points
    }
}
