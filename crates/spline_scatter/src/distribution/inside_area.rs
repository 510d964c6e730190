//! Jittered-grid sampling of the area enclosed by the curve.
use glam::{Vec2, Vec3};
use rand::Rng;

use crate::curve::CurveQuery;
use crate::distribution::{
    emit, rand01, step_count, within_budget, Candidate, Distribute, MIN_CURVE_LENGTH,
};
use crate::placeable::DescriptorTable;
use crate::point::PlacementPoint;

/// Smallest spacing accepted for area sampling.
pub const MIN_AREA_SPACING: f32 = 0.5;

/// Jittered grid over the curve footprint, clipped to the curve interior.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InsideAreaDistribution {
    /// Cell size of the underlying grid. Clamped to [`MIN_AREA_SPACING`].
    pub spacing: f32,
    /// Jitter amount in [0, 1], where 0 is cell centers and 1 is max jitter.
    pub jitter: f32,
}

impl InsideAreaDistribution {
    pub fn new(spacing: f32, jitter: f32) -> Self {
        Self {
            spacing: spacing.max(MIN_AREA_SPACING),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }
}

impl Default for InsideAreaDistribution {
    fn default() -> Self {
        Self::new(2.0, 1.0)
    }
}

impl Distribute for InsideAreaDistribution {
    fn min_knots(&self) -> usize {
        3
    }

    fn generate(
        &self,
        curve: &dyn CurveQuery,
        descriptors: &DescriptorTable,
        rng: &mut dyn Rng,
    ) -> Vec<PlacementPoint> {
        if !(curve.length() >= MIN_CURVE_LENGTH) || !self.spacing.is_finite() {
            return Vec::new();
        }
        let bounds = curve.bounds();
        let size = bounds.size();
        let (w, h) = (size.x, size.z);
        if w <= 0.0 || h <= 0.0 {
            return Vec::new();
        }

        let spacing = self.spacing.max(MIN_AREA_SPACING);
        let (Some(cols), Some(rows)) = (step_count(w, spacing), step_count(h, spacing)) else {
            return Vec::new();
        };
        let (cols, rows) = (cols.max(1), rows.max(1));
        if !within_budget(cols.saturating_mul(rows), "inside_area") {
            return Vec::new();
        }
        let cell_w = w / cols as f32;
        let cell_h = h / rows as f32;
        let jitter = self.jitter.clamp(0.0, 1.0);
        let jitter_x = jitter * cell_w * 0.5;
        let jitter_z = jitter * cell_h * 0.5;
        let height = bounds.center().y;

        let mut points = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let cx = bounds.min.x + (i as f32 + 0.5) * cell_w;
                let cz = bounds.min.z + (j as f32 + 0.5) * cell_h;
                let jx = if jitter_x > 0.0 {
                    (rand01(rng) * 2.0 - 1.0) * jitter_x
                } else {
                    0.0
                };
                let jz = if jitter_z > 0.0 {
                    (rand01(rng) * 2.0 - 1.0) * jitter_z
                } else {
                    0.0
                };
                let position = Vec3::new(
                    (cx + jx).clamp(bounds.min.x, bounds.max.x),
                    height,
                    (cz + jz).clamp(bounds.min.z, bounds.max.z),
                );

                if !curve.is_inside(position, spacing) {
                    continue;
                }

                let nearest = curve.nearest_point(position);
                let uv = bounds.uv_xz(position);
                let candidate = Candidate {
                    position,
                    curve_position: nearest.position,
                    forward: nearest.tangent,
                    up: Vec3::Y,
                    noise_coord: Vec2::new(uv.x, uv.y),
                };
                if let Some(p) = emit(candidate, descriptors, rng) {
                    points.push(p);
                }
            }
        }
        points
    }
}
