//! Mask rules that invalidate points by shape.
//!
//! Masking runs after distribution. Every point is tested against every active rule and
//! either survives or has its valid flag cleared; nothing else about the point changes.
use std::sync::Arc;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

use crate::curve::polyline::polygon_contains;
use crate::curve::{Aabb, CurveQuery};
use crate::point::PlacementPoint;

/// Bit set of mask layers a pass listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask containing only `layer` (0..32). Out-of-range layers yield an empty mask.
    pub fn layer(layer: u32) -> Self {
        LayerMask(1u32.checked_shl(layer).unwrap_or(0))
    }

    pub fn with_layer(self, layer: u32) -> Self {
        LayerMask(self.0 | Self::layer(layer).0)
    }

    #[inline]
    pub fn contains(self, layer: u32) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// What a rule does with points inside its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaskMode {
    /// Points inside the shape are removed.
    #[default]
    Exclude,
    /// Points outside the shape are removed.
    Include,
}

/// Region tested by a rule.
#[derive(Debug, Clone)]
pub enum MaskShape {
    Sphere { center: Vec3, radius: f32 },
    Box(Aabb),
    /// Ground-plane polygon, `(x, z)` per vertex.
    Polygon(Vec<Vec2>),
    /// Closed curves test their enclosed area. Open curves test a band of `tolerance`
    /// around the curve.
    Curve {
        curve: Arc<dyn CurveQuery>,
        tolerance: f32,
    },
}

impl MaskShape {
    pub fn contains(&self, p: Vec3) -> bool {
        match self {
            MaskShape::Sphere { center, radius } => p.distance_squared(*center) <= radius * radius,
            MaskShape::Box(aabb) => aabb.contains(p),
            MaskShape::Polygon(vertices) => polygon_contains(vertices, Vec2::new(p.x, p.z)),
            MaskShape::Curve { curve, tolerance } => {
                if curve.is_closed() {
                    curve.is_inside(p, *tolerance)
                } else {
                    curve.nearest_point(p).position.distance(p) <= *tolerance
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaskRule {
    pub shape: MaskShape,
    pub mode: MaskMode,
    /// Layer index in 0..32.
    pub layer: u32,
}

impl MaskRule {
    pub fn new(shape: MaskShape, mode: MaskMode) -> Self {
        Self {
            shape,
            mode,
            layer: 0,
        }
    }

    pub fn exclude(shape: MaskShape) -> Self {
        Self::new(shape, MaskMode::Exclude)
    }

    pub fn include(shape: MaskShape) -> Self {
        Self::new(shape, MaskMode::Include)
    }

    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Whether a point at `p` survives this rule.
    pub fn keeps(&self, p: Vec3) -> bool {
        let inside = self.shape.contains(p);
        match self.mode {
            MaskMode::Exclude => !inside,
            MaskMode::Include => inside,
        }
    }
}

/// Invalidates every point that fails an active rule. Returns the number of points
/// invalidated by this call.
pub fn apply_masks(points: &mut [PlacementPoint], rules: &[MaskRule], layers: LayerMask) -> usize {
    let active: Vec<&MaskRule> = rules.iter().filter(|r| layers.contains(r.layer)).collect();
    if active.is_empty() {
        return 0;
    }
    points
        .par_iter_mut()
        .map(|point| {
            if !point.valid {
                return 0;
            }
            if active.iter().all(|rule| rule.keeps(point.position)) {
                0
            } else {
                point.invalidate();
                1
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Polyline;

    fn row(n: usize) -> Vec<PlacementPoint> {
        (0..n)
            .map(|i| PlacementPoint::new(Vec3::new(i as f32, 0.0, 0.0), 0))
            .collect()
    }

    #[test]
    fn layer_mask_bits() {
        let mask = LayerMask::layer(2).with_layer(5);
        assert!(mask.contains(2) && mask.contains(5));
        assert!(!mask.contains(0));
        assert_eq!(LayerMask::layer(40), LayerMask::NONE);
    }

    #[test]
    fn exclude_sphere_removes_inside_points() {
        let mut points = row(10);
        let rules = [MaskRule::exclude(MaskShape::Sphere {
            center: Vec3::ZERO,
            radius: 2.5,
        })];
        assert_eq!(apply_masks(&mut points, &rules, LayerMask::ALL), 3);
        assert!(points[..3].iter().all(|p| !p.valid));
        assert!(points[3..].iter().all(|p| p.valid));
    }

    #[test]
    fn include_box_keeps_inside_points() {
        let mut points = row(10);
        let rules = [MaskRule::include(MaskShape::Box(Aabb::new(
            Vec3::new(4.0, -1.0, -1.0),
            Vec3::new(6.0, 1.0, 1.0),
        )))];
        apply_masks(&mut points, &rules, LayerMask::ALL);
        let kept: Vec<f32> = points.iter().filter(|p| p.valid).map(|p| p.position.x).collect();
        assert_eq!(kept, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn inactive_layers_are_ignored() {
        let mut points = row(4);
        let rules = [MaskRule::exclude(MaskShape::Sphere {
            center: Vec3::ZERO,
            radius: 100.0,
        })
        .on_layer(3)];
        assert_eq!(apply_masks(&mut points, &rules, LayerMask::layer(1)), 0);
        assert!(points.iter().all(|p| p.valid));
    }

    #[test]
    fn masking_is_idempotent_and_keeps_transforms() {
        let square = Arc::new(Polyline::rectangle(Vec3::new(3.0, 0.0, 0.0), Vec2::new(3.0, 3.0)));
        let rules = [
            MaskRule::exclude(MaskShape::Curve {
                curve: square,
                tolerance: 0.5,
            }),
            MaskRule::exclude(MaskShape::Polygon(vec![
                Vec2::new(7.5, -1.0),
                Vec2::new(9.5, -1.0),
                Vec2::new(9.5, 1.0),
                Vec2::new(7.5, 1.0),
            ])),
        ];
        let original = row(12);
        let mut once = original.clone();
        apply_masks(&mut once, &rules, LayerMask::ALL);
        let mut twice = once.clone();
        assert_eq!(apply_masks(&mut twice, &rules, LayerMask::ALL), 0);
        assert_eq!(once, twice);
        for (a, b) in original.iter().zip(once.iter()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.rotation, b.rotation);
            assert_eq!(a.scale, b.scale);
        }
        assert!(!once[3].valid && !once[8].valid && !once[9].valid);
        assert!(once[0].valid && once[6].valid);
    }

    #[test]
    fn open_curve_masks_a_band() {
        let line = Arc::new(Polyline::line(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(0.0, 0.0, 10.0),
        ));
        let rule = MaskRule::exclude(MaskShape::Curve {
            curve: line,
            tolerance: 1.0,
        });
        assert!(!rule.keeps(Vec3::new(0.5, 0.0, 3.0)));
        assert!(rule.keeps(Vec3::new(2.0, 0.0, 3.0)));
    }
}
