//! Curve query interface consumed by the distribution and masking stages.
//!
//! The engine never evaluates spline math itself. Everything it needs from a curve goes
//! through [`CurveQuery`]: arc length, bounds, nearest point, containment, and knots.
//! [`Polyline`] is a small reference implementation used by tests, benches and demos.
use std::fmt;

use glam::{Vec2, Vec3};

pub mod polyline;

pub use polyline::Polyline;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box centered on `center` with full extent `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box containing all `points`, or `None` when empty.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Containment on the ground plane only (X and Z).
    pub fn contains_xz(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.z && p.z <= self.max.z
    }

    /// Normalized ground-plane coordinate of `p` inside the box, in [0, 1] when contained.
    pub fn uv_xz(&self, p: Vec3) -> Vec2 {
        let size = self.size();
        let u = if size.x > 0.0 {
            (p.x - self.min.x) / size.x
        } else {
            0.5
        };
        let v = if size.z > 0.0 {
            (p.z - self.min.z) / size.z
        } else {
            0.5
        };
        Vec2::new(u, v)
    }
}

/// Result of projecting a point onto a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Closest point on the curve.
    pub position: Vec3,
    /// Unit tangent at the closest point.
    pub tangent: Vec3,
    /// Arc-length distance of the closest point from the curve start.
    pub distance: f32,
}

/// Position and tangent at an arc-length distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    pub position: Vec3,
    pub tangent: Vec3,
}

/// Queries the engine needs from a curve. Implementations must be thread-safe because mask
/// rules may hold curves that are evaluated from the worker pool.
pub trait CurveQuery: Send + Sync {
    /// Total arc length.
    fn length(&self) -> f32;

    /// World-space bounds of the curve.
    fn bounds(&self) -> Aabb;

    /// Closest point on the curve to `p`.
    fn nearest_point(&self, p: Vec3) -> NearestPoint;

    /// Whether `p` lies inside the area enclosed by the curve on the ground plane.
    ///
    /// `tolerance` is the arc-length search step used to approximate the curve outline;
    /// larger values are faster and coarser.
    fn is_inside(&self, p: Vec3, tolerance: f32) -> bool;

    /// Number of control vertices.
    fn knot_count(&self) -> usize;

    /// Position of knot `index`.
    fn knot(&self, index: usize) -> Vec3;

    /// Position and tangent `distance` units along the curve.
    fn sample_at(&self, distance: f32) -> CurveSample;

    fn is_closed(&self) -> bool;
}

impl fmt::Debug for dyn CurveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveQuery")
            .field("length", &self.length())
            .field("knots", &self.knot_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
