//! Piecewise-linear reference curve.
use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

use crate::curve::{Aabb, CurveQuery, CurveSample, NearestPoint};

/// Upper bound on outline vertices generated by [`Polyline::is_inside`].
const MAX_OUTLINE_SAMPLES: usize = 1 << 14;

/// Points closer than this to the sampled outline count as inside.
const OUTLINE_EPSILON: f32 = 1e-4;

/// Polyline through a list of knots, optionally closed.
#[derive(Debug, Clone)]
pub struct Polyline {
    knots: Vec<Vec3>,
    closed: bool,
    /// Cumulative arc length at the start of each segment, plus the total at the end.
    cumulative: Vec<f32>,
}

impl Polyline {
    pub fn new(knots: Vec<Vec3>, closed: bool) -> Self {
        let mut cumulative = Vec::with_capacity(knots.len() + 1);
        let mut acc = 0.0;
        cumulative.push(acc);
        let segment_count = segment_count(knots.len(), closed);
        for i in 0..segment_count {
            let a = knots[i];
            let b = knots[(i + 1) % knots.len()];
            acc += a.distance(b);
            cumulative.push(acc);
        }
        Self {
            knots,
            closed,
            cumulative,
        }
    }

    pub fn open(knots: Vec<Vec3>) -> Self {
        Self::new(knots, false)
    }

    pub fn closed(knots: Vec<Vec3>) -> Self {
        Self::new(knots, true)
    }

    /// Closed regular polygon on the ground plane approximating a circle.
    pub fn circle(center: Vec3, radius: f32, segments: usize) -> Self {
        let segments = segments.max(3);
        let knots = (0..segments)
            .map(|i| {
                let a = i as f32 / segments as f32 * TAU;
                center + Vec3::new(a.sin(), 0.0, a.cos()) * radius
            })
            .collect();
        Self::closed(knots)
    }

    /// Closed axis-aligned rectangle on the ground plane.
    pub fn rectangle(center: Vec3, size: Vec2) -> Self {
        let h = size.abs() * 0.5;
        Self::closed(vec![
            center + Vec3::new(-h.x, 0.0, -h.y),
            center + Vec3::new(h.x, 0.0, -h.y),
            center + Vec3::new(h.x, 0.0, h.y),
            center + Vec3::new(-h.x, 0.0, h.y),
        ])
    }

    /// Straight open line from `start` to `end`.
    pub fn line(start: Vec3, end: Vec3) -> Self {
        Self::open(vec![start, end])
    }

    pub fn knots(&self) -> &[Vec3] {
        &self.knots
    }

    fn segment(&self, index: usize) -> (Vec3, Vec3) {
        let a = self.knots[index];
        let b = self.knots[(index + 1) % self.knots.len()];
        (a, b)
    }

    fn segment_total(&self) -> usize {
        self.cumulative.len() - 1
    }

    /// Ground-plane outline sampled every `step` units of arc length.
    ///
    /// The sample count is rounded up to a power of two so that a finer step always yields a
    /// superset of the vertices produced by a coarser one.
    fn outline(&self, step: f32) -> Vec<Vec2> {
        let length = self.length();
        if !(step.is_finite() && step > 0.0) || length <= 0.0 {
            return self.knots.iter().map(|k| Vec2::new(k.x, k.z)).collect();
        }
        let count = ((length / step).ceil() as usize)
            .max(4)
            .next_power_of_two()
            .min(MAX_OUTLINE_SAMPLES);
        (0..count)
            .map(|i| {
                let p = self.sample_at(length * (i as f32 / count as f32)).position;
                Vec2::new(p.x, p.z)
            })
            .collect()
    }
}

fn segment_count(knots: usize, closed: bool) -> usize {
    match knots {
        0 | 1 => 0,
        2 => 1,
        n if closed => n,
        n => n - 1,
    }
}

/// Even-odd point-in-polygon test.
pub(crate) fn polygon_contains(polygon: &[Vec2], p: Vec2) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// True when `p` lies within `epsilon` of any edge of the closed `polygon`.
pub(crate) fn near_polygon_edge(polygon: &[Vec2], p: Vec2, epsilon: f32) -> bool {
    let eps2 = epsilon * epsilon;
    let mut j = polygon.len().saturating_sub(1);
    for i in 0..polygon.len() {
        let a = polygon[j];
        let ab = polygon[i] - a;
        let len2 = ab.length_squared();
        let t = if len2 > 0.0 {
            ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if (a + ab * t).distance_squared(p) <= eps2 {
            return true;
        }
        j = i;
    }
    false
}

impl CurveQuery for Polyline {
    fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_points(self.knots.iter().copied())
            .unwrap_or_else(|| Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    fn nearest_point(&self, p: Vec3) -> NearestPoint {
        if self.segment_total() == 0 {
            let position = self.knots.first().copied().unwrap_or(Vec3::ZERO);
            return NearestPoint {
                position,
                tangent: Vec3::Z,
                distance: 0.0,
            };
        }

        let mut best = NearestPoint {
            position: Vec3::ZERO,
            tangent: Vec3::Z,
            distance: 0.0,
        };
        let mut best_d2 = f32::INFINITY;
        for i in 0..self.segment_total() {
            let (a, b) = self.segment(i);
            let ab = b - a;
            let len2 = ab.length_squared();
            let t = if len2 > 0.0 {
                ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let q = a + ab * t;
            let d2 = q.distance_squared(p);
            if d2 < best_d2 {
                best_d2 = d2;
                best = NearestPoint {
                    position: q,
                    tangent: ab.try_normalize().unwrap_or(Vec3::Z),
                    distance: self.cumulative[i] + len2.sqrt() * t,
                };
            }
        }
        best
    }

    fn is_inside(&self, p: Vec3, tolerance: f32) -> bool {
        if self.knots.len() < 3 {
            return false;
        }
        // The edge band keeps a finer outline from rejecting points a coarser one accepted
        // where both run along the same straight stretch.
        let outline = self.outline(tolerance);
        let q = Vec2::new(p.x, p.z);
        polygon_contains(&outline, q) || near_polygon_edge(&outline, q, OUTLINE_EPSILON)
    }

    fn knot_count(&self) -> usize {
        self.knots.len()
    }

    fn knot(&self, index: usize) -> Vec3 {
        self.knots[index]
    }

    fn sample_at(&self, distance: f32) -> CurveSample {
        let length = self.length();
        if self.segment_total() == 0 || length <= 0.0 {
            return CurveSample {
                position: self.knots.first().copied().unwrap_or(Vec3::ZERO),
                tangent: Vec3::Z,
            };
        }
        let d = if self.closed && distance >= length {
            distance.rem_euclid(length)
        } else {
            distance.clamp(0.0, length)
        };
        // First segment whose end lies at or beyond `d`.
        let index = self.cumulative[1..]
            .partition_point(|&end| end < d)
            .min(self.segment_total() - 1);
        let (a, b) = self.segment(index);
        let seg_len = self.cumulative[index + 1] - self.cumulative[index];
        let t = if seg_len > 0.0 {
            ((d - self.cumulative[index]) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        CurveSample {
            position: a.lerp(b, t),
            tangent: (b - a).try_normalize().unwrap_or(Vec3::Z),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
