//! Distribution strategies that turn a curve into candidate placement points.
//!
//! Each mode implements [`Distribute`]. [`distribute`] runs the selected mode with a single
//! seeded generator, attaches a placeable to every accepted candidate, and freezes the
//! result into a [`PointBuffer`]. Distribution never fails: degenerate geometry produces an
//! empty buffer.
use glam::{Affine3A, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::curve::CurveQuery;
use crate::placeable::{pick_weighted_random, DescriptorTable};
use crate::point::{look_rotation, PlacementPoint, PointBuffer, PointContext};

pub mod grid;
pub mod inside_area;
pub mod on_curve;
pub mod on_knots;
pub mod radial;

pub use grid::GridDistribution;
pub use inside_area::InsideAreaDistribution;
pub use on_curve::OnCurveDistribution;
pub use on_knots::OnKnotsDistribution;
pub use radial::{Accuracy, RadialDistribution};

/// Curves shorter than this produce no points.
pub const MIN_CURVE_LENGTH: f32 = 1.0;

/// Smallest spacing the spacing-driven modes accept. Anything finer yields no points.
pub const MIN_SPACING: f32 = 0.01;

/// Upper bound on candidate positions a single distribution may visit.
pub const MAX_CANDIDATES: usize = 1 << 22;

/// Trait implemented by every distribution mode.
pub trait Distribute: Send + Sync {
    /// Minimum number of knots the source curve needs for this mode.
    fn min_knots(&self) -> usize {
        0
    }

    /// Generates points in curve space. Implementations draw all randomness from `rng`.
    fn generate(
        &self,
        curve: &dyn CurveQuery,
        descriptors: &DescriptorTable,
        rng: &mut dyn Rng,
    ) -> Vec<PlacementPoint>;
}

/// The selected distribution algorithm together with its parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistributionMode {
    OnCurve(OnCurveDistribution),
    InsideArea(InsideAreaDistribution),
    Radial(RadialDistribution),
    Grid(GridDistribution),
    OnKnots(OnKnotsDistribution),
}

impl DistributionMode {
    pub fn name(&self) -> &'static str {
        match self {
            DistributionMode::OnCurve(_) => "on_curve",
            DistributionMode::InsideArea(_) => "inside_area",
            DistributionMode::Radial(_) => "radial",
            DistributionMode::Grid(_) => "grid",
            DistributionMode::OnKnots(_) => "on_knots",
        }
    }

    pub fn strategy(&self) -> &dyn Distribute {
        match self {
            DistributionMode::OnCurve(s) => s,
            DistributionMode::InsideArea(s) => s,
            DistributionMode::Radial(s) => s,
            DistributionMode::Grid(s) => s,
            DistributionMode::OnKnots(s) => s,
        }
    }

    pub fn min_knots(&self) -> usize {
        self.strategy().min_knots()
    }
}

impl Default for DistributionMode {
    fn default() -> Self {
        DistributionMode::OnCurve(OnCurveDistribution::default())
    }
}

/// Distribution configuration for a spawner.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistributionSettings {
    pub mode: DistributionMode,
    /// Base seed. Each segment derives its own seed from it.
    pub seed: u64,
}

impl DistributionSettings {
    pub fn new(mode: DistributionMode) -> Self {
        Self { mode, seed: 0 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Runs the configured distribution mode for one curve.
///
/// The curve is sampled in its own space; `transform` maps the resulting points to world
/// space. The same inputs always produce the same buffer.
pub fn distribute(
    curve: &dyn CurveQuery,
    transform: Affine3A,
    settings: &DistributionSettings,
    descriptors: &DescriptorTable,
    seed: u64,
) -> PointBuffer {
    let mode = &settings.mode;
    let knots = curve.knot_count();
    if knots < mode.min_knots() {
        warn!(
            "Distribution '{}' needs at least {} knots (curve has {}); nothing generated.",
            mode.name(),
            mode.min_knots(),
            knots
        );
        return PointBuffer::new();
    }
    if descriptors.is_empty() {
        debug!("No descriptors; nothing generated.");
        return PointBuffer::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = mode.strategy().generate(curve, descriptors, &mut rng);

    if transform != Affine3A::IDENTITY {
        let (_, rotation, _) = transform.to_scale_rotation_translation();
        for p in &mut points {
            p.position = transform.transform_point3(p.position);
            p.rotation = (rotation * p.rotation).normalize();
            let ctx = &mut p.context;
            ctx.curve_position = transform.transform_point3(ctx.curve_position);
            ctx.forward = rotation * ctx.forward;
            ctx.up = rotation * ctx.up;
            ctx.right = rotation * ctx.right;
        }
    }

    debug!(
        "Distribution '{}' produced {} points.",
        mode.name(),
        points.len()
    );
    PointBuffer::from_points(points)
}

/// Derives a per-segment seed from a base seed.
pub fn seed_for_segment(base_seed: u64, segment: usize) -> u64 {
    let s = segment as u64;
    mix_u64(base_seed ^ s.wrapping_mul(0x9E3779B97F4A7C15))
}

#[inline]
fn mix_u64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

/// Generate a random float in the range [0, 1).
#[inline]
pub(crate) fn rand01<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let v = (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0);
    v.min(1.0 - f32::EPSILON)
}

/// Whole `spacing` steps that fit in `extent`, or `None` when the spacing is unusable or the
/// walk would exceed [`MAX_CANDIDATES`].
pub(crate) fn step_count(extent: f32, spacing: f32) -> Option<usize> {
    if !(spacing.is_finite() && spacing >= MIN_SPACING) || !extent.is_finite() {
        return None;
    }
    let steps = (extent.max(0.0) / spacing).floor();
    if steps >= MAX_CANDIDATES as f32 {
        warn!(
            "Spacing {} over {} exceeds {} candidates; nothing generated.",
            spacing, extent, MAX_CANDIDATES
        );
        return None;
    }
    Some(steps as usize)
}

/// True when `count` candidates fit the per-pass budget. Logs otherwise.
pub(crate) fn within_budget(count: usize, mode: &str) -> bool {
    if count > MAX_CANDIDATES {
        warn!(
            "Distribution '{}' would visit {} candidates (limit {}); nothing generated.",
            mode, count, MAX_CANDIDATES
        );
        return false;
    }
    true
}

/// Accepted candidate before a placeable is attached.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub position: Vec3,
    pub curve_position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub noise_coord: Vec2,
}

/// Draws a placeable for `candidate` and builds the point. Returns `None` when no placeable
/// can be selected, in which case the candidate is dropped.
pub(crate) fn emit(
    candidate: Candidate,
    descriptors: &DescriptorTable,
    rng: &mut dyn Rng,
) -> Option<PlacementPoint> {
    let (index, r) = pick_weighted_random(descriptors, rng);
    let index = index?;
    let descriptor = descriptors.get(index)?;

    let rotation = look_rotation(candidate.forward, candidate.up);
    let context = PointContext {
        curve_position: candidate.curve_position,
        forward: rotation * Vec3::Z,
        up: rotation * Vec3::Y,
        right: rotation * Vec3::X,
        noise_coord: candidate.noise_coord,
        random01: r,
    };
    Some(
        PlacementPoint::new(candidate.position, index)
            .with_rotation(rotation)
            .with_scale(descriptor.scale)
            .with_context(context),
    )
}
