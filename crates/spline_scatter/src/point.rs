//! Placement points and the fixed-length buffer that carries them through a pass.
//!
//! Distribution is the only stage that decides how many points exist. Every later stage
//! receives a mutable slice, so it can rewrite fields or clear [`PlacementPoint::valid`]
//! but can never insert or remove entries. Stable indices are what make the later stages
//! safe to run as plain parallel maps.
use glam::{Mat3, Quat, Vec2, Vec3};

/// Read-only metadata captured by the distribution stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointContext {
    /// Nearest point on the source curve.
    pub curve_position: Vec3,
    /// Curve tangent, the local forward axis.
    pub forward: Vec3,
    /// Local up axis (curve normal).
    pub up: Vec3,
    /// Local right axis (curve binormal).
    pub right: Vec3,
    /// Pattern-relative coordinate used for deterministic noise lookups.
    pub noise_coord: Vec2,
    /// Uniform draw in [0, 1) that selected the placeable.
    pub random01: f32,
}

impl Default for PointContext {
    fn default() -> Self {
        Self {
            curve_position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
            right: Vec3::X,
            noise_coord: Vec2::ZERO,
            random01: 0.0,
        }
    }
}

/// A candidate placement produced by distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPoint {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Index into the pass descriptor table.
    pub placeable_index: usize,
    /// Cleared by masks or modifiers; invalid points are skipped but never removed.
    pub valid: bool,
    pub context: PointContext,
}

impl PlacementPoint {
    pub fn new(position: Vec3, placeable_index: usize) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            placeable_index,
            valid: true,
            context: PointContext::default(),
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_context(mut self, context: PointContext) -> Self {
        self.context = context;
        self
    }

    /// Clears the valid flag. Invalid points stay invalid.
    #[inline]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// Fixed-length arena of points owned by a single pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBuffer {
    points: Vec<PlacementPoint>,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Freezes the output of a distribution run.
    pub fn from_points(points: Vec<PlacementPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_slice(&self) -> &[PlacementPoint] {
        &self.points
    }

    /// Mutable view for later stages. The slice cannot change the buffer length.
    pub fn as_mut_slice(&mut self) -> &mut [PlacementPoint] {
        &mut self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlacementPoint> {
        self.points.iter()
    }

    pub fn valid(&self) -> impl Iterator<Item = &PlacementPoint> + '_ {
        self.points.iter().filter(|p| p.valid)
    }

    pub fn valid_count(&self) -> usize {
        self.points.iter().filter(|p| p.valid).count()
    }

    pub fn into_inner(self) -> Vec<PlacementPoint> {
        self.points
    }
}

impl<'a> IntoIterator for &'a PointBuffer {
    type Item = &'a PlacementPoint;
    type IntoIter = std::slice::Iter<'a, PlacementPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Rotation whose local +Z faces `forward` and whose local +Y leans toward `up`.
///
/// Falls back to an orthogonal up vector when `forward` is parallel to `up`, and to the
/// identity when `forward` has no usable length.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let Some(f) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let right = match up.cross(f).try_normalize() {
        Some(r) => r,
        None => f.any_orthonormal_vector(),
    };
    let u = f.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, u, f)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_rotation_maps_local_z_to_forward() {
        let forward = Vec3::new(1.0, 0.0, 1.0).normalize();
        let q = look_rotation(forward, Vec3::Y);
        assert!((q * Vec3::Z - forward).length() < 1e-5);
        assert!((q * Vec3::Y - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn look_rotation_handles_vertical_forward() {
        let q = look_rotation(Vec3::Y, Vec3::Y);
        assert!((q * Vec3::Z - Vec3::Y).length() < 1e-5);
        assert!(q.is_normalized());
    }

    #[test]
    fn look_rotation_zero_forward_is_identity() {
        assert_eq!(look_rotation(Vec3::ZERO, Vec3::Y), Quat::IDENTITY);
    }

    #[test]
    fn buffer_counts_valid_points() {
        let mut buffer = PointBuffer::from_points(vec![
            PlacementPoint::new(Vec3::ZERO, 0),
            PlacementPoint::new(Vec3::X, 0),
        ]);
        buffer.as_mut_slice()[1].invalidate();
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.valid_count(), 1);
        assert_eq!(buffer.valid().next().map(|p| p.position), Some(Vec3::ZERO));
    }

    #[test]
    fn nan_position_is_not_finite() {
        let p = PlacementPoint::new(Vec3::new(f32::NAN, 0.0, 0.0), 0);
        assert!(!p.is_finite());
        assert!(PlacementPoint::new(Vec3::ONE, 0).is_finite());
    }
}
