//! Rotates points toward a target.
use glam::{BVec3, EulerRot, Quat, Vec3};
use rayon::prelude::*;
use tracing::warn;

use crate::modifier::{Modifier, ModifierEnv};
use crate::point::{look_rotation, PlacementPoint};

/// Directions shorter than this leave the point unchanged.
pub const LOOK_AT_EPSILON: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LookAtTarget {
    /// Nearest point on the source curve.
    #[default]
    Curve,
    Point(Vec3),
    /// The viewer position from [`ModifierEnv::viewer`].
    Viewer,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LookAt {
    pub target: LookAtTarget,
    /// Face away from the target instead.
    pub reverse: bool,
    /// Axes (pitch, yaw, roll as x, y, z) that keep their previous angle.
    pub lock: BVec3,
}

impl LookAt {
    pub fn new(target: LookAtTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_lock(mut self, lock: BVec3) -> Self {
        self.lock = lock;
        self
    }
}

/// Takes the locked Euler components from `current` and the rest from `target`.
fn lock_angles(current: Quat, target: Quat, lock: BVec3) -> Quat {
    if !lock.any() {
        return target;
    }
    let (cy, cx, cz) = current.to_euler(EulerRot::YXZ);
    let (ty, tx, tz) = target.to_euler(EulerRot::YXZ);
    let x = if lock.x { cx } else { tx };
    let y = if lock.y { cy } else { ty };
    let z = if lock.z { cz } else { tz };
    Quat::from_euler(EulerRot::YXZ, y, x, z)
}

impl Modifier for LookAt {
    fn name(&self) -> &'static str {
        "look_at"
    }

    fn run(&self, points: &mut [PlacementPoint], env: &ModifierEnv) {
        let fixed = match self.target {
            LookAtTarget::Curve => None,
            LookAtTarget::Point(p) => Some(p),
            LookAtTarget::Viewer => match env.viewer {
                Some(v) => Some(v),
                None => {
                    warn!(
                        "Look-at on segment {} targets the viewer but no viewer position is set; skipping.",
                        env.segment
                    );
                    return;
                }
            },
        };
        let reverse = self.reverse;
        let lock = self.lock;

        points.par_iter_mut().filter(|p| p.valid).for_each(|p| {
            let target = fixed.unwrap_or(p.context.curve_position);
            let mut direction = target - p.position;
            if direction.length() < LOOK_AT_EPSILON {
                return;
            }
            if reverse {
                direction = -direction;
            }
            let rotation = look_rotation(direction, Vec3::Y);
            p.rotation = lock_angles(p.rotation, rotation, lock).normalize();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::PointContext;

    fn point_at(position: Vec3, curve_position: Vec3) -> PlacementPoint {
        PlacementPoint::new(position, 0).with_context(PointContext {
            curve_position,
            ..Default::default()
        })
    }

    #[test]
    fn faces_the_curve() {
        let mut pts = vec![point_at(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO)];
        LookAt::new(LookAtTarget::Curve).run(&mut pts, &ModifierEnv::default());
        assert!((pts[0].rotation * Vec3::Z - Vec3::Z).length() < 1e-5);

        let mut pts = vec![point_at(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO)];
        LookAt::new(LookAtTarget::Curve)
            .reversed()
            .run(&mut pts, &ModifierEnv::default());
        assert!((pts[0].rotation * Vec3::Z - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn short_direction_leaves_point_unchanged() {
        let original = Quat::from_rotation_y(1.0);
        let mut pts = vec![point_at(Vec3::ZERO, Vec3::new(0.01, 0.0, 0.0)).with_rotation(original)];
        LookAt::new(LookAtTarget::Curve).run(&mut pts, &ModifierEnv::default());
        assert_eq!(pts[0].rotation, original);
    }

    #[test]
    fn missing_viewer_skips_stage() {
        let mut pts = vec![point_at(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0))];
        let before = pts.clone();
        LookAt::new(LookAtTarget::Viewer).run(&mut pts, &ModifierEnv::default());
        assert_eq!(pts, before);

        let env = ModifierEnv {
            viewer: Some(Vec3::new(-10.0, 0.0, 0.0)),
            segment: 0,
        };
        LookAt::new(LookAtTarget::Viewer).run(&mut pts, &env);
        assert!((pts[0].rotation * Vec3::Z - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn locked_axis_keeps_previous_angle() {
        let yaw = Quat::from_rotation_y(0.5);
        let mut pts = vec![point_at(Vec3::ZERO, Vec3::new(0.0, 5.0, 5.0)).with_rotation(yaw)];
        LookAt::new(LookAtTarget::Curve)
            .with_lock(BVec3::new(false, true, false))
            .run(&mut pts, &ModifierEnv::default());
        let (y, x, _) = pts[0].rotation.to_euler(EulerRot::YXZ);
        assert!((y - 0.5).abs() < 1e-4);
        assert!(x < -0.5, "pitch {x}");
    }
}
