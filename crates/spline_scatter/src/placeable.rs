//! Placeable configuration and the per-pass descriptor table.
//!
//! A [`Placeable`] is the user-facing description of something that can be spawned.
//! At the start of every pass the enabled, non-degenerate placeables are folded into a
//! [`DescriptorTable`], which owns the normalized selection weights and the transform
//! reconciliation data (pivot and forward axis) used at instantiation time.
//!
//! Selection works on the table alone:
//! - [`DescriptorTable::pick`]: maps a uniform draw onto the cumulative weight intervals.
//! - [`pick_weighted_random`]: draws from an RNG and picks in one step.
use glam::{Quat, Vec3};
use rand::Rng;
use tracing::debug;

use crate::curve::Aabb;
use crate::distribution::rand01;
use crate::error::{Error, Result};

/// Placeables whose largest authored dimension is below this are never spawned.
pub const MIN_PLACEABLE_SIZE: f32 = 0.001;

pub type PlaceableId = String;

/// Pivot adjustment applied when positioning an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pivot {
    /// Keep the authored pivot.
    #[default]
    Original,
    /// Move the pivot to the bounds center.
    Center,
    /// Move the pivot to the center of the back (-Z) face.
    Back,
}

/// Axis the placeable was authored to face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForwardAxis {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    #[default]
    PositiveZ,
    NegativeZ,
}

impl ForwardAxis {
    pub fn as_vec3(self) -> Vec3 {
        match self {
            ForwardAxis::PositiveX => Vec3::X,
            ForwardAxis::NegativeX => Vec3::NEG_X,
            ForwardAxis::PositiveY => Vec3::Y,
            ForwardAxis::NegativeY => Vec3::NEG_Y,
            ForwardAxis::PositiveZ => Vec3::Z,
            ForwardAxis::NegativeZ => Vec3::NEG_Z,
        }
    }

    /// Rotation that turns the authored forward axis onto +Z.
    pub fn to_canonical(self) -> Quat {
        match self {
            ForwardAxis::PositiveZ => Quat::IDENTITY,
            ForwardAxis::NegativeZ => Quat::from_rotation_y(std::f32::consts::PI),
            axis => Quat::from_rotation_arc(axis.as_vec3(), Vec3::Z),
        }
    }
}

/// User-facing description of a spawnable item.
#[non_exhaustive]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placeable {
    pub id: PlaceableId,
    /// Relative selection chance in [0, 100].
    pub probability: f32,
    pub base_scale: Vec3,
    pub pivot: Pivot,
    pub forward_axis: ForwardAxis,
    /// Authored local bounds, used for pivot adjustment and the size floor.
    pub bounds: Aabb,
    /// Mask rules carried by the placeable itself. Any value above zero is rejected.
    pub mask_rule_count: usize,
    pub enabled: bool,
}

impl Placeable {
    pub fn new(id: impl Into<PlaceableId>) -> Self {
        Self {
            id: id.into(),
            probability: 100.0,
            base_scale: Vec3::ONE,
            pivot: Pivot::Original,
            forward_axis: ForwardAxis::PositiveZ,
            bounds: Aabb::from_center_size(Vec3::ZERO, Vec3::ONE),
            mask_rule_count: 0,
            enabled: true,
        }
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability.clamp(0.0, 100.0);
        self
    }

    pub fn with_base_scale(mut self, base_scale: Vec3) -> Self {
        self.base_scale = base_scale;
        self
    }

    pub fn with_pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_forward_axis(mut self, forward_axis: ForwardAxis) -> Self {
        self.forward_axis = forward_axis;
        self
    }

    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_mask_rules(mut self, count: usize) -> Self {
        self.mask_rule_count = count;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn pivot_offset(&self) -> Vec3 {
        let c = self.bounds.center();
        match self.pivot {
            Pivot::Original => Vec3::ZERO,
            Pivot::Center => -c,
            Pivot::Back => -Vec3::new(c.x, c.y, self.bounds.min.z),
        }
    }
}

/// Plain-data view of a [`Placeable`] resolved for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceableDescriptor {
    /// Index of the source [`Placeable`] in the spawner configuration.
    pub source_index: usize,
    pub id: PlaceableId,
    pub probability: f32,
    pub scale: Vec3,
    /// Local offset applied before rotation and scale.
    pub pivot_offset: Vec3,
    /// Rotation reconciling the authored forward axis with +Z.
    pub forward_rotation: Quat,
}

/// Normalized, weighted table of the placeables eligible for the current pass.
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    descriptors: Vec<PlaceableDescriptor>,
    probability_sum: f32,
}

impl DescriptorTable {
    /// Builds the table from the live configuration.
    ///
    /// Disabled or undersized placeables are skipped. A placeable carrying mask rules is a
    /// fatal configuration error and aborts the build.
    pub fn build(placeables: &[Placeable]) -> Result<Self> {
        let mut descriptors = Vec::with_capacity(placeables.len());
        for (index, placeable) in placeables.iter().enumerate() {
            if placeable.mask_rule_count > 0 {
                return Err(Error::PlaceableContainsMasks {
                    name: placeable.id.clone(),
                    count: placeable.mask_rule_count,
                });
            }
            if !placeable.enabled {
                continue;
            }
            if placeable.bounds.size().max_element() < MIN_PLACEABLE_SIZE {
                debug!(
                    "Placeable '{}' is below the size floor; skipping.",
                    placeable.id
                );
                continue;
            }
            descriptors.push(PlaceableDescriptor {
                source_index: index,
                id: placeable.id.clone(),
                probability: placeable.probability.max(0.0),
                scale: placeable.base_scale,
                pivot_offset: placeable.pivot_offset(),
                forward_rotation: placeable.forward_axis.to_canonical(),
            });
        }
        let probability_sum = descriptors.iter().map(|d| d.probability).sum();
        Ok(Self {
            descriptors,
            probability_sum,
        })
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaceableDescriptor> {
        self.descriptors.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlaceableDescriptor> {
        self.descriptors.iter()
    }

    pub fn probability_sum(&self) -> f32 {
        self.probability_sum
    }

    /// Maps a uniform draw `r` in [0, 1) to the descriptor whose cumulative weight interval
    /// contains it. Returns `None` when no descriptor has a positive weight.
    pub fn pick(&self, r: f32) -> Option<usize> {
        if self.probability_sum <= 0.0 {
            return None;
        }
        let mut roll = r.clamp(0.0, 1.0) * self.probability_sum;
        let mut last_positive = None;
        for (index, d) in self.descriptors.iter().enumerate() {
            if d.probability <= 0.0 {
                continue;
            }
            roll -= d.probability;
            if roll < 0.0 {
                return Some(index);
            }
            last_positive = Some(index);
        }
        last_positive
    }
}

/// Draws a uniform value from `rng` and picks a descriptor with it.
///
/// Returns the picked index together with the draw so callers can record it.
pub fn pick_weighted_random<R: Rng + ?Sized>(
    table: &DescriptorTable,
    rng: &mut R,
) -> (Option<usize>, f32) {
    let r = rand01(rng);
    (table.pick(r), r)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    struct FixedRng {
        value: u32,
    }

    impl rand::TryRng for FixedRng {
        type Error = core::convert::Infallible;

        fn try_next_u32(&mut self) -> std::result::Result<u32, Self::Error> {
            Ok(self.value)
        }

        fn try_next_u64(&mut self) -> std::result::Result<u64, Self::Error> {
            Ok(self.value as u64)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), Self::Error> {
            let bytes = self.value.to_le_bytes();
            for (i, b) in dest.iter_mut().enumerate() {
                *b = bytes[i % 4];
            }
            Ok(())
        }
    }

    fn table(weights: &[f32]) -> DescriptorTable {
        let placeables: Vec<_> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| Placeable::new(format!("p{i}")).with_probability(*w))
            .collect();
        DescriptorTable::build(&placeables).unwrap()
    }

    #[test]
    fn weighted_random_selects_by_probability() {
        let t = table(&[70.0, 30.0]);

        let mut rng_first = FixedRng { value: 0 };
        assert_eq!(pick_weighted_random(&t, &mut rng_first).0, Some(0));

        let mut rng_second = FixedRng {
            value: (0.8 * u32::MAX as f32) as u32,
        };
        assert_eq!(pick_weighted_random(&t, &mut rng_second).0, Some(1));
    }

    #[test]
    fn zero_weight_sum_selects_nothing() {
        let t = table(&[0.0, 0.0]);
        assert_eq!(t.pick(0.5), None);
    }

    #[test]
    fn zero_weight_entries_are_never_picked() {
        let t = table(&[0.0, 50.0]);
        assert_eq!(t.pick(0.0), Some(1));
        assert_eq!(t.pick(0.999), Some(1));
    }

    #[test]
    fn selection_ratio_converges_to_weights() {
        let t = table(&[70.0, 30.0]);
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let first = (0..n)
            .filter(|_| pick_weighted_random(&t, &mut rng).0 == Some(0))
            .count();
        let ratio = first as f32 / n as f32;
        assert!((ratio - 0.7).abs() < 0.02, "ratio {ratio}");
    }

    #[test]
    fn build_rejects_placeables_with_masks() {
        let placeables = vec![Placeable::new("ok"), Placeable::new("bad").with_mask_rules(1)];
        let err = DescriptorTable::build(&placeables).unwrap_err();
        assert!(matches!(err, Error::PlaceableContainsMasks { ref name, count: 1 } if name == "bad"));
    }

    #[test]
    fn build_skips_disabled_and_tiny_placeables() {
        let placeables = vec![
            Placeable::new("tiny").with_bounds(Aabb::from_center_size(Vec3::ZERO, Vec3::ZERO)),
            Placeable::new("off").with_enabled(false),
            Placeable::new("tree"),
        ];
        let t = DescriptorTable::build(&placeables).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0).unwrap().source_index, 2);
        assert_eq!(t.probability_sum(), 100.0);
    }

    #[test]
    fn forward_axis_reconciles_to_z() {
        for axis in [
            ForwardAxis::PositiveX,
            ForwardAxis::NegativeX,
            ForwardAxis::PositiveY,
            ForwardAxis::NegativeY,
            ForwardAxis::PositiveZ,
            ForwardAxis::NegativeZ,
        ] {
            let q = axis.to_canonical();
            assert!((q * axis.as_vec3() - Vec3::Z).length() < 1e-5, "{axis:?}");
        }
    }

    #[test]
    fn back_pivot_moves_back_face_to_origin() {
        let p = Placeable::new("crate")
            .with_bounds(Aabb::new(Vec3::new(-1.0, 0.0, -2.0), Vec3::new(1.0, 2.0, 2.0)))
            .with_pivot(Pivot::Back);
        assert_eq!(p.pivot_offset(), Vec3::new(0.0, -1.0, 2.0));
    }
}
