#![forbid(unsafe_code)]
//! spline_scatter: Curve-driven object spawning with distribution modes, masking, parallel
//! modifiers and instance pooling.
//!
//! Modules:
//! - curve: the `CurveQuery` interface and a polyline implementation
//! - distribution: on-curve, inside-area, radial, grid and per-knot point generation
//! - mask: shape rules that invalidate points
//! - modifier: offset, look-at, rotate and scale stages run on a worker pool
//! - instance: host interface and per-placeable instance pools
//! - spawner: per-segment respawn passes, events and timings
//!
//! For examples, see the README and the `spline_scatter_examples` crate.
pub mod curve;
pub mod distribution;
pub mod error;
pub mod events;
pub mod instance;
pub mod mask;
pub mod modifier;
pub mod noise;
pub mod placeable;
pub mod point;
pub mod spawner;

/// Convenient re-exports for common types. Import with `use spline_scatter::prelude::*;`.
pub mod prelude {
    pub use crate::curve::{Aabb, CurveQuery, CurveSample, NearestPoint, Polyline};
    pub use crate::distribution::{
        distribute, seed_for_segment, Accuracy, Distribute, DistributionMode,
        DistributionSettings, GridDistribution, InsideAreaDistribution, OnCurveDistribution,
        OnKnotsDistribution, RadialDistribution,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        EventSink, FnSink, InspectStage, MultiSink, SpawnEvent, SpawnEventKind, VecSink,
    };
    pub use crate::instance::{InstanceHost, InstanceManager, InstanceRef, InstanceTransform, RootId};
    pub use crate::mask::{apply_masks, LayerMask, MaskMode, MaskRule, MaskShape};
    pub use crate::modifier::{
        LookAt, LookAtTarget, Modifier, ModifierEnv, ModifierStack, Offset, RandomMode, Rotate,
        Scale, Space,
    };
    pub use crate::noise::PerlinNoise;
    pub use crate::placeable::{
        pick_weighted_random, DescriptorTable, ForwardAxis, Pivot, Placeable, PlaceableDescriptor,
        PlaceableId,
    };
    pub use crate::point::{look_rotation, PlacementPoint, PointBuffer, PointContext};
    pub use crate::spawner::{
        AbortReason, PassOutcome, PassReport, PassState, PassTimings, Spawner, SpawnerConfig,
    };
}
