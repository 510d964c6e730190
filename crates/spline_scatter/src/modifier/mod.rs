//! Ordered modifier stages that rewrite points in place.
//!
//! Each stage is a [`Modifier`] trait object. A stage sees the whole point slice and runs
//! as a data-parallel map over it; stages are separated by hard barriers so a stage always
//! observes the complete output of the previous one.
use std::fmt;

use glam::Vec3;
use rayon::ThreadPool;
use tracing::debug;

use crate::point::PlacementPoint;

pub mod look_at;
pub mod offset;
pub mod rotate;
pub mod scale;

pub use look_at::{LookAt, LookAtTarget, LOOK_AT_EPSILON};
pub use offset::{Offset, RandomMode, Space};
pub use rotate::Rotate;
pub use scale::Scale;

/// Pass-wide inputs available to every stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModifierEnv {
    /// Current viewer (camera) position, if the host supplied one.
    pub viewer: Option<Vec3>,
    /// Segment being processed.
    pub segment: usize,
}

/// A single modifier stage.
///
/// Implementations must skip points whose `valid` flag is cleared and must only touch the
/// point at the index they are processing.
pub trait Modifier: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Runs the stage over `points`. Called from inside the worker pool.
    fn run(&self, points: &mut [PlacementPoint], env: &ModifierEnv);
}

#[derive(Debug)]
struct StackEntry {
    enabled: bool,
    modifier: Box<dyn Modifier>,
}

/// Ordered list of modifier stages.
#[derive(Debug, Default)]
pub struct ModifierStack {
    entries: Vec<StackEntry>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage and returns its index.
    pub fn push(&mut self, modifier: Box<dyn Modifier>) -> usize {
        self.entries.push(StackEntry {
            enabled: true,
            modifier,
        });
        self.entries.len() - 1
    }

    /// Removes the stage at `index`, shifting later stages down.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Modifier>> {
        if index < self.entries.len() {
            Some(self.entries.remove(index).modifier)
        } else {
            None
        }
    }

    /// Returns `false` when `index` is out of range.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.enabled)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabled stages in execution order.
    pub fn enabled(&self) -> impl Iterator<Item = &dyn Modifier> + '_ {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.modifier.as_ref())
    }

    /// Runs every enabled stage on `pool`, one after the other.
    ///
    /// `proceed` is checked before each stage; when it returns `false` the remaining stages
    /// are skipped and `false` is returned.
    pub fn run_all(
        &self,
        pool: &ThreadPool,
        points: &mut [PlacementPoint],
        env: &ModifierEnv,
        mut proceed: impl FnMut() -> bool,
    ) -> bool {
        for modifier in self.enabled() {
            if !proceed() {
                return false;
            }
            debug!(
                "Segment {}: running modifier '{}' on {} points.",
                env.segment,
                modifier.name(),
                points.len()
            );
            pool.install(|| modifier.run(points, env));
        }
        true
    }
}
