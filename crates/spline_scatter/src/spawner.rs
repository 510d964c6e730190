//! Orchestrates respawn passes over curve segments.
//!
//! A pass walks one segment through `Setup → Distributing → Masking → Modifying →
//! Instantiating` and back to `Idle`. Each stage finishes before the next begins. Stages
//! after distribution run on the spawner's worker pool. Configuration can change between
//! passes; a pass snapshots what it needs during setup.
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Affine3A, Vec3};
use parking_lot::{Mutex, RwLock};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use crate::curve::CurveQuery;
use crate::distribution::inside_area::MIN_AREA_SPACING;
use crate::distribution::{
    distribute, seed_for_segment, DistributionMode, DistributionSettings, MIN_CURVE_LENGTH,
    MIN_SPACING,
};
use crate::error::{Error, Result};
use crate::events::{EventSink, InspectStage, SpawnEvent, SpawnEventKind};
use crate::instance::{InstanceHost, InstanceManager, RootId};
use crate::mask::{apply_masks, LayerMask, MaskRule};
use crate::modifier::{Modifier, ModifierEnv, ModifierStack};
use crate::placeable::{DescriptorTable, Placeable};

/// Configuration for a [`Spawner`].
#[non_exhaustive]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnerConfig {
    pub distribution: DistributionSettings,
    /// Mask layers this spawner listens to.
    pub mask_layers: LayerMask,
    /// When false a pass stops after the modifier stages and creates no instances.
    pub spawn_instances: bool,
    /// Spawned instances are placed hidden.
    pub hide_instances: bool,
    /// Parent passed to the host for every spawned instance.
    pub root: Option<RootId>,
    /// Worker threads for the parallel stages. Zero picks the rayon default.
    pub worker_threads: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            distribution: DistributionSettings::default(),
            mask_layers: LayerMask::ALL,
            spawn_instances: true,
            hide_instances: false,
            root: None,
            worker_threads: 0,
        }
    }
}

impl SpawnerConfig {
    pub fn new(mode: DistributionMode) -> Self {
        Self {
            distribution: DistributionSettings::new(mode),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.distribution.seed = seed;
        self
    }

    pub fn with_mask_layers(mut self, mask_layers: LayerMask) -> Self {
        self.mask_layers = mask_layers;
        self
    }

    pub fn with_spawn_instances(mut self, spawn_instances: bool) -> Self {
        self.spawn_instances = spawn_instances;
        self
    }

    pub fn with_hide_instances(mut self, hide_instances: bool) -> Self {
        self.hide_instances = hide_instances;
        self
    }

    pub fn with_root(mut self, root: Option<RootId>) -> Self {
        self.root = root;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        fn spacing(value: f32, name: &str) -> Result<()> {
            if value.is_finite() && value >= MIN_SPACING {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{name} must be a finite value >= {MIN_SPACING}"
                )))
            }
        }

        match &self.distribution.mode {
            DistributionMode::OnCurve(d) => {
                spacing(d.spacing, "on_curve.spacing")?;
                if !(0.0..=1.0).contains(&d.jitter) {
                    return Err(Error::InvalidConfig(
                        "on_curve.jitter must be in [0, 1]".into(),
                    ));
                }
            }
            DistributionMode::InsideArea(d) => {
                if !(d.spacing >= MIN_AREA_SPACING) {
                    return Err(Error::InvalidConfig(format!(
                        "inside_area.spacing must be >= {MIN_AREA_SPACING}"
                    )));
                }
            }
            DistributionMode::Radial(d) => {
                spacing(d.spacing, "radial.spacing")?;
                spacing(d.radial_spacing, "radial.radial_spacing")?;
                if d.min_radial_spacing < 0.0 {
                    return Err(Error::InvalidConfig(
                        "radial.min_radial_spacing must be >= 0".into(),
                    ));
                }
                if d.angle_range.x > d.angle_range.y {
                    return Err(Error::InvalidConfig(
                        "radial.angle_range start must not exceed its end".into(),
                    ));
                }
            }
            DistributionMode::Grid(d) => spacing(d.spacing, "grid.spacing")?,
            DistributionMode::OnKnots(_) => {}
        }
        Ok(())
    }
}

/// Lifecycle state of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PassState {
    Idle = 0,
    Setup = 1,
    Distributing = 2,
    Masking = 3,
    Modifying = 4,
    Instantiating = 5,
}

impl PassState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => PassState::Setup,
            2 => PassState::Distributing,
            3 => PassState::Masking,
            4 => PassState::Modifying,
            5 => PassState::Instantiating,
            _ => PassState::Idle,
        }
    }
}

/// Wall time spent in each stage of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassTimings {
    pub distribution: Duration,
    pub masking: Duration,
    pub modifiers: Duration,
    pub instantiation: Duration,
}

impl PassTimings {
    pub fn total(&self) -> Duration {
        self.distribution + self.masking + self.modifiers + self.instantiation
    }
}

/// Summary of a completed pass.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub segment: usize,
    /// Points produced by distribution.
    pub points_generated: usize,
    /// Points invalidated by mask rules.
    pub points_masked: usize,
    /// Points still valid after the modifier stages.
    pub points_valid: usize,
    pub instances_spawned: usize,
    /// Valid points refused at instantiation (non-finite transforms).
    pub rejected: usize,
    pub timings: PassTimings,
}

/// Why a pass stopped before instantiating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// No enabled placeable with a positive weight.
    NoPlaceables,
    /// The curve has fewer knots than the distribution mode needs.
    TooFewKnots { required: usize, actual: usize },
    /// The segment was disabled while the pass was running.
    SegmentDisabled,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::NoPlaceables => write!(f, "no eligible placeables"),
            AbortReason::TooFewKnots { required, actual } => {
                write!(f, "curve has {actual} knots, distribution needs {required}")
            }
            AbortReason::SegmentDisabled => write!(f, "segment disabled"),
        }
    }
}

/// Result of a respawn call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Completed(PassReport),
    Aborted { segment: usize, reason: AbortReason },
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Aborted { .. } => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, PassOutcome::Aborted { .. })
    }
}

struct Segment {
    curve: Arc<dyn CurveQuery>,
    transform: Affine3A,
    enabled: AtomicBool,
    in_flight: AtomicBool,
    state: AtomicU8,
}

impl Segment {
    fn set_state(&self, state: PassState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Marks a segment busy for the lifetime of a pass.
struct InFlightGuard<'a> {
    segment: &'a Segment,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(segment: &'a Segment) -> Option<Self> {
        segment
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { segment })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.segment.set_state(PassState::Idle);
        self.segment.in_flight.store(false, Ordering::Release);
    }
}

fn warn_sink(sink: &mut dyn EventSink, context: String, message: String) {
    if sink.wants(SpawnEventKind::Warning) {
        sink.send(SpawnEvent::Warning { context, message });
    }
}

/// Scatters placeables along a set of curve segments.
pub struct Spawner<H: InstanceHost> {
    config: SpawnerConfig,
    pool: ThreadPool,
    placeables: RwLock<Vec<Placeable>>,
    modifiers: RwLock<ModifierStack>,
    masks: RwLock<Vec<MaskRule>>,
    segments: RwLock<Vec<Arc<Segment>>>,
    instances: InstanceManager<H>,
    viewer: RwLock<Option<Vec3>>,
    last_timings: Mutex<Option<PassTimings>>,
}

impl<H: InstanceHost> Spawner<H> {
    pub fn new(config: SpawnerConfig, host: H) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("spline-scatter-{i}"))
            .build()?;
        Ok(Self {
            config,
            pool,
            placeables: RwLock::new(Vec::new()),
            modifiers: RwLock::new(ModifierStack::new()),
            masks: RwLock::new(Vec::new()),
            segments: RwLock::new(Vec::new()),
            instances: InstanceManager::new(host),
            viewer: RwLock::new(None),
            last_timings: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn instances(&self) -> &InstanceManager<H> {
        &self.instances
    }

    // Placeables.

    /// Adds a placeable and returns its index.
    pub fn add_placeable(&self, placeable: Placeable) -> usize {
        let mut placeables = self.placeables.write();
        placeables.push(placeable);
        placeables.len() - 1
    }

    pub fn remove_placeable(&self, index: usize) -> Option<Placeable> {
        let mut placeables = self.placeables.write();
        (index < placeables.len()).then(|| placeables.remove(index))
    }

    pub fn placeables(&self) -> Vec<Placeable> {
        self.placeables.read().clone()
    }

    // Modifiers.

    /// Appends a modifier stage and returns its index.
    pub fn add_modifier(&self, modifier: Box<dyn Modifier>) -> usize {
        self.modifiers.write().push(modifier)
    }

    pub fn remove_modifier(&self, index: usize) -> Option<Box<dyn Modifier>> {
        self.modifiers.write().remove(index)
    }

    pub fn set_modifier_enabled(&self, index: usize, enabled: bool) -> bool {
        self.modifiers.write().set_enabled(index, enabled)
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.read().len()
    }

    // Masks.

    /// Adds a mask rule and returns its index.
    pub fn add_mask(&self, rule: MaskRule) -> usize {
        let mut masks = self.masks.write();
        masks.push(rule);
        masks.len() - 1
    }

    pub fn remove_mask(&self, index: usize) -> Option<MaskRule> {
        let mut masks = self.masks.write();
        (index < masks.len()).then(|| masks.remove(index))
    }

    pub fn mask_count(&self) -> usize {
        self.masks.read().len()
    }

    // Segments.

    /// Registers a curve. `transform` maps curve space to world space.
    pub fn add_segment(&self, curve: Arc<dyn CurveQuery>, transform: Affine3A) -> usize {
        let mut segments = self.segments.write();
        segments.push(Arc::new(Segment {
            curve,
            transform,
            enabled: AtomicBool::new(true),
            in_flight: AtomicBool::new(false),
            state: AtomicU8::new(PassState::Idle as u8),
        }));
        segments.len() - 1
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    fn segment(&self, segment: usize) -> Result<Arc<Segment>> {
        self.segments
            .read()
            .get(segment)
            .cloned()
            .ok_or(Error::UnknownSegment { segment })
    }

    /// Enables or disables a segment. Disabling a segment mid-pass aborts the pass at the
    /// next stage boundary.
    pub fn set_segment_enabled(&self, segment: usize, enabled: bool) -> Result<()> {
        self.segment(segment)?
            .enabled
            .store(enabled, Ordering::Release);
        Ok(())
    }

    pub fn segment_state(&self, segment: usize) -> Result<PassState> {
        let seg = self.segment(segment)?;
        Ok(PassState::from_u8(seg.state.load(Ordering::Acquire)))
    }

    /// Viewer position used by viewer-targeting modifiers.
    pub fn set_viewer(&self, viewer: Option<Vec3>) {
        *self.viewer.write() = viewer;
    }

    // Metrics.

    pub fn live_instance_count(&self) -> usize {
        self.instances.live_count()
    }

    /// Stage timings of the most recent completed pass.
    pub fn last_timings(&self) -> Option<PassTimings> {
        *self.last_timings.lock()
    }

    /// Pre-creates pooled instances for every enabled placeable. Returns the number created.
    pub fn warm_up_pools(&self, capacity: usize) -> usize {
        let placeables = self.placeables.read().clone();
        let created: usize = placeables
            .iter()
            .filter(|p| p.enabled)
            .map(|p| self.instances.warm_up(p, capacity))
            .sum();
        debug!("Warmed up pools to {} ({} created).", capacity, created);
        created
    }

    // Passes.

    pub fn respawn_all(&self) -> Result<Vec<PassOutcome>> {
        self.respawn_all_with_events(&mut ())
    }

    /// Respawns every segment in order. Stops at the first error.
    pub fn respawn_all_with_events(&self, sink: &mut dyn EventSink) -> Result<Vec<PassOutcome>> {
        let start = Instant::now();
        let count = self.segment_count();
        let mut outcomes = Vec::with_capacity(count);
        for segment in 0..count {
            outcomes.push(self.respawn_segment_with_events(segment, sink)?);
        }
        info!(
            "Respawned {} segments ({} instances) in {:?}.",
            count,
            self.live_instance_count(),
            start.elapsed()
        );
        Ok(outcomes)
    }

    pub fn respawn_segment(&self, segment: usize) -> Result<PassOutcome> {
        self.respawn_segment_with_events(segment, &mut ())
    }

    /// Runs one pass for `segment`.
    ///
    /// Returns [`Error::PassInFlight`] when the segment's previous pass has not finished and
    /// [`Error::PlaceableContainsMasks`] when a placeable carries mask rules.
    pub fn respawn_segment_with_events(
        &self,
        segment: usize,
        sink: &mut dyn EventSink,
    ) -> Result<PassOutcome> {
        let seg = self.segment(segment)?;
        let Some(_guard) = InFlightGuard::acquire(&seg) else {
            warn!("Segment {} still has a respawn pass in flight; request rejected.", segment);
            return Err(Error::PassInFlight { segment });
        };

        seg.set_state(PassState::Setup);
        if sink.wants(SpawnEventKind::PreRespawn) {
            sink.send(SpawnEvent::PreRespawn { segment });
        }
        self.instances.destroy_all_for_curve(segment);

        let placeables = self.placeables.read().clone();
        let table = match DescriptorTable::build(&placeables) {
            Ok(table) => table,
            Err(err) => {
                error!("Segment {} pass failed during setup: {}.", segment, err);
                warn_sink(sink, format!("segment {segment}"), err.to_string());
                if sink.wants(SpawnEventKind::PassAborted) {
                    sink.send(SpawnEvent::PassAborted {
                        segment,
                        reason: err.to_string(),
                    });
                }
                return Err(err);
            }
        };
        if table.is_empty() || table.probability_sum() <= 0.0 {
            return Ok(self.abort(segment, AbortReason::NoPlaceables, sink));
        }
        let required = self.config.distribution.mode.min_knots();
        let actual = seg.curve.knot_count();
        if actual < required {
            return Ok(self.abort(segment, AbortReason::TooFewKnots { required, actual }, sink));
        }
        if seg.curve.length() < MIN_CURVE_LENGTH {
            warn!("Segment {} is shorter than {}; nothing to distribute.", segment, MIN_CURVE_LENGTH);
            warn_sink(
                sink,
                format!("segment {segment}"),
                format!("curve is shorter than {MIN_CURVE_LENGTH}"),
            );
        }
        if !seg.is_enabled() {
            return Ok(self.abort(segment, AbortReason::SegmentDisabled, sink));
        }

        let mut timings = PassTimings::default();

        seg.set_state(PassState::Distributing);
        let stage = Instant::now();
        let seed = seed_for_segment(self.config.distribution.seed, segment);
        let mut buffer = distribute(
            seg.curve.as_ref(),
            seg.transform,
            &self.config.distribution,
            &table,
            seed,
        );
        timings.distribution = stage.elapsed();
        sink.inspect(InspectStage::AfterDistribution, segment, buffer.as_slice());
        if !seg.is_enabled() {
            return Ok(self.abort(segment, AbortReason::SegmentDisabled, sink));
        }

        seg.set_state(PassState::Masking);
        let stage = Instant::now();
        let masks = self.masks.read().clone();
        let layers = self.config.mask_layers;
        let points = buffer.as_mut_slice();
        let masked = self.pool.install(|| apply_masks(points, &masks, layers));
        timings.masking = stage.elapsed();
        if !seg.is_enabled() {
            return Ok(self.abort(segment, AbortReason::SegmentDisabled, sink));
        }

        seg.set_state(PassState::Modifying);
        let stage = Instant::now();
        let env = ModifierEnv {
            viewer: *self.viewer.read(),
            segment,
        };
        let finished = self.modifiers.read().run_all(
            &self.pool,
            buffer.as_mut_slice(),
            &env,
            || seg.is_enabled(),
        );
        if !finished {
            return Ok(self.abort(segment, AbortReason::SegmentDisabled, sink));
        }
        timings.modifiers = stage.elapsed();
        sink.inspect(InspectStage::AfterModifiers, segment, buffer.as_slice());
        if !seg.is_enabled() {
            return Ok(self.abort(segment, AbortReason::SegmentDisabled, sink));
        }

        let mut report = PassReport {
            segment,
            points_generated: buffer.len(),
            points_masked: masked,
            points_valid: buffer.valid_count(),
            ..Default::default()
        };

        if self.config.spawn_instances {
            seg.set_state(PassState::Instantiating);
            let stage = Instant::now();
            for point in buffer.valid() {
                let Some(descriptor) = table.get(point.placeable_index) else {
                    report.rejected += 1;
                    continue;
                };
                let Some(placeable) = placeables.get(descriptor.source_index) else {
                    report.rejected += 1;
                    continue;
                };
                match self.instances.spawn(
                    segment,
                    point,
                    descriptor,
                    placeable,
                    self.config.root,
                    self.config.hide_instances,
                ) {
                    Some(_) => report.instances_spawned += 1,
                    None => report.rejected += 1,
                }
            }
            timings.instantiation = stage.elapsed();
        }

        if report.rejected > 0 {
            warn_sink(
                sink,
                format!("segment {segment}"),
                format!("{} points were rejected at instantiation", report.rejected),
            );
        }

        report.timings = timings;
        *self.last_timings.lock() = Some(timings);
        info!(
            "Segment {}: {} points, {} valid, {} instances in {:?}.",
            segment,
            report.points_generated,
            report.points_valid,
            report.instances_spawned,
            timings.total()
        );
        if sink.wants(SpawnEventKind::PostRespawn) {
            sink.send(SpawnEvent::PostRespawn {
                report: report.clone(),
            });
        }
        Ok(PassOutcome::Completed(report))
    }

    fn abort(&self, segment: usize, reason: AbortReason, sink: &mut dyn EventSink) -> PassOutcome {
        match reason {
            AbortReason::SegmentDisabled => {
                debug!("Segment {} pass aborted: {}.", segment, reason);
            }
            _ => {
                warn!("Segment {} pass aborted: {}.", segment, reason);
                warn_sink(sink, format!("segment {segment}"), reason.to_string());
            }
        }
        if sink.wants(SpawnEventKind::PassAborted) {
            sink.send(SpawnEvent::PassAborted {
                segment,
                reason: reason.to_string(),
            });
        }
        PassOutcome::Aborted { segment, reason }
    }
}

impl<H: InstanceHost> std::fmt::Debug for Spawner<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spawner")
            .field("config", &self.config)
            .field("segments", &self.segment_count())
            .field("placeables", &self.placeables.read().len())
            .field("modifiers", &self.modifier_count())
            .field("masks", &self.mask_count())
            .field("live_instances", &self.live_instance_count())
            .finish()
    }
}
