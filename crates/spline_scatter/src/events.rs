//! Event types and sinks for observing respawn passes.
//!
//! A [`crate::spawner::Spawner`] reports through an [`EventSink`] handed to each respawn
//! call. Sinks receive lifecycle events ([`SpawnEvent`]) and can optionally inspect the
//! point buffer after distribution and after the modifier stages.
use crate::point::PlacementPoint;
use crate::spawner::PassReport;

/// Describes events emitted by the spawner.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum SpawnEvent {
    /// Emitted before a segment's previous instances are cleared.
    PreRespawn {
        /// Segment being respawned.
        segment: usize,
    },

    /// Emitted when a pass finishes instantiating.
    PostRespawn {
        /// Summary of the pass.
        report: PassReport,
    },

    /// Emitted when a pass stops early without an error.
    PassAborted {
        segment: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// Non-fatal warning generated during a pass.
    Warning {
        /// Context string (e.g. segment index, modifier name).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

impl SpawnEvent {
    pub fn kind(&self) -> SpawnEventKind {
        match self {
            SpawnEvent::PreRespawn { .. } => SpawnEventKind::PreRespawn,
            SpawnEvent::PostRespawn { .. } => SpawnEventKind::PostRespawn,
            SpawnEvent::PassAborted { .. } => SpawnEventKind::PassAborted,
            SpawnEvent::Warning { .. } => SpawnEventKind::Warning,
        }
    }
}

/// Discriminant of [`SpawnEvent`], used to filter what a sink receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnEventKind {
    PreRespawn,
    PostRespawn,
    PassAborted,
    Warning,
}

/// Points at which a sink may inspect the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectStage {
    AfterDistribution,
    AfterModifiers,
}

/// A generic event sink that accepts [`SpawnEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: SpawnEvent);

    /// Whether the sink cares about events of `kind`. Lets the spawner skip building them.
    fn wants(&mut self, _kind: SpawnEventKind) -> bool {
        true
    }

    /// Read-only view of the buffer at `stage`.
    fn inspect(&mut self, _stage: InspectStage, _segment: usize, _points: &[PlacementPoint]) {}

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = SpawnEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: SpawnEvent) {}

    #[inline]
    fn wants(&mut self, _kind: SpawnEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(SpawnEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(SpawnEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(SpawnEvent),
{
    #[inline]
    fn send(&mut self, event: SpawnEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`, and optionally snapshots of the
/// inspected buffers.
#[derive(Default)]
pub struct VecSink {
    events: Vec<SpawnEvent>,
    capture_points: bool,
    snapshots: Vec<(InspectStage, usize, Vec<PlacementPoint>)>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
            ..Self::default()
        }
    }

    /// Also records a copy of every inspected buffer.
    pub fn capturing_points() -> Self {
        Self {
            capture_points: true,
            ..Self::default()
        }
    }

    pub fn into_inner(self) -> Vec<SpawnEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[SpawnEvent] {
        &self.events
    }

    pub fn snapshots(&self) -> &[(InspectStage, usize, Vec<PlacementPoint>)] {
        &self.snapshots
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: SpawnEvent) {
        self.events.push(event);
    }

    fn inspect(&mut self, stage: InspectStage, segment: usize, points: &[PlacementPoint]) {
        if self.capture_points {
            self.snapshots.push((stage, segment, points.to_vec()));
        }
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: SpawnEvent) {
        let Some((last, rest)) = self.sinks.split_last_mut() else {
            return;
        };
        for sink in rest {
            if sink.wants(event.kind()) {
                sink.send(event.clone());
            }
        }
        if last.wants(event.kind()) {
            last.send(event);
        }
    }

    fn wants(&mut self, kind: SpawnEventKind) -> bool {
        self.sinks.iter_mut().any(|s| s.wants(kind))
    }

    fn inspect(&mut self, stage: InspectStage, segment: usize, points: &[PlacementPoint]) {
        for sink in &mut self.sinks {
            sink.inspect(stage, segment, points);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn warning(context: &str) -> SpawnEvent {
        SpawnEvent::Warning {
            context: context.into(),
            message: "msg".into(),
        }
    }

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::with_capacity(2);
        assert!(sink.is_empty());
        sink.send(warning("a"));
        sink.send(SpawnEvent::PreRespawn { segment: 1 });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.as_slice()[1].kind(), SpawnEventKind::PreRespawn);
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn vec_sink_snapshots_only_when_capturing() {
        let points = [PlacementPoint::new(Vec3::ONE, 0)];
        let mut plain = VecSink::new();
        plain.inspect(InspectStage::AfterDistribution, 0, &points);
        assert!(plain.snapshots().is_empty());

        let mut capturing = VecSink::capturing_points();
        capturing.inspect(InspectStage::AfterModifiers, 3, &points);
        assert_eq!(capturing.snapshots().len(), 1);
        assert_eq!(capturing.snapshots()[0].0, InspectStage::AfterModifiers);
        assert_eq!(capturing.snapshots()[0].1, 3);
    }

    #[test]
    fn multi_sink_fans_out_events() {
        let mut multi = MultiSink::with_sinks(vec![VecSink::new(), VecSink::new()]);
        multi.send(warning("ctx"));
        assert_eq!(multi.len(), 2);
        assert_eq!(multi.sinks[0].len(), 1);
        assert_eq!(multi.sinks[1].len(), 1);
        assert!(matches!(multi.sinks[0].as_slice()[0], SpawnEvent::Warning { .. }));
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(warning("ctx"));
        drop(sink);
        assert_eq!(count, 1);
    }

    #[test]
    fn unit_sink_wants_nothing() {
        let mut sink = ();
        assert!(!sink.wants(SpawnEventKind::Warning));
    }
}
