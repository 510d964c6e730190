//! Pooled instance lifecycle.
//!
//! The engine never creates scene objects itself. An [`InstanceHost`] does, and the
//! [`InstanceManager`] keeps one pool of inactive handles per placeable plus the set of
//! live handles per segment. Respawning a segment returns its live handles to the pools,
//! so repeated passes reuse objects instead of creating new ones.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::placeable::{Placeable, PlaceableDescriptor, PlaceableId};
use crate::point::PlacementPoint;

/// Opaque identifier of the parent object instances are attached to.
pub type RootId = u64;

/// Final world transform handed to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl InstanceTransform {
    /// Applies the descriptor's forward-axis and pivot reconciliation to a point.
    pub fn reconcile(point: &PlacementPoint, descriptor: &PlaceableDescriptor) -> Self {
        let rotation = (point.rotation * descriptor.forward_rotation).normalize();
        let position = point.position + rotation * (descriptor.pivot_offset * point.scale);
        Self {
            position,
            rotation,
            scale: point.scale,
        }
    }
}

/// Creates and manipulates the host's scene objects.
pub trait InstanceHost: Send + Sync {
    type Handle: Send;

    /// Creates a new, inactive instance of `placeable`.
    fn create(&self, placeable: &Placeable) -> Self::Handle;

    /// Sets the transform and parent of an instance.
    fn place(
        &self,
        handle: &mut Self::Handle,
        transform: &InstanceTransform,
        root: Option<RootId>,
        hidden: bool,
    );

    fn set_active(&self, handle: &mut Self::Handle, active: bool);
}

/// Reference to a live instance returned by [`InstanceManager::spawn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub segment: usize,
    pub placeable: PlaceableId,
    /// Position in the segment's live list.
    pub slot: usize,
}

struct LiveInstance<T> {
    placeable: PlaceableId,
    handle: T,
}

type Pool<T> = Arc<Mutex<Vec<T>>>;

/// Per-placeable pools and per-segment live sets.
///
/// Pools grow without bound: a pass that needs more instances than any earlier pass creates
/// the difference and keeps it pooled afterwards.
pub struct InstanceManager<H: InstanceHost> {
    host: H,
    pools: RwLock<HashMap<PlaceableId, Pool<H::Handle>>>,
    live: Mutex<HashMap<usize, Vec<LiveInstance<H::Handle>>>>,
    created: AtomicUsize,
    live_count: AtomicUsize,
}

impl<H: InstanceHost> InstanceManager<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            pools: RwLock::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
            live_count: AtomicUsize::new(0),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn pool(&self, id: &PlaceableId) -> Pool<H::Handle> {
        if let Some(pool) = self.pools.read().get(id) {
            return Arc::clone(pool);
        }
        let mut pools = self.pools.write();
        Arc::clone(pools.entry(id.clone()).or_default())
    }

    fn create(&self, placeable: &Placeable) -> H::Handle {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.host.create(placeable)
    }

    /// Activates an instance for `point`, reusing a pooled one when available.
    ///
    /// Returns `None` and logs when the point is not finite.
    pub fn spawn(
        &self,
        segment: usize,
        point: &PlacementPoint,
        descriptor: &PlaceableDescriptor,
        placeable: &Placeable,
        root: Option<RootId>,
        hidden: bool,
    ) -> Option<InstanceRef> {
        if !point.is_finite() {
            warn!(
                "Rejected non-finite placement for '{}' on segment {} at {:?}.",
                descriptor.id, segment, point.position
            );
            return None;
        }
        let transform = InstanceTransform::reconcile(point, descriptor);

        let pooled = self.pool(&descriptor.id).lock().pop();
        let mut handle = match pooled {
            Some(handle) => handle,
            None => self.create(placeable),
        };
        self.host.place(&mut handle, &transform, root, hidden);
        self.host.set_active(&mut handle, true);

        let mut live = self.live.lock();
        let list = live.entry(segment).or_default();
        list.push(LiveInstance {
            placeable: descriptor.id.clone(),
            handle,
        });
        self.live_count.fetch_add(1, Ordering::Relaxed);
        Some(InstanceRef {
            segment,
            placeable: descriptor.id.clone(),
            slot: list.len() - 1,
        })
    }

    /// Deactivates every live instance of `segment` and returns it to its pool.
    pub fn destroy_all_for_curve(&self, segment: usize) -> usize {
        let Some(instances) = self.live.lock().remove(&segment) else {
            return 0;
        };
        let count = instances.len();
        for LiveInstance {
            placeable,
            mut handle,
        } in instances
        {
            self.host.set_active(&mut handle, false);
            self.pool(&placeable).lock().push(handle);
        }
        self.live_count.fetch_sub(count, Ordering::Relaxed);
        debug!("Returned {} instances of segment {} to their pools.", count, segment);
        count
    }

    /// Pre-creates inactive instances until the pool of `placeable` holds `capacity`.
    /// Returns the number created.
    pub fn warm_up(&self, placeable: &Placeable, capacity: usize) -> usize {
        let pool = self.pool(&placeable.id);
        let mut pool = pool.lock();
        let mut created = 0;
        while pool.len() < capacity {
            let mut handle = self.create(placeable);
            self.host.set_active(&mut handle, false);
            pool.push(handle);
            created += 1;
        }
        created
    }

    /// Total number of instances ever created through the host.
    pub fn creation_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn live_count(&self) -> usize {
        self.live_count.load(Ordering::Relaxed)
    }

    pub fn live_count_for(&self, segment: usize) -> usize {
        self.live.lock().get(&segment).map_or(0, Vec::len)
    }

    pub fn pooled_count(&self, id: &str) -> usize {
        self.pools.read().get(id).map_or(0, |pool| pool.lock().len())
    }
}

impl<H: InstanceHost + std::fmt::Debug> std::fmt::Debug for InstanceManager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceManager")
            .field("host", &self.host)
            .field("created", &self.creation_count())
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Aabb;
    use crate::placeable::{DescriptorTable, Pivot};

    #[derive(Debug, Default)]
    struct CountingHost {
        next: AtomicUsize,
    }

    #[derive(Debug)]
    struct Handle {
        id: usize,
        active: bool,
        transform: Option<InstanceTransform>,
        hidden: bool,
    }

    impl InstanceHost for CountingHost {
        type Handle = Handle;

        fn create(&self, _placeable: &Placeable) -> Handle {
            Handle {
                id: self.next.fetch_add(1, Ordering::Relaxed),
                active: false,
                transform: None,
                hidden: false,
            }
        }

        fn place(
            &self,
            handle: &mut Handle,
            transform: &InstanceTransform,
            _root: Option<RootId>,
            hidden: bool,
        ) {
            handle.transform = Some(*transform);
            handle.hidden = hidden;
        }

        fn set_active(&self, handle: &mut Handle, active: bool) {
            handle.active = active;
        }
    }

    fn fixture() -> (Placeable, PlaceableDescriptor) {
        let placeable = Placeable::new("rock");
        let table = DescriptorTable::build(std::slice::from_ref(&placeable)).unwrap();
        let descriptor = table.get(0).unwrap().clone();
        (placeable, descriptor)
    }

    #[test]
    fn respawn_reuses_pooled_instances() {
        let manager = InstanceManager::new(CountingHost::default());
        let (placeable, descriptor) = fixture();
        let point = PlacementPoint::new(Vec3::ONE, 0);

        for _ in 0..5 {
            manager.spawn(0, &point, &descriptor, &placeable, None, false);
        }
        assert_eq!(manager.creation_count(), 5);
        assert_eq!(manager.live_count(), 5);

        assert_eq!(manager.destroy_all_for_curve(0), 5);
        assert_eq!(manager.live_count(), 0);
        assert_eq!(manager.pooled_count("rock"), 5);

        for _ in 0..5 {
            manager.spawn(0, &point, &descriptor, &placeable, None, true);
        }
        assert_eq!(manager.creation_count(), 5);
        assert_eq!(manager.live_count_for(0), 5);
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let manager = InstanceManager::new(CountingHost::default());
        let (placeable, descriptor) = fixture();
        let point = PlacementPoint::new(Vec3::new(f32::NAN, 0.0, 0.0), 0);
        assert!(manager
            .spawn(1, &point, &descriptor, &placeable, None, false)
            .is_none());
        assert_eq!(manager.creation_count(), 0);
        assert_eq!(manager.live_count(), 0);
    }

    #[test]
    fn warm_up_fills_pool_once() {
        let manager = InstanceManager::new(CountingHost::default());
        let (placeable, descriptor) = fixture();
        assert_eq!(manager.warm_up(&placeable, 3), 3);
        assert_eq!(manager.warm_up(&placeable, 3), 0);
        manager.spawn(0, &PlacementPoint::new(Vec3::ZERO, 0), &descriptor, &placeable, None, false);
        assert_eq!(manager.creation_count(), 3);
        assert_eq!(manager.pooled_count("rock"), 2);
    }

    #[test]
    fn reconcile_applies_pivot_after_rotation_and_scale() {
        let placeable = Placeable::new("crate")
            .with_bounds(Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)))
            .with_pivot(Pivot::Center);
        let table = DescriptorTable::build(&[placeable]).unwrap();
        let descriptor = table.get(0).unwrap();
        let point = PlacementPoint::new(Vec3::new(5.0, 0.0, 0.0), 0).with_scale(Vec3::splat(2.0));
        let t = InstanceTransform::reconcile(&point, descriptor);
        assert!((t.position - Vec3::new(5.0, -2.0, 0.0)).length() < 1e-5);
        assert_eq!(t.scale, Vec3::splat(2.0));
    }
}
