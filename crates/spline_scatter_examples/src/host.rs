use glam::{Quat, Vec3};
use parking_lot::Mutex;
use spline_scatter::prelude::*;

/// Record of one instance created by [`DemoHost`].
#[derive(Debug, Clone)]
pub struct DemoInstance {
    pub placeable: PlaceableId,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub active: bool,
    pub hidden: bool,
    pub root: Option<RootId>,
}

/// In-memory host that stores every instance in a flat list. Handles are list indices.
#[derive(Debug, Default)]
pub struct DemoHost {
    instances: Mutex<Vec<DemoInstance>>,
}

impl DemoHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active, visible instances.
    pub fn visible(&self) -> Vec<DemoInstance> {
        self.instances
            .lock()
            .iter()
            .filter(|i| i.active && !i.hidden)
            .cloned()
            .collect()
    }

    pub fn total_created(&self) -> usize {
        self.instances.lock().len()
    }
}

impl InstanceHost for DemoHost {
    type Handle = usize;

    fn create(&self, placeable: &Placeable) -> usize {
        let mut instances = self.instances.lock();
        instances.push(DemoInstance {
            placeable: placeable.id.clone(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: placeable.base_scale,
            active: false,
            hidden: false,
            root: None,
        });
        instances.len() - 1
    }

    fn place(
        &self,
        handle: &mut usize,
        transform: &InstanceTransform,
        root: Option<RootId>,
        hidden: bool,
    ) {
        if let Some(instance) = self.instances.lock().get_mut(*handle) {
            instance.position = transform.position;
            instance.rotation = transform.rotation;
            instance.scale = transform.scale;
            instance.hidden = hidden;
            instance.root = root;
        }
    }

    fn set_active(&self, handle: &mut usize, active: bool) {
        if let Some(instance) = self.instances.lock().get_mut(*handle) {
            instance.active = active;
        }
    }
}
