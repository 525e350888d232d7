//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend. Tracked
//! entities talk to a [`Scene`], which owns the actual render objects and hands
//! out opaque [`RenderHandle`]s.
//!
//! Every operation on a handle that has already been despawned is a no-op, so
//! a stale handle (e.g. held by the camera) can never reach a freed object.

use std::collections::HashMap;

use crate::math::Vec2;

/// Opaque reference to one live render object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// What to draw. Visual details beyond this are up to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Avatar { color: u32, label: String },
    Blade { color: u32 },
    Projectile,
    Coin { size: f32 },
}

/// A minimal scene API.
pub trait Scene {
    fn spawn(&mut self, shape: Shape, position: Vec2) -> RenderHandle;
    fn set_position(&mut self, handle: RenderHandle, position: Vec2);
    fn set_rotation(&mut self, handle: RenderHandle, theta: f32);
    fn set_visible(&mut self, handle: RenderHandle, visible: bool);
    fn position(&self, handle: RenderHandle) -> Option<Vec2>;
    fn despawn(&mut self, handle: RenderHandle);
}

/// State of one object inside a [`HeadlessScene`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub shape: Shape,
    pub position: Vec2,
    pub rotation: f32,
    pub visible: bool,
}

/// In-memory scene useful when no renderer is attached, and for tests.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_id: u64,
    objects: HashMap<RenderHandle, SceneObject>,
    spawned: u64,
    despawned: u64,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: RenderHandle) -> Option<&SceneObject> {
        self.objects.get(&handle)
    }

    /// Number of live objects.
    pub fn live(&self) -> usize {
        self.objects.len()
    }

    /// Total spawns since creation.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Total effective despawns since creation.
    pub fn despawned(&self) -> u64 {
        self.despawned
    }

    pub fn iter(&self) -> impl Iterator<Item = (RenderHandle, &SceneObject)> {
        self.objects.iter().map(|(h, o)| (*h, o))
    }
}

impl Scene for HeadlessScene {
    fn spawn(&mut self, shape: Shape, position: Vec2) -> RenderHandle {
        let handle = RenderHandle(self.next_id);
        self.next_id += 1;
        self.spawned += 1;
        self.objects.insert(
            handle,
            SceneObject {
                shape,
                position,
                rotation: 0.0,
                visible: true,
            },
        );
        handle
    }

    fn set_position(&mut self, handle: RenderHandle, position: Vec2) {
        if let Some(obj) = self.objects.get_mut(&handle) {
            obj.position = position;
        }
    }

    fn set_rotation(&mut self, handle: RenderHandle, theta: f32) {
        if let Some(obj) = self.objects.get_mut(&handle) {
            obj.rotation = theta;
        }
    }

    fn set_visible(&mut self, handle: RenderHandle, visible: bool) {
        if let Some(obj) = self.objects.get_mut(&handle) {
            obj.visible = visible;
        }
    }

    fn position(&self, handle: RenderHandle) -> Option<Vec2> {
        self.objects.get(&handle).map(|o| o.position)
    }

    fn despawn(&mut self, handle: RenderHandle) {
        if self.objects.remove(&handle).is_some() {
            self.despawned += 1;
        }
    }
}
