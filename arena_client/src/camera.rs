//! Camera follow controller.
//!
//! The camera either idles or follows one entity. Directional input always
//! wins: while any pan key is held the camera moves by hand and stops
//! tracking, and on the frame the keys are released it snaps back to the
//! followed entity.
//!
//! The selected entity key is persisted through a [`FollowStore`] so the
//! selection survives a restart; when an entity with that key shows up again
//! it is followed automatically.

use std::path::{Path, PathBuf};

use anyhow::Context;
use arena_shared::{
    config::CameraConfig,
    math::Vec2,
    render::{RenderHandle, Scene},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    input::{InputFrame, Keys},
    sync::EntityKey,
};

/// Durable storage for the followed entity key.
pub trait FollowStore {
    fn load(&self) -> anyhow::Result<Option<EntityKey>>;
    fn save(&mut self, key: &EntityKey) -> anyhow::Result<()>;
    fn clear(&mut self) -> anyhow::Result<()>;
}

/// Non-durable store, for tests and runs without a writable directory.
#[derive(Debug, Default)]
pub struct MemoryFollowStore {
    key: Option<EntityKey>,
}

impl MemoryFollowStore {
    pub fn with_key(key: EntityKey) -> Self {
        Self { key: Some(key) }
    }
}

impl FollowStore for MemoryFollowStore {
    fn load(&self) -> anyhow::Result<Option<EntityKey>> {
        Ok(self.key.clone())
    }

    fn save(&mut self, key: &EntityKey) -> anyhow::Result<()> {
        self.key = Some(key.clone());
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.key = None;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FollowDocument {
    #[serde(default)]
    follow: Option<String>,
}

/// Stores the key as a small JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileFollowStore {
    path: PathBuf,
}

impl JsonFileFollowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FollowStore for JsonFileFollowStore {
    fn load(&self) -> anyhow::Result<Option<EntityKey>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        let doc: FollowDocument = serde_json::from_str(&text)
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(doc.follow.map(EntityKey::new))
    }

    fn save(&mut self, key: &EntityKey) -> anyhow::Result<()> {
        let doc = FollowDocument {
            follow: Some(key.to_string()),
        };
        let text = serde_json::to_string(&doc).context("serialize follow document")?;
        std::fs::write(&self.path, text).with_context(|| format!("write {}", self.path.display()))
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

/// Camera transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Vec2,
    pub zoom: f32,
}

/// Entity the camera is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowTarget {
    pub key: EntityKey,
    pub handle: RenderHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FollowState {
    Idle,
    Following(FollowTarget),
}

pub struct CameraFollowController {
    cfg: CameraConfig,
    camera: Camera,
    state: FollowState,
    /// Cleared while manual input overrides the follow.
    tracking: bool,
    prev_keys: Keys,
    selection: Option<EntityKey>,
    store: Box<dyn FollowStore>,
}

impl CameraFollowController {
    /// Creates the controller and reads the persisted selection.
    pub fn new(cfg: CameraConfig, store: Box<dyn FollowStore>) -> Self {
        let selection = match store.load() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Could not read follow selection");
                None
            }
        };
        if let Some(key) = &selection {
            info!(key = %key, "Restored follow selection");
        }

        Self {
            camera: Camera {
                center: Vec2::ZERO,
                zoom: cfg.initial_zoom.max(cfg.zoom_min).min(cfg.zoom_max),
            },
            cfg,
            state: FollowState::Idle,
            tracking: false,
            prev_keys: Keys::empty(),
            selection,
            store,
        }
    }

    /// Follows `key`, replacing any current target, and persists the choice.
    pub fn follow(&mut self, key: EntityKey, handle: RenderHandle) {
        info!(key = %key, "Camera follow");
        if let Err(e) = self.store.save(&key) {
            warn!(key = %key, error = %e, "Could not persist follow selection");
        }
        self.selection = Some(key.clone());
        self.state = FollowState::Following(FollowTarget { key, handle });
        self.tracking = true;
    }

    /// Remembers `key` without a live entity to attach to yet; it is
    /// followed as soon as it is created.
    pub fn select(&mut self, key: EntityKey) {
        if let Err(e) = self.store.save(&key) {
            warn!(key = %key, error = %e, "Could not persist follow selection");
        }
        self.selection = Some(key);
    }

    /// Stops following and forgets the persisted selection. No-op when
    /// there is neither a target nor a selection.
    pub fn unfollow(&mut self) {
        if self.state == FollowState::Idle && self.selection.is_none() {
            return;
        }
        info!("Camera unfollow");
        self.state = FollowState::Idle;
        self.tracking = false;
        self.selection = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Could not clear follow selection");
        }
    }

    /// Per-frame update: manual pan, zoom, follow suspension and resume,
    /// then tracking.
    pub fn update(&mut self, dt_ms: f32, input: &InputFrame, scene: &dyn Scene) {
        let speed = self.cfg.pan_speed * if input.boost() { 2.0 } else { 1.0 };
        let movement = speed * (dt_ms.max(0.0) / 1000.0);

        let pan = Vec2::new(input.horizontal(), input.vertical());
        let on_movement = pan != Vec2::ZERO;
        if on_movement {
            self.camera.center += pan * movement;
            if self.tracking {
                debug!("Follow suspended by manual input");
            }
            self.tracking = false;
        }

        let released = input.released_since(self.prev_keys);
        self.prev_keys = input.keys;
        if !released.is_empty() && !on_movement {
            if let FollowState::Following(target) = &self.state {
                debug!(key = %target.key, "Follow resumed");
                self.tracking = true;
            }
        }

        if input.wheel_delta > 0.0 {
            self.camera.zoom = (self.camera.zoom - self.cfg.zoom_step).max(self.cfg.zoom_min);
        } else if input.wheel_delta < 0.0 {
            self.camera.zoom = (self.camera.zoom + self.cfg.zoom_step).min(self.cfg.zoom_max);
        }

        if self.tracking {
            if let FollowState::Following(target) = &self.state {
                if let Some(pos) = scene.position(target.handle) {
                    self.camera.center = pos;
                }
            }
        }
    }

    /// A new entity appeared; follow it if it matches the persisted selection.
    pub fn on_entity_created(&mut self, key: &EntityKey, handle: RenderHandle) {
        if self.selection.as_ref() == Some(key) {
            self.follow(key.clone(), handle);
        }
    }

    /// An entity went away. If it was the target, live tracking is released
    /// (when configured) while the persisted selection is kept.
    pub fn on_entity_destroyed(&mut self, key: &EntityKey) {
        let is_target = matches!(&self.state, FollowState::Following(t) if &t.key == key);
        if is_target && self.cfg.release_on_destroy {
            info!(key = %key, "Followed entity destroyed");
            self.state = FollowState::Idle;
            self.tracking = false;
        }
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn state(&self) -> &FollowState {
        &self.state
    }

    pub fn target(&self) -> Option<&FollowTarget> {
        match &self.state {
            FollowState::Following(t) => Some(t),
            FollowState::Idle => None,
        }
    }

    /// True when the camera is actually attached to its target this frame.
    pub fn is_tracking(&self) -> bool {
        self.tracking && self.target().is_some()
    }

    pub fn selection(&self) -> Option<&EntityKey> {
        self.selection.as_ref()
    }

    pub fn store(&self) -> &dyn FollowStore {
        self.store.as_ref()
    }
}
