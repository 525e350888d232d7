//! Snapshot synchronization.
//!
//! Every entity kind is driven by one [`EntityManager`]. The manager holds two
//! generations of keyed snapshots:
//! - `curr`: the generation currently being displayed,
//! - `next`: the payload received by the latest `sync`, promoted on the
//!   following call.
//!
//! Displaying one generation behind the network lets each entity move from
//! the promoted position toward the newer destination, which smooths out
//! irregular snapshot arrival.

use std::collections::HashMap;
use std::fmt;

use arena_shared::render::{RenderHandle, Scene};
use tracing::{debug, warn};

/// Unique key of an entity within one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(String);

impl EntityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a key from the identifying fields of a wire entry.
    ///
    /// An explicit identifier always wins over a name; an entry with neither
    /// has no key.
    pub fn derive(id: Option<&str>, name: Option<&str>) -> Option<Self> {
        id.or(name).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot types expose the key the manager indexes them by.
pub trait Keyed {
    fn key(&self) -> EntityKey;
}

/// Reasons a snapshot cannot be turned into an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    NonFinite {
        kind: &'static str,
        field: &'static str,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::MissingField { kind, field } => {
                write!(f, "{kind} entry is missing `{field}`")
            }
            SnapshotError::NonFinite { kind, field } => {
                write!(f, "{kind} entry has non-finite `{field}`")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// What a tracked entity does once it reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Release the render object (ephemeral kinds).
    Release,
    /// Stay in place until the next retarget (persistent kinds).
    Keep,
}

/// Capability set of one entity kind.
pub trait TrackedEntity: Sized {
    type Snapshot: Keyed + Clone;
    /// Per-kind creation parameters, owned by the manager.
    type Params;

    const KIND: &'static str;

    fn create(
        scene: &mut dyn Scene,
        snapshot: &Self::Snapshot,
        params: &Self::Params,
    ) -> Result<Self, SnapshotError>;

    /// Releases every render object owned by the entity.
    fn destroy(self, scene: &mut dyn Scene);

    /// Advances one render frame. Returns true if the destination was reached.
    fn advance(&mut self, scene: &mut dyn Scene, dt_ms: f32) -> bool;

    fn on_arrival(&mut self) -> Arrival {
        Arrival::Release
    }

    /// Called after every promotion for entities present in `curr`. `next`
    /// is the entity's entry in the payload just staged, if any.
    fn refresh(
        &mut self,
        _scene: &mut dyn Scene,
        _curr: &Self::Snapshot,
        _next: Option<&Self::Snapshot>,
    ) {
    }

    /// Main render object (what a camera would follow).
    fn handle(&self) -> RenderHandle;
}

/// Double buffer of keyed snapshot generations.
#[derive(Debug)]
pub struct SnapshotDiffBuffer<S> {
    curr: HashMap<EntityKey, S>,
    next: HashMap<EntityKey, S>,
}

impl<S> Default for SnapshotDiffBuffer<S> {
    fn default() -> Self {
        Self {
            curr: HashMap::new(),
            next: HashMap::new(),
        }
    }
}

impl<S: Keyed> SnapshotDiffBuffer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `curr := next`. The previous `curr` is dropped; `next` is left empty
    /// until the following [`stage`](Self::stage).
    pub fn promote(&mut self) {
        self.curr = std::mem::take(&mut self.next);
    }

    /// Replaces `next` with `payloads`, keyed. Duplicate keys: last one wins.
    pub fn stage(&mut self, payloads: impl IntoIterator<Item = S>) {
        self.next.clear();
        for p in payloads {
            self.next.insert(p.key(), p);
        }
    }

    pub fn curr(&self) -> &HashMap<EntityKey, S> {
        &self.curr
    }

    pub fn next(&self) -> &HashMap<EntityKey, S> {
        &self.next
    }

    pub fn clear(&mut self) {
        self.curr.clear();
        self.next.clear();
    }
}

/// Create/destroy events produced by one manager call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub created: Vec<EntityKey>,
    pub destroyed: Vec<EntityKey>,
    pub skipped: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty()
    }
}

/// Generic lifecycle manager for one entity kind.
///
/// A slot whose value is `None` belongs to an entity that already released
/// its render object on arrival; the key stays reserved until it leaves the
/// diff so the entity is neither re-created nor destroyed twice.
pub struct EntityManager<T: TrackedEntity> {
    params: T::Params,
    live: HashMap<EntityKey, Option<T>>,
    buffer: SnapshotDiffBuffer<T::Snapshot>,
}

impl<T: TrackedEntity> EntityManager<T> {
    pub fn new(params: T::Params) -> Self {
        Self {
            params,
            live: HashMap::new(),
            buffer: SnapshotDiffBuffer::new(),
        }
    }

    pub fn params(&self) -> &T::Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut T::Params {
        &mut self.params
    }

    /// Promotes the previous payload, reconciles the live cache against it,
    /// then stages `payloads` for the next call.
    pub fn sync(&mut self, scene: &mut dyn Scene, payloads: Vec<T::Snapshot>) -> SyncReport {
        let mut report = SyncReport::default();

        self.buffer.promote();

        // Destroy before create: a key that vanished and came back is a new entity.
        let gone: Vec<EntityKey> = self
            .live
            .keys()
            .filter(|k| !self.buffer.curr.contains_key(*k))
            .cloned()
            .collect();
        for key in gone {
            if let Some(Some(entity)) = self.live.remove(&key) {
                entity.destroy(scene);
            }
            debug!(kind = T::KIND, key = %key, "destroy");
            report.destroyed.push(key);
        }

        for (key, snapshot) in &self.buffer.curr {
            if self.live.contains_key(key) {
                continue;
            }
            match T::create(scene, snapshot, &self.params) {
                Ok(entity) => {
                    debug!(kind = T::KIND, key = %key, "create");
                    self.live.insert(key.clone(), Some(entity));
                    report.created.push(key.clone());
                }
                Err(e) => {
                    warn!(kind = T::KIND, key = %key, error = %e, "skipping entity");
                    report.skipped += 1;
                }
            }
        }

        self.buffer.stage(payloads);

        for (key, slot) in self.live.iter_mut() {
            if let (Some(entity), Some(curr)) = (slot.as_mut(), self.buffer.curr.get(key)) {
                entity.refresh(scene, curr, self.buffer.next.get(key));
            }
        }

        report.created.sort();
        report.destroyed.sort();
        report
    }

    /// Advances every live entity by one render frame. Returns the keys whose
    /// render object was released on arrival.
    pub fn move_all(&mut self, scene: &mut dyn Scene, dt_ms: f32) -> Vec<EntityKey> {
        let mut released = Vec::new();
        for (key, slot) in self.live.iter_mut() {
            let release = match slot.as_mut() {
                Some(entity) => {
                    entity.advance(scene, dt_ms) && entity.on_arrival() == Arrival::Release
                }
                None => false,
            };
            if release {
                if let Some(entity) = slot.take() {
                    entity.destroy(scene);
                }
                released.push(key.clone());
            }
        }
        released
    }

    /// Destroys every tracked entity and empties both generations.
    pub fn clear(&mut self, scene: &mut dyn Scene) -> SyncReport {
        let mut report = SyncReport::default();
        for (key, slot) in self.live.drain() {
            if let Some(entity) = slot {
                entity.destroy(scene);
            }
            report.destroyed.push(key);
        }
        self.buffer.clear();
        report.destroyed.sort();
        report
    }

    /// Live entity, if it still owns its render object.
    pub fn get(&self, key: &EntityKey) -> Option<&T> {
        self.live.get(key).and_then(Option::as_ref)
    }

    /// Every tracked key, including entities already released on arrival.
    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.live.keys()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Entities that still own a render object.
    pub fn active(&self) -> impl Iterator<Item = (&EntityKey, &T)> {
        self.live
            .iter()
            .filter_map(|(k, slot)| slot.as_ref().map(|e| (k, e)))
    }

    pub fn buffer(&self) -> &SnapshotDiffBuffer<T::Snapshot> {
        &self.buffer
    }
}
