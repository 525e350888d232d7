//! Per-kind tracked entities.
//!
//! - [`Avatar`]: persistent, keyed by name, carries a melee blade.
//! - [`Projectile`]: ephemeral, flies to its spawn destination then vanishes.
//! - [`Collectible`]: static coin.
//!
//! Wire entries are converted into the typed snapshots here, once, so the
//! generic manager never has to probe for fields.

use arena_shared::{
    math::Vec2,
    net::{WireCoin, WirePlayer, WireProjectile, WEAPON_BLADE, WEAPON_CANON},
    render::{RenderHandle, Scene, Shape},
};

use crate::{
    interp::Mover,
    sync::{Arrival, EntityKey, EntityManager, Keyed, SnapshotError, TrackedEntity},
};

pub type AvatarManager = EntityManager<Avatar>;
pub type ProjectileManager = EntityManager<Projectile>;
pub type CollectibleManager = EntityManager<Collectible>;

const DEFAULT_COLOR: u32 = 0xffffff;

/// Weapon currently held by an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weapon {
    #[default]
    None,
    Canon,
    Blade,
}

impl From<u8> for Weapon {
    fn from(v: u8) -> Self {
        match v {
            WEAPON_CANON => Weapon::Canon,
            WEAPON_BLADE => Weapon::Blade,
            _ => Weapon::None,
        }
    }
}

fn finite(kind: &'static str, field: &'static str, v: Vec2) -> Result<Vec2, SnapshotError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SnapshotError::NonFinite { kind, field })
    }
}

fn required<T>(kind: &'static str, field: &'static str, v: Option<T>) -> Result<T, SnapshotError> {
    v.ok_or(SnapshotError::MissingField { kind, field })
}

// ─── Avatar ───

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarSnapshot {
    pub key: EntityKey,
    pub name: String,
    pub color: u32,
    pub pos: Vec2,
    pub dest: Vec2,
    pub weapon: Weapon,
    pub blade_rotation: f32,
}

impl Keyed for AvatarSnapshot {
    fn key(&self) -> EntityKey {
        self.key.clone()
    }
}

impl TryFrom<&WirePlayer> for AvatarSnapshot {
    type Error = SnapshotError;

    fn try_from(p: &WirePlayer) -> Result<Self, Self::Error> {
        const KIND: &str = Avatar::KIND;
        let key = required(
            KIND,
            "name",
            EntityKey::derive(p.id.as_deref(), p.name.as_deref()),
        )?;
        let pos = finite(KIND, "pos", required(KIND, "pos", p.pos)?)?;
        let dest = finite(KIND, "dest", p.dest.unwrap_or(pos))?;
        Ok(Self {
            name: p.name.clone().unwrap_or_else(|| key.to_string()),
            key,
            color: p.color.unwrap_or(DEFAULT_COLOR),
            pos,
            dest,
            weapon: p.current_weapon.map(Weapon::from).unwrap_or_default(),
            blade_rotation: p.blade.map(|b| b.rotation).unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AvatarParams {
    pub speed: f32,
    pub blade_distance: f32,
}

/// Where an avatar should travel after a promotion: from `curr.pos` toward
/// the newer destination, or hold still if the avatar is leaving or the
/// newer entry repeats the current one.
pub fn plan_path(curr: &AvatarSnapshot, next: Option<&AvatarSnapshot>) -> (Vec2, Vec2) {
    match next {
        Some(n) if n.pos != curr.pos || n.dest != curr.dest => (curr.pos, n.dest),
        _ => (curr.pos, curr.pos),
    }
}

pub struct Avatar {
    body: RenderHandle,
    blade: RenderHandle,
    mover: Mover,
    blade_rotation: f32,
    blade_distance: f32,
}

impl Avatar {
    pub fn position(&self) -> Vec2 {
        self.mover.position
    }

    pub fn destination(&self) -> Vec2 {
        self.mover.destination
    }

    pub fn blade_rotation(&self) -> f32 {
        self.blade_rotation
    }

    pub fn blade_handle(&self) -> RenderHandle {
        self.blade
    }

    fn place_blade(&self, scene: &mut dyn Scene) {
        let at = self.mover.position.orbit(self.blade_rotation, self.blade_distance);
        scene.set_position(self.blade, at);
    }
}

impl TrackedEntity for Avatar {
    type Snapshot = AvatarSnapshot;
    type Params = AvatarParams;

    const KIND: &'static str = "avatar";

    fn create(
        scene: &mut dyn Scene,
        s: &AvatarSnapshot,
        params: &AvatarParams,
    ) -> Result<Self, SnapshotError> {
        let body = scene.spawn(
            Shape::Avatar {
                color: s.color,
                label: s.name.clone(),
            },
            s.pos,
        );
        let blade = scene.spawn(Shape::Blade { color: s.color }, s.pos);
        let avatar = Self {
            body,
            blade,
            mover: Mover::at_rest(s.pos, params.speed),
            blade_rotation: s.blade_rotation,
            blade_distance: params.blade_distance,
        };
        scene.set_rotation(blade, s.blade_rotation);
        scene.set_visible(blade, s.weapon == Weapon::Blade);
        avatar.place_blade(scene);
        Ok(avatar)
    }

    fn destroy(self, scene: &mut dyn Scene) {
        scene.despawn(self.blade);
        scene.despawn(self.body);
    }

    fn advance(&mut self, scene: &mut dyn Scene, dt_ms: f32) -> bool {
        let arrived = self.mover.advance(dt_ms);
        scene.set_position(self.body, self.mover.position);
        self.place_blade(scene);
        arrived
    }

    fn on_arrival(&mut self) -> Arrival {
        Arrival::Keep
    }

    fn refresh(
        &mut self,
        scene: &mut dyn Scene,
        curr: &AvatarSnapshot,
        next: Option<&AvatarSnapshot>,
    ) {
        // A leaving avatar keeps its displayed position for its last tick.
        if next.is_some() {
            let (pos, dest) = plan_path(curr, next);
            if self.mover.retarget(pos, dest) {
                scene.set_position(self.body, pos);
            }
        }

        // Rotation is applied as-is; only position is smoothed.
        self.blade_rotation = curr.blade_rotation;
        scene.set_rotation(self.blade, curr.blade_rotation);
        scene.set_visible(self.blade, curr.weapon == Weapon::Blade);
        self.place_blade(scene);
    }

    fn handle(&self) -> RenderHandle {
        self.body
    }
}

// ─── Projectile ───

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub key: EntityKey,
    pub pos: Vec2,
    pub dest: Vec2,
}

impl Keyed for ProjectileSnapshot {
    fn key(&self) -> EntityKey {
        self.key.clone()
    }
}

impl TryFrom<&WireProjectile> for ProjectileSnapshot {
    type Error = SnapshotError;

    fn try_from(p: &WireProjectile) -> Result<Self, Self::Error> {
        const KIND: &str = Projectile::KIND;
        let key = required(KIND, "id", EntityKey::derive(p.id.as_deref(), None))?;
        Ok(Self {
            key,
            pos: finite(KIND, "pos", required(KIND, "pos", p.pos)?)?,
            dest: finite(KIND, "dest", required(KIND, "dest", p.dest)?)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectileParams {
    pub speed: f32,
}

pub struct Projectile {
    handle: RenderHandle,
    mover: Mover,
}

impl Projectile {
    pub fn position(&self) -> Vec2 {
        self.mover.position
    }
}

impl TrackedEntity for Projectile {
    type Snapshot = ProjectileSnapshot;
    type Params = ProjectileParams;

    const KIND: &'static str = "projectile";

    fn create(
        scene: &mut dyn Scene,
        s: &ProjectileSnapshot,
        params: &ProjectileParams,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            handle: scene.spawn(Shape::Projectile, s.pos),
            mover: Mover::new(s.pos, s.dest, params.speed),
        })
    }

    fn destroy(self, scene: &mut dyn Scene) {
        scene.despawn(self.handle);
    }

    fn advance(&mut self, scene: &mut dyn Scene, dt_ms: f32) -> bool {
        let arrived = self.mover.advance(dt_ms);
        scene.set_position(self.handle, self.mover.position);
        arrived
    }

    fn handle(&self) -> RenderHandle {
        self.handle
    }
}

// ─── Collectible ───

#[derive(Debug, Clone, PartialEq)]
pub struct CoinSnapshot {
    pub key: EntityKey,
    pub pos: Vec2,
    pub value: i64,
}

impl Keyed for CoinSnapshot {
    fn key(&self) -> EntityKey {
        self.key.clone()
    }
}

impl TryFrom<&WireCoin> for CoinSnapshot {
    type Error = SnapshotError;

    fn try_from(c: &WireCoin) -> Result<Self, Self::Error> {
        const KIND: &str = Collectible::KIND;
        Ok(Self {
            key: required(KIND, "id", EntityKey::derive(c.id.as_deref(), None))?,
            pos: finite(KIND, "pos", required(KIND, "pos", c.pos)?)?,
            value: c.value.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollectibleParams {
    /// Diameter used for coins created from now on.
    pub size: f32,
}

pub struct Collectible {
    handle: RenderHandle,
    position: Vec2,
    value: i64,
}

impl Collectible {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl TrackedEntity for Collectible {
    type Snapshot = CoinSnapshot;
    type Params = CollectibleParams;

    const KIND: &'static str = "coin";

    fn create(
        scene: &mut dyn Scene,
        s: &CoinSnapshot,
        params: &CollectibleParams,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            handle: scene.spawn(Shape::Coin { size: params.size }, s.pos),
            position: s.pos,
            value: s.value,
        })
    }

    fn destroy(self, scene: &mut dyn Scene) {
        scene.despawn(self.handle);
    }

    fn advance(&mut self, _scene: &mut dyn Scene, _dt_ms: f32) -> bool {
        false
    }

    fn on_arrival(&mut self) -> Arrival {
        Arrival::Keep
    }

    fn handle(&self) -> RenderHandle {
        self.handle
    }
}
