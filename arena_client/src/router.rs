//! Game state router.
//!
//! Dispatches decoded server messages to the per-kind managers. Wire entries
//! are converted to typed snapshots here; an entry that fails conversion is
//! logged and left out, the rest of the tick goes through.

use arena_shared::{
    config::EntityConfig,
    net::{GameState, ServerMessage},
    render::Scene,
};
use tracing::{debug, info, warn};

use crate::{
    camera::CameraFollowController,
    entities::{
        AvatarManager, AvatarParams, AvatarSnapshot, CoinSnapshot, CollectibleManager,
        CollectibleParams, ProjectileManager, ProjectileParams, ProjectileSnapshot,
    },
    sync::{SyncReport, TrackedEntity},
};

/// Notable things a dispatch produced, for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    /// A round just started; show the banner.
    RoundBanner { round: u32, tick: u32 },
    /// The game ended and every entity was cleared.
    GameEnded,
}

/// One row of the current-game scoreboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: i64,
    pub color: u32,
}

pub struct GameStateRouter {
    cfg: EntityConfig,
    avatars: AvatarManager,
    projectiles: ProjectileManager,
    coins: CollectibleManager,
    tick: u32,
    round: u32,
    scoreboard: Vec<ScoreEntry>,
}

impl GameStateRouter {
    pub fn new(cfg: EntityConfig) -> Self {
        Self {
            avatars: AvatarManager::new(AvatarParams {
                speed: cfg.avatar_speed,
                blade_distance: cfg.blade_distance,
            }),
            projectiles: ProjectileManager::new(ProjectileParams {
                speed: cfg.projectile_speed,
            }),
            coins: CollectibleManager::new(CollectibleParams {
                size: cfg.coin_size(0),
            }),
            cfg,
            tick: 0,
            round: 0,
            scoreboard: Vec::new(),
        }
    }

    pub fn dispatch(
        &mut self,
        scene: &mut dyn Scene,
        camera: &mut CameraFollowController,
        msg: ServerMessage,
    ) -> Vec<RouterEvent> {
        match msg {
            ServerMessage::GameState(state) => self.handle_game_state(scene, camera, state),
            ServerMessage::GameEnd => {
                info!(tick = self.tick, "Game ended");
                self.clear(scene, camera);
                vec![RouterEvent::GameEnded]
            }
            ServerMessage::MapState => {
                debug!("Map state ignored by entity core");
                Vec::new()
            }
            ServerMessage::Unknown(kind) => {
                debug!(kind, "Unhandled message type");
                Vec::new()
            }
        }
    }

    fn handle_game_state(
        &mut self,
        scene: &mut dyn Scene,
        camera: &mut CameraFollowController,
        state: GameState,
    ) -> Vec<RouterEvent> {
        let mut events = Vec::new();

        self.tick = state.tick;
        self.round = state.round;
        self.coins.params_mut().size = self.cfg.coin_size(state.round);
        if state.tick == 1 || state.tick == self.cfg.round_two_start_tick {
            info!(round = state.round, tick = state.tick, "Round start");
            events.push(RouterEvent::RoundBanner {
                round: state.round,
                tick: state.tick,
            });
        }

        let mut avatars = Vec::with_capacity(state.players.len());
        let mut projectiles = Vec::new();
        for p in &state.players {
            match AvatarSnapshot::try_from(p) {
                Ok(s) => avatars.push(s),
                Err(e) => warn!(error = %e, "Dropping player entry"),
            }
            for b in &p.projectiles {
                match ProjectileSnapshot::try_from(b) {
                    Ok(s) => projectiles.push(s),
                    Err(e) => warn!(error = %e, "Dropping projectile entry"),
                }
            }
        }
        let mut coins = Vec::with_capacity(state.coins.len());
        for c in &state.coins {
            match CoinSnapshot::try_from(c) {
                Ok(s) => coins.push(s),
                Err(e) => warn!(error = %e, "Dropping coin entry"),
            }
        }

        let report = self.avatars.sync(scene, avatars);
        self.notify_camera(camera, &report);
        let bullets = self.projectiles.sync(scene, projectiles);
        let coin_report = self.coins.sync(scene, coins);
        debug!(
            tick = state.tick,
            avatars_created = report.created.len(),
            avatars_destroyed = report.destroyed.len(),
            projectiles_created = bullets.created.len(),
            coins_created = coin_report.created.len(),
            "Synced game state"
        );

        self.scoreboard = state
            .players
            .iter()
            .filter_map(|p| {
                Some(ScoreEntry {
                    name: p.name.clone()?,
                    score: p.score.unwrap_or(0),
                    color: p.color.unwrap_or(0),
                })
            })
            .collect();
        self.scoreboard
            .sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

        events
    }

    fn notify_camera(&self, camera: &mut CameraFollowController, report: &SyncReport) {
        for key in &report.destroyed {
            camera.on_entity_destroyed(key);
        }
        for key in &report.created {
            if let Some(avatar) = self.avatars.get(key) {
                camera.on_entity_created(key, avatar.handle());
            }
        }
    }

    /// Advances every moving entity by one render frame.
    pub fn advance(&mut self, scene: &mut dyn Scene, dt_ms: f32) {
        self.avatars.move_all(scene, dt_ms);
        let landed = self.projectiles.move_all(scene, dt_ms);
        if !landed.is_empty() {
            debug!(count = landed.len(), "Projectiles landed");
        }
    }

    /// Destroys every tracked entity. Safe to call repeatedly.
    pub fn clear(&mut self, scene: &mut dyn Scene, camera: &mut CameraFollowController) {
        let report = self.avatars.clear(scene);
        self.notify_camera(camera, &report);
        self.projectiles.clear(scene);
        self.coins.clear(scene);
        self.scoreboard.clear();
        self.tick = 0;
        self.round = 0;
    }

    pub fn avatars(&self) -> &AvatarManager {
        &self.avatars
    }

    pub fn projectiles(&self) -> &ProjectileManager {
        &self.projectiles
    }

    pub fn coins(&self) -> &CollectibleManager {
        &self.coins
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn scoreboard(&self) -> &[ScoreEntry] {
        &self.scoreboard
    }
}

#[cfg(test)]
mod tests {
    use arena_shared::math::Vec2;
    use arena_shared::net::{WireCoin, WirePlayer, WireProjectile};
    use arena_shared::render::HeadlessScene;

    use super::*;
    use crate::camera::MemoryFollowStore;
    use crate::sync::EntityKey;

    fn camera() -> CameraFollowController {
        CameraFollowController::new(Default::default(), Box::<MemoryFollowStore>::default())
    }

    fn player(name: &str, score: i64, bullets: &[&str]) -> WirePlayer {
        WirePlayer {
            name: Some(name.to_string()),
            score: Some(score),
            pos: Some(Vec2::ZERO),
            dest: Some(Vec2::ZERO),
            projectiles: bullets
                .iter()
                .map(|id| WireProjectile {
                    id: Some(id.to_string()),
                    pos: Some(Vec2::ZERO),
                    dest: Some(Vec2::new(300.0, 0.0)),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn tick(tick: u32, players: Vec<WirePlayer>, coins: Vec<WireCoin>) -> ServerMessage {
        ServerMessage::GameState(GameState {
            tick,
            round: 0,
            players,
            coins,
        })
    }

    #[test]
    fn flattens_projectiles_and_skips_bad_entries() {
        let mut scene = HeadlessScene::new();
        let mut cam = camera();
        let mut router = GameStateRouter::new(EntityConfig::default());

        let nameless = WirePlayer {
            pos: Some(Vec2::ZERO),
            projectiles: vec![WireProjectile {
                id: Some("orphan".into()),
                pos: Some(Vec2::ZERO),
                dest: Some(Vec2::new(10.0, 0.0)),
            }],
            ..Default::default()
        };
        let coins = vec![
            WireCoin {
                id: Some("c1".into()),
                pos: Some(Vec2::new(1.0, 1.0)),
                value: Some(1),
            },
            WireCoin {
                id: None,
                pos: Some(Vec2::ZERO),
                value: None,
            },
        ];
        let players = vec![player("p1", 3, &["b1", "b2"]), player("p2", 9, &["b3"]), nameless];

        router.dispatch(&mut scene, &mut cam, tick(5, players.clone(), coins.clone()));
        router.dispatch(&mut scene, &mut cam, tick(6, players, coins));

        assert_eq!(router.avatars().len(), 2);
        assert_eq!(router.projectiles().len(), 4);
        assert_eq!(router.coins().len(), 1);
        assert_eq!(router.tick(), 6);

        let names: Vec<_> = router.scoreboard().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["p2", "p1"]);
    }

    #[test]
    fn round_banner_on_first_tick_and_round_two() {
        let mut scene = HeadlessScene::new();
        let mut cam = camera();
        let mut router = GameStateRouter::new(EntityConfig::default());

        let events = router.dispatch(&mut scene, &mut cam, tick(1, vec![], vec![]));
        assert_eq!(events, vec![RouterEvent::RoundBanner { round: 0, tick: 1 }]);
        assert!(router
            .dispatch(&mut scene, &mut cam, tick(2, vec![], vec![]))
            .is_empty());
        assert_eq!(
            router
                .dispatch(&mut scene, &mut cam, tick(720, vec![], vec![]))
                .len(),
            1
        );
    }

    #[test]
    fn game_end_clears_everything() {
        let mut scene = HeadlessScene::new();
        let mut cam = camera();
        let mut router = GameStateRouter::new(EntityConfig::default());
        let players = vec![player("p1", 0, &["b1"])];
        router.dispatch(&mut scene, &mut cam, tick(3, players.clone(), vec![]));
        router.dispatch(&mut scene, &mut cam, tick(4, players, vec![]));
        assert!(scene.live() > 0);

        let events = router.dispatch(&mut scene, &mut cam, ServerMessage::GameEnd);
        assert_eq!(events, vec![RouterEvent::GameEnded]);
        assert_eq!(scene.live(), 0);
        assert!(router.avatars().is_empty());
        assert_eq!((router.tick(), router.round()), (0, 0));
        assert!(router.scoreboard().is_empty());

        router.dispatch(&mut scene, &mut cam, ServerMessage::GameEnd);
        assert_eq!(scene.live(), 0);
    }

    #[test]
    fn persisted_selection_is_followed_when_avatar_appears() {
        let mut scene = HeadlessScene::new();
        let mut cam = CameraFollowController::new(
            Default::default(),
            Box::new(MemoryFollowStore::with_key(EntityKey::new("p2"))),
        );
        let mut router = GameStateRouter::new(EntityConfig::default());
        let players = vec![player("p1", 0, &[]), player("p2", 0, &[])];
        router.dispatch(&mut scene, &mut cam, tick(1, players.clone(), vec![]));
        assert!(cam.target().is_none());

        router.dispatch(&mut scene, &mut cam, tick(2, players, vec![]));
        assert_eq!(cam.target().map(|t| t.key.clone()), Some(EntityKey::new("p2")));

        router.dispatch(&mut scene, &mut cam, tick(3, vec![], vec![]));
        router.dispatch(&mut scene, &mut cam, tick(4, vec![], vec![]));
        assert!(cam.target().is_none());
        assert_eq!(cam.selection(), Some(&EntityKey::new("p2")));
    }

    #[test]
    fn map_and_unknown_messages_are_ignored() {
        let mut scene = HeadlessScene::new();
        let mut cam = camera();
        let mut router = GameStateRouter::new(EntityConfig::default());
        assert!(router
            .dispatch(&mut scene, &mut cam, ServerMessage::MapState)
            .is_empty());
        assert!(router
            .dispatch(&mut scene, &mut cam, ServerMessage::Unknown(42))
            .is_empty());
        assert_eq!(scene.spawned(), 0);
    }
}
