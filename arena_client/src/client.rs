//! Client implementation.
//!
//! The client runs two cooperating loops:
//! - a network side that decodes server frames and queues them
//!   ([`GameClient::push_message`]), never touching entities,
//! - a render side that, once per frame, applies the queued messages, moves
//!   every entity, then updates the camera ([`GameClient::tick`]).
//!
//! Everything that mutates entities happens on the render side.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use arena_shared::{
    config::ClientConfig,
    net::{decode_message, FramedConn, ServerMessage},
    render::Scene,
};
use async_trait::async_trait;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader, Lines},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    camera::{CameraFollowController, FollowStore},
    input::InputFrame,
    router::{GameStateRouter, RouterEvent},
    sync::{EntityKey, TrackedEntity},
};

/// Client connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the first message.
    Connecting,
    /// Receiving game state.
    Connected,
    /// Source closed; every entity has been cleared.
    Disconnected,
}

/// High-level game client.
pub struct GameClient<S: Scene> {
    pub state: ClientState,
    scene: S,
    router: GameStateRouter,
    camera: CameraFollowController,
    pending: VecDeque<ServerMessage>,
    frames: u64,
}

impl<S: Scene> GameClient<S> {
    pub fn new(cfg: &ClientConfig, scene: S, store: Box<dyn FollowStore>) -> Self {
        Self {
            state: ClientState::Connecting,
            scene,
            router: GameStateRouter::new(cfg.entities.clone()),
            camera: CameraFollowController::new(cfg.camera.clone(), store),
            pending: VecDeque::new(),
            frames: 0,
        }
    }

    /// Network side: queue one decoded message for the next frame.
    pub fn push_message(&mut self, msg: ServerMessage) {
        if self.state == ClientState::Connecting {
            self.state = ClientState::Connected;
        }
        self.pending.push_back(msg);
    }

    /// Render side: dispatch queued messages, interpolate, update the camera.
    pub fn tick(&mut self, dt_ms: f32, input: &InputFrame) -> Vec<RouterEvent> {
        let mut events = Vec::new();
        while let Some(msg) = self.pending.pop_front() {
            events.extend(self.router.dispatch(&mut self.scene, &mut self.camera, msg));
        }
        self.router.advance(&mut self.scene, dt_ms);
        self.camera.update(dt_ms, input, &self.scene);
        self.frames += 1;
        events
    }

    /// Drops every entity and pending message. Idempotent.
    pub fn disconnect(&mut self) {
        if self.state != ClientState::Disconnected {
            info!("Disconnected from server");
        }
        self.pending.clear();
        self.router.clear(&mut self.scene, &mut self.camera);
        self.state = ClientState::Disconnected;
    }

    /// Follows the avatar `key` now if it exists, otherwise as soon as it
    /// appears.
    pub fn follow(&mut self, key: EntityKey) {
        match self.router.avatars().get(&key) {
            Some(avatar) => self.camera.follow(key, avatar.handle()),
            None => self.camera.select(key),
        }
    }

    pub fn unfollow(&mut self) {
        self.camera.unfollow();
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn router(&self) -> &GameStateRouter {
        &self.router
    }

    pub fn camera(&self) -> &CameraFollowController {
        &self.camera
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One-line summary for logs.
    pub fn status(&self) -> String {
        let cam = self.camera.camera();
        format!(
            "state={:?} tick={} round={} avatars={} projectiles={} coins={} camera=({:.0},{:.0})x{:.1} following={}",
            self.state,
            self.router.tick(),
            self.router.round(),
            self.router.avatars().len(),
            self.router.projectiles().len(),
            self.router.coins().len(),
            cam.center.x,
            cam.center.y,
            cam.zoom,
            self.camera
                .target()
                .map(|t| t.key.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

/// Where decoded server messages come from.
#[async_trait]
pub trait MessageSource: Send {
    /// Next message, or `None` once the source is closed.
    async fn next_message(&mut self) -> anyhow::Result<Option<ServerMessage>>;
}

/// Live game server over the framed TCP channel.
pub struct TcpSource {
    conn: FramedConn,
}

impl TcpSource {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = addr.parse().context("parse server_addr")?;
        info!(server = %addr, "Connecting to server");
        let conn = FramedConn::connect(addr).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl MessageSource for TcpSource {
    async fn next_message(&mut self) -> anyhow::Result<Option<ServerMessage>> {
        while let Some(frame) = self.conn.recv_frame().await? {
            match decode_message(&frame) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => warn!(error = %e, len = frame.len(), "Skipping undecodable frame"),
            }
        }
        Ok(None)
    }
}

/// Recorded session: one JSON message per line, replayed at a fixed pace.
pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
    pace: Duration,
    started: bool,
}

impl ReplaySource {
    pub async fn open(path: &Path, pace: Duration) -> anyhow::Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("open replay {}", path.display()))?;
        info!(path = %path.display(), pace_ms = pace.as_millis() as u64, "Replaying session");
        Ok(Self {
            lines: BufReader::new(file).lines(),
            pace,
            started: false,
        })
    }
}

#[async_trait]
impl MessageSource for ReplaySource {
    async fn next_message(&mut self) -> anyhow::Result<Option<ServerMessage>> {
        while let Some(line) = self.lines.next_line().await.context("read replay")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match decode_message(line.as_bytes()) {
                Ok(msg) => {
                    if self.started && !self.pace.is_zero() {
                        tokio::time::sleep(self.pace).await;
                    }
                    self.started = true;
                    return Ok(Some(msg));
                }
                Err(e) => warn!(error = %e, "Skipping undecodable replay line"),
            }
        }
        Ok(None)
    }
}

/// Network task: forwards every message from `source` until it closes or
/// the receiving side goes away.
pub async fn pump(
    mut source: impl MessageSource,
    tx: mpsc::Sender<ServerMessage>,
) -> anyhow::Result<u64> {
    let mut forwarded = 0u64;
    while let Some(msg) = source.next_message().await? {
        if tx.send(msg).await.is_err() {
            debug!("Render side closed, stopping network task");
            break;
        }
        forwarded += 1;
    }
    info!(forwarded, "Message source closed");
    Ok(forwarded)
}
