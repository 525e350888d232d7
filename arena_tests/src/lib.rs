//! Shared fixtures for the integration tests.

use std::net::SocketAddr;

use arena_client::{camera::MemoryFollowStore, GameClient};
use arena_shared::{
    config::ClientConfig,
    math::Vec2,
    net::{FramedConn, GameState, ServerMessage, WireCoin, WirePlayer, WireProjectile},
    render::HeadlessScene,
};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::info;

/// Installs a test-friendly subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Client over a headless scene with an in-memory follow store.
pub fn headless_client() -> GameClient<HeadlessScene> {
    GameClient::new(
        &ClientConfig::default(),
        HeadlessScene::new(),
        Box::<MemoryFollowStore>::default(),
    )
}

pub fn player(name: &str, pos: Vec2, dest: Vec2) -> WirePlayer {
    WirePlayer {
        name: Some(name.to_string()),
        color: Some(0x00ff00),
        pos: Some(pos),
        dest: Some(dest),
        ..Default::default()
    }
}

pub fn projectile(id: &str, pos: Vec2, dest: Vec2) -> WireProjectile {
    WireProjectile {
        id: Some(id.to_string()),
        pos: Some(pos),
        dest: Some(dest),
    }
}

pub fn coin(id: &str, pos: Vec2) -> WireCoin {
    WireCoin {
        id: Some(id.to_string()),
        pos: Some(pos),
        value: Some(1),
    }
}

pub fn game_state(tick: u32, players: Vec<WirePlayer>, coins: Vec<WireCoin>) -> ServerMessage {
    ServerMessage::GameState(GameState {
        tick,
        round: 0,
        players,
        coins,
    })
}

/// Accepts one connection on an ephemeral port, sends `script` as framed
/// messages, then closes the stream.
pub async fn serve_script(
    script: Vec<ServerMessage>,
) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, frames = script.len(), "Fake server accepted client");
        let mut conn = FramedConn::new(stream);
        // Not JSON: the client must skip it and keep going.
        conn.send_frame(b"\x01\x02garbage").await?;
        for msg in &script {
            conn.send_message(msg).await?;
        }
        Ok(())
    });
    Ok((addr, handle))
}
