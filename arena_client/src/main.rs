//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--addr 127.0.0.1:40000] [--config client.json]
//!                                [--replay session.jsonl] [--replay-tick-ms 250]
//!                                [--fps 60] [--follow <name>]
//!
//! The client connects to the game server (or replays a recorded session),
//! drives the entity core at a fixed render rate against a headless scene,
//! and logs a status line once per second.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use arena_client::client::{pump, ReplaySource, TcpSource};
use arena_client::{camera::JsonFileFollowStore, input::InputFrame, sync::EntityKey, GameClient};
use arena_shared::{config::ClientConfig, render::HeadlessScene};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    addr: Option<String>,
    fps: Option<u32>,
    replay: Option<PathBuf>,
    replay_tick_ms: u64,
    follow: Option<String>,
}

fn parse_args() -> Args {
    let mut out = Args {
        replay_tick_ms: 250,
        ..Args::default()
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--addr" if i + 1 < args.len() => {
                out.addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--fps" if i + 1 < args.len() => {
                out.fps = args[i + 1].parse().ok();
                i += 2;
            }
            "--replay" if i + 1 < args.len() => {
                out.replay = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--replay-tick-ms" if i + 1 < args.len() => {
                out.replay_tick_ms = args[i + 1].parse().unwrap_or(250);
                i += 2;
            }
            "--follow" if i + 1 < args.len() => {
                out.follow = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let mut cfg = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(addr) = args.addr.clone() {
        cfg.server_addr = addr;
    }
    if let Some(fps) = args.fps {
        cfg.render_hz = fps.max(1);
    }
    cfg.validate()?;
    info!(server = %cfg.server_addr, render_hz = cfg.render_hz, "Starting client");

    let store = Box::new(JsonFileFollowStore::new(&cfg.follow_file));
    let mut client = GameClient::new(&cfg, HeadlessScene::new(), store);
    if let Some(name) = args.follow {
        client.follow(EntityKey::new(name));
    }

    let (tx, mut rx) = mpsc::channel(64);
    let network = match &args.replay {
        Some(path) => {
            let source =
                ReplaySource::open(path, Duration::from_millis(args.replay_tick_ms)).await?;
            tokio::spawn(pump(source, tx))
        }
        None => {
            let source = TcpSource::connect(&cfg.server_addr)
                .await
                .context("connect")?;
            tokio::spawn(pump(source, tx))
        }
    };

    let frame = Duration::from_secs_f32(1.0 / cfg.render_hz as f32);
    let mut interval = tokio::time::interval(frame);
    let mut last = tokio::time::Instant::now();
    let input = InputFrame::default();

    loop {
        interval.tick().await;
        let now = tokio::time::Instant::now();
        let dt_ms = now.duration_since(last).as_secs_f32() * 1000.0;
        last = now;

        let mut closed = false;
        loop {
            match rx.try_recv() {
                Ok(msg) => client.push_message(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }

        for event in client.tick(dt_ms, &input) {
            info!(?event, "Game event");
        }

        if client.frames() % u64::from(cfg.render_hz) == 0 {
            info!(status = %client.status(), "Client");
        }

        if closed {
            client.disconnect();
            break;
        }
    }

    match network.await {
        Ok(Ok(count)) => info!(messages = count, "Network task finished"),
        Ok(Err(e)) => warn!(error = %e, "Network task failed"),
        Err(e) => warn!(error = %e, "Network task panicked"),
    }
    info!(status = %client.status(), "Client stopped");

    Ok(())
}
