//! Networking primitives.
//!
//! Goals:
//! - Describe the decoded server messages the client core consumes.
//! - Keep partial entries decodable so they can be rejected one at a time.
//! - Provide the length-prefixed frame channel used to reach the game server.
//!
//! Message bodies are JSON objects discriminated by an integer `type` field.

use std::net::SocketAddr;

use anyhow::{bail, Context};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::warn;

use crate::math::Vec2;

/// Game-state tick.
pub const MSG_GAME_STATE: u64 = 1;
/// Map/start; consumed by the terrain collaborator, not by the entity core.
pub const MSG_MAP_STATE: u64 = 4;
/// Game end.
pub const MSG_GAME_END: u64 = 5;

/// Largest frame accepted from the wire.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Weapon currently held by a player.
pub const WEAPON_NONE: u8 = 0;
pub const WEAPON_CANON: u8 = 1;
pub const WEAPON_BLADE: u8 = 2;

/// Decoded server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    GameState(GameState),
    MapState,
    GameEnd,
    Unknown(u64),
}

impl ServerMessage {
    pub fn kind(&self) -> u64 {
        match self {
            ServerMessage::GameState(_) => MSG_GAME_STATE,
            ServerMessage::MapState => MSG_MAP_STATE,
            ServerMessage::GameEnd => MSG_GAME_END,
            ServerMessage::Unknown(k) => *k,
        }
    }
}

/// Body of a game-state tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub tick: u32,
    #[serde(default)]
    pub round: u32,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub players: Vec<WirePlayer>,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub coins: Vec<WireCoin>,
}

/// Decodes a list element by element; an element of the wrong shape is
/// logged and dropped instead of failing the whole body.
fn skip_malformed<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<Value>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping malformed wire entry");
                None
            }
        })
        .collect())
}

/// Melee weapon state as sent by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WireBlade {
    #[serde(default)]
    pub rotation: f32,
}

/// One player entry. Fields are optional on the wire; the router decides
/// which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WirePlayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_weapon: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blade: Option<WireBlade>,
    #[serde(default, deserialize_with = "skip_malformed")]
    pub projectiles: Vec<WireProjectile>,
}

/// One projectile entry, nested inside its owner's player entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireProjectile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<Vec2>,
}

/// One coin entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireCoin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

/// Decodes one message body.
pub fn decode_message(b: &[u8]) -> anyhow::Result<ServerMessage> {
    let value: Value = serde_json::from_slice(b).context("deserialize message")?;
    let kind = value
        .get("type")
        .and_then(Value::as_u64)
        .context("message has no integer `type`")?;

    let msg = match kind {
        MSG_GAME_STATE => {
            ServerMessage::GameState(serde_json::from_value(value).context("game state body")?)
        }
        MSG_MAP_STATE => ServerMessage::MapState,
        MSG_GAME_END => ServerMessage::GameEnd,
        other => ServerMessage::Unknown(other),
    };
    Ok(msg)
}

/// Encodes one message body (used by tools and fake servers).
pub fn encode_message(msg: &ServerMessage) -> anyhow::Result<Bytes> {
    let mut body = match msg {
        ServerMessage::GameState(state) => serde_json::to_value(state).context("serialize state")?,
        _ => Value::Object(Default::default()),
    };
    match body.as_object_mut() {
        Some(obj) => {
            obj.insert("type".to_string(), Value::from(msg.kind()));
        }
        None => bail!("message body is not an object"),
    }
    let payload = serde_json::to_vec(&body).context("serialize message")?;
    Ok(Bytes::from(payload))
}

/// Reliable, length-prefixed (u32 BE) frame channel over TCP.
#[derive(Debug)]
pub struct FramedConn {
    stream: TcpStream,
}

impl FramedConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        Ok(Self::new(stream))
    }

    pub async fn send_frame(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(payload);
        self.stream.write_all(&buf).await.context("tcp write")?;
        Ok(())
    }

    pub async fn send_message(&mut self, msg: &ServerMessage) -> anyhow::Result<()> {
        let payload = encode_message(msg)?;
        self.send_frame(&payload).await
    }

    /// Reads one frame. `None` means the peer closed the stream cleanly
    /// between frames.
    pub async fn recv_frame(&mut self) -> anyhow::Result<Option<Bytes>> {
        let mut len_buf = [0u8; 4];
        // EOF before the first prefix byte is a clean close; after it, a
        // truncated frame.
        if self.stream.read(&mut len_buf[..1]).await.context("tcp read len")? == 0 {
            return Ok(None);
        }
        self.stream
            .read_exact(&mut len_buf[1..])
            .await
            .context("tcp read len")?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            bail!("frame of {len} bytes exceeds limit");
        }
        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .context("tcp read payload")?;
        Ok(Some(Bytes::from(payload)))
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}
