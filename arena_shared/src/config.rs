//! Configuration system.
//!
//! Loads client configuration from JSON strings/files. Every field has a
//! default, so a partial document (or none at all) is valid.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// World units per server unit.
pub const SCALE: f32 = 30.0;

/// Root client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Game server address, e.g. `127.0.0.1:40000`.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Render loop rate.
    #[serde(default = "default_render_hz")]
    pub render_hz: u32,
    /// Where the followed entity key is persisted between runs.
    #[serde(default = "default_follow_file")]
    pub follow_file: PathBuf,
    #[serde(default)]
    pub entities: EntityConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

/// Per-kind tunables for the tracked entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Avatar speed in world units per second.
    pub avatar_speed: f32,
    /// Projectile speed in world units per second.
    pub projectile_speed: f32,
    /// Coin diameter per round (index = round number).
    pub coin_sizes: Vec<f32>,
    /// Distance between an avatar and the center of its blade.
    pub blade_distance: f32,
    /// Tick at which the second round starts (drives the round banner).
    pub round_two_start_tick: u32,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            avatar_speed: 1.15 * SCALE,
            projectile_speed: 3.0 * SCALE,
            coin_sizes: vec![0.5 * SCALE, 4.0 * SCALE],
            blade_distance: 1.5 * SCALE,
            round_two_start_tick: 4 * 60 * 3,
        }
    }
}

impl EntityConfig {
    /// Coin diameter for `round`, falling back to the last configured size.
    pub fn coin_size(&self, round: u32) -> f32 {
        self.coin_sizes
            .get(round as usize)
            .or_else(|| self.coin_sizes.last())
            .copied()
            .unwrap_or(0.5 * SCALE)
    }
}

/// Camera tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Manual pan speed in world units per second (doubled with SHIFT).
    pub pan_speed: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
    pub initial_zoom: f32,
    /// Drop live tracking when the followed entity is destroyed. The
    /// persisted selection is kept either way.
    pub release_on_destroy: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pan_speed: 500.0,
            zoom_min: 0.3,
            zoom_max: 1.1,
            zoom_step: 0.1,
            initial_zoom: 1.0,
            release_on_destroy: true,
        }
    }
}

fn default_server_addr() -> String {
    "127.0.0.1:40000".to_string()
}

fn default_render_hz() -> u32 {
    60
}

fn default_follow_file() -> PathBuf {
    PathBuf::from("follow.json")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            render_hz: default_render_hz(),
            follow_file: default_follow_file(),
            entities: EntityConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON and rejects values the client cannot run with.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(s).context("deserialize config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.render_hz == 0 {
            bail!("render_hz must be at least 1");
        }
        Ok(())
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let cfg = ClientConfig::from_json_str(r#"{"render_hz": 30, "camera": {"pan_speed": 250.0}}"#)
            .unwrap();
        assert_eq!(cfg.render_hz, 30);
        assert_eq!(cfg.camera.pan_speed, 250.0);
        assert_eq!(cfg.camera.zoom_max, 1.1);
        assert_eq!(cfg.server_addr, "127.0.0.1:40000");
        assert_eq!(cfg.entities.projectile_speed, 90.0);
    }

    #[test]
    fn zero_render_rate_is_rejected() {
        let err = ClientConfig::from_json_str(r#"{"render_hz": 0}"#).unwrap_err();
        assert!(err.to_string().contains("render_hz"));
        assert!(ClientConfig::from_json_str(r#"{"render_hz": 1}"#).is_ok());
    }

    #[test]
    fn coin_size_falls_back_to_last_round() {
        let cfg = EntityConfig::default();
        assert_eq!(cfg.coin_size(0), 15.0);
        assert_eq!(cfg.coin_size(1), 120.0);
        assert_eq!(cfg.coin_size(7), 120.0);
    }
}
