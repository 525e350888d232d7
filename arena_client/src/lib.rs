//! `arena_client`
//!
//! Client-side systems:
//! - Snapshot diffing and entity lifecycle (generic over entity kinds)
//! - Dead-reckoning interpolation for every moving entity
//! - Per-kind managers for avatars, projectiles, and coins
//! - Camera follow with manual override
//! - Message routing and the network/render client shell

pub mod camera;
pub mod client;
pub mod entities;
pub mod input;
pub mod interp;
pub mod router;
pub mod sync;

pub use camera::CameraFollowController;
pub use client::GameClient;
pub use router::GameStateRouter;
pub use sync::EntityManager;
