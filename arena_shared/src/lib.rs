//! `arena_shared`
//!
//! Libraries shared by the arena client and its tooling.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - Clear separation of concerns (math, config, net, render).
//! - Traits for abstraction and dependency injection.
//! - No `unsafe`.

pub mod config;
pub mod math;
pub mod net;
pub mod render;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::render::*;
}
