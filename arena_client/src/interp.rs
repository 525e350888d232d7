//! Interpolation.
//!
//! The server sends discrete snapshots at its own tick rate. The client renders
//! at a faster, regular rate and moves every tracked entity toward its latest
//! known destination at a fixed speed (dead reckoning). Positions are only
//! retargeted when a snapshot generation is promoted; stepping runs every frame.

use arena_shared::math::Vec2;

/// Offset below which a retarget keeps the currently displayed position.
pub const RESNAP_EPSILON: f32 = 0.01;

/// Result of one interpolation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub position: Vec2,
    /// The destination was reached during this step.
    pub arrived: bool,
}

/// Moves `pos` toward `dest` at `speed` units/second for `dt_ms` milliseconds.
///
/// Never overshoots: if the remaining distance fits in this step the result
/// is exactly `dest`. Zero distance snaps without normalizing, so no NaN can
/// appear. Negative speed or elapsed time count as zero.
pub fn step_towards(pos: Vec2, dest: Vec2, speed: f32, dt_ms: f32) -> Step {
    let direction = dest - pos;
    let distance = direction.length();
    let travel = speed.max(0.0) * (dt_ms.max(0.0) / 1000.0);

    if distance == 0.0 || distance <= travel {
        return Step {
            position: dest,
            arrived: true,
        };
    }

    Step {
        position: pos + direction.normalize_or_zero() * travel,
        arrived: false,
    }
}

/// Interpolation state of one tracked entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mover {
    pub position: Vec2,
    pub destination: Vec2,
    pub speed: f32,
}

impl Mover {
    pub fn new(position: Vec2, destination: Vec2, speed: f32) -> Self {
        Self {
            position,
            destination,
            speed,
        }
    }

    /// A mover already at rest on `position`.
    pub fn at_rest(position: Vec2, speed: f32) -> Self {
        Self::new(position, position, speed)
    }

    /// Advances one frame. Returns true on arrival.
    pub fn advance(&mut self, dt_ms: f32) -> bool {
        let step = step_towards(self.position, self.destination, self.speed, dt_ms);
        self.position = step.position;
        step.arrived
    }

    /// Points the mover at `dest`, starting from `pos`.
    ///
    /// The displayed position only jumps to `pos` if it drifted further than
    /// [`RESNAP_EPSILON`] on either axis; small drift is absorbed to avoid
    /// visible jitter. Returns true if the position was resnapped.
    pub fn retarget(&mut self, pos: Vec2, dest: Vec2) -> bool {
        self.destination = dest;
        if self.position.approx_eq(pos, RESNAP_EPSILON) {
            return false;
        }
        self.position = pos;
        true
    }
}
