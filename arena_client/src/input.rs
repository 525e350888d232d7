//! Input handling.
//!
//! The windowing layer samples the keyboard and mouse wheel once per render
//! frame and hands the result to the camera as an [`InputFrame`]. Only the
//! keys the camera cares about are modeled.

use bitflags::bitflags;

bitflags! {
    /// Keys held down during a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Keys: u16 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const UP = 1 << 2;
        const DOWN = 1 << 3;
        const A = 1 << 4;
        const D = 1 << 5;
        const W = 1 << 6;
        const S = 1 << 7;
        const SHIFT = 1 << 8;

        const DIRECTIONAL = Self::LEFT.bits() | Self::RIGHT.bits() | Self::UP.bits()
            | Self::DOWN.bits() | Self::A.bits() | Self::D.bits() | Self::W.bits()
            | Self::S.bits();
    }
}

/// User input state for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub keys: Keys,
    /// Wheel movement this frame; positive scrolls down (zooms out).
    pub wheel_delta: f32,
}

impl InputFrame {
    pub fn new(keys: Keys) -> Self {
        Self {
            keys,
            wheel_delta: 0.0,
        }
    }

    pub fn with_wheel(mut self, delta: f32) -> Self {
        self.wheel_delta = delta;
        self
    }

    /// -1 (left), 0, or 1 (right). Left wins when both are held.
    pub fn horizontal(&self) -> f32 {
        if self.keys.intersects(Keys::LEFT | Keys::A) {
            -1.0
        } else if self.keys.intersects(Keys::RIGHT | Keys::D) {
            1.0
        } else {
            0.0
        }
    }

    /// -1 (up), 0, or 1 (down). Up wins when both are held.
    pub fn vertical(&self) -> f32 {
        if self.keys.intersects(Keys::UP | Keys::W) {
            -1.0
        } else if self.keys.intersects(Keys::DOWN | Keys::S) {
            1.0
        } else {
            0.0
        }
    }

    pub fn any_directional(&self) -> bool {
        self.keys.intersects(Keys::DIRECTIONAL)
    }

    pub fn boost(&self) -> bool {
        self.keys.contains(Keys::SHIFT)
    }

    /// Directional keys held in `previous` but not in this frame.
    pub fn released_since(&self, previous: Keys) -> Keys {
        (previous & Keys::DIRECTIONAL) - self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_keys_resolve_to_first() {
        let f = InputFrame::new(Keys::LEFT | Keys::D | Keys::S | Keys::W);
        assert_eq!(f.horizontal(), -1.0);
        assert_eq!(f.vertical(), -1.0);
    }

    #[test]
    fn shift_alone_is_not_directional() {
        let f = InputFrame::new(Keys::SHIFT);
        assert!(!f.any_directional());
        assert!(f.boost());
    }

    #[test]
    fn release_detection_ignores_modifiers() {
        let now = InputFrame::new(Keys::A);
        assert_eq!(now.released_since(Keys::A | Keys::UP | Keys::SHIFT), Keys::UP);
        assert!(now.released_since(Keys::A).is_empty());
    }
}
