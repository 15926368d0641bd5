//! Pointer and scroll input for the layout simulation.
//!
//! `UserController` turns raw mouse and wheel readings into an
//! `InteractionState`, which the simulation reads once per tick.

use crate::vect2::Vect2;
use serde::{Deserialize, Serialize};

const SCROLL_SCALE_FACTOR: f64 = 0.001;
const MIN_SCALE: f64 = 0.1;

/// Pointer position in origin-centered display space, primary button state
/// and zoom. Display coordinates are simulation coordinates times `scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionState {
    pub pointer: Vect2,
    pub primary_pressed: bool,
    pub scale: f64,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            pointer: Vect2::ZERO,
            primary_pressed: false,
            scale: 1.0,
        }
    }
}

impl InteractionState {
    pub fn to_simulation(&self, display: Vect2) -> Vect2 {
        display / self.scale
    }

    pub fn to_display(&self, position: Vect2) -> Vect2 {
        position * self.scale
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserController {
    viewport: Vect2,
    scroll: Vect2,
    state: InteractionState,
}

impl UserController {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Vect2::new(width, height),
            ..Self::default()
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = Vect2::new(width, height);
    }

    /// Record a mouse reading: offset within the viewport and the
    /// `buttons` bitmask, bit 0 being the primary button.
    pub fn handle_mouse(&mut self, offset_x: f64, offset_y: f64, buttons: u16) {
        self.state.pointer = Vect2::new(offset_x, offset_y) - self.viewport * 0.5;
        self.state.primary_pressed = buttons & 1 == 1;
    }

    pub fn handle_wheel(&mut self, delta_x: f64, delta_y: f64) {
        self.scroll += Vect2::new(delta_x, delta_y);
        self.state.scale = (1.0 + self.scroll.y * SCROLL_SCALE_FACTOR).max(MIN_SCALE);
    }
}
