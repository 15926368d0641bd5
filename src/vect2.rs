//! Two-dimensional vector arithmetic.
//!
//! Shared by the layout simulation (positions, velocities, forces) and the
//! interaction controller (pointer position, scroll accumulator).

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vect2 {
    pub x: f64,
    pub y: f64,
}

impl Vect2 {
    pub const ZERO: Vect2 = Vect2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let length = self.length();
        if length == 0.0 {
            return self;
        }
        self / length
    }

    pub fn distance_sq_to(self, other: Vect2) -> f64 {
        (self - other).length_sq()
    }

    pub fn distance_to(self, other: Vect2) -> f64 {
        self.distance_sq_to(other).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ============================================================================
// Operators
// ============================================================================

impl Add for Vect2 {
    type Output = Vect2;

    fn add(self, rhs: Vect2) -> Vect2 {
        Vect2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vect2 {
    fn add_assign(&mut self, rhs: Vect2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vect2 {
    type Output = Vect2;

    fn sub(self, rhs: Vect2) -> Vect2 {
        Vect2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vect2 {
    type Output = Vect2;

    fn mul(self, factor: f64) -> Vect2 {
        Vect2::new(self.x * factor, self.y * factor)
    }
}

impl MulAssign<f64> for Vect2 {
    fn mul_assign(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
    }
}

impl Div<f64> for Vect2 {
    type Output = Vect2;

    fn div(self, divisor: f64) -> Vect2 {
        Vect2::new(self.x / divisor, self.y / divisor)
    }
}
