use core::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// 2D vector in world units (or logical pixels, depending on the caller).
///
/// Pure value type. Division by a zero component yields zero for that
/// component so a degenerate zoom or canvas size never produces inf/NaN.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v }
    }

    /// Rounds each component to the nearest whole unit; halves go toward +∞.
    #[inline]
    pub fn round(self) -> Self {
        Self::new((self.x + 0.5).floor(), (self.y + 0.5).floor())
    }

    #[inline]
    pub fn floor(self) -> Self {
        Self::new(self.x.floor(), self.y.floor())
    }

    #[inline]
    pub fn ceil(self) -> Self {
        Self::new(self.x.ceil(), self.y.ceil())
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// `true` when either component has a fractional part.
    #[inline]
    pub fn has_fraction(self) -> bool {
        self.x.fract() != 0.0 || self.y.fract() != 0.0
    }
}

#[inline]
fn safe_div(a: f32, b: f32) -> f32 {
    if b == 0.0 { 0.0 } else { a / b }
}

impl Add for Vector2 {
    type Output = Vector2;
    #[inline]
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    #[inline]
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul for Vector2 {
    type Output = Vector2;
    #[inline]
    fn mul(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x * rhs.x, self.y * rhs.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;
    #[inline]
    fn mul(self, rhs: f32) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div for Vector2 {
    type Output = Vector2;
    #[inline]
    fn div(self, rhs: Vector2) -> Vector2 {
        Vector2::new(safe_div(self.x, rhs.x), safe_div(self.y, rhs.y))
    }
}

impl Div<f32> for Vector2 {
    type Output = Vector2;
    #[inline]
    fn div(self, rhs: f32) -> Vector2 {
        Vector2::new(safe_div(self.x, rhs), safe_div(self.y, rhs))
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    #[inline]
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

impl From<(f32, f32)> for Vector2 {
    #[inline]
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vector2 { Vector2::new(x, y) }

    // ── arithmetic ────────────────────────────────────────────────────────

    #[test]
    fn add_then_sub_round_trips() {
        let a = v(3.5, -2.0);
        let b = v(-7.25, 11.0);
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn mul_is_component_wise() {
        assert_eq!(v(2.0, 3.0) * v(4.0, -1.0), v(8.0, -3.0));
        assert_eq!(v(2.0, 3.0) * 2.0, v(4.0, 6.0));
    }

    #[test]
    fn neg_flips_both_axes() {
        assert_eq!(-v(1.0, -2.0), v(-1.0, 2.0));
    }

    // ── division ──────────────────────────────────────────────────────────

    #[test]
    fn div_by_zero_vector_yields_zero() {
        assert_eq!(v(3.0, 4.0) / v(0.0, 0.0), v(0.0, 0.0));
    }

    #[test]
    fn div_by_zero_component_only_zeroes_that_axis() {
        assert_eq!(v(3.0, 4.0) / v(0.0, 2.0), v(0.0, 2.0));
    }

    #[test]
    fn div_by_zero_scalar_yields_zero() {
        let r = v(5.0, -5.0) / 0.0;
        assert!(r.is_finite());
        assert_eq!(r, Vector2::zero());
    }

    // ── rounding ──────────────────────────────────────────────────────────

    #[test]
    fn round_halves_go_up() {
        assert_eq!(v(2.5, -2.5).round(), v(3.0, -2.0));
        assert_eq!(v(1.4, -1.6).round(), v(1.0, -2.0));
    }

    #[test]
    fn floor_and_ceil() {
        assert_eq!(v(1.7, -1.2).floor(), v(1.0, -2.0));
        assert_eq!(v(1.2, -1.7).ceil(), v(2.0, -1.0));
    }

    #[test]
    fn has_fraction_detects_half_units() {
        assert!(v(7.5, 8.0).has_fraction());
        assert!(!v(8.0, 8.0).has_fraction());
    }
}
