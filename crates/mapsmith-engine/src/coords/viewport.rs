use super::Vector2;

/// Canvas size in logical pixels.
///
/// The map shader divides world positions by half of this size to reach NDC.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn size(self) -> Vector2 {
        Vector2::new(self.width, self.height)
    }

    #[inline]
    pub fn half(self) -> Vector2 {
        self.size() / 2.0
    }
}
