use super::Vector2;

/// Axis-aligned rectangle given by its minimum corner and size.
///
/// Used both for the canvas bounding box (screen space) and for object
/// bounds (world space), so it makes no assumption about the Y direction.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vector2,
    pub size: Vector2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vector2::new(x, y),
            size: Vector2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vector2, size: Vector2) -> Self {
        Self { origin, size }
    }

    /// Box spanning `center - extent ..= center + extent`.
    #[inline]
    pub fn from_center_extent(center: Vector2, extent: Vector2) -> Self {
        Self::from_origin_size(center - extent, extent * 2.0)
    }

    #[inline]
    pub fn min(self) -> Vector2 {
        self.origin
    }

    #[inline]
    pub fn max(self) -> Vector2 {
        self.origin + self.size
    }

    #[inline]
    pub fn center(self) -> Vector2 {
        self.origin + self.size / 2.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut r = self;
        if r.size.x < 0.0 {
            r.origin.x += r.size.x;
            r.size.x = -r.size.x;
        }
        if r.size.y < 0.0 {
            r.origin.y += r.size.y;
            r.size.y = -r.size.y;
        }
        r
    }

    /// Closed containment: `[min, max]` on both axes.
    #[inline]
    pub fn contains(self, p: Vector2) -> bool {
        let r = self.normalized();
        let max = r.max();
        p.x >= r.origin.x && p.y >= r.origin.y && p.x <= max.x && p.y <= max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(x, y, w, h) }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn center_extent_round_trips() {
        let rect = Rect::from_center_extent(Vector2::new(100.0, 100.0), Vector2::new(4.0, 4.0));
        assert_eq!(rect.min(), Vector2::new(96.0, 96.0));
        assert_eq!(rect.max(), Vector2::new(104.0, 104.0));
        assert_eq!(rect.center(), Vector2::new(100.0, 100.0));
    }

    #[test]
    fn normalized_negative_size() {
        let n = r(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, r(6.0, 7.0, 4.0, 3.0));
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_both_edges() {
        let rect = r(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Vector2::new(0.0, 0.0)));
        assert!(rect.contains(Vector2::new(10.0, 10.0)));
    }

    #[test]
    fn contains_outside() {
        let rect = r(0.0, 0.0, 10.0, 10.0);
        assert!(!rect.contains(Vector2::new(-0.01, 5.0)));
        assert!(!rect.contains(Vector2::new(5.0, 10.01)));
    }

    #[test]
    fn is_empty_zero_size() {
        assert!(r(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(!r(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
