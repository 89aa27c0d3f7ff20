use crate::coords::Vector2;

use super::context::{BufferId, GpuContext};

/// Unit quad in triangle-strip order: top-right, top-left, bottom-right,
/// bottom-left (Y up).
pub const UNIT_QUAD: [Vector2; 4] = [
    Vector2::new(1.0, 1.0),
    Vector2::new(-1.0, 1.0),
    Vector2::new(1.0, -1.0),
    Vector2::new(-1.0, -1.0),
];

/// Texture coordinates matching `UNIT_QUAD` vertex for vertex (V down).
pub const UV_QUAD: [Vector2; 4] = [
    Vector2::new(1.0, 0.0),
    Vector2::new(0.0, 0.0),
    Vector2::new(1.0, 1.0),
    Vector2::new(0.0, 1.0),
];

/// A GPU vertex buffer holding exactly four 2D points.
///
/// The points are kept CPU-side too; they are immutable after creation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderBuffer {
    id: BufferId,
    points: [Vector2; 4],
}

impl RenderBuffer {
    pub const VERTEX_COUNT: u32 = 4;

    pub fn new(gpu: &mut dyn GpuContext, label: &str, points: [Vector2; 4]) -> Self {
        let id = gpu.create_buffer(label, &points);
        Self { id, points }
    }

    /// Quad spanning `±half`, in `UNIT_QUAD` order.
    pub fn quad(gpu: &mut dyn GpuContext, label: &str, half: Vector2) -> Self {
        Self::new(gpu, label, UNIT_QUAD.map(|p| p * half))
    }

    /// Quad spanning `±half`, ordered as a closed outline.
    pub fn outline(gpu: &mut dyn GpuContext, label: &str, half: Vector2) -> Self {
        let Vector2 { x: w, y: h } = half;
        let points = [
            Vector2::new(w, h),
            Vector2::new(-w, h),
            Vector2::new(-w, -h),
            Vector2::new(w, -h),
        ];
        Self::new(gpu, label, points)
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn points(&self) -> &[Vector2; 4] {
        &self.points
    }
}

/// Lazily created buffers shared by every draw: the unit quad and its UVs.
#[derive(Debug, Default)]
pub struct DefaultBuffers {
    quad: Option<RenderBuffer>,
    uv: Option<RenderBuffer>,
}

impl DefaultBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quad(&mut self, gpu: &mut dyn GpuContext) -> RenderBuffer {
        *self
            .quad
            .get_or_insert_with(|| RenderBuffer::new(gpu, "default quad", UNIT_QUAD))
    }

    pub fn uv(&mut self, gpu: &mut dyn GpuContext) -> RenderBuffer {
        *self
            .uv
            .get_or_insert_with(|| RenderBuffer::new(gpu, "default uv", UV_QUAD))
    }

    /// Forgets the buffers, e.g. after the context they live on is dropped.
    pub fn reset(&mut self) {
        self.quad = None;
        self.uv = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{GpuCall, HeadlessContext};

    fn buffer_creations(gpu: &HeadlessContext) -> usize {
        gpu.calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::CreateBuffer { .. }))
            .count()
    }

    #[test]
    fn quad_scales_unit_points() {
        let mut gpu = HeadlessContext::new();
        let b = RenderBuffer::quad(&mut gpu, "t", Vector2::new(8.0, 4.0));
        assert_eq!(b.points()[0], Vector2::new(8.0, 4.0));
        assert_eq!(b.points()[3], Vector2::new(-8.0, -4.0));
    }

    #[test]
    fn outline_visits_corners_in_order() {
        let mut gpu = HeadlessContext::new();
        let b = RenderBuffer::outline(&mut gpu, "t", Vector2::new(2.0, 3.0));
        assert_eq!(
            *b.points(),
            [
                Vector2::new(2.0, 3.0),
                Vector2::new(-2.0, 3.0),
                Vector2::new(-2.0, -3.0),
                Vector2::new(2.0, -3.0),
            ]
        );
    }

    #[test]
    fn defaults_are_created_once() {
        let mut gpu = HeadlessContext::new();
        let mut defaults = DefaultBuffers::new();

        let a = defaults.quad(&mut gpu);
        let b = defaults.quad(&mut gpu);
        let uv = defaults.uv(&mut gpu);

        assert_eq!(a, b);
        assert_eq!(*uv.points(), UV_QUAD);
        assert_eq!(buffer_creations(&gpu), 2);
    }

    #[test]
    fn reset_recreates() {
        let mut gpu = HeadlessContext::new();
        let mut defaults = DefaultBuffers::new();
        let a = defaults.quad(&mut gpu);
        defaults.reset();
        let b = defaults.quad(&mut gpu);
        assert_ne!(a.id(), b.id());
    }
}
