use crate::coords::Viewport;

use super::buffer::DefaultBuffers;
use super::context::GpuContext;
use super::shader::ShaderRegistry;

/// What a renderer needs for one draw pass: the context plus the shared
/// shader registry and default buffers that live alongside it.
pub struct RenderCtx<'a> {
    pub gpu: &'a mut dyn GpuContext,
    pub shaders: &'a mut ShaderRegistry,
    pub buffers: &'a mut DefaultBuffers,
    pub viewport: Viewport, // logical px
    /// Physical pixels per logical pixel.
    pub pixel_ratio: f32,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        gpu: &'a mut dyn GpuContext,
        shaders: &'a mut ShaderRegistry,
        buffers: &'a mut DefaultBuffers,
        viewport: Viewport,
        pixel_ratio: f32,
    ) -> Self {
        Self {
            gpu,
            shaders,
            buffers,
            viewport,
            pixel_ratio,
        }
    }
}
