use anyhow::Result;
use mapsmith_engine::coords::{ColorRgba, Rect, Vector2, Viewport};
use mapsmith_engine::render::shader::ShaderRegistry;
use mapsmith_engine::render::{DefaultBuffers, GpuContext, RenderCtx};

use crate::map::Map;

/// Owns the GPU context the editor draws into and its lifecycle.
///
/// Mounting hands the canvas a context; unmounting takes it back and drops
/// every resource created on it (shaders, default buffers).
pub struct CanvasRenderer<G: GpuContext> {
    gpu: Option<G>,
    shaders: ShaderRegistry,
    buffers: DefaultBuffers,
    /// Canvas rectangle in logical screen pixels.
    bounds: Rect,
    clear_color: ColorRgba,
}

impl<G: GpuContext> Default for CanvasRenderer<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GpuContext> CanvasRenderer<G> {
    pub fn new() -> Self {
        Self {
            gpu: None,
            shaders: ShaderRegistry::new(),
            buffers: DefaultBuffers::new(),
            bounds: Rect::default(),
            clear_color: ColorRgba::black(),
        }
    }

    pub fn mount(&mut self, gpu: G) {
        if self.gpu.is_some() {
            log::warn!("canvas mounted twice; replacing the previous context");
            self.release();
        }
        self.gpu = Some(gpu);
        log::debug!("canvas mounted");
    }

    /// Takes the context back. Resources created on it are forgotten.
    pub fn unmount(&mut self) -> Option<G> {
        let gpu = self.gpu.take();
        if gpu.is_some() {
            self.release();
            log::debug!("canvas unmounted");
        }
        gpu
    }

    fn release(&mut self) {
        self.shaders.clear();
        self.buffers.reset();
    }

    pub fn is_mounted(&self) -> bool {
        self.gpu.is_some()
    }

    /// The mounted context.
    ///
    /// # Panics
    /// If the canvas is not mounted: drawing before mount is a lifecycle bug
    /// in the caller.
    pub fn ctx(&mut self) -> &mut G {
        expect_mounted(self.gpu.as_mut())
    }

    pub fn context(&self) -> Option<&G> {
        self.gpu.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut G> {
        self.gpu.as_mut()
    }

    pub fn resize(&mut self, bounds: Rect) {
        self.bounds = bounds.normalized();
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.bounds.size.x, self.bounds.size.y)
    }

    /// Top-left corner in screen pixels.
    pub fn origin(&self) -> Vector2 {
        self.bounds.origin
    }

    pub fn set_clear_color(&mut self, color: ColorRgba) {
        self.clear_color = color;
    }

    /// Starts a new, empty frame.
    pub fn clear(&mut self) {
        let color = self.clear_color;
        self.ctx().clear(color);
    }

    /// Clears, then records `map`.
    pub fn render(&mut self, map: &mut Map, pixel_ratio: f32) -> Result<()> {
        self.clear();

        let viewport = self.viewport();
        let gpu = expect_mounted(self.gpu.as_mut());
        let mut ctx = RenderCtx::new(gpu, &mut self.shaders, &mut self.buffers, viewport, pixel_ratio);
        map.render(&mut ctx)
    }
}

fn expect_mounted<G>(gpu: Option<&mut G>) -> &mut G {
    match gpu {
        Some(gpu) => gpu,
        None => panic!("GPU context accessed before the canvas was mounted"),
    }
}
