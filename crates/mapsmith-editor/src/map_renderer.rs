use anyhow::Result;
use mapsmith_engine::coords::{ColorRgba, Vector2};
use mapsmith_engine::render::{BlendMode, Primitive, RenderBuffer, RenderCtx};

use crate::layer::Layer;
use crate::object::GameObject;
use crate::shaders::DefaultShader;

/// Outline color of the selected object.
pub const SELECTION_COLOR: ColorRgba = ColorRgba::new(1.0, 0.2, 0.2, 1.0);

/// The parts of a map a frame is drawn from.
#[derive(Debug, Copy, Clone)]
pub struct MapScene<'a> {
    pub size: Vector2,
    pub offset: Vector2,
    pub layers: &'a [Layer],
    pub selected: Option<&'a GameObject>,
}

/// Per-map drawing state: zoom and the background quad.
#[derive(Debug)]
pub struct MapRenderer {
    zoom: f32,
    /// Background quad and the map size it was built for.
    background: Option<(Vector2, RenderBuffer)>,
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            background: None,
        }
    }
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom;
    }

    /// Drops GPU buffers, e.g. after the context they live on went away.
    pub fn invalidate(&mut self) {
        self.background = None;
    }

    /// Records one frame of `scene`.
    ///
    /// Offset, zoom and pixel ratio go to the shader as uniforms; object
    /// positions are passed through unscaled.
    pub fn render(&mut self, ctx: &mut RenderCtx<'_>, scene: &MapScene<'_>) -> Result<()> {
        let background = match self.background {
            Some((size, buffer)) if size == scene.size => buffer,
            _ => {
                let buffer = RenderBuffer::quad(ctx.gpu, "map background", scene.size / 2.0);
                self.background = Some((scene.size, buffer));
                buffer
            }
        };

        let shader = ctx.shaders.get::<DefaultShader>(ctx.gpu)?;
        let gpu = &mut *ctx.gpu;

        shader.use_program(gpu);
        shader.set_attribute_buffer(gpu, "aVertexPosition", &background);
        shader.set_uniform(gpu, "uPixelRatio", ctx.pixel_ratio);
        shader.set_uniform(gpu, "uZoom", self.zoom);
        shader.set_uniform(gpu, "uRenderTexture", 0.0);
        shader.set_uniform(gpu, "uSelectionRender", 0.0);
        shader.set_uniform(gpu, "uCanvasSize", ctx.viewport.size());
        shader.set_uniform(gpu, "uPosition", Vector2::zero());
        shader.set_uniform(gpu, "uColor", ColorRgba::white());
        shader.set_uniform(gpu, "uMapOffset", scene.offset);
        shader.set_texture(gpu, "uSampler", None);
        gpu.draw(Primitive::TriangleStrip, RenderBuffer::VERTEX_COUNT);

        gpu.set_blend(Some(BlendMode::Alpha));
        shader.set_uniform(gpu, "uRenderTexture", 1.0);

        for object in scene.layers.iter().flat_map(Layer::objects) {
            let Some(texture) = object.texture() else {
                continue;
            };
            let loaded = match texture.load(gpu, ctx.buffers) {
                Ok(loaded) => loaded,
                Err(err) => {
                    log::error!("object {} skipped: {err}", object.id());
                    continue;
                }
            };

            shader.set_attribute_buffer(gpu, "aVertexPosition", &loaded.size_buffer);
            shader.set_attribute_buffer(gpu, "aUVPosition", &loaded.uv_buffer);
            shader.set_texture(gpu, "uSampler", Some(loaded.texture));
            shader.set_uniform(gpu, "uPosition", object.position());
            gpu.draw(Primitive::TriangleStrip, RenderBuffer::VERTEX_COUNT);
        }

        // A texture that failed above is not retried for the outline.
        if let Some(object) = scene.selected
            && let Some(texture) = object.texture()
            && let Some(loaded) = texture.gpu()
        {

            shader.set_attribute_buffer(gpu, "aVertexPosition", &loaded.selection_buffer);
            shader.set_attribute_buffer(gpu, "aUVPosition", &loaded.uv_buffer);
            shader.set_texture(gpu, "uSampler", Some(loaded.texture));
            shader.set_uniform(gpu, "uPosition", object.position());
            shader.set_uniform(gpu, "uSelectionColor", SELECTION_COLOR);
            shader.set_uniform(gpu, "uSelectionRender", 1.0);
            gpu.draw(Primitive::LineLoop, RenderBuffer::VERTEX_COUNT);
            shader.set_uniform(gpu, "uSelectionRender", 0.0);
        }

        gpu.set_blend(None);
        Ok(())
    }
}
