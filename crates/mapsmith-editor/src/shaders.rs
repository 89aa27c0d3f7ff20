//! Shader definitions used by the map renderer.

use mapsmith_engine::render::shader::{Declaration, GlslType, ShaderDefinition};

/// The one shader maps are drawn with.
///
/// Attribute locations follow declaration order; uniforms are packed in
/// declaration order into the `Uniforms` block of `default.wgsl`.
pub struct DefaultShader;

impl ShaderDefinition for DefaultShader {
    const LABEL: &'static str = "default map shader";
    const WGSL: &'static str = include_str!("shaders/default.wgsl");
    const DECLARATIONS: &'static [Declaration] = &[
        Declaration::attribute("aVertexPosition", GlslType::Vec2),
        Declaration::attribute("aUVPosition", GlslType::Vec2),
        Declaration::uniform("uCanvasSize", GlslType::Vec2),
        Declaration::uniform("uPosition", GlslType::Vec2),
        Declaration::uniform("uColor", GlslType::Vec4),
        Declaration::uniform("uMapOffset", GlslType::Vec2),
        Declaration::uniform("uSelectionRender", GlslType::Float),
        Declaration::uniform("uZoom", GlslType::Float),
        Declaration::uniform("uPixelRatio", GlslType::Float),
        Declaration::uniform("uRenderTexture", GlslType::Float),
        Declaration::uniform("uSelectionColor", GlslType::Vec4),
        Declaration::uniform("uSampler", GlslType::Sampler2D),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsmith_engine::render::UniformBlock;

    #[test]
    fn block_matches_wgsl_struct() {
        let block = UniformBlock::from_layout(&DefaultShader::layout());
        let offsets: Vec<(&str, Option<u32>)> = block
            .slots()
            .iter()
            .map(|s| (s.name.as_str(), s.offset))
            .collect();

        assert_eq!(
            offsets,
            [
                ("uCanvasSize", Some(0)),
                ("uPosition", Some(8)),
                ("uColor", Some(16)),
                ("uMapOffset", Some(32)),
                ("uSelectionRender", Some(40)),
                ("uZoom", Some(44)),
                ("uPixelRatio", Some(48)),
                ("uRenderTexture", Some(52)),
                ("uSelectionColor", Some(64)),
                ("uSampler", None),
            ]
        );
        assert_eq!(block.size(), 80);
    }

    #[test]
    fn vertex_inputs_are_in_location_order() {
        let layout = DefaultShader::layout();
        assert_eq!(layout.attribute_location("aVertexPosition"), Some(0));
        assert_eq!(layout.attribute_location("aUVPosition"), Some(1));
    }
}
