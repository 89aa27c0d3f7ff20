use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::render::buffer::RenderBuffer;
use crate::render::context::{
    GpuContext, ProgramDesc, ProgramId, TextureId, UniformLocation, UniformValue,
};

use super::layout::{Declaration, GlslType, ShaderLayout};

/// Static description of a shader: source plus declaration table.
///
/// Implemented by zero-sized marker types; `ShaderRegistry` keys on the type.
pub trait ShaderDefinition: 'static {
    const LABEL: &'static str;
    const WGSL: &'static str;
    const DECLARATIONS: &'static [Declaration];

    fn layout() -> ShaderLayout {
        ShaderLayout::from_declarations(Self::DECLARATIONS)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeBinding {
    pub location: u32,
    pub ty: GlslType,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformBinding {
    pub location: UniformLocation,
    pub ty: GlslType,
}

/// A compiled program with its resolved attribute and uniform locations.
#[derive(Debug)]
pub struct Shader {
    label: String,
    program: ProgramId,
    attributes: IndexMap<String, AttributeBinding>,
    uniforms: IndexMap<String, UniformBinding>,
}

impl Shader {
    /// Compiles `wgsl` and resolves every declared name.
    ///
    /// Compile or link failure is an error. Uniforms the backend cannot
    /// locate are reported and left out; setting them later is a no-op.
    pub fn new(
        gpu: &mut dyn GpuContext,
        label: &str,
        wgsl: &str,
        layout: &ShaderLayout,
    ) -> Result<Self> {
        let program = gpu
            .create_program(&ProgramDesc { label, wgsl, layout })
            .with_context(|| format!("failed to build shader program {label:?}"))?;

        let mut attributes = IndexMap::new();
        for (name, ty) in layout.attributes() {
            match gpu.attribute_location(program, name) {
                Some(location) => {
                    attributes.insert(name.to_string(), AttributeBinding { location, ty });
                }
                None => log::warn!("{label}: could not get attribute location for {name:?}"),
            }
        }

        let mut uniforms = IndexMap::new();
        for (name, ty) in layout.uniforms() {
            match gpu.uniform_location(program, name) {
                Some(location) => {
                    uniforms.insert(name.to_string(), UniformBinding { location, ty });
                }
                None => log::warn!("{label}: could not get uniform location for {name:?}"),
            }
        }

        log::debug!(
            "{label}: {} attribute(s), {} uniform(s)",
            attributes.len(),
            uniforms.len()
        );

        Ok(Self {
            label: label.to_string(),
            program,
            attributes,
            uniforms,
        })
    }

    pub fn from_definition<S: ShaderDefinition>(gpu: &mut dyn GpuContext) -> Result<Self> {
        Self::new(gpu, S::LABEL, S::WGSL, &S::layout())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeBinding> {
        self.attributes.get(name)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformBinding> {
        self.uniforms.get(name)
    }

    pub fn use_program(&self, gpu: &mut dyn GpuContext) {
        gpu.use_program(self.program);
    }

    /// Binds `buffer` to the attribute `name` with its declared component
    /// count. Unknown names are logged and skipped.
    pub fn set_attribute_buffer(
        &self,
        gpu: &mut dyn GpuContext,
        name: &str,
        buffer: &RenderBuffer,
    ) -> bool {
        let Some(attr) = self.attributes.get(name) else {
            log::error!("{}: attribute {name:?} does not exist", self.label);
            return false;
        };
        gpu.bind_attribute(attr.location, buffer.id(), attr.ty.components());
        true
    }

    /// Writes a uniform. Unknown names are skipped.
    pub fn set_uniform(
        &self,
        gpu: &mut dyn GpuContext,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> bool {
        let Some(uniform) = self.uniforms.get(name) else {
            log::debug!("{}: uniform {name:?} is not bound; skipped", self.label);
            return false;
        };
        gpu.set_uniform(uniform.location, value.into());
        true
    }

    /// Points sampler `name` at texture unit 0 and binds `texture` there.
    pub fn set_texture(
        &self,
        gpu: &mut dyn GpuContext,
        name: &str,
        texture: Option<TextureId>,
    ) -> bool {
        let bound = self.set_uniform(gpu, name, UniformValue::Int(0));
        gpu.bind_texture(texture);
        bound
    }
}
