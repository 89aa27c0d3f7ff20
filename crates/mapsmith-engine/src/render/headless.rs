//! Recording `GpuContext` with no device behind it.
//!
//! Used by tests and by tools that exercise the editor without a window.
//! Every call is appended to a log; ids are handed out sequentially.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::coords::{ColorRgba, Vector2};

use super::context::{
    BlendMode, BufferId, GpuContext, Primitive, ProgramDesc, ProgramId, TextureId,
    UniformLocation, UniformValue,
};
use super::shader::ShaderLayout;

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer { buffer: BufferId, points: [Vector2; 4] },
    CreateTexture { texture: TextureId, width: u32, height: u32 },
    CreateProgram { program: ProgramId, label: String },
    UseProgram(ProgramId),
    BindAttribute { location: u32, buffer: BufferId, components: u32 },
    SetUniform { name: String, value: UniformValue },
    BindTexture(Option<TextureId>),
    SetBlend(Option<BlendMode>),
    Clear(ColorRgba),
    Draw { primitive: Primitive, vertex_count: u32 },
}

#[derive(Debug)]
struct HeadlessProgram {
    layout: ShaderLayout,
}

#[derive(Debug, Default)]
pub struct HeadlessContext {
    calls: Vec<GpuCall>,
    /// Uniform locations number every program's uniforms consecutively.
    programs: Vec<HeadlessProgram>,
    buffers: u32,
    textures: u32,
    compile_error: Option<String>,
    unresolved_uniforms: HashSet<String>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_program` fails with `message`.
    pub fn failing_programs(mut self, message: &str) -> Self {
        self.compile_error = Some(message.to_string());
        self
    }

    /// `uniform_location` reports `name` as unresolved, as a driver does for
    /// uniforms optimized out of a program.
    pub fn without_uniform(mut self, name: &str) -> Self {
        self.unresolved_uniforms.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<GpuCall> {
        std::mem::take(&mut self.calls)
    }

    /// Calls recorded since the most recent `clear`.
    pub fn last_frame(&self) -> &[GpuCall] {
        let start = self
            .calls
            .iter()
            .rposition(|c| matches!(c, GpuCall::Clear(_)))
            .unwrap_or(0);
        &self.calls[start..]
    }

    pub fn count(&self, pred: impl Fn(&GpuCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl GpuContext for HeadlessContext {
    fn create_buffer(&mut self, _label: &str, points: &[Vector2; 4]) -> BufferId {
        let buffer = BufferId(self.buffers);
        self.buffers += 1;
        self.calls.push(GpuCall::CreateBuffer { buffer, points: *points });
        buffer
    }

    fn create_texture(&mut self, _label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        let texture = TextureId(self.textures);
        self.textures += 1;
        self.calls.push(GpuCall::CreateTexture { texture, width, height });
        texture
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId> {
        if let Some(message) = &self.compile_error {
            bail!("{}: {message}", desc.label);
        }
        let program = ProgramId(self.programs.len() as u32);
        self.programs.push(HeadlessProgram { layout: desc.layout.clone() });
        self.calls.push(GpuCall::CreateProgram { program, label: desc.label.to_string() });
        Ok(program)
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(program.0 as usize)?.layout.attribute_location(name)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if self.unresolved_uniforms.contains(name) {
            return None;
        }
        let own = self.programs.get(program.0 as usize)?;
        let local = own.layout.uniforms().position(|(n, _)| n == name)?;
        let before: usize = self.programs[..program.0 as usize]
            .iter()
            .map(|p| p.layout.uniforms().count())
            .sum();
        Some(UniformLocation((before + local) as u32))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(GpuCall::UseProgram(program));
    }

    fn bind_attribute(&mut self, location: u32, buffer: BufferId, components: u32) {
        self.calls.push(GpuCall::BindAttribute { location, buffer, components });
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let name = self.uniform_name(location).unwrap_or("<unknown>").to_string();
        self.calls.push(GpuCall::SetUniform { name, value });
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.calls.push(GpuCall::BindTexture(texture));
    }

    fn set_blend(&mut self, blend: Option<BlendMode>) {
        self.calls.push(GpuCall::SetBlend(blend));
    }

    fn clear(&mut self, color: ColorRgba) {
        self.calls.push(GpuCall::Clear(color));
    }

    fn draw(&mut self, primitive: Primitive, vertex_count: u32) {
        self.calls.push(GpuCall::Draw { primitive, vertex_count });
    }
}

impl HeadlessContext {
    fn uniform_name(&self, location: UniformLocation) -> Option<&str> {
        let mut index = location.0 as usize;
        for p in &self.programs {
            let count = p.layout.uniforms().count();
            if index < count {
                return p.layout.uniforms().nth(index).map(|(n, _)| n);
            }
            index -= count;
        }
        None
    }
}
