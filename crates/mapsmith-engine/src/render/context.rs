//! The GPU seam.
//!
//! Map drawing is written against `GpuContext`, a small retained-mode API
//! in the shape of a GL context: create buffers/textures/programs, bind
//! state, issue draws. `WgpuContext` records the calls and replays them into
//! a wgpu render pass; `HeadlessContext` only records them.

use anyhow::Result;

use crate::coords::{ColorRgba, Vector2};

use super::shader::ShaderLayout;

/// Handle to a vertex buffer of four 2D points.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub(crate) u32);

/// Handle to an RGBA8 2D texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub(crate) u32);

/// Handle to a compiled shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub(crate) u32);

/// Backend-defined uniform location, valid for the program it was queried on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub(crate) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Primitive {
    TriangleStrip,
    /// Closed outline through every vertex, back to the first.
    LineLoop,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    Alpha,
}

/// Value written to a uniform slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major.
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vector2> for UniformValue {
    fn from(v: Vector2) -> Self {
        UniformValue::Vec2([v.x, v.y])
    }
}

impl From<ColorRgba> for UniformValue {
    fn from(c: ColorRgba) -> Self {
        UniformValue::Vec4(c.to_array())
    }
}

/// Everything a backend needs to build a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    /// WGSL source with `vs_main`/`fs_main` entry points.
    pub wgsl: &'a str,
    /// Declared attributes and uniforms, in declaration order.
    pub layout: &'a ShaderLayout,
}

/// Retained GPU API the map renderer draws through.
///
/// Binding calls (`use_program`, `bind_attribute`, `set_uniform`,
/// `bind_texture`, `set_blend`) mutate current state; `draw` snapshots it.
pub trait GpuContext {
    fn create_buffer(&mut self, label: &str, points: &[Vector2; 4]) -> BufferId;

    /// `rgba` holds `width * height * 4` bytes, rows top to bottom.
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId;

    /// Compiles and links a program. Failure is reported, never deferred.
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId>;

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn use_program(&mut self, program: ProgramId);

    fn bind_attribute(&mut self, location: u32, buffer: BufferId, components: u32);

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn bind_texture(&mut self, texture: Option<TextureId>);

    fn set_blend(&mut self, blend: Option<BlendMode>);

    /// Starts a new frame cleared to `color`.
    fn clear(&mut self, color: ColorRgba);

    fn draw(&mut self, primitive: Primitive, vertex_count: u32);
}
