//! GPU rendering subsystem.
//!
//! Drawing code talks to a `GpuContext`; `WgpuContext` turns the recorded
//! calls into a wgpu render pass, `headless::HeadlessContext` keeps them for
//! inspection.
//!
//! Convention:
//! - World geometry is in logical pixels, origin at the canvas center, +Y up.
//! - Vertex shaders divide by half the canvas size to reach clip space.

mod buffer;
mod context;
mod ctx;
pub mod headless;
pub mod shader;
mod uniform;
mod wgpu_context;

pub use buffer::{DefaultBuffers, RenderBuffer, UNIT_QUAD, UV_QUAD};
pub use context::{
    BlendMode, BufferId, GpuContext, Primitive, ProgramDesc, ProgramId, TextureId,
    UniformLocation, UniformValue,
};
pub use ctx::RenderCtx;
pub use uniform::{UniformBlock, UniformSlot};
pub use wgpu_context::WgpuContext;
