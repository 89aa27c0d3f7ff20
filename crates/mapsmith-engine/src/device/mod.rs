//! GPU device + surface management.
//!
//! Creates the wgpu Instance/Adapter/Device/Queue for the editor window,
//! configures the swapchain and hands out one frame (encoder + view) at a
//! time.

mod gpu;
mod init;

pub use gpu::{Gpu, GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
