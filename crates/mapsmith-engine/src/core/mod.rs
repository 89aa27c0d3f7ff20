//! Core contracts between the runtime (platform loop) and the application.
//!
//! The runtime owns the window and the GPU; the application sees input as
//! `InputEvent`s and draws through a per-frame `FrameCtx`.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
