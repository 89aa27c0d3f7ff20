//! Mapsmith engine crate.
//!
//! Platform and GPU runtime pieces shared by the editor: window loop, input
//! translation, the `GpuContext` drawing seam and shader reflection.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
