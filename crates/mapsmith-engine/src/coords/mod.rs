//! Coordinate and geometry types shared by the editor model and renderers.
//!
//! Two spaces are in play:
//! - screen space: logical pixels, origin top-left, +Y down (pointer events)
//! - world space: map units, origin at the canvas center, +Y up
//!
//! The editor converts between them; the vertex shader maps world to NDC.

mod color;
mod rect;
mod vector2;
mod viewport;

pub use color::ColorRgba;
pub use rect::Rect;
pub use vector2::Vector2;
pub use viewport::Viewport;
