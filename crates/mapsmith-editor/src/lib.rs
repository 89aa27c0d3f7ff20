//! Mapsmith editor crate.
//!
//! The map model (maps, layers, game objects, textures), the project that
//! owns them on disk, the map renderer and the `Editor` input controller.
//! Drawing goes through the engine's `GpuContext`, so everything here runs
//! headless in tests.

pub mod canvas;
pub mod editor;
pub mod error;
pub mod layer;
pub mod map;
pub mod map_renderer;
pub mod object;
pub mod project;
pub mod shaders;
pub mod texture;

pub use canvas::CanvasRenderer;
pub use editor::{DragKind, DragPhase, Editor};
pub use error::{ProjectError, ProjectResult};
pub use layer::Layer;
pub use map::{Map, MapDocument, MapId};
pub use map_renderer::MapRenderer;
pub use object::{GameObject, ObjectId, ObjectKind};
pub use project::{AssetDir, Project, ProjectSettings};
pub use shaders::DefaultShader;
pub use texture::{Texture, TextureCache};
