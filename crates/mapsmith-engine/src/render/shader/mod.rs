//! Shader programs and their reflected interface.
//!
//! - `ShaderLayout`: attribute/uniform names and types, from a static
//!   declaration table or reflected from GLSL-style source text
//! - `Shader`: a compiled program plus resolved locations and a typed
//!   binding API
//! - `ShaderRegistry`: one `Shader` per definition type, created on demand

mod layout;
mod program;
mod registry;

pub use layout::{Declaration, GlslType, Qualifier, ShaderLayout};
pub use program::{AttributeBinding, Shader, ShaderDefinition, UniformBinding};
pub use registry::ShaderRegistry;
