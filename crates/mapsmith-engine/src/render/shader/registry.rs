use std::any::TypeId;
use std::collections::HashMap;

use anyhow::Result;

use crate::render::context::GpuContext;

use super::program::{Shader, ShaderDefinition};

/// One `Shader` per definition type, compiled on first request.
///
/// Handles are tied to the context they were created on; call `clear` when
/// that context goes away.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    shaders: HashMap<TypeId, Shader>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<S: ShaderDefinition>(&mut self, gpu: &mut dyn GpuContext) -> Result<&Shader> {
        let key = TypeId::of::<S>();
        if !self.shaders.contains_key(&key) {
            let shader = Shader::from_definition::<S>(gpu)?;
            log::debug!("compiled shader {:?}", S::LABEL);
            self.shaders.insert(key, shader);
        }
        self.shaders
            .get(&key)
            .ok_or_else(|| anyhow::anyhow!("shader {:?} missing after insert", S::LABEL))
    }

    pub fn contains<S: ShaderDefinition>(&self) -> bool {
        self.shaders.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn clear(&mut self) {
        self.shaders.clear();
    }
}
