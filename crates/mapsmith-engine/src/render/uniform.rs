//! Uniform block packing.
//!
//! Non-sampler uniforms of a program are packed into one block following
//! WGSL's uniform address-space layout, in declaration order. The WGSL
//! struct a shader declares must list the same members in the same order.

use super::context::UniformValue;
use super::shader::{GlslType, ShaderLayout};

/// `(align, size)` in bytes, or `None` for types that do not live in the block.
fn align_and_size(ty: GlslType) -> Option<(u32, u32)> {
    Some(match ty {
        GlslType::Float | GlslType::Int | GlslType::Bool => (4, 4),
        GlslType::Vec2 => (8, 8),
        GlslType::Vec3 => (16, 12),
        GlslType::Vec4 => (16, 16),
        GlslType::Mat2 => (8, 16),
        GlslType::Mat3 => (16, 48),
        GlslType::Mat4 => (16, 64),
        GlslType::Sampler2D => return None,
    })
}

#[inline]
pub(crate) fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    pub name: String,
    pub ty: GlslType,
    /// Byte offset inside the block; `None` for samplers.
    pub offset: Option<u32>,
}

/// Byte layout of a program's uniforms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBlock {
    slots: Vec<UniformSlot>,
    size: u32,
}

impl UniformBlock {
    pub fn from_layout(layout: &ShaderLayout) -> Self {
        let mut slots = Vec::new();
        let mut cursor = 0u32;
        for (name, ty) in layout.uniforms() {
            let offset = align_and_size(ty).map(|(align, size)| {
                let at = align_up(cursor as u64, align as u64) as u32;
                cursor = at + size;
                at
            });
            slots.push(UniformSlot { name: name.to_string(), ty, offset });
        }
        Self {
            slots,
            size: align_up(cursor as u64, 16) as u32,
        }
    }

    /// Block size in bytes, rounded up to 16. Zero when nothing is packed.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Encodes `value` into `bytes` at slot `index`.
    ///
    /// Returns `false` (and writes nothing) for samplers, out-of-range slots
    /// and values whose shape does not match the declared type.
    pub fn write(&self, bytes: &mut [u8], index: usize, value: UniformValue) -> bool {
        let Some(slot) = self.slots.get(index) else { return false };
        let Some(offset) = slot.offset else { return false };
        let mut at = offset as usize;

        let mut put = |word: [u8; 4], at: &mut usize| {
            if let Some(dst) = bytes.get_mut(*at..*at + 4) {
                dst.copy_from_slice(&word);
            }
            *at += 4;
        };

        match (slot.ty, value) {
            (GlslType::Float, UniformValue::Float(v)) => put(v.to_le_bytes(), &mut at),
            // GL-style code sets float flags with ints and bools; accept both.
            (GlslType::Float, UniformValue::Int(v)) => put((v as f32).to_le_bytes(), &mut at),
            (GlslType::Float, UniformValue::Bool(v)) => {
                put((v as u8 as f32).to_le_bytes(), &mut at)
            }
            (GlslType::Int, UniformValue::Int(v)) => put(v.to_le_bytes(), &mut at),
            (GlslType::Bool, UniformValue::Bool(v)) => put((v as u32).to_le_bytes(), &mut at),
            (GlslType::Bool, UniformValue::Int(v)) => put(((v != 0) as u32).to_le_bytes(), &mut at),
            (GlslType::Vec2, UniformValue::Vec2(v)) => v.iter().for_each(|f| put(f.to_le_bytes(), &mut at)),
            (GlslType::Vec3, UniformValue::Vec3(v)) => v.iter().for_each(|f| put(f.to_le_bytes(), &mut at)),
            (GlslType::Vec4, UniformValue::Vec4(v)) => v.iter().for_each(|f| put(f.to_le_bytes(), &mut at)),
            (GlslType::Mat2, UniformValue::Mat2(m)) => {
                m.iter().for_each(|f| put(f.to_le_bytes(), &mut at))
            }
            (GlslType::Mat3, UniformValue::Mat3(m)) => {
                // Columns are vec3 with a 16-byte stride.
                for col in m.chunks_exact(3) {
                    let mut c = at;
                    col.iter().for_each(|f| put(f.to_le_bytes(), &mut c));
                    at += 16;
                }
            }
            (GlslType::Mat4, UniformValue::Mat4(m)) => {
                m.iter().for_each(|f| put(f.to_le_bytes(), &mut at))
            }
            (ty, value) => {
                log::warn!(
                    "uniform {:?}: {value:?} does not fit declared type {}",
                    slot.name,
                    ty.as_str()
                );
                return false;
            }
        }
        true
    }
}
