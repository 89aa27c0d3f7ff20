//! `GpuContext` on top of wgpu.
//!
//! Calls are recorded into a retained frame and replayed by `flush` into a
//! single render pass. Each draw snapshots the current program's uniform
//! block; all snapshots share one uniform buffer addressed with dynamic
//! offsets. Pipelines are built lazily per (program, primitive, blend).

use std::collections::HashMap;
use std::num::NonZeroU64;

use anyhow::{anyhow, bail, Result};
use wgpu::util::DeviceExt;

use crate::coords::{ColorRgba, Vector2};

use super::context::{
    BlendMode, BufferId, GpuContext, Primitive, ProgramDesc, ProgramId, TextureId,
    UniformLocation, UniformValue,
};
use super::uniform::{align_up, UniformBlock};

const MAX_ATTRIBUTES: usize = 8;

/// Closes a 4-vertex line strip back onto its first vertex.
const LOOP_INDICES: [u16; 6] = [0, 1, 2, 3, 0, 0];
const LOOP_VERTICES: u32 = 4;

/// Bound in place of attributes the caller left unbound.
const NULL_VERTEX_BYTES: u64 = 256;

const MIN_UNIFORM_CAPACITY: u64 = 64 * 256;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    primitive: Primitive,
    blend: Option<BlendMode>,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct Program {
    label: String,
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    attribute_names: Vec<String>,
    /// Component count per attribute location.
    attribute_components: Vec<u32>,
    block: UniformBlock,
    /// Current uniform values.
    staging: Vec<u8>,
    first_location: u32,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Bind group plus the uniform-buffer generation it was built against.
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

struct DrawCall {
    program: usize,
    key: PipelineKey,
    vertex_count: u32,
    attributes: [Option<BufferId>; MAX_ATTRIBUTES],
    texture: Option<TextureId>,
    uniforms: Vec<u8>,
}

#[derive(Default)]
struct Frame {
    clear: Option<ColorRgba>,
    draws: Vec<DrawCall>,
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    uniform_alignment: u64,

    uniform_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback_texture: GpuTexture,
    null_vertex_buffer: wgpu::Buffer,
    loop_indices: wgpu::Buffer,

    uniform_buffer: Option<wgpu::Buffer>,
    uniform_capacity: u64,
    uniform_generation: u64,

    buffers: Vec<wgpu::Buffer>,
    textures: Vec<GpuTexture>,
    programs: Vec<Program>,
    /// Uniform location → owning program index.
    uniform_owner: Vec<usize>,

    current_program: Option<usize>,
    attributes: [Option<BufferId>; MAX_ATTRIBUTES],
    texture: Option<TextureId>,
    blend: Option<BlendMode>,

    frame: Frame,
}

impl WgpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as u64;

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mapsmith uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mapsmith texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Sprites are pixel art: no filtering between texels.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mapsmith sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let fallback_texture = upload_texture(
            &device,
            &queue,
            &texture_bgl,
            &sampler,
            "mapsmith fallback texture",
            1,
            1,
            &[255; 4],
        );

        let null_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mapsmith null vertex buffer"),
            size: NULL_VERTEX_BYTES,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let loop_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mapsmith line loop ibo"),
            contents: bytemuck::cast_slice(&LOOP_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            device,
            queue,
            target_format,
            uniform_alignment,
            uniform_bgl,
            texture_bgl,
            sampler,
            fallback_texture,
            null_vertex_buffer,
            loop_indices,
            uniform_buffer: None,
            uniform_capacity: 0,
            uniform_generation: 0,
            buffers: Vec::new(),
            textures: Vec::new(),
            programs: Vec::new(),
            uniform_owner: Vec::new(),
            current_program: None,
            attributes: [None; MAX_ATTRIBUTES],
            texture: None,
            blend: None,
            frame: Frame::default(),
        }
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Number of draws in the recorded frame.
    pub fn recorded_draws(&self) -> usize {
        self.frame.draws.len()
    }

    /// Replays the recorded frame into `target`.
    ///
    /// The frame is kept, so presenting again without new draw calls shows
    /// the same image.
    pub fn flush(&mut self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut offsets = Vec::with_capacity(self.frame.draws.len());
        let mut cursor = 0u64;
        for draw in &self.frame.draws {
            offsets.push(cursor);
            let size = self.programs[draw.program].block.size().max(16) as u64;
            cursor += align_up(size, self.uniform_alignment);
        }

        if cursor > 0 {
            self.ensure_uniform_capacity(cursor);
            let mut bytes = vec![0u8; cursor as usize];
            for (draw, offset) in self.frame.draws.iter().zip(&offsets) {
                let at = *offset as usize;
                bytes[at..at + draw.uniforms.len()].copy_from_slice(&draw.uniforms);
            }
            if let Some(buffer) = &self.uniform_buffer {
                self.queue.write_buffer(buffer, 0, &bytes);
            }
        }

        let needed: Vec<(usize, PipelineKey)> =
            self.frame.draws.iter().map(|d| (d.program, d.key)).collect();
        for (program, key) in needed {
            self.ensure_pipeline(program, key);
            self.ensure_uniform_bind_group(program);
        }

        let load = match self.frame.clear {
            Some(color) => wgpu::LoadOp::Clear(color.to_wgpu()),
            None => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("mapsmith canvas pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for (draw, offset) in self.frame.draws.iter().zip(offsets) {
            let Some(program) = self.programs.get(draw.program) else { continue };
            let Some(pipeline) = program.pipelines.get(&draw.key) else { continue };
            let Some((_, uniforms)) = program.bind_group.as_ref() else { continue };
            let texture = draw
                .texture
                .and_then(|t| self.textures.get(t.0 as usize))
                .unwrap_or(&self.fallback_texture);

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, uniforms, &[offset as u32]);
            rpass.set_bind_group(1, &texture.bind_group, &[]);

            for location in 0..program.attribute_components.len() {
                let buffer = draw.attributes[location]
                    .and_then(|b| self.buffers.get(b.0 as usize))
                    .unwrap_or(&self.null_vertex_buffer);
                rpass.set_vertex_buffer(location as u32, buffer.slice(..));
            }

            match draw.key.primitive {
                Primitive::TriangleStrip => rpass.draw(0..draw.vertex_count, 0..1),
                Primitive::LineLoop => {
                    rpass.set_index_buffer(self.loop_indices.slice(..), wgpu::IndexFormat::Uint16);
                    rpass.draw_indexed(0..LOOP_VERTICES + 1, 0, 0..1);
                }
            }
        }
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_uniform_capacity(&mut self, required: u64) {
        if required <= self.uniform_capacity && self.uniform_buffer.is_some() {
            return;
        }
        let capacity = required.next_power_of_two().max(MIN_UNIFORM_CAPACITY);
        self.uniform_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mapsmith draw uniforms"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.uniform_capacity = capacity;
        self.uniform_generation += 1;
    }

    fn ensure_uniform_bind_group(&mut self, program: usize) {
        let Some(buffer) = self.uniform_buffer.as_ref() else { return };
        let Some(p) = self.programs.get_mut(program) else { return };
        if matches!(&p.bind_group, Some((generation, _)) if *generation == self.uniform_generation) {
            return;
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&p.label),
            layout: &self.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(p.block.size().max(16) as u64),
                }),
            }],
        });
        p.bind_group = Some((self.uniform_generation, bind_group));
    }

    fn ensure_pipeline(&mut self, program: usize, key: PipelineKey) {
        let Some(p) = self.programs.get_mut(program) else { return };
        if p.pipelines.contains_key(&key) {
            return;
        }

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = p
            .attribute_components
            .iter()
            .enumerate()
            .map(|(location, components)| {
                [wgpu::VertexAttribute {
                    format: vertex_format(*components).unwrap_or(wgpu::VertexFormat::Float32x2),
                    offset: 0,
                    shader_location: location as u32,
                }]
            })
            .collect();

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attributes
            .iter()
            .zip(&p.attribute_components)
            .map(|(attrs, components)| wgpu::VertexBufferLayout {
                array_stride: *components as u64 * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let (topology, strip_index_format) = match key.primitive {
            Primitive::TriangleStrip => (wgpu::PrimitiveTopology::TriangleStrip, None),
            Primitive::LineLoop => (
                wgpu::PrimitiveTopology::LineStrip,
                Some(wgpu::IndexFormat::Uint16),
            ),
        };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&p.label),
            layout: Some(&p.pipeline_layout),

            vertex: wgpu::VertexState {
                module: &p.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &p.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target_format,
                    blend: key.blend.map(blend_state),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("{}: built pipeline for {key:?}", p.label);
        p.pipelines.insert(key, pipeline);
    }
}

impl GpuContext for WgpuContext {
    fn create_buffer(&mut self, label: &str, points: &[Vector2; 4]) -> BufferId {
        let data: [[f32; 2]; 4] = points.map(|p| [p.x, p.y]);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.buffers.push(buffer);
        BufferId(self.buffers.len() as u32 - 1)
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        let texture = if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            log::warn!("{label}: invalid {width}x{height} texture data; using a blank texel");
            upload_texture(&self.device, &self.queue, &self.texture_bgl, &self.sampler, label, 1, 1, &[0; 4])
        } else {
            upload_texture(&self.device, &self.queue, &self.texture_bgl, &self.sampler, label, width, height, rgba)
        };
        self.textures.push(texture);
        TextureId(self.textures.len() as u32 - 1)
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId> {
        validate_wgsl(desc.label, desc.wgsl)?;

        let mut attribute_names = Vec::new();
        let mut attribute_components = Vec::new();
        for (name, ty) in desc.layout.attributes() {
            if vertex_format(ty.components()).is_none() {
                bail!("{}: attribute {name:?} of type {} cannot be a vertex input", desc.label, ty.as_str());
            }
            attribute_names.push(name.to_string());
            attribute_components.push(ty.components());
        }
        if attribute_components.len() > MAX_ATTRIBUTES {
            bail!("{}: more than {MAX_ATTRIBUTES} attributes", desc.label);
        }

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.wgsl.into()),
        });

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&self.uniform_bgl, &self.texture_bgl],
            immediate_size: 0,
        });

        let block = UniformBlock::from_layout(desc.layout);
        let index = self.programs.len();
        let first_location = self.uniform_owner.len() as u32;
        self.uniform_owner.extend(std::iter::repeat_n(index, block.slots().len()));

        self.programs.push(Program {
            label: desc.label.to_string(),
            module,
            pipeline_layout,
            attribute_names,
            attribute_components,
            staging: vec![0; block.size() as usize],
            block,
            first_location,
            pipelines: HashMap::new(),
            bind_group: None,
        });

        Ok(ProgramId(index as u32))
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let p = self.programs.get(program.0 as usize)?;
        let location = p.attribute_names.iter().position(|n| n == name)?;
        Some(location as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get(program.0 as usize)?;
        let slot = p.block.find(name)?;
        Some(UniformLocation(p.first_location + slot as u32))
    }

    fn use_program(&mut self, program: ProgramId) {
        if (program.0 as usize) < self.programs.len() {
            self.current_program = Some(program.0 as usize);
        }
    }

    fn bind_attribute(&mut self, location: u32, buffer: BufferId, _components: u32) {
        if let Some(slot) = self.attributes.get_mut(location as usize) {
            *slot = Some(buffer);
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let Some(&program) = self.uniform_owner.get(location.0 as usize) else { return };
        let p = &mut self.programs[program];
        let slot = (location.0 - p.first_location) as usize;
        p.block.write(&mut p.staging, slot, value);
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    fn set_blend(&mut self, blend: Option<BlendMode>) {
        self.blend = blend;
    }

    fn clear(&mut self, color: ColorRgba) {
        self.frame.clear = Some(color);
        self.frame.draws.clear();
    }

    fn draw(&mut self, primitive: Primitive, vertex_count: u32) {
        let Some(program) = self.current_program else {
            log::warn!("draw without a program; skipped");
            return;
        };
        if primitive == Primitive::LineLoop && vertex_count != LOOP_VERTICES {
            log::warn!("line loops of {vertex_count} vertices are not supported; skipped");
            return;
        }
        self.frame.draws.push(DrawCall {
            program,
            key: PipelineKey { primitive, blend: self.blend },
            vertex_count,
            attributes: self.attributes,
            texture: self.texture,
            uniforms: self.programs[program].staging.clone(),
        });
    }
}

fn vertex_format(components: u32) -> Option<wgpu::VertexFormat> {
    match components {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
    }
}

fn validate_wgsl(label: &str, source: &str) -> Result<()> {
    use wgpu::naga;

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| anyhow!("{label}: {}", e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("{label}: {e}"))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    GpuTexture {
        _texture: texture,
        bind_group,
    }
}
