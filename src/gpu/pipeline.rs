// ============================================================================
// FIXED RESOURCES — shaders, quad geometry, sampler, blend/raster state
// ============================================================================
//
// Created once per device and never resized.  Render pipelines depend on the
// colour format of the render-target set, so they are built on first use for
// each format and cached here.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::BlurError;

// ============================================================================
// GPU DATA TYPES
// ============================================================================

/// One corner of the full-screen quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Clip-space corners at ±1, drawn as a 4-vertex triangle strip.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
];

/// Per-frame constants shared by both passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurConstants {
    pub texture_size: [f32; 2],
    pub blur_strength: f32,
    pub _pad: f32,
}

impl BlurConstants {
    pub fn new(width: u32, height: u32, blur_strength: f32) -> Self {
        Self {
            texture_size: [width as f32, height as f32],
            blur_strength,
            _pad: 0.0,
        }
    }
}

/// Standard alpha-over: colour by source alpha, alpha written through.
pub const ALPHA_OVER: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::Zero,
        operation: wgpu::BlendOperation::Add,
    },
};

// ============================================================================
// FIXED RESOURCES
// ============================================================================

/// Horizontal + vertical pipelines for one colour format.
pub struct BlurPipelines {
    pub horizontal: wgpu::RenderPipeline,
    pub vertical: wgpu::RenderPipeline,
}

pub struct FixedResources {
    vertex_shader: wgpu::ShaderModule,
    horizontal_shader: wgpu::ShaderModule,
    vertical_shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pub vertex_buffer: wgpu::Buffer,
    pub constant_buffer: wgpu::Buffer,
    pub sampler: wgpu::Sampler,
    /// Group 0: constants + sampler.
    pub constants_bind_group: wgpu::BindGroup,
    /// Group 1: the sampled input texture.
    pub texture_bgl: wgpu::BindGroupLayout,
    pipelines: HashMap<wgpu::TextureFormat, BlurPipelines>,
}

impl FixedResources {
    /// Compile shaders and build the fixed state.  Creation errors are caught
    /// with an error scope instead of reaching the device's uncaptured-error
    /// handler.
    pub fn new(device: &wgpu::Device) -> Result<Self, BlurError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let resources = Self::create(device);
        match pollster::block_on(device.pop_error_scope()) {
            None => Ok(resources),
            Some(e) => Err(BlurError::ShaderCreation(e.to_string())),
        }
    }

    fn create(device: &wgpu::Device) -> Self {
        let vertex_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blur_quad_vs"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::FULLSCREEN_QUAD_SHADER.into()),
        });
        let horizontal_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blur_horizontal_fs"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::HORIZONTAL_BLUR_SHADER.into()),
        });
        let vertical_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blur_vertical_fs"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::VERTICAL_BLUR_SHADER.into()),
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("blur_quad_vb"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let constant_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blur_constants"),
            size: std::mem::size_of::<BlurConstants>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blur_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let constants_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur_constants_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
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

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur_texture_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let constants_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur_constants_bg"),
            layout: &constants_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: constant_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blur_pipeline_layout"),
            bind_group_layouts: &[&constants_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        Self {
            vertex_shader,
            horizontal_shader,
            vertical_shader,
            pipeline_layout,
            vertex_buffer,
            constant_buffer,
            sampler,
            constants_bind_group,
            texture_bgl,
            pipelines: HashMap::new(),
        }
    }

    /// Build the pipelines writing to `format` unless already cached.
    pub fn ensure_pipelines(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<(), BlurError> {
        if self.pipelines.contains_key(&format) {
            return Ok(());
        }
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let horizontal = self.create_pipeline(device, format, &self.horizontal_shader, "blur_horizontal");
        let vertical = self.create_pipeline(device, format, &self.vertical_shader, "blur_vertical");
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(BlurError::ShaderCreation(e.to_string()));
        }
        crate::log_info!("[GPU] Built blur pipelines for {:?}", format);
        self.pipelines.insert(format, BlurPipelines { horizontal, vertical });
        Ok(())
    }

    pub fn pipelines(&self, format: wgpu::TextureFormat) -> Option<&BlurPipelines> {
        self.pipelines.get(&format)
    }

    /// Number of colour formats with cached pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn create_pipeline(
        &self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        fragment: &wgpu::ShaderModule,
        label: &str,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.vertex_shader,
                entry_point: "vs_main",
                buffers: &[QuadVertex::layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(ALPHA_OVER),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        })
    }
}
