use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::renderer::frame::{
    ColorUniform, FrameRenderer, PartDraw, PartEncoder, TransformUniforms,
};
use crate::renderer::stats::{FrameStats, SkipReason};
use crate::renderer::texture::{GpuTexture, TextureCache, TextureId};
use crate::scene::{Geometry, Vertex};
use crate::ui::state::RotationFlags;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct TextureFlags {
    has_diffuse: u32,
    has_specular: u32,
    _padding: [u32; 2],
}

/// Texture pair bound for one part; `None` selects the fallback texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TextureSlots {
    diffuse: Option<TextureId>,
    specular: Option<TextureId>,
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    pub pipeline: wgpu::RenderPipeline,
    transform_layout: wgpu::BindGroupLayout,
    color_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    pub depth_texture: wgpu::TextureView,
}

impl GpuState {
    pub async fn new(window: Arc<winit::window::Window>, viewer: &ViewerConfig) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!(adapter = %info.name, backend = ?info.backend, "GPU adapter selected");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        // Textures are stored linear, so present to a linear target as well.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if viewer.present.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let transform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Transform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let color_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Color Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<ColorUniform>() as u64),
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&transform_layout, &color_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Depth testing, not draw order, decides visibility.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(ViewerError::Pipeline(err.to_string()));
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let depth_texture = Self::create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            transform_layout,
            color_layout,
            texture_layout,
            sampler,
            depth_texture,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.device, &self.config);
        }
    }

    /// Next presentable surface, or `None` if this frame should be dropped.
    pub fn acquire_frame(&mut self, stats: &FrameStats) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize(self.size);
                stats.record_skipped(SkipReason::SurfaceReconfigured);
                None
            }
            Err(wgpu::SurfaceError::Timeout) => {
                stats.record_skipped(SkipReason::SurfaceTimeout);
                None
            }
            Err(err) => {
                tracing::error!(%err, "failed to acquire surface texture");
                stats.record_skipped(SkipReason::SurfaceError);
                None
            }
        }
    }

    /// Records the scene pass: clear, bind shared state, then let the
    /// renderer advance the model and draw every part.
    pub fn render_scene(
        &self,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        viewport: Option<Viewport>,
        resources: &SceneResources,
        renderer: &mut FrameRenderer,
        flags: RotationFlags,
    ) -> u32 {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        // The model keeps spinning even while there is nowhere to draw it.
        let Some(viewport) = viewport else {
            renderer.advance(flags);
            return 0;
        };

        render_pass.set_viewport(viewport.x, viewport.y, viewport.width, viewport.height, 0.0, 1.0);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &resources.transform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, resources.vertex_buffer.slice(..));
        render_pass.set_index_buffer(resources.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        let mut part_encoder = WgpuPartEncoder {
            pass: &mut render_pass,
            queue: &self.queue,
            resources,
            next_color_slot: 0,
        };
        renderer.encode_frame(flags, &mut part_encoder)
    }
}

/// Everything uploaded from the scene: geometry, uniforms and textures.
pub struct SceneResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,

    transform_buffer: wgpu::Buffer,
    transform_bind_group: wgpu::BindGroup,

    // One slot per part, `color_stride` bytes apart.
    color_buffer: wgpu::Buffer,
    color_bind_group: wgpu::BindGroup,
    color_stride: u32,
    color_slots: u32,

    _textures: TextureCache<GpuTexture>,
    texture_bind_groups: HashMap<TextureSlots, wgpu::BindGroup>,
    _fallback: GpuTexture,
}

impl SceneResources {
    pub fn new(
        gpu: &GpuState,
        geometry: &Geometry,
        textures: TextureCache<GpuTexture>,
        parts: &[PartDraw],
    ) -> Self {
        let device = &gpu.device;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(geometry.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(geometry.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let transform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Transform Uniform Buffer"),
            size: std::mem::size_of::<TransformUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transform Bind Group"),
            layout: &gpu.transform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform_buffer.as_entire_binding(),
            }],
        });

        let color_stride = color_slot_stride(device.limits().min_uniform_buffer_offset_alignment);
        let color_slots = parts.len().max(1) as u32;
        let color_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Color Uniform Buffer"),
            size: u64::from(color_stride) * u64::from(color_slots),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let color_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Color Bind Group"),
            layout: &gpu.color_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &color_buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ColorUniform>() as u64),
                }),
            }],
        });

        let fallback = GpuTexture::fallback(device, &gpu.queue);

        let mut texture_bind_groups = HashMap::new();
        for slots in texture_slots(parts) {
            texture_bind_groups.entry(slots).or_insert_with(|| {
                let view_for = |id: Option<TextureId>| match id {
                    Some(id) => &textures.texture(id).view,
                    None => &fallback.view,
                };
                let flags = TextureFlags {
                    has_diffuse: u32::from(slots.diffuse.is_some()),
                    has_specular: u32::from(slots.specular.is_some()),
                    _padding: [0; 2],
                };
                let flags_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Texture Flags Buffer"),
                    contents: bytemuck::bytes_of(&flags),
                    usage: wgpu::BufferUsages::UNIFORM,
                });

                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Texture Bind Group"),
                    layout: &gpu.texture_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(view_for(slots.diffuse)),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(view_for(slots.specular)),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: flags_buffer.as_entire_binding(),
                        },
                    ],
                })
            });
        }

        tracing::debug!(
            color_slots,
            color_stride,
            texture_bind_groups = texture_bind_groups.len(),
            textures = textures.len(),
            "scene resources uploaded"
        );

        Self {
            vertex_buffer,
            index_buffer,
            transform_buffer,
            transform_bind_group,
            color_buffer,
            color_bind_group,
            color_stride,
            color_slots,
            _textures: textures,
            texture_bind_groups,
            _fallback: fallback,
        }
    }

    /// Every pair a part can ask for is built in `new`.
    fn texture_bind_group(&self, slots: TextureSlots) -> &wgpu::BindGroup {
        &self.texture_bind_groups[&slots]
    }
}

/// Texture pairs that need a bind group: one per part, plus the untextured
/// pair. May repeat.
fn texture_slots(parts: &[PartDraw]) -> impl Iterator<Item = TextureSlots> + '_ {
    parts
        .iter()
        .map(|p| TextureSlots {
            diffuse: p.diffuse,
            specular: p.specular,
        })
        .chain(std::iter::once(TextureSlots {
            diffuse: None,
            specular: None,
        }))
}

/// Uniform slots addressed by dynamic offset must sit on the device's
/// offset alignment.
fn color_slot_stride(alignment: u32) -> u32 {
    let size = std::mem::size_of::<ColorUniform>() as u32;
    size.div_ceil(alignment) * alignment
}

/// Records part draws into a wgpu render pass.
///
/// Queue writes land before the whole command buffer runs, so every color
/// write goes to a fresh slot and the following draw binds that slot.
struct WgpuPartEncoder<'p, 'e> {
    pass: &'p mut wgpu::RenderPass<'e>,
    queue: &'p wgpu::Queue,
    resources: &'p SceneResources,
    next_color_slot: u32,
}

impl PartEncoder for WgpuPartEncoder<'_, '_> {
    fn upload_transforms(&mut self, uniforms: &TransformUniforms) {
        self.queue.write_buffer(
            &self.resources.transform_buffer,
            0,
            bytemuck::bytes_of(uniforms),
        );
    }

    fn bind_textures(&mut self, diffuse: Option<TextureId>, specular: Option<TextureId>) {
        let bind_group = self
            .resources
            .texture_bind_group(TextureSlots { diffuse, specular });
        self.pass.set_bind_group(2, bind_group, &[]);
    }

    fn upload_color(&mut self, color: ColorUniform) {
        let slot = self.next_color_slot.min(self.resources.color_slots - 1);
        self.next_color_slot += 1;

        let offset = slot * self.resources.color_stride;
        self.queue.write_buffer(
            &self.resources.color_buffer,
            u64::from(offset),
            bytemuck::bytes_of(&color),
        );
        self.pass.set_bind_group(1, &self.resources.color_bind_group, &[offset]);
    }

    fn draw_indexed(&mut self, indices: Range<u32>) {
        self.pass.draw_indexed(indices, 0, 0..1);
    }
}

/// Pixel rectangle the scene is drawn into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Largest square centred in `rect` (egui points), clipped to the
    /// surface. `None` when nothing is left to draw into.
    pub fn fit_square(rect: egui::Rect, pixels_per_point: f32, surface: (u32, u32)) -> Option<Self> {
        let (sw, sh) = (surface.0 as f32, surface.1 as f32);
        let min_x = (rect.min.x * pixels_per_point).clamp(0.0, sw);
        let min_y = (rect.min.y * pixels_per_point).clamp(0.0, sh);
        let max_x = (rect.max.x * pixels_per_point).clamp(0.0, sw);
        let max_y = (rect.max.y * pixels_per_point).clamp(0.0, sh);

        let side = (max_x - min_x).min(max_y - min_y).floor();
        if side < 1.0 {
            return None;
        }

        Some(Self {
            x: (min_x + (max_x - min_x - side) / 2.0).floor(),
            y: (min_y + (max_y - min_y - side) / 2.0).floor(),
            width: side,
            height: side,
        })
    }
}
