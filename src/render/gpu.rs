use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::Pod;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use crate::assets::{AssetCatalog, TextureId};
use crate::constants::{PerFrameConstants, PerObjectConstants};
use crate::error::InitError;
use crate::light::NUM_LIGHTS;
use crate::material::{BlendMode, CullMode, DepthMode, Technique, TextureSet};
use crate::mesh::{MeshData, MeshVertex};
use crate::scene::Scene;
use crate::texture::{TextureData, TextureKind};

use super::commands::{FrameCommands, PassRecord, PassTarget, RenderCommand};
use super::shaders::SHADER_SOURCE;

/// wgpu backend that executes recorded [`FrameCommands`].
///
/// Every GPU resource the scene needs is created up front; a failure in any
/// of them is reported as an [`InitError`] before the first frame.
pub struct Renderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    depth: DepthBuffer,
    layouts: Layouts,
    frame_uniforms: DynamicUniforms,
    object_uniforms: DynamicUniforms,
    shadow_maps: Vec<ShadowMap>,
    shadow_bind_group: wgpu::BindGroup,
    material_sampler: wgpu::Sampler,
    textures: Vec<wgpu::TextureView>,
    fallback_diffuse: wgpu::TextureView,
    fallback_secondary: wgpu::TextureView,
    materials: HashMap<TextureSet, wgpu::BindGroup>,
    meshes: Vec<MeshBuffers>,
    pipelines: HashMap<Technique, wgpu::RenderPipeline>,
}

impl Renderer {
    /// Creates the device, uploads every asset in the scene's catalog and
    /// builds one pipeline per technique.
    pub async fn new(window: Arc<Window>, scene: &Scene) -> Result<Self, InitError> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(InitError::Device("window has zero area".to_string()));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|err| InitError::Device(format!("failed to create surface: {err}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| InitError::Device(format!("failed to acquire GPU adapter: {err}")))?;

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("shadow-lab-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .map_err(|err| InitError::Device(format!("failed to create GPU device: {err}")))?;
        info!("using adapter {}", adapter.get_info().name);

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(InitError::Device("surface reports no formats".to_string()));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(first_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| matches!(mode, wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate))
                .unwrap_or(wgpu::PresentMode::Fifo),
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);
        let layouts = Layouts::new(&device);

        let frame_uniforms = DynamicUniforms::new(
            &device,
            &layouts.frame,
            "frame-constants",
            std::mem::size_of::<PerFrameConstants>() as u64,
            NUM_LIGHTS + 1,
        );
        let object_uniforms = DynamicUniforms::new(
            &device,
            &layouts.object,
            "object-constants",
            std::mem::size_of::<PerObjectConstants>() as u64,
            64,
        );

        let shadow_maps = (0..NUM_LIGHTS)
            .map(|index| ShadowMap::create(&device, index, scene.shadow_map_size()))
            .collect::<Result<Vec<_>, _>>()?;
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-comparison-sampler"),
            compare: Some(wgpu::CompareFunction::LessEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-map-bind-group"),
            layout: &layouts.shadow,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_maps[0].view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_maps[1].view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let assets = scene.assets();
        let textures = upload_textures(&device, &queue, assets)?;
        let fallback_diffuse = upload_texture(
            &device,
            &queue,
            "fallback-diffuse",
            &solid_texture([255, 255, 255, 0], TextureKind::Color)?,
        );
        let fallback_secondary = upload_texture(
            &device,
            &queue,
            "fallback-secondary",
            &solid_texture([128, 128, 255, 255], TextureKind::Linear)?,
        );
        let meshes = assets
            .meshes()
            .map(|(_, name, mesh)| MeshBuffers::from_mesh(&device, mesh, name))
            .collect();

        let pipelines = build_pipelines(&device, &layouts, surface_format)?;

        let mut renderer = Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            depth,
            layouts,
            frame_uniforms,
            object_uniforms,
            shadow_maps,
            shadow_bind_group,
            material_sampler,
            textures,
            fallback_diffuse,
            fallback_secondary,
            materials: HashMap::new(),
            meshes,
            pipelines,
        };

        let mut sets: Vec<TextureSet> = scene.models().iter().map(|model| model.material.textures).collect();
        sets.push(scene.marker_material().textures);
        for set in sets {
            renderer.ensure_material(set);
        }
        info!(
            "renderer ready: {} meshes, {} textures, {} materials, {}px shadow maps",
            renderer.meshes.len(),
            renderer.textures.len(),
            renderer.materials.len(),
            scene.shadow_map_size()
        );
        Ok(renderer)
    }

    /// Returns the identifier of the window owned by the renderer.
    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// Exposes the inner window for event handling.
    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn surface_size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Reconfigures the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    /// Uploads the frame's constant blocks and executes its passes in order,
    /// then presents.
    pub fn render(&mut self, frame: &FrameCommands) -> Result<(), wgpu::SurfaceError> {
        self.frame_uniforms
            .write(&self.device, &self.queue, &self.layouts.frame, &frame.frame_constants);
        self.object_uniforms
            .write(&self.device, &self.queue, &self.layouts.object, &frame.object_constants);
        for pass in &frame.passes {
            for command in &pass.commands {
                if let RenderCommand::BindMaterial(textures) = command {
                    self.ensure_material(*textures);
                }
            }
        }

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        for record in &frame.passes {
            self.execute_pass(&mut encoder, &view, record);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn execute_pass(&self, encoder: &mut wgpu::CommandEncoder, back_buffer: &wgpu::TextureView, record: &PassRecord) {
        let depth_ops = Some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(record.clear_depth),
            store: wgpu::StoreOp::Store,
        });
        let (color_view, depth_view, width, height) = match record.target {
            PassTarget::BackBuffer => (Some(back_buffer), &self.depth.view, self.size.width, self.size.height),
            PassTarget::ShadowMap(index) => match self.shadow_maps.get(index) {
                Some(map) => (None, &map.view, map.size, map.size),
                None => {
                    warn!("skipping pass {}: no shadow map {index}", record.label);
                    return;
                }
            },
        };

        let color_attachment = color_view.map(|view| wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: match record.clear_color {
                    Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    None => wgpu::LoadOp::Load,
                },
                store: wgpu::StoreOp::Store,
            },
        });
        let color_attachments: Vec<_> = color_attachment.into_iter().map(Some).collect();

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&record.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops,
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(
            0.0,
            0.0,
            record.viewport.width.min(width) as f32,
            record.viewport.height.min(height) as f32,
            0.0,
            1.0,
        );

        let mut technique = None;
        let mut frame_slot = None;
        let mut material = None;
        let mut shadows_bound = false;
        for command in &record.commands {
            match *command {
                RenderCommand::SetFrameConstants(slot) => frame_slot = Some(slot),
                RenderCommand::SetTechnique(next) => {
                    if let Some(pipeline) = self.pipelines.get(&next) {
                        pass.set_pipeline(pipeline);
                        technique = Some(next);
                    }
                }
                RenderCommand::BindMaterial(textures) => material = self.materials.get(&textures),
                RenderCommand::BindShadowMaps => shadows_bound = true,
                RenderCommand::UnbindShadowMaps => shadows_bound = false,
                RenderCommand::Draw { mesh, object } => {
                    let (Some(technique), Some(frame_slot)) = (technique, frame_slot) else {
                        warn!("pass {}: draw without technique or frame constants", record.label);
                        continue;
                    };
                    let Some(buffers) = self.meshes.get(mesh.index()) else {
                        warn!("pass {}: unknown mesh {}", record.label, mesh.index());
                        continue;
                    };
                    pass.set_bind_group(0, &self.frame_uniforms.bind_group, &[self.frame_uniforms.offset(frame_slot)]);
                    pass.set_bind_group(1, &self.object_uniforms.bind_group, &[self.object_uniforms.offset(object)]);
                    if technique.texture_slots() > 0 {
                        let Some(material) = material else {
                            warn!("pass {}: {technique:?} drawn without material", record.label);
                            continue;
                        };
                        pass.set_bind_group(2, material, &[]);
                    }
                    if technique.reads_shadow_maps() {
                        if !shadows_bound {
                            warn!("pass {}: {technique:?} drawn without shadow maps", record.label);
                            continue;
                        }
                        pass.set_bind_group(3, &self.shadow_bind_group, &[]);
                    }
                    pass.set_vertex_buffer(0, buffers.vertex.slice(..));
                    pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..buffers.index_count, 0, 0..1);
                }
            }
        }
    }

    fn ensure_material(&mut self, textures: TextureSet) {
        if self.materials.contains_key(&textures) {
            return;
        }
        let diffuse = texture_or(&self.textures, textures.diffuse, &self.fallback_diffuse);
        let secondary = texture_or(&self.textures, textures.secondary, &self.fallback_secondary);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material-bind-group"),
            layout: &self.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(diffuse),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(secondary),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.material_sampler),
                },
            ],
        });
        debug!("created material bind group for {textures:?}");
        self.materials.insert(textures, bind_group);
    }
}

fn texture_or<'a>(
    textures: &'a [wgpu::TextureView],
    id: Option<TextureId>,
    fallback: &'a wgpu::TextureView,
) -> &'a wgpu::TextureView {
    id.and_then(|id| textures.get(id.index())).unwrap_or(fallback)
}

/// Bind group layouts shared by every pipeline.
struct Layouts {
    frame: wgpu::BindGroupLayout,
    object: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    shadow: wgpu::BindGroupLayout,
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform = |label, size: usize| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(size as u64),
                    },
                    count: None,
                }],
            })
        };
        let frame = uniform("frame-bind-layout", std::mem::size_of::<PerFrameConstants>());
        let object = uniform("object-bind-layout", std::mem::size_of::<PerObjectConstants>());

        let texture = |binding, sample_type| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler = |binding, kind| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(kind),
            count: None,
        };
        let color = wgpu::TextureSampleType::Float { filterable: true };
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-bind-layout"),
            entries: &[
                texture(0, color),
                texture(1, color),
                sampler(2, wgpu::SamplerBindingType::Filtering),
            ],
        });
        let shadow = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow-bind-layout"),
            entries: &[
                texture(0, wgpu::TextureSampleType::Depth),
                texture(1, wgpu::TextureSampleType::Depth),
                sampler(2, wgpu::SamplerBindingType::Comparison),
            ],
        });

        Self {
            frame,
            object,
            material,
            shadow,
        }
    }

    /// Groups a technique's shaders reference, in group order.
    fn for_technique(&self, technique: Technique) -> Vec<&wgpu::BindGroupLayout> {
        let mut layouts = vec![&self.frame, &self.object];
        if technique.texture_slots() > 0 {
            layouts.push(&self.material);
        }
        if technique.reads_shadow_maps() {
            layouts.push(&self.shadow);
        }
        layouts
    }
}

fn build_pipelines(
    device: &wgpu::Device,
    layouts: &Layouts,
    surface_format: wgpu::TextureFormat,
) -> Result<HashMap<Technique, wgpu::RenderPipeline>, InitError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shadow-lab-shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
    });
    let pipelines = Technique::ALL
        .into_iter()
        .map(|technique| (technique, build_pipeline(device, layouts, &shader, technique, surface_format)))
        .collect();
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(InitError::Shader(err.to_string()));
    }
    Ok(pipelines)
}

fn build_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    shader: &wgpu::ShaderModule,
    technique: Technique,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let state = technique.render_state();
    let bind_group_layouts = layouts.for_technique(technique);
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(technique.label()),
        bind_group_layouts: &bind_group_layouts,
        push_constant_ranges: &[],
    });

    let blend = match state.blend {
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
        BlendMode::Additive => {
            let add = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            wgpu::BlendState { color: add, alpha: add }
        }
    };
    let targets = [Some(wgpu::ColorTargetState {
        format: surface_format,
        blend: Some(blend),
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let fragment = technique
        .pixel_entry_point()
        .filter(|_| state.color_output)
        .map(|entry_point| wgpu::FragmentState {
            module: shader,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            targets: &targets,
        });
    let (depth_format, depth_write_enabled, depth_compare) = match (state.color_output, state.depth) {
        (false, _) => (ShadowMap::FORMAT, true, wgpu::CompareFunction::Less),
        (true, DepthMode::ReadWrite) => (DepthBuffer::FORMAT, true, wgpu::CompareFunction::Less),
        (true, DepthMode::ReadOnly) => (DepthBuffer::FORMAT, false, wgpu::CompareFunction::LessEqual),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(technique.label()),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(technique.vertex_stage().entry_point()),
            compilation_options: Default::default(),
            buffers: &[MeshVertex::layout()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            // Meshes wind clockwise when viewed from outside.
            front_face: wgpu::FrontFace::Cw,
            cull_mode: match state.cull {
                CullMode::Back => Some(wgpu::Face::Back),
                CullMode::None => None,
            },
            polygon_mode: wgpu::PolygonMode::Fill,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled,
            depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment,
        multiview: None,
        cache: None,
    })
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2, 3 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One uniform buffer holding every block of a frame at aligned offsets,
/// bound with a dynamic offset per draw.
struct DynamicUniforms {
    label: &'static str,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    block_size: u64,
    stride: u64,
    capacity: usize,
}

impl DynamicUniforms {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &'static str, block_size: u64, capacity: usize) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_up(block_size, alignment);
        let (buffer, bind_group) = Self::allocate(device, layout, label, block_size, stride, capacity);
        Self {
            label,
            buffer,
            bind_group,
            block_size,
            stride,
            capacity,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        block_size: u64,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity.max(1) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block_size),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Writes `blocks` at slots `0..blocks.len()`, growing the buffer first
    /// when they do not fit.
    fn write<T: Pod>(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout, blocks: &[T]) {
        if blocks.is_empty() {
            return;
        }
        if blocks.len() > self.capacity {
            let capacity = blocks.len().next_power_of_two();
            debug!("growing {} from {} to {capacity} blocks", self.label, self.capacity);
            let (buffer, bind_group) = Self::allocate(device, layout, self.label, self.block_size, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
        let stride = self.stride as usize;
        let mut staging = vec![0u8; stride * blocks.len()];
        for (chunk, block) in staging.chunks_exact_mut(stride).zip(blocks) {
            let bytes = bytemuck::bytes_of(block);
            chunk[..bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &staging);
    }

    fn offset(&self, slot: usize) -> u32 {
        (slot as u64 * self.stride) as u32
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

struct ShadowMap {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: u32,
}

impl ShadowMap {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn create(device: &wgpu::Device, index: usize, size: u32) -> Result<Self, InitError> {
        let max = device.limits().max_texture_dimension_2d;
        if size == 0 || size > max {
            return Err(InitError::ShadowMap(format!(
                "shadow map {index} of {size}px exceeds the device limit of {max}px"
            )));
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("shadow-map-{index}")),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            _texture: texture,
            view,
            size,
        })
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

fn upload_textures(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    assets: &AssetCatalog,
) -> Result<Vec<wgpu::TextureView>, InitError> {
    let max = device.limits().max_texture_dimension_2d;
    assets
        .textures()
        .map(|(_, name, data)| {
            if data.width > max || data.height > max {
                return Err(InitError::texture(
                    name,
                    format!("{}x{} exceeds the device limit of {max}px", data.width, data.height),
                ));
            }
            Ok(upload_texture(device, queue, name, data))
        })
        .collect()
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, data: &TextureData) -> wgpu::TextureView {
    let format = match data.kind {
        TextureKind::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureKind::Linear => wgpu::TextureFormat::Rgba8Unorm,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &data.pixels,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn solid_texture(texel: [u8; 4], kind: TextureKind) -> Result<TextureData, InitError> {
    TextureData::new(1, 1, texel.to_vec(), kind).map_err(|reason| InitError::texture("fallback", reason))
}
