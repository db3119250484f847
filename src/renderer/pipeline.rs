//! WebGPU render pipeline setup
//!
//! Two passes per frame: a depth-only pass from the sun into the shadow map, then
//! the main pass (opaque objects first, translucent ones blended on top).

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::shapes::mesh_for;
use super::vertex::Vertex;
use super::{RenderError, SceneRenderer};
use crate::error::GameError;
use crate::scene::{MeshKind, PerspectiveCamera, Scene, SceneObject};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// GPU DATA STRUCTURES (must match scene.wgsl / shadow.wgsl)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    fog_color: [f32; 4],
    /// fog near, fog far, shadows enabled, shadow texel size
    params: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    /// x: receives shadows
    flags: [f32; 4],
}

impl ObjectUniform {
    fn from_object(object: &SceneObject) -> Self {
        let [r, g, b] = object.material.color;
        Self {
            model: object.model_matrix().to_cols_array_2d(),
            color: [r, g, b, object.material.opacity],
            flags: [f32::from(u8::from(object.receive_shadow)), 0.0, 0.0, 0.0],
        }
    }
}

/// Per scene object GPU resources
struct GpuObject {
    kind: MeshKind,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct ShadowMap {
    view: wgpu::TextureView,
    size: u32,
}

impl ShadowMap {
    fn new(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            size,
        }
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

// ============================================================================
// RENDER STATE
// ============================================================================

/// Main render state
pub struct RenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    /// Viewport size in pixels
    pub size: (u32, u32),

    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    globals_layout: wgpu::BindGroupLayout,
    globals_bind_group: wgpu::BindGroup,
    shadow_globals_buffer: wgpu::Buffer,
    shadow_globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,

    shadow_map: ShadowMap,
    depth_view: wgpu::TextureView,
    objects: Vec<GpuObject>,
}

impl RenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        shadow_map_size: Option<u32>,
    ) -> Result<Self, GameError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("goal-rush-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .map_err(|e| GameError::Device(e.to_string()))?;

        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| GameError::Surface("no supported surface format".into()))?;
        log::info!("Using surface format: {:?}", surface_format);

        let width = width.max(1);
        let height = height.max(1);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
        });

        // Bind group layouts
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let shadow_globals_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow_globals_layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        // Buffers
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow_globals"),
            contents: bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        // A 1x1 map stands in when shadows are off so the layout stays the same
        let shadow_map = ShadowMap::new(&device, shadow_map_size.unwrap_or(1).max(1));
        log::info!(
            "Shadow map: {}",
            shadow_map_size.map_or("disabled".to_string(), |s| format!("{s}x{s}"))
        );

        let globals_bind_group = Self::create_globals_bind_group(
            &device,
            &globals_layout,
            &globals_buffer,
            &shadow_map,
            &shadow_sampler,
        );
        let shadow_globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_globals_bind_group"),
            layout: &shadow_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_globals_buffer.as_entire_binding(),
            }],
        });

        // Pipelines
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            immediate_size: 0,
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[&shadow_globals_layout, &object_layout],
            immediate_size: 0,
        });

        let scene_pipeline = |label: &str, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&scene_layout),
                vertex: wgpu::VertexState {
                    module: &scene_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &scene_shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };
        let opaque_pipeline = scene_pipeline("opaque_pipeline", wgpu::BlendState::REPLACE, true);
        let transparent_pipeline =
            scene_pipeline("transparent_pipeline", wgpu::BlendState::ALPHA_BLENDING, false);

        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&shadow_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_shadow"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let depth_view = create_depth_view(&device, width, height);

        log::info!("Renderer initialized ({}x{})", width, height);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size: (width, height),
            opaque_pipeline,
            transparent_pipeline,
            shadow_pipeline,
            globals_buffer,
            globals_layout,
            globals_bind_group,
            shadow_globals_buffer,
            shadow_globals_bind_group,
            object_layout,
            shadow_sampler,
            shadow_map,
            depth_view,
            objects: Vec::new(),
        })
    }

    fn create_globals_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        globals_buffer: &wgpu::Buffer,
        shadow_map: &ShadowMap,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Reallocate the shadow map when the scene asks for a different resolution
    fn ensure_shadow_map(&mut self, size: u32) {
        if self.shadow_map.size == size {
            return;
        }
        self.shadow_map = ShadowMap::new(&self.device, size);
        self.globals_bind_group = Self::create_globals_bind_group(
            &self.device,
            &self.globals_layout,
            &self.globals_buffer,
            &self.shadow_map,
            &self.shadow_sampler,
        );
    }

    /// Make sure every scene object has GPU buffers, then refresh their uniforms
    fn sync_objects(&mut self, scene: &Scene) {
        for (id, object) in scene.objects() {
            let stale = self
                .objects
                .get(id.0)
                .is_none_or(|gpu| gpu.kind != object.mesh);
            if stale {
                let gpu = self.upload_object(object);
                if id.0 < self.objects.len() {
                    self.objects[id.0] = gpu;
                } else {
                    self.objects.push(gpu);
                }
            }

            let uniform = ObjectUniform::from_object(object);
            self.queue.write_buffer(
                &self.objects[id.0].uniform_buffer,
                0,
                bytemuck::bytes_of(&uniform),
            );
        }
    }

    fn upload_object(&self, object: &SceneObject) -> GpuObject {
        let mesh = mesh_for(&object.mesh);

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertex_buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        // Pad to a 4-byte multiple for u16 indices
        let mut indices = mesh.indices.clone();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("index_buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object_uniform"),
                contents: bytemuck::bytes_of(&ObjectUniform::from_object(object)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        GpuObject {
            kind: object.mesh,
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    fn write_globals(&self, scene: &Scene, camera: &PerspectiveCamera) -> Option<Mat4> {
        let light_view_proj = scene.sun.shadow_view_proj();
        let sun = &scene.sun;
        let to_light = sun.direction_to_light();
        let (fog_color, fog_near, fog_far) = match scene.fog {
            Some(fog) => ([fog.color[0], fog.color[1], fog.color[2], 1.0], fog.near, fog.far),
            None => ([0.0; 4], 0.0, 1.0),
        };

        let globals = Globals {
            view_proj: camera.view_proj().to_cols_array_2d(),
            light_view_proj: light_view_proj.unwrap_or(Mat4::IDENTITY).to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: to_light.extend(0.0).to_array(),
            light_color: [sun.color[0], sun.color[1], sun.color[2], sun.intensity],
            ambient: [
                scene.ambient.color[0],
                scene.ambient.color[1],
                scene.ambient.color[2],
                scene.ambient.intensity,
            ],
            fog_color,
            params: [
                fog_near,
                fog_far,
                if light_view_proj.is_some() { 1.0 } else { 0.0 },
                1.0 / self.shadow_map.size as f32,
            ],
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        light_view_proj
    }

    fn draw_objects<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'_>,
        objects: impl Iterator<Item = &'a GpuObject>,
    ) {
        for gpu in objects {
            pass.set_bind_group(1, &gpu.bind_group, &[]);
            pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..gpu.index_count, 0, 0..1);
        }
    }
}

impl SceneRenderer for RenderState {
    fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, new_width, new_height);
        }
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        if let Some(shadow) = scene.sun.shadow {
            self.ensure_shadow_map(shadow.map_size.max(1));
        }
        self.sync_objects(scene);
        let light_view_proj = self.write_globals(scene, camera);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        if let Some(light_view_proj) = light_view_proj {
            self.queue.write_buffer(
                &self.shadow_globals_buffer,
                0,
                bytemuck::cast_slice(&light_view_proj.to_cols_array()),
            );

            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.shadow_globals_bind_group, &[]);
            let casters = scene
                .objects()
                .filter(|(_, o)| o.cast_shadow)
                .map(|(id, _)| &self.objects[id.0]);
            self.draw_objects(&mut shadow_pass, casters);
        }

        {
            let [r, g, b] = scene.background;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);

            render_pass.set_pipeline(&self.opaque_pipeline);
            let opaque = scene
                .objects()
                .filter(|(_, o)| !o.material.is_transparent())
                .map(|(id, _)| &self.objects[id.0]);
            self.draw_objects(&mut render_pass, opaque);

            render_pass.set_pipeline(&self.transparent_pipeline);
            let transparent = scene
                .objects()
                .filter(|(_, o)| o.material.is_transparent())
                .map(|(id, _)| &self.objects[id.0]);
            self.draw_objects(&mut render_pass, transparent);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
