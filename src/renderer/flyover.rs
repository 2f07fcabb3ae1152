//! Flyover scene render pipeline
//!
//! Fullscreen-triangle raymarch pass. The fragment shader walks the same
//! fractal heightfield the sim collides against (the noise permutation is
//! uploaded once at startup), models the castle from box/cylinder SDFs and
//! splats the entity storage buffers on top.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::consts::CASTLE_BASE;
use crate::flyover::{CameraPose, World};
use crate::settings::Settings;

/// Maximum wall patrols uploaded per frame
const MAX_PATROLS: usize = 16;
/// Maximum cannons
const MAX_CANNONS: usize = 8;
/// Maximum projectiles in flight
const MAX_PROJECTILES: usize = 64;
/// Maximum citizens
const MAX_CITIZENS: usize = 32;
/// Maximum courtyard horses
const MAX_HORSES: usize = 8;
/// Maximum cloud billboards
const MAX_CLOUDS: usize = 64;
/// Maximum dust puffs
const MAX_PUFFS: usize = 128;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    resolution: [f32; 2],  // offset 0
    time: f32,             // offset 8
    raymarch_steps: u32,   // offset 12
    eye: [f32; 3],         // offset 16 (16-byte aligned for WGSL vec3)
    _pad0: f32,            // offset 28
    target: [f32; 3],      // offset 32
    _pad1: f32,            // offset 44
    patrol_count: u32,     // offset 48
    cannon_count: u32,     // offset 52
    projectile_count: u32, // offset 56
    citizen_count: u32,    // offset 60
    horse_count: u32,      // offset 64
    cloud_count: u32,      // offset 68
    puff_count: u32,       // offset 72
    _pad2: u32,            // pad to 80 bytes
}

/// Position plus one scalar; covers patrols/cannons (yaw), citizens/horses
/// (heading), projectiles (unused) and clouds (scale)
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct EntityData {
    pos: [f32; 3],
    param: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct PuffData {
    pos: [f32; 3],
    scale: f32,
    opacity: f32,
    _pad: [f32; 3],
}

// ============================================================================
// RENDER STATE
// ============================================================================

pub struct FlyoverRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    patrols_buffer: wgpu::Buffer,
    cannons_buffer: wgpu::Buffer,
    projectiles_buffer: wgpu::Buffer,
    citizens_buffer: wgpu::Buffer,
    horses_buffer: wgpu::Buffer,
    clouds_buffer: wgpu::Buffer,
    puffs_buffer: wgpu::Buffer,

    bind_group: wgpu::BindGroup,

    pub size: (u32, u32),
}

impl FlyoverRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        permutation: &[u32; 512],
    ) -> Self {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flyover-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);
        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("flyover_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("flyover.wgsl").into()),
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flyover-globals"),
            contents: bytemuck::bytes_of(&Globals::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // The noise permutation never changes; upload it once
        let perm_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flyover-permutation"),
            contents: bytemuck::cast_slice(permutation),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let entity_buffer = |label: &str, count: usize| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: (std::mem::size_of::<EntityData>() * count) as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        let patrols_buffer = entity_buffer("flyover-patrols", MAX_PATROLS);
        let cannons_buffer = entity_buffer("flyover-cannons", MAX_CANNONS);
        let projectiles_buffer = entity_buffer("flyover-projectiles", MAX_PROJECTILES);
        let citizens_buffer = entity_buffer("flyover-citizens", MAX_CITIZENS);
        let horses_buffer = entity_buffer("flyover-horses", MAX_HORSES);
        let clouds_buffer = entity_buffer("flyover-clouds", MAX_CLOUDS);

        let puffs_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("flyover-puffs"),
            size: (std::mem::size_of::<PuffData>() * MAX_PUFFS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("flyover_bind_group_layout"),
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
                storage_entry(1),
                storage_entry(2),
                storage_entry(3),
                storage_entry(4),
                storage_entry(5),
                storage_entry(6),
                storage_entry(7),
                storage_entry(8),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("flyover_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: perm_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: patrols_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: cannons_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: projectiles_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: citizens_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: horses_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: clouds_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 8,
                    resource: puffs_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flyover_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("flyover_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[], // No vertex buffers - fullscreen triangle
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            globals_buffer,
            patrols_buffer,
            cannons_buffer,
            projectiles_buffer,
            citizens_buffer,
            horses_buffer,
            clouds_buffer,
            puffs_buffer,
            bind_group,
            size: (width, height),
        }
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Update GPU buffers from the world and render
    pub fn render(
        &mut self,
        world: &World,
        pose: &CameraPose,
        settings: &Settings,
        time: f64,
    ) -> Result<(), wgpu::SurfaceError> {
        let elapsed = (time / 1000.0) as f32;
        let max_clouds = settings.quality.max_clouds().min(MAX_CLOUDS);

        let globals = Globals {
            resolution: [self.size.0 as f32, self.size.1 as f32],
            time: elapsed,
            raymarch_steps: settings.quality.raymarch_steps(),
            eye: pose.eye.to_array(),
            _pad0: 0.0,
            target: pose.target.to_array(),
            _pad1: 0.0,
            patrol_count: world.patrols.len().min(MAX_PATROLS) as u32,
            cannon_count: world.cannons.len().min(MAX_CANNONS) as u32,
            projectile_count: world.projectiles.len().min(MAX_PROJECTILES) as u32,
            citizen_count: world.citizens.len().min(MAX_CITIZENS) as u32,
            horse_count: world.horses.len().min(MAX_HORSES) as u32,
            cloud_count: world.clouds.len().min(max_clouds) as u32,
            puff_count: world.puffs.len().min(MAX_PUFFS) as u32,
            _pad2: 0,
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let mut patrols = [EntityData::zeroed(); MAX_PATROLS];
        for (i, p) in world.patrols.iter().take(MAX_PATROLS).enumerate() {
            let (pos, yaw) = p.pose();
            patrols[i] = EntityData {
                pos: pos.to_array(),
                param: yaw,
            };
        }
        self.queue
            .write_buffer(&self.patrols_buffer, 0, bytemuck::cast_slice(&patrols));

        let mut cannons = [EntityData::zeroed(); MAX_CANNONS];
        for (i, c) in world.cannons.iter().take(MAX_CANNONS).enumerate() {
            cannons[i] = EntityData {
                pos: c.pos.to_array(),
                param: c.yaw,
            };
        }
        self.queue
            .write_buffer(&self.cannons_buffer, 0, bytemuck::cast_slice(&cannons));

        let mut projectiles = [EntityData::zeroed(); MAX_PROJECTILES];
        for (i, p) in world.projectiles.iter().take(MAX_PROJECTILES).enumerate() {
            projectiles[i] = EntityData {
                pos: p.pos.to_array(),
                param: 0.0,
            };
        }
        self.queue.write_buffer(
            &self.projectiles_buffer,
            0,
            bytemuck::cast_slice(&projectiles),
        );

        let mut citizens = [EntityData::zeroed(); MAX_CITIZENS];
        for (i, c) in world.citizens.iter().take(MAX_CITIZENS).enumerate() {
            citizens[i] = EntityData {
                pos: [c.pos.x, CASTLE_BASE + 3.0, c.pos.y],
                param: c.heading,
            };
        }
        self.queue
            .write_buffer(&self.citizens_buffer, 0, bytemuck::cast_slice(&citizens));

        let mut horses = [EntityData::zeroed(); MAX_HORSES];
        for (i, h) in world.horses.iter().take(MAX_HORSES).enumerate() {
            let y = CASTLE_BASE + 2.2 + h.bob_phase.sin() * 0.4;
            horses[i] = EntityData {
                pos: [h.pos.x, y, h.pos.y],
                param: h.heading,
            };
        }
        self.queue
            .write_buffer(&self.horses_buffer, 0, bytemuck::cast_slice(&horses));

        let mut clouds = [EntityData::zeroed(); MAX_CLOUDS];
        for (i, c) in world.clouds.iter().take(max_clouds).enumerate() {
            clouds[i] = EntityData {
                pos: c.pos.to_array(),
                param: c.scale,
            };
        }
        self.queue
            .write_buffer(&self.clouds_buffer, 0, bytemuck::cast_slice(&clouds));

        let mut puffs = [PuffData::zeroed(); MAX_PUFFS];
        for (i, p) in world.puffs.iter().take(MAX_PUFFS).enumerate() {
            puffs[i] = PuffData {
                pos: p.pos.to_array(),
                scale: p.scale(),
                opacity: p.opacity(),
                _pad: [0.0; 3],
            };
        }
        self.queue
            .write_buffer(&self.puffs_buffer, 0, bytemuck::cast_slice(&puffs));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flyover_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flyover_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
