//! Rampart scene render pipeline
//!
//! Fullscreen-triangle SDF pass: the fragment shader paints the sky, castle
//! and ground from layout parameters, then the entity storage buffers on
//! top.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::rampart::{Layout, SceneState};
use crate::settings::Settings;

/// Maximum balloons uploaded per frame
const MAX_BALLOONS: usize = 64;
/// Maximum guards
const MAX_GUARDS: usize = 16;
/// Maximum horses
const MAX_HORSES: usize = 8;
/// Maximum pop-burst particles
const MAX_PARTICLES: usize = 256;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    resolution: [f32; 2], // offset 0 - framebuffer pixels
    scene_size: [f32; 2], // offset 8 - CSS pixels (layout space)
    time: f32,            // offset 16
    ground_y: f32,        // offset 20
    wall_top: f32,        // offset 24
    wall_height: f32,     // offset 28
    tower_inset: f32,     // offset 32
    tower_width: f32,     // offset 36
    tower_height: f32,    // offset 40
    merlon_width: f32,    // offset 44
    merlon_gap: f32,      // offset 48
    gate_width: f32,      // offset 52
    balloon_count: u32,   // offset 56
    guard_count: u32,     // offset 60
    horse_count: u32,     // offset 64
    particle_count: u32,  // offset 68
    pointer: [f32; 2],    // offset 72 (8-byte aligned)
    over_balloon: u32,    // offset 80
    _pad: [u32; 3],       // pad to 96 bytes
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BalloonData {
    pos: [f32; 2],
    radius: f32,
    color: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GuardData {
    pos: [f32; 2],
    facing: f32,
    _pad: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct HorseData {
    pos: [f32; 2],
    dir: f32,
    phase: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ParticleData {
    pos: [f32; 2],
    life: f32,
    color: u32,
}

// ============================================================================
// RENDER STATE
// ============================================================================

pub struct RampartRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    balloons_buffer: wgpu::Buffer,
    guards_buffer: wgpu::Buffer,
    horses_buffer: wgpu::Buffer,
    particles_buffer: wgpu::Buffer,

    bind_group: wgpu::BindGroup,

    pub size: (u32, u32),
}

impl RampartRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> Self {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("rampart-device"),
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
            label: Some("rampart_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("rampart.wgsl").into()),
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rampart-globals"),
            contents: bytemuck::bytes_of(&Globals::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let balloons_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rampart-balloons"),
            size: (std::mem::size_of::<BalloonData>() * MAX_BALLOONS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let guards_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rampart-guards"),
            size: (std::mem::size_of::<GuardData>() * MAX_GUARDS) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let horses_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rampart-horses"),
            size: (std::mem::size_of::<HorseData>() * MAX_HORSES) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let particles_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rampart-particles"),
            size: (std::mem::size_of::<ParticleData>() * MAX_PARTICLES) as u64,
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
            label: Some("rampart_bind_group_layout"),
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
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rampart_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: balloons_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: guards_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: horses_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: particles_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rampart_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rampart_pipeline"),
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
            balloons_buffer,
            guards_buffer,
            horses_buffer,
            particles_buffer,
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

    /// Update GPU buffers from scene state and render
    pub fn render(
        &mut self,
        state: &SceneState,
        layout: &Layout,
        settings: &Settings,
        time: f64,
    ) -> Result<(), wgpu::SurfaceError> {
        let elapsed = (time / 1000.0) as f32;

        let visible: Vec<_> = state.balloons.iter().filter(|b| !b.popped).collect();
        let balloon_count = visible.len().min(MAX_BALLOONS) as u32;
        let guard_count = state.guards.len().min(MAX_GUARDS) as u32;
        let horse_count = state.horses.len().min(MAX_HORSES) as u32;
        let max_particles = settings.quality.max_particles().min(MAX_PARTICLES);
        let particle_count = state.particles.len().min(max_particles) as u32;

        let globals = Globals {
            resolution: [self.size.0 as f32, self.size.1 as f32],
            scene_size: [layout.w, layout.h],
            time: elapsed,
            ground_y: layout.ground_y,
            wall_top: layout.wall_top,
            wall_height: layout.wall_height,
            tower_inset: layout.tower_inset,
            tower_width: layout.tower_width,
            tower_height: layout.tower_height,
            merlon_width: layout.merlon_width,
            merlon_gap: layout.merlon_gap,
            gate_width: layout.gate_width,
            balloon_count,
            guard_count,
            horse_count,
            particle_count,
            pointer: [state.pointer.x, state.pointer.y],
            over_balloon: state.over_balloon as u32,
            _pad: [0; 3],
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let mut balloons_data = [BalloonData::zeroed(); MAX_BALLOONS];
        for (i, b) in visible.iter().take(MAX_BALLOONS).enumerate() {
            balloons_data[i] = BalloonData {
                pos: [b.pos.x, b.pos.y],
                radius: b.radius,
                color: b.color,
            };
        }
        self.queue
            .write_buffer(&self.balloons_buffer, 0, bytemuck::cast_slice(&balloons_data));

        let mut guards_data = [GuardData::zeroed(); MAX_GUARDS];
        for (i, g) in state.guards.iter().take(MAX_GUARDS).enumerate() {
            guards_data[i] = GuardData {
                pos: [layout.path_start_x() + g.progress, layout.walkway_y],
                facing: g.dir,
                _pad: 0,
            };
        }
        self.queue
            .write_buffer(&self.guards_buffer, 0, bytemuck::cast_slice(&guards_data));

        let mut horses_data = [HorseData::zeroed(); MAX_HORSES];
        for (i, h) in state.horses.iter().take(MAX_HORSES).enumerate() {
            horses_data[i] = HorseData {
                pos: [h.x, layout.ground_y - 6.0],
                dir: h.dir,
                phase: h.phase,
            };
        }
        self.queue
            .write_buffer(&self.horses_buffer, 0, bytemuck::cast_slice(&horses_data));

        let mut particles_data = [ParticleData::zeroed(); MAX_PARTICLES];
        for (i, p) in state.particles.iter().take(max_particles).enumerate() {
            particles_data[i] = ParticleData {
                pos: [p.pos.x, p.pos.y],
                life: p.life,
                color: p.color,
            };
        }
        self.queue.write_buffer(
            &self.particles_buffer,
            0,
            bytemuck::cast_slice(&particles_data),
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rampart_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rampart_render_pass"),
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
