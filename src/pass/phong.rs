use std::{collections::HashMap, iter, mem};

use cgmath::{Deg, Matrix4, Rad};
use wgpu::{BindGroupLayout, Device, Queue, Surface};

use crate::{
    context::create_render_pipeline,
    model::{DrawModel, ModelVertex, SceneResources, Vertex},
    sgraph::visitors::{LeafDraw, RenderBackend, RenderError, DEFAULT_TEXTURE},
    sgraph::{Light, Material},
    texture,
};

use super::{Pass, UniformPool};

/// Size of the light array in the shader
pub const MAX_LIGHTS: usize = 8;

// Global uniform data
// aka the projection and how many lights are in use
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    projection: [[f32; 4]; 4],
    light_count: [u32; 4],
}

// Uniform for light data, in view space
// Every field is padded to 16 bytes as uniforms require
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub position: [f32; 4],
    // w holds the cosine of the spot cutoff, -1 for lights without a cone
    pub spot_direction: [f32; 4],
}

impl From<&Light> for LightUniform {
    fn from(light: &Light) -> Self {
        let cutoff = if light.is_spot() {
            Rad::from(Deg(light.spot_cutoff)).0.cos()
        } else {
            -1.0
        };
        Self {
            ambient: light.ambient.extend(1.0).into(),
            diffuse: light.diffuse.extend(1.0).into(),
            specular: light.specular.extend(1.0).into(),
            position: light.position.into(),
            spot_direction: light.spot_direction.extend(cutoff).into(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Lights {
    lights: [LightUniform; MAX_LIGHTS],
}

// Local uniform data
// aka the individual leaf's transforms and material
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Locals {
    pub modelview: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub texture_matrix: [[f32; 4]; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    // w holds the shininess
    pub specular: [f32; 4],
    pub emission: [f32; 4],
}

impl Locals {
    fn new(
        modelview: Matrix4<f32>,
        normal_matrix: Matrix4<f32>,
        texture_matrix: Matrix4<f32>,
        material: &Material,
    ) -> Self {
        Self {
            modelview: modelview.into(),
            normal_matrix: normal_matrix.into(),
            texture_matrix: texture_matrix.into(),
            ambient: material.ambient.extend(1.0).into(),
            diffuse: material.diffuse.extend(1.0).into(),
            specular: material.specular.extend(material.shininess).into(),
            emission: material.emission.extend(1.0).into(),
        }
    }
}

/// One leaf waiting to be drawn this frame
#[derive(Debug, Clone)]
pub struct QueuedDraw {
    pub instance: String,
    pub texture: String,
    pub locals: Locals,
}

/// Collects the draws of one frame from the rasterizing traversal,
/// checking them against the uploaded scene resources.
pub struct PhongFrame<'r> {
    resources: &'r SceneResources,
    draws: Vec<QueuedDraw>,
}

impl<'r> PhongFrame<'r> {
    pub fn new(resources: &'r SceneResources) -> Self {
        Self {
            resources,
            draws: Vec::new(),
        }
    }

    pub fn into_draws(self) -> Vec<QueuedDraw> {
        self.draws
    }
}

impl RenderBackend for PhongFrame<'_> {
    fn has_texture(&self, name: &str) -> bool {
        self.resources.textures.contains_key(name)
    }

    fn draw(&mut self, draw: LeafDraw) -> Result<(), RenderError> {
        if !self.resources.meshes.contains_key(draw.instance) {
            return Err(RenderError::UnknownInstance {
                leaf: String::new(),
                instance: draw.instance.to_string(),
            });
        }
        self.draws.push(QueuedDraw {
            instance: draw.instance.to_string(),
            texture: draw.texture.to_string(),
            locals: Locals::new(
                draw.modelview,
                draw.normal_matrix,
                draw.texture_matrix,
                draw.material,
            ),
        });
        Ok(())
    }
}

pub struct PhongConfig {
    pub max_lights: usize,
    pub clear_color: wgpu::Color,
}

impl Default for PhongConfig {
    fn default() -> Self {
        Self {
            max_lights: MAX_LIGHTS,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

pub struct PhongPass {
    config: PhongConfig,
    // Uniforms
    pub global_bind_group_layout: BindGroupLayout,
    pub global_uniform_buffer: wgpu::Buffer,
    pub global_bind_group: wgpu::BindGroup,
    pub local_bind_group_layout: BindGroupLayout,
    // Keyed by uniform pool slot and texture name
    local_bind_groups: HashMap<(usize, String), wgpu::BindGroup>,
    pub uniform_pool: UniformPool,
    // Textures
    pub depth_texture: texture::Texture,
    // Render pipeline
    pub render_pipeline: wgpu::RenderPipeline,
    // Lighting
    pub light_buffer: wgpu::Buffer,
}

impl PhongPass {
    pub fn new(
        phong_config: PhongConfig,
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> PhongPass {
        // Setup global uniforms
        // Global bind group layout
        let global_size = mem::size_of::<Globals>() as wgpu::BufferAddress;
        let light_size = mem::size_of::<Lights>() as wgpu::BufferAddress;
        let global_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("[Phong] Globals"),
                entries: &[
                    // Global uniforms
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(global_size),
                        },
                        count: None,
                    },
                    // Lights
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(light_size),
                        },
                        count: None,
                    },
                    // Sampler for textures
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        // Global uniform buffer
        let global_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("[Phong] Globals"),
            size: global_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("[Phong] Lights"),
            size: light_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // Shared by every texture; repeats so texture matrices can tile past 1
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("[Phong] sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        // Combine the global uniform, the lights, and the texture sampler into one bind group
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("[Phong] Globals"),
            layout: &global_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: global_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        // Setup local uniforms
        // Local bind group layout
        let local_size = mem::size_of::<Locals>() as wgpu::BufferAddress;
        let local_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("[Phong] Locals"),
                entries: &[
                    // Local uniforms
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(local_size),
                        },
                        count: None,
                    },
                    // Leaf texture
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                ],
            });

        // Setup the render pipeline
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("[Phong] Pipeline"),
            bind_group_layouts: &[&global_bind_group_layout, &local_bind_group_layout],
            push_constant_ranges: &[],
        });
        let render_pipeline = create_render_pipeline(
            device,
            &pipeline_layout,
            config.format,
            Some(texture::Texture::DEPTH_FORMAT),
            &[ModelVertex::desc()],
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::ShaderModuleDescriptor {
                label: Some("Phong Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("../shader.wgsl").into()),
            },
        );

        // Create depth texture
        let depth_texture = texture::Texture::create_depth_texture(device, config, "depth_texture");

        let uniform_pool = UniformPool::new("[Phong] Locals", local_size);

        PhongPass {
            config: phong_config,
            global_bind_group_layout,
            global_uniform_buffer,
            global_bind_group,
            local_bind_group_layout,
            local_bind_groups: Default::default(),
            uniform_pool,
            depth_texture,
            render_pipeline,
            light_buffer,
        }
    }

    /// Keeps the depth buffer the size of the surface
    pub fn resize(&mut self, device: &Device, config: &wgpu::SurfaceConfiguration) {
        self.depth_texture = texture::Texture::create_depth_texture(device, config, "depth_texture");
    }

    /// Uploads the projection and the view space lights for the next frame
    pub fn update_globals(&self, queue: &Queue, projection: Matrix4<f32>, lights: &[Light]) {
        let max_lights = self.config.max_lights.min(MAX_LIGHTS);
        if lights.len() > max_lights {
            log::debug!("Scene has {} lights, shading with the first {}", lights.len(), max_lights);
        }
        let count = lights.len().min(max_lights);

        let mut uniforms = Lights {
            lights: [bytemuck::Zeroable::zeroed(); MAX_LIGHTS],
        };
        for (slot, light) in uniforms.lights.iter_mut().zip(&lights[..count]) {
            *slot = LightUniform::from(light);
        }

        let globals = Globals {
            projection: projection.into(),
            light_count: [count as u32, 0, 0, 0],
        };
        queue.write_buffer(&self.global_uniform_buffer, 0, bytemuck::cast_slice(&[globals]));
        queue.write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }
}

impl Pass for PhongPass {
    type Draw = QueuedDraw;

    fn draw(
        &mut self,
        surface: &Surface,
        device: &Device,
        queue: &Queue,
        resources: &SceneResources,
        draws: &[QueuedDraw],
    ) -> Result<(), wgpu::SurfaceError> {
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // Allocate buffers for local uniforms
        self.uniform_pool.alloc_buffers(draws.len(), device);

        // Upload each leaf's locals and make sure a bind group exists for
        // its slot and texture. This is a separate loop from the render
        // because the render pass borrows the bind groups.
        let mut bound = Vec::with_capacity(draws.len());
        for (index, draw) in draws.iter().enumerate() {
            self.uniform_pool.update_uniform(index, draw.locals, queue);

            let texture_name = if resources.textures.contains_key(&draw.texture) {
                draw.texture.as_str()
            } else {
                DEFAULT_TEXTURE
            };
            let texture = match resources.textures.get(texture_name) {
                Some(texture) => texture,
                None => continue,
            };
            let mesh = match resources.meshes.get(&draw.instance) {
                Some(mesh) => mesh,
                None => continue,
            };

            let local_buffer = &self.uniform_pool.buffers[index];
            let layout = &self.local_bind_group_layout;
            let key = (index, texture_name.to_string());
            self.local_bind_groups.entry(key.clone()).or_insert_with(|| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("[Phong] Locals"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: local_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                    ],
                })
            });
            bound.push((mesh, key));
        }

        // Setup the render pass
        // see: clear color, depth stencil
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.config.clear_color),
                        store: true,
                    },
                })],
                // Create a depth stencil buffer using the depth texture
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            render_pass.set_pipeline(&self.render_pipeline);
            for (mesh, key) in &bound {
                render_pass.draw_mesh(mesh, &self.global_bind_group, &self.local_bind_groups[key]);
            }
        }

        queue.submit(iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
