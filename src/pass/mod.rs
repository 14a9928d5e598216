use wgpu::{Device, Queue, Surface};

use crate::model::SceneResources;

pub mod phong;

pub trait Pass {
    type Draw;

    fn draw(
        &mut self,
        surface: &Surface,
        device: &Device,
        queue: &Queue,
        resources: &SceneResources,
        draws: &[Self::Draw],
    ) -> Result<(), wgpu::SurfaceError>;
}

/// Grow-only set of equally sized uniform buffers, one per draw of a frame
pub struct UniformPool {
    label: &'static str,
    size: wgpu::BufferAddress,
    pub buffers: Vec<wgpu::Buffer>,
}

impl UniformPool {
    pub fn new(label: &'static str, size: wgpu::BufferAddress) -> Self {
        Self {
            label,
            size,
            buffers: Vec::new(),
        }
    }

    pub fn alloc_buffers(&mut self, count: usize, device: &Device) {
        while self.buffers.len() < count {
            self.buffers.push(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: self.size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
    }

    pub fn update_uniform<T: bytemuck::Pod>(&self, index: usize, data: T, queue: &Queue) {
        if let Some(buffer) = self.buffers.get(index) {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[data]));
        }
    }
}
