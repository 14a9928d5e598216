use std::collections::HashMap;
use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::sgraph::{PolygonMesh, Scenegraph, VertexAttrib};
use crate::texture::Texture;

pub trait Vertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl From<&VertexAttrib> for ModelVertex {
    fn from(v: &VertexAttrib) -> Self {
        Self {
            position: v.position,
            tex_coords: v.tex_coords,
            normal: v.normal,
        }
    }
}

impl Vertex for ModelVertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A mesh instance uploaded to the GPU
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, name: &str, mesh: &PolygonMesh) -> Self {
        let vertices: Vec<ModelVertex> = mesh.vertices().iter().map(ModelVertex::from).collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_elements: mesh.indices().len() as u32,
        }
    }
}

/// GPU side of a loaded scene: meshes by instance name and textures by
/// texture name. The default texture is always present.
pub struct SceneResources {
    pub meshes: HashMap<String, GpuMesh>,
    pub textures: HashMap<String, Texture>,
}

impl SceneResources {
    pub fn new(
        device: &wgpu::Device,
        scenegraph: &Scenegraph,
        mut textures: HashMap<String, Texture>,
        white: Texture,
    ) -> Self {
        let meshes = scenegraph
            .meshes()
            .iter()
            .map(|(name, mesh)| (name.clone(), GpuMesh::new(device, name, mesh)))
            .collect();
        textures.insert(crate::sgraph::visitors::DEFAULT_TEXTURE.to_string(), white);
        Self { meshes, textures }
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh(
        &mut self,
        mesh: &'a GpuMesh,
        globals: &'a wgpu::BindGroup,
        locals: &'a wgpu::BindGroup,
    );
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a GpuMesh,
        instances: Range<u32>,
        globals: &'a wgpu::BindGroup,
        locals: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(
        &mut self,
        mesh: &'b GpuMesh,
        globals: &'b wgpu::BindGroup,
        locals: &'b wgpu::BindGroup,
    ) {
        self.draw_mesh_instanced(mesh, 0..1, globals, locals);
    }

    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b GpuMesh,
        instances: Range<u32>,
        globals: &'b wgpu::BindGroup,
        locals: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, globals, &[]);
        self.set_bind_group(1, locals, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<ModelVertex>(), 32);
        let layout = ModelVertex::desc();
        assert_eq!(layout.array_stride, 32);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
    }

    #[test]
    fn vertex_from_attrib_keeps_fields() {
        let attrib = VertexAttrib {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            tex_coords: [0.25, 0.75],
        };
        let vertex = ModelVertex::from(&attrib);
        assert_eq!(vertex.position, attrib.position);
        assert_eq!(vertex.normal, attrib.normal);
        assert_eq!(vertex.tex_coords, attrib.tex_coords);
    }
}
