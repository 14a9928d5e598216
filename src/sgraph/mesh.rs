use std::path::{Path, PathBuf};

use cgmath::{InnerSpace, Vector3, Zero};
use thiserror::Error;

/// Per-vertex data of an imported mesh
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexAttrib {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Indexed triangle mesh, kept on the CPU by the scenegraph and uploaded
/// to the GPU once per viewer session.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonMesh {
    vertices: Vec<VertexAttrib>,
    indices: Vec<u32>,
    min_bounds: Vector3<f32>,
    max_bounds: Vector3<f32>,
}

impl PolygonMesh {
    /// Indices per primitive, meshes are always triangulated
    pub const PRIMITIVE_SIZE: usize = 3;

    pub fn new(vertices: Vec<VertexAttrib>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            vertices,
            indices,
            min_bounds: Vector3::zero(),
            max_bounds: Vector3::zero(),
        };
        mesh.compute_bounding_box();
        mesh
    }

    pub fn vertices(&self) -> &[VertexAttrib] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.indices.len() / Self::PRIMITIVE_SIZE
    }

    /// Returns `(min, max)` corners of the axis aligned bounds
    pub fn bounds(&self) -> (Vector3<f32>, Vector3<f32>) {
        (self.min_bounds, self.max_bounds)
    }

    fn compute_bounding_box(&mut self) {
        let mut positions = self.vertices.iter().map(|v| Vector3::from(v.position));
        let first = match positions.next() {
            Some(p) => p,
            None => return,
        };
        let (min, max) = positions.fold((first, first), |(min, max), p| {
            (
                Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            )
        });
        self.min_bounds = min;
        self.max_bounds = max;
    }

    /// Recomputes vertex normals by summing the (area weighted) normals of
    /// every triangle touching the vertex.
    pub fn compute_normals(&mut self) {
        let mut sums = vec![Vector3::<f32>::zero(); self.vertices.len()];

        for tri in self.indices.chunks_exact(Self::PRIMITIVE_SIZE) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if a >= sums.len() || b >= sums.len() || c >= sums.len() {
                continue;
            }
            let pa = Vector3::from(self.vertices[a].position);
            let pb = Vector3::from(self.vertices[b].position);
            let pc = Vector3::from(self.vertices[c].position);
            let face = (pb - pa).cross(pc - pa);
            sums[a] += face;
            sums[b] += face;
            sums[c] += face;
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            if sum.magnitude2() > 0.0 {
                vertex.normal = sum.normalize().into();
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("failed to import mesh {path:?}: {message}")]
    Import { path: PathBuf, message: String },
    #[error("mesh {0:?} contains no triangles")]
    Empty(PathBuf),
}

/// Turns a mesh file path into geometry.
///
/// The importer only knows this seam; the viewer plugs in the OBJ loader,
/// tests plug in closures returning generated primitives.
pub trait MeshLoader {
    fn load(&self, path: &Path) -> Result<PolygonMesh, MeshError>;
}

impl<F> MeshLoader for F
where
    F: Fn(&Path) -> Result<PolygonMesh, MeshError>,
{
    fn load(&self, path: &Path) -> Result<PolygonMesh, MeshError> {
        self(path)
    }
}
