use crate::sgraph::{PolygonMesh, VertexAttrib};

// One entry per face: outward normal, then the four corners counter-clockwise
// when looking at the face from outside.
const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    // +X
    (
        [1.0, 0.0, 0.0],
        [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]],
    ),
    // -X
    (
        [-1.0, 0.0, 0.0],
        [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]],
    ),
    // +Y
    (
        [0.0, 1.0, 0.0],
        [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]],
    ),
    // -Y
    (
        [0.0, -1.0, 0.0],
        [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]],
    ),
    // +Z
    (
        [0.0, 0.0, 1.0],
        [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
    ),
    // -Z
    (
        [0.0, 0.0, -1.0],
        [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]],
    ),
];

const FACE_TEX_COORDS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Axis aligned box spanning `[-0.5, 0.5]` on every axis, with flat normals
pub fn box_mesh() -> PolygonMesh {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, corners) in FACES.iter() {
        let base = vertices.len() as u32;
        for (corner, tex_coords) in corners.iter().zip(FACE_TEX_COORDS.iter()) {
            vertices.push(VertexAttrib {
                position: *corner,
                normal: *normal,
                tex_coords: *tex_coords,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    PolygonMesh::new(vertices, indices)
}
