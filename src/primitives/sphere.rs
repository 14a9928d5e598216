use std::f32::consts::PI;

use crate::sgraph::{PolygonMesh, VertexAttrib};

/// Generates a UV sphere centered at the origin
pub fn sphere_mesh(radius: f32, sector_count: u32, stack_count: u32) -> PolygonMesh {
    let sector_count = sector_count.max(3);
    let stack_count = stack_count.max(2);

    let mut vertices: Vec<VertexAttrib> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let length_inv = 1.0 / radius;
    let sector_step = 2.0 * PI / sector_count as f32;
    let stack_step = PI / stack_count as f32;

    // Build the vertex data (position, normal, tex coords), one ring per stack
    // from the north pole (+Y) down to the south pole
    for i in 0..=stack_count {
        let stack_angle = PI / 2.0 - i as f32 * stack_step;
        let xz = radius * stack_angle.cos();
        let y = radius * stack_angle.sin();

        for j in 0..=sector_count {
            let sector_angle = j as f32 * sector_step;

            let x = xz * sector_angle.sin();
            let z = xz * sector_angle.cos();

            vertices.push(VertexAttrib {
                position: [x, y, z],
                normal: [x * length_inv, y * length_inv, z * length_inv],
                tex_coords: [
                    j as f32 / sector_count as f32,
                    i as f32 / stack_count as f32,
                ],
            })
        }
    }

    // Two triangles per quad, `k1` walking the upper ring and `k2` the lower.
    //  k1--k1+1
    //  |  / |
    //  | /  |
    //  k2--k2+1
    for i in 0..stack_count {
        let mut k1 = i * (sector_count + 1);
        let mut k2 = k1 + sector_count + 1;

        for _ in 0..sector_count {
            // The top and bottom rings collapse into a single point
            if i != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if i != stack_count - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
            k1 += 1;
            k2 += 1;
        }
    }

    PolygonMesh::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_lie_on_the_sphere() {
        let mesh = sphere_mesh(2.0, 16, 8);
        for v in mesh.vertices() {
            let [x, y, z] = v.position;
            assert!(((x * x + y * y + z * z).sqrt() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn indices_stay_in_range() {
        let mesh = sphere_mesh(1.0, 8, 4);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices().iter().all(|&i| i < count));
        // Each stack but the two polar ones contributes two triangles per sector
        assert_eq!(mesh.primitive_count(), 8 * 2 * (4 - 1));
    }
}
