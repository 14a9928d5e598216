use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::sgraph::{MeshError, MeshLoader, PolygonMesh, Scenegraph, ScenegraphImporter, VertexAttrib};
use crate::texture::Texture;

/// Loads Wavefront OBJ files, merging every object of a file into one
/// triangulated mesh.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjMeshLoader;

impl MeshLoader for ObjMeshLoader {
    fn load(&self, path: &Path) -> Result<PolygonMesh, MeshError> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|err| MeshError::Import {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for model in models {
            let mesh = model.mesh;
            let base = vertices.len() as u32;
            for i in 0..mesh.positions.len() / 3 {
                let normal = if mesh.normals.len() >= i * 3 + 3 {
                    [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
                } else {
                    [0.0; 3]
                };
                let tex_coords = if mesh.texcoords.len() >= i * 2 + 2 {
                    // OBJ puts v = 0 at the bottom of the image
                    [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                } else {
                    [0.0; 2]
                };
                vertices.push(VertexAttrib {
                    position: [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    normal,
                    tex_coords,
                });
            }
            indices.extend(mesh.indices.iter().map(|i| i + base));
        }

        Ok(PolygonMesh::new(vertices, indices))
    }
}

/// Parses a scene file, loading its meshes from OBJ files
pub fn load_scene(path: &Path) -> anyhow::Result<Scenegraph> {
    let loader = ObjMeshLoader;
    let scenegraph = ScenegraphImporter::new(&loader)
        .parse_file(path)
        .with_context(|| format!("Couldn't load scene {:?}", path))?;
    log::info!(
        "Loaded scene {:?}: {} nodes, {} meshes, {} textures",
        path,
        scenegraph.root().node_count(),
        scenegraph.meshes().len(),
        scenegraph.texture_paths().len()
    );
    Ok(scenegraph)
}

pub fn load_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("Couldn't open image {:?}", path))
}

/// Uploads every scene texture. A texture that fails to load is logged and
/// left out, so leaves using it fall back to the default texture.
pub fn load_textures(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    paths: &BTreeMap<String, PathBuf>,
) -> HashMap<String, Texture> {
    let mut textures = HashMap::new();
    for (name, path) in paths {
        match load_image(path) {
            Ok(img) => {
                let texture = Texture::from_image(device, queue, &img, Some(name.as_str()));
                textures.insert(name.clone(), texture);
            }
            Err(err) => log::warn!("Skipping texture `{}`: {:#}", name, err),
        }
    }
    textures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD: &str = "
o quad
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn obj_faces_are_triangulated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        fs::write(&path, QUAD).unwrap();

        let mesh = ObjMeshLoader.load(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.primitive_count(), 2);
        assert!(mesh.vertices().iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        // Bottom left corner flips to the top of the texture
        let corner = mesh
            .vertices()
            .iter()
            .find(|v| v.position == [-1.0, -1.0, 0.0])
            .unwrap();
        assert_eq!(corner.tex_coords, [0.0, 1.0]);
    }

    #[test]
    fn missing_obj_reports_path() {
        let err = ObjMeshLoader.load(Path::new("no/such/mesh.obj")).unwrap_err();
        assert!(err.to_string().contains("no/such/mesh.obj"));
    }

    #[test]
    fn missing_image_is_an_error() {
        let err = load_image(Path::new("no/such/texture.png")).unwrap_err();
        assert!(format!("{:#}", err).contains("texture.png"));
    }
}
