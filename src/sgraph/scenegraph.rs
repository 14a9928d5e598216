use std::collections::BTreeMap;
use std::path::PathBuf;

use super::mesh::PolygonMesh;
use super::node::SceneNode;

/// One parsed scene: the owned node tree plus the mesh table the leaves
/// refer to by instance name.
#[derive(Debug, Clone)]
pub struct Scenegraph {
    root: SceneNode,
    meshes: BTreeMap<String, PolygonMesh>,
    mesh_paths: BTreeMap<String, PathBuf>,
    texture_paths: BTreeMap<String, PathBuf>,
}

impl Scenegraph {
    pub fn new(root: SceneNode) -> Self {
        Self {
            root,
            meshes: BTreeMap::new(),
            mesh_paths: BTreeMap::new(),
            texture_paths: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut SceneNode {
        &mut self.root
    }

    /// Gives up the tree, dropping the mesh table
    pub fn into_root(self) -> SceneNode {
        self.root
    }

    pub fn get_node(&self, name: &str) -> Option<&SceneNode> {
        self.root.get_node(name)
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.root.get_node_mut(name)
    }

    pub fn meshes(&self) -> &BTreeMap<String, PolygonMesh> {
        &self.meshes
    }

    pub fn set_meshes(&mut self, meshes: BTreeMap<String, PolygonMesh>) {
        self.meshes = meshes;
    }

    /// Source file of each mesh instance, kept for reference only
    pub fn mesh_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.mesh_paths
    }

    pub fn set_mesh_paths(&mut self, paths: BTreeMap<String, PathBuf>) {
        self.mesh_paths = paths;
    }

    /// Texture name to image file, loaded lazily by the viewer
    pub fn texture_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.texture_paths
    }

    pub fn set_texture_paths(&mut self, paths: BTreeMap<String, PathBuf>) {
        self.texture_paths = paths;
    }
}
