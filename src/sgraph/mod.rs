//! Scene graph core: the node tree, the scene description importer and the
//! visitors that animate, draw, dump and raycast it.
mod importer;
mod material;
mod mesh;
mod node;
pub mod raycast;
mod scenegraph;
mod visitor;
pub mod visitors;

pub use importer::{strip_comments, ParseError, ScenegraphImporter};
pub use material::{Light, Material};
pub use mesh::{MeshError, MeshLoader, PolygonMesh, VertexAttrib};
pub use node::{GroupNode, LeafNode, ParentData, ParentNode, SceneNode, TransformKind, TransformNode};
pub use scenegraph::Scenegraph;
pub use visitor::{MatrixStack, NodeVisitor, NodeVisitorMut};
