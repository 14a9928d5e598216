use cgmath::{InnerSpace, Matrix4, Rad, SquareMatrix, Vector3};

use super::material::{Light, Material};
use super::visitor::{NodeVisitor, NodeVisitorMut};

/// A node of the scene tree.
///
/// The tree is strictly owned: every node except the root lives in exactly
/// one parent's child list, and the root is owned by its
/// [`Scenegraph`](super::Scenegraph).
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Group(GroupNode),
    Leaf(LeafNode),
    Transform(TransformNode),
}

/// Children, lights and animation transform shared by every node that can
/// own children.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentData {
    children: Vec<SceneNode>,
    lights: Vec<Light>,
    anim_transform: Matrix4<f32>,
}

impl Default for ParentData {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            lights: Vec::new(),
            anim_transform: Matrix4::identity(),
        }
    }
}

/// Capabilities of nodes that own an ordered list of children.
pub trait ParentNode {
    fn parent_data(&self) -> &ParentData;
    fn parent_data_mut(&mut self) -> &mut ParentData;

    fn children(&self) -> &[SceneNode] {
        &self.parent_data().children
    }

    fn children_mut(&mut self) -> &mut [SceneNode] {
        &mut self.parent_data_mut().children
    }

    /// Appends `child`, which also fixes its position in render order
    fn add_child(&mut self, child: SceneNode) {
        self.parent_data_mut().children.push(child);
    }

    fn lights(&self) -> &[Light] {
        &self.parent_data().lights
    }

    fn add_light(&mut self, light: Light) {
        self.parent_data_mut().lights.push(light);
    }

    fn anim_transform(&self) -> Matrix4<f32> {
        self.parent_data().anim_transform
    }

    fn set_anim_transform(&mut self, transform: Matrix4<f32>) {
        self.parent_data_mut().anim_transform = transform;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    name: String,
    data: ParentData,
}

impl GroupNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ParentData::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ParentNode for GroupNode {
    fn parent_data(&self) -> &ParentData {
        &self.data
    }

    fn parent_data_mut(&mut self) -> &mut ParentData {
        &mut self.data
    }
}

/// The only node carrying geometry: a named mesh instance plus its
/// material and an optional texture.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    name: String,
    instance_of: String,
    material: Material,
    texture: String,
}

impl LeafNode {
    pub fn new(name: impl Into<String>, instance_of: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_of: instance_of.into(),
            material: Material::default(),
            texture: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the mesh instance in the scenegraph's mesh table
    pub fn instance_of(&self) -> &str {
        &self.instance_of
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Texture name, empty when the leaf uses the default texture
    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn set_texture(&mut self, texture: impl Into<String>) {
        self.texture = texture.into();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformKind {
    Scale(Vector3<f32>),
    Translate(Vector3<f32>),
    Rotate { angle: Rad<f32>, axis: Vector3<f32> },
}

impl TransformKind {
    pub fn matrix(&self) -> Matrix4<f32> {
        match *self {
            TransformKind::Scale(s) => Matrix4::from_nonuniform_scale(s.x, s.y, s.z),
            TransformKind::Translate(t) => Matrix4::from_translation(t),
            TransformKind::Rotate { angle, axis } => {
                if axis.magnitude2() == 0.0 {
                    Matrix4::identity()
                } else {
                    Matrix4::from_axis_angle(axis.normalize(), angle)
                }
            }
        }
    }
}

/// A single elementary transform applied to its child.
///
/// Renderers only descend into the first child; extra children are kept
/// but never drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    name: String,
    kind: TransformKind,
    data: ParentData,
}

impl TransformNode {
    pub fn new(name: impl Into<String>, kind: TransformKind) -> Self {
        Self {
            name: name.into(),
            kind,
            data: ParentData::default(),
        }
    }

    pub fn scale(name: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self::new(name, TransformKind::Scale(Vector3::new(x, y, z)))
    }

    pub fn translate(name: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self::new(name, TransformKind::Translate(Vector3::new(x, y, z)))
    }

    pub fn rotate(name: impl Into<String>, angle: Rad<f32>, axis: Vector3<f32>) -> Self {
        Self::new(name, TransformKind::Rotate { angle, axis })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    pub fn transform(&self) -> Matrix4<f32> {
        self.kind.matrix()
    }

    /// The child that renderers descend into
    pub fn child(&self) -> Option<&SceneNode> {
        self.data.children.first()
    }
}

impl ParentNode for TransformNode {
    fn parent_data(&self) -> &ParentData {
        &self.data
    }

    fn parent_data_mut(&mut self) -> &mut ParentData {
        &mut self.data
    }
}

impl From<GroupNode> for SceneNode {
    fn from(node: GroupNode) -> Self {
        SceneNode::Group(node)
    }
}

impl From<LeafNode> for SceneNode {
    fn from(node: LeafNode) -> Self {
        SceneNode::Leaf(node)
    }
}

impl From<TransformNode> for SceneNode {
    fn from(node: TransformNode) -> Self {
        SceneNode::Transform(node)
    }
}

impl SceneNode {
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Group(g) => g.name(),
            SceneNode::Leaf(l) => l.name(),
            SceneNode::Transform(t) => t.name(),
        }
    }

    /// Dispatches to the visitor method matching this node's variant
    pub fn accept<'a, V>(&'a self, visitor: &mut V)
    where
        V: NodeVisitor<'a> + ?Sized,
    {
        match self {
            SceneNode::Group(group) => visitor.visit_group(group),
            SceneNode::Leaf(leaf) => visitor.visit_leaf(leaf),
            SceneNode::Transform(transform) => match transform.kind {
                TransformKind::Scale(_) => visitor.visit_scale(transform),
                TransformKind::Translate(_) => visitor.visit_translate(transform),
                TransformKind::Rotate { .. } => visitor.visit_rotate(transform),
            },
        }
    }

    pub fn accept_mut<V>(&mut self, visitor: &mut V)
    where
        V: NodeVisitorMut + ?Sized,
    {
        match self {
            SceneNode::Group(group) => visitor.visit_group(group),
            SceneNode::Leaf(leaf) => visitor.visit_leaf(leaf),
            SceneNode::Transform(transform) => match transform.kind {
                TransformKind::Scale(_) => visitor.visit_scale(transform),
                TransformKind::Translate(_) => visitor.visit_translate(transform),
                TransformKind::Rotate { .. } => visitor.visit_rotate(transform),
            },
        }
    }

    pub fn as_parent(&self) -> Option<&dyn ParentNode> {
        match self {
            SceneNode::Group(g) => Some(g),
            SceneNode::Transform(t) => Some(t),
            SceneNode::Leaf(_) => None,
        }
    }

    pub fn as_parent_mut(&mut self) -> Option<&mut dyn ParentNode> {
        match self {
            SceneNode::Group(g) => Some(g),
            SceneNode::Transform(t) => Some(t),
            SceneNode::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            SceneNode::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode> {
        match self {
            SceneNode::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn children(&self) -> &[SceneNode] {
        self.as_parent().map(|p| p.children()).unwrap_or(&[])
    }

    /// Depth-first search: this node first, then each child subtree in
    /// order. Returns the first node called `name`.
    pub fn get_node(&self, name: &str) -> Option<&SceneNode> {
        if self.name() == name {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.get_node(name))
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name() == name {
            return Some(self);
        }
        self.as_parent_mut()?
            .children_mut()
            .iter_mut()
            .find_map(|child| child.get_node_mut(name))
    }

    /// Detaches and returns all children, leaving the node childless
    pub(crate) fn take_children(&mut self) -> Vec<SceneNode> {
        match self {
            SceneNode::Group(g) => std::mem::take(&mut g.data.children),
            SceneNode::Transform(t) => std::mem::take(&mut t.data.children),
            SceneNode::Leaf(_) => Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(SceneNode::node_count).sum::<usize>()
    }
}
