use cgmath::{Matrix, Matrix4, SquareMatrix};
use thiserror::Error;

use crate::sgraph::{GroupNode, LeafNode, Material, MatrixStack, NodeVisitor, ParentNode, SceneNode, TransformNode};

/// Texture bound to leaves without a texture of their own, or whose
/// texture failed to load
pub const DEFAULT_TEXTURE: &str = "white";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("leaf `{leaf}` refers to unknown mesh instance `{instance}`")]
    UnknownInstance { leaf: String, instance: String },
}

/// Everything needed to draw one leaf
#[derive(Debug, Clone, Copy)]
pub struct LeafDraw<'a> {
    pub instance: &'a str,
    pub texture: &'a str,
    pub modelview: Matrix4<f32>,
    pub normal_matrix: Matrix4<f32>,
    pub texture_matrix: Matrix4<f32>,
    pub material: &'a Material,
}

/// Draw target of the rasterizing traversal.
///
/// The GPU pass implements this by queueing one draw call per leaf; tests
/// record the calls.
pub trait RenderBackend {
    fn has_texture(&self, name: &str) -> bool;

    /// Fails with [`RenderError::UnknownInstance`] when `draw.instance` has
    /// no mesh
    fn draw(&mut self, draw: LeafDraw) -> Result<(), RenderError>;
}

/// Walks the tree with a modelview stack seeded by the view matrix and
/// hands every reachable leaf to the backend.
pub struct RasterRenderer<'b, B: RenderBackend + ?Sized> {
    backend: &'b mut B,
    stack: MatrixStack,
    error: Option<RenderError>,
}

impl<'b, B: RenderBackend + ?Sized> RasterRenderer<'b, B> {
    pub fn new(backend: &'b mut B, view: Matrix4<f32>) -> Self {
        Self {
            backend,
            stack: MatrixStack::new(view),
            error: None,
        }
    }

    /// Draws the tree below `root`, stopping at the first backend error
    pub fn draw(mut self, root: &SceneNode) -> Result<(), RenderError> {
        root.accept(&mut self);
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<'a, 'b, B: RenderBackend + ?Sized> NodeVisitor<'a> for RasterRenderer<'b, B> {
    fn visit_group(&mut self, group: &'a GroupNode) {
        self.stack.push(group.anim_transform());
        for child in group.children() {
            if self.error.is_some() {
                break;
            }
            child.accept(self);
        }
        self.stack.pop();
    }

    fn visit_leaf(&mut self, leaf: &'a LeafNode) {
        if self.error.is_some() {
            return;
        }
        let modelview = self.stack.top();
        let normal_matrix = modelview
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);

        let texture = if !leaf.texture().is_empty() && self.backend.has_texture(leaf.texture()) {
            leaf.texture()
        } else {
            DEFAULT_TEXTURE
        };

        let draw = LeafDraw {
            instance: leaf.instance_of(),
            texture,
            modelview,
            normal_matrix,
            texture_matrix: Matrix4::identity(),
            material: leaf.material(),
        };
        if let Err(err) = self.backend.draw(draw) {
            self.error = Some(match err {
                RenderError::UnknownInstance { instance, .. } => RenderError::UnknownInstance {
                    leaf: leaf.name().to_string(),
                    instance,
                },
            });
        }
    }

    fn visit_transform(&mut self, transform: &'a TransformNode) {
        self.stack.push(transform.transform());
        if let Some(child) = transform.child() {
            child.accept(self);
        }
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Deg, Vector3};
    use std::collections::HashSet;

    #[derive(Default)]
    struct Recorder {
        meshes: HashSet<&'static str>,
        textures: HashSet<&'static str>,
        draws: Vec<(String, String, Matrix4<f32>, Matrix4<f32>)>,
    }

    impl RenderBackend for Recorder {
        fn has_texture(&self, name: &str) -> bool {
            self.textures.contains(name)
        }

        fn draw(&mut self, draw: LeafDraw) -> Result<(), RenderError> {
            if !self.meshes.contains(draw.instance) {
                return Err(RenderError::UnknownInstance {
                    leaf: String::new(),
                    instance: draw.instance.to_string(),
                });
            }
            self.draws.push((
                draw.instance.to_string(),
                draw.texture.to_string(),
                draw.modelview,
                draw.normal_matrix,
            ));
            Ok(())
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            meshes: ["box", "sphere"].into_iter().collect(),
            textures: ["white", "checker"].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn leaf_modelview_is_product_of_ancestors() {
        let mut rotate = TransformNode::rotate("r", Deg(30.0).into(), Vector3::unit_y());
        rotate.add_child(LeafNode::new("leaf", "box").into());
        let mut scale = TransformNode::scale("s", 2.0, 3.0, 4.0);
        scale.add_child(rotate.into());
        let root: SceneNode = scale.into();

        let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0));
        let mut backend = recorder();
        RasterRenderer::new(&mut backend, view).draw(&root).unwrap();

        let expected = view
            * Matrix4::from_nonuniform_scale(2.0, 3.0, 4.0)
            * Matrix4::from_angle_y(Deg(30.0));
        assert_eq!(backend.draws.len(), 1);
        assert_relative_eq!(backend.draws[0].2, expected, epsilon = 1e-6);
        let normal = expected.invert().unwrap().transpose();
        assert_relative_eq!(backend.draws[0].3, normal, epsilon = 1e-5);
    }

    #[test]
    fn group_animation_applies_to_children() {
        let mut root = GroupNode::new("root");
        let spin = Matrix4::from_angle_z(Deg(45.0));
        root.set_anim_transform(spin);
        root.add_child(LeafNode::new("a", "sphere").into());
        let root: SceneNode = root.into();

        let mut backend = recorder();
        RasterRenderer::new(&mut backend, Matrix4::identity())
            .draw(&root)
            .unwrap();
        assert_relative_eq!(backend.draws[0].2, spin);
    }

    #[test]
    fn transform_draws_only_first_child() {
        let mut t = TransformNode::translate("t", 1.0, 0.0, 0.0);
        t.add_child(LeafNode::new("a", "box").into());
        t.add_child(LeafNode::new("b", "sphere").into());
        let root: SceneNode = t.into();

        let mut backend = recorder();
        RasterRenderer::new(&mut backend, Matrix4::identity())
            .draw(&root)
            .unwrap();
        assert_eq!(backend.draws.len(), 1);
        assert_eq!(backend.draws[0].0, "box");
    }

    #[test]
    fn missing_texture_falls_back_to_white() {
        let mut plain = LeafNode::new("plain", "box");
        plain.set_texture("checker");
        let mut broken = LeafNode::new("broken", "box");
        broken.set_texture("does-not-exist");
        let mut root = GroupNode::new("root");
        root.add_child(plain.into());
        root.add_child(broken.into());
        root.add_child(LeafNode::new("bare", "sphere").into());
        let root: SceneNode = root.into();

        let mut backend = recorder();
        RasterRenderer::new(&mut backend, Matrix4::identity())
            .draw(&root)
            .unwrap();
        let textures: Vec<&str> = backend.draws.iter().map(|d| d.1.as_str()).collect();
        assert_eq!(textures, vec!["checker", DEFAULT_TEXTURE, DEFAULT_TEXTURE]);
    }

    #[test]
    fn unknown_instance_aborts_the_frame() {
        let mut root = GroupNode::new("root");
        root.add_child(LeafNode::new("ok", "box").into());
        root.add_child(LeafNode::new("teapot", "teapot").into());
        root.add_child(LeafNode::new("never", "sphere").into());
        let root: SceneNode = root.into();

        let mut backend = recorder();
        let err = RasterRenderer::new(&mut backend, Matrix4::identity())
            .draw(&root)
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::UnknownInstance {
                leaf: "teapot".to_string(),
                instance: "teapot".to_string(),
            }
        );
        assert_eq!(backend.draws.len(), 1);
    }
}
