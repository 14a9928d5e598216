use cgmath::Matrix4;

use crate::sgraph::{GroupNode, LeafNode, Light, MatrixStack, NodeVisitor, ParentNode, SceneNode, TransformNode};

/// Gathers every light in the tree, in pre-order, moved into the frame of
/// `transform`.
///
/// A light attached to a transform node sees that node's matrix, a light
/// attached to a group sees the matrix above the group. Group animation
/// transforms apply to everything below the group.
pub fn collect_lights(root: &SceneNode, transform: Matrix4<f32>) -> Vec<Light> {
    let mut collector = LightCollector {
        stack: MatrixStack::new(transform),
        lights: Vec::new(),
    };
    root.accept(&mut collector);
    collector.lights
}

struct LightCollector {
    stack: MatrixStack,
    lights: Vec<Light>,
}

impl LightCollector {
    fn gather(&mut self, node: &dyn ParentNode) {
        let matrix = self.stack.top();
        for light in node.lights() {
            let mut moved = *light;
            moved.position = matrix * light.position;
            moved.spot_direction = (matrix * light.spot_direction.extend(0.0)).truncate();
            self.lights.push(moved);
        }
    }
}

impl<'a> NodeVisitor<'a> for LightCollector {
    fn visit_group(&mut self, group: &'a GroupNode) {
        self.gather(group);
        self.stack.push(group.anim_transform());
        for child in group.children() {
            child.accept(self);
        }
        self.stack.pop();
    }

    fn visit_leaf(&mut self, _leaf: &'a LeafNode) {}

    fn visit_transform(&mut self, transform: &'a TransformNode) {
        self.stack.push(transform.transform());
        self.gather(transform);
        for child in transform.children() {
            child.accept(self);
        }
        self.stack.pop();
    }
}
