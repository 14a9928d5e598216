use cgmath::{Matrix4, Rad};

use crate::sgraph::{GroupNode, LeafNode, NodeVisitorMut, ParentNode, SceneNode, TransformNode};

/// Per-frame update pass, run before any rendering traversal.
///
/// Groups forward to their children; leaves and transforms are left as
/// they are. When a spin speed is set, the root group's animation
/// transform becomes a rotation about +Y by `elapsed * spin_speed`.
#[derive(Debug, Clone, Copy)]
pub struct AnimationVisitor {
    elapsed: f32,
    spin_speed: f32,
}

impl AnimationVisitor {
    /// `elapsed` in seconds since the session started, `spin_speed` in
    /// radians per second
    pub fn new(elapsed: f32, spin_speed: f32) -> Self {
        Self {
            elapsed,
            spin_speed,
        }
    }

    pub fn animate(&mut self, root: &mut SceneNode) {
        if self.spin_speed != 0.0 {
            if let SceneNode::Group(group) = root {
                let angle = Rad(self.elapsed * self.spin_speed);
                group.set_anim_transform(Matrix4::from_angle_y(angle));
            }
        }
        root.accept_mut(self);
    }
}

impl NodeVisitorMut for AnimationVisitor {
    fn visit_group(&mut self, group: &mut GroupNode) {
        for child in group.children_mut() {
            child.accept_mut(self);
        }
    }

    fn visit_leaf(&mut self, _leaf: &mut LeafNode) {}

    fn visit_transform(&mut self, _transform: &mut TransformNode) {}
}
