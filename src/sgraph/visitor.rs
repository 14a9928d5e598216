use cgmath::{Matrix4, SquareMatrix};

use super::node::{GroupNode, LeafNode, TransformNode};

/// Read-only traversal over the scene tree.
///
/// The lifetime lets visitors keep references into the tree (the raycaster
/// holds on to the material of the closest hit).
pub trait NodeVisitor<'a> {
    fn visit_group(&mut self, group: &'a GroupNode);
    fn visit_leaf(&mut self, leaf: &'a LeafNode);
    fn visit_transform(&mut self, transform: &'a TransformNode);

    fn visit_scale(&mut self, transform: &'a TransformNode) {
        self.visit_transform(transform);
    }

    fn visit_translate(&mut self, transform: &'a TransformNode) {
        self.visit_transform(transform);
    }

    fn visit_rotate(&mut self, transform: &'a TransformNode) {
        self.visit_transform(transform);
    }
}

/// Traversal that may update nodes in place (animation)
pub trait NodeVisitorMut {
    fn visit_group(&mut self, group: &mut GroupNode);
    fn visit_leaf(&mut self, leaf: &mut LeafNode);
    fn visit_transform(&mut self, transform: &mut TransformNode);

    fn visit_scale(&mut self, transform: &mut TransformNode) {
        self.visit_transform(transform);
    }

    fn visit_translate(&mut self, transform: &mut TransformNode) {
        self.visit_transform(transform);
    }

    fn visit_rotate(&mut self, transform: &mut TransformNode) {
        self.visit_transform(transform);
    }
}

/// Modelview stack: each level is the product of every transform from the
/// seed down to the current node.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Matrix4<f32>>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new(Matrix4::identity())
    }
}

impl MatrixStack {
    pub fn new(seed: Matrix4<f32>) -> Self {
        Self { stack: vec![seed] }
    }

    pub fn top(&self) -> Matrix4<f32> {
        // The seed is never popped
        self.stack[self.stack.len() - 1]
    }

    /// Pushes `top * local`
    pub fn push(&mut self, local: Matrix4<f32>) {
        let next = self.top() * local;
        self.stack.push(next);
    }

    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn push_composes_and_pop_keeps_the_seed() {
        let seed = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
        let mut stack = MatrixStack::new(seed);
        stack.push(Matrix4::from_scale(2.0));
        assert_eq!(stack.top(), seed * Matrix4::from_scale(2.0));

        stack.pop();
        stack.pop();
        assert_eq!(stack.top(), seed);
    }
}
