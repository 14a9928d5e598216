use crate::sgraph::{GroupNode, LeafNode, NodeVisitor, ParentNode, SceneNode, TransformNode};

/// Depth-first dump of the node names, one per line, indented four spaces
/// per level below the root:
///
/// ```text
/// - root
///     - arm
///         - hand
/// ```
#[derive(Debug, Default)]
pub struct TextRenderer {
    depth: usize,
    out: String,
}

impl TextRenderer {
    pub fn render(root: &SceneNode) -> String {
        let mut renderer = Self::default();
        root.accept(&mut renderer);
        renderer.out
    }

    fn line(&mut self, name: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str("- ");
        self.out.push_str(name);
        self.out.push('\n');
    }
}

impl<'a> NodeVisitor<'a> for TextRenderer {
    fn visit_group(&mut self, group: &'a GroupNode) {
        self.line(group.name());
        self.depth += 1;
        for child in group.children() {
            child.accept(self);
        }
        self.depth -= 1;
    }

    fn visit_leaf(&mut self, leaf: &'a LeafNode) {
        self.line(leaf.name());
    }

    fn visit_transform(&mut self, transform: &'a TransformNode) {
        self.line(transform.name());
        self.depth += 1;
        if let Some(child) = transform.child() {
            child.accept(self);
        }
        self.depth -= 1;
    }
}
