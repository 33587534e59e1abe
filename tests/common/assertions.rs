use ctree::ast::{NodeId, Tree};
use ctree::codegen::render;
use ctree::types::TypeRegistry;
use pretty_assertions::assert_eq;

/// Render `root` with the built-in registry
pub fn render_text(tree: &Tree, root: NodeId) -> String {
    render(tree, root, &TypeRegistry::new())
        .unwrap_or_else(|e| panic!("Expected {} to render: {}", root, e))
}

/// Assert that `root` renders exactly as `expected`
pub fn assert_renders(tree: &Tree, root: NodeId, expected: &str) {
    assert_eq!(render_text(tree, root), expected);
}
