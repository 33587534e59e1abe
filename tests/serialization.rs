//! Trees as JSON documents: the form the command line tool reads.

mod common;

use ctree::ast::{validate, Node, NodeId, Tree};
use pretty_assertions::assert_eq;

use common::assertions::{assert_renders, render_text};
use common::fixtures::fib_project;

#[test]
fn test_json_round_trip_keeps_rendering() {
    let mut tree = Tree::new();
    let project = fib_project(&mut tree);
    let expected = render_text(&tree, project);

    let text = serde_json::to_string(&tree).unwrap();
    let loaded: Tree = serde_json::from_str(&text).unwrap();

    assert_eq!(loaded.len(), tree.len());
    assert_eq!(validate(&loaded, project), Ok(()));
    assert_eq!(render_text(&loaded, project), expected);
}

#[test]
fn test_parent_links_are_rebuilt_on_load() {
    let document = r#"{
        "nodes": [
            { "Constant": { "value": { "Int": 1 } } },
            { "Constant": { "value": { "Int": 2 } } },
            { "BinaryOp": { "left": 0, "op": "Add", "right": 1 } },
            { "Constant": { "value": { "Int": 3 } } },
            { "BinaryOp": { "left": 2, "op": "Mul", "right": 3 } }
        ]
    }"#;
    let tree: Tree = serde_json::from_str(document).unwrap();

    let root = NodeId(4);
    assert_eq!(tree.parent(NodeId(2)), Some(root));
    assert_eq!(tree.parent(NodeId(0)), Some(NodeId(2)));
    assert!(matches!(tree[root], Node::BinaryOp { .. }));
    assert_renders(&tree, root, "(1 + 2) * 3");
}

#[test]
fn test_malformed_document_is_rejected() {
    let document = r#"{ "nodes": [ { "Constant": { "value": 1 } } ] }"#;
    assert!(serde_json::from_str::<Tree>(document).is_err());
}
