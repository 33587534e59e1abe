//! Node kinds and their child slots

use std::collections::BTreeMap;
use std::fmt;

use ctree_types::{Type, Value};
use serde::{Deserialize, Serialize};

use crate::Op;

/// Index of a node in its [`Tree`](crate::Tree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One IR node. Children are referenced by id; the owning [`Tree`]
/// tracks each node's parent.
///
/// [`Tree`]: crate::Tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    // ===== Containers =====
    Project {
        files: Vec<NodeId>,
    },
    File {
        name: String,
        body: Vec<NodeId>,
    },

    // ===== Statements =====
    Return {
        value: Option<NodeId>,
    },
    If {
        cond: NodeId,
        then: NodeId,
        elze: Option<NodeId>,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        cond: NodeId,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        incr: Option<NodeId>,
        body: NodeId,
    },
    Block {
        body: Vec<NodeId>,
    },
    Break,
    Continue,
    Pass,
    FunctionDecl {
        return_type: Type,
        name: String,
        params: Vec<NodeId>,
        defn: Option<NodeId>,
        is_static: bool,
        is_inline: bool,
    },

    // ===== Expressions =====
    UnaryOp {
        op: Op,
        arg: NodeId,
    },
    BinaryOp {
        left: NodeId,
        op: Op,
        right: NodeId,
    },
    AugAssign {
        target: NodeId,
        op: Op,
        value: NodeId,
    },
    TernaryOp {
        cond: NodeId,
        then: NodeId,
        elze: NodeId,
    },
    Cast {
        ty: Type,
        value: NodeId,
    },
    FunctionCall {
        func: NodeId,
        args: Vec<NodeId>,
        ty: Option<Type>,
    },
    ArrayDef {
        target: NodeId,
        size: NodeId,
        body: Vec<NodeId>,
    },
    Constant {
        value: Value,
    },
    String {
        value: String,
    },
    SymbolRef {
        name: String,
        ty: Option<Type>,
        is_const: bool,
    },

    // ===== Preprocessor and extensions =====
    Include {
        target: String,
        system: bool,
    },
    Comment {
        text: String,
    },
    /// A node kind contributed by an extension; rendered through a rule
    /// registered under `kind`
    Custom {
        kind: String,
        attrs: BTreeMap<String, String>,
        children: Vec<NodeId>,
    },
}

/// A child slot as seen by generic traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    Required(NodeId),
    Optional(Option<NodeId>),
    List(&'a [NodeId]),
}

pub(crate) enum SlotMut<'a> {
    Required(&'a mut NodeId),
    Optional(&'a mut Option<NodeId>),
    List(&'a mut Vec<NodeId>),
}

/// A present child, as yielded by [`Node::fields`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child<'a> {
    One(NodeId),
    Many(&'a [NodeId]),
}

impl Node {
    pub fn symbol(name: impl Into<String>) -> Self {
        Node::SymbolRef {
            name: name.into(),
            ty: None,
            is_const: false,
        }
    }

    pub fn typed_symbol(name: impl Into<String>, ty: Type) -> Self {
        Node::SymbolRef {
            name: name.into(),
            ty: Some(ty),
            is_const: false,
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant {
            value: value.into(),
        }
    }

    pub fn kind_name(&self) -> &str {
        match self {
            Node::Project { .. } => "Project",
            Node::File { .. } => "File",
            Node::Return { .. } => "Return",
            Node::If { .. } => "If",
            Node::While { .. } => "While",
            Node::DoWhile { .. } => "DoWhile",
            Node::For { .. } => "For",
            Node::Block { .. } => "Block",
            Node::Break => "Break",
            Node::Continue => "Continue",
            Node::Pass => "Pass",
            Node::FunctionDecl { .. } => "FunctionDecl",
            Node::UnaryOp { .. } => "UnaryOp",
            Node::BinaryOp { .. } => "BinaryOp",
            Node::AugAssign { .. } => "AugAssign",
            Node::TernaryOp { .. } => "TernaryOp",
            Node::Cast { .. } => "Cast",
            Node::FunctionCall { .. } => "FunctionCall",
            Node::ArrayDef { .. } => "ArrayDef",
            Node::Constant { .. } => "Constant",
            Node::String { .. } => "String",
            Node::SymbolRef { .. } => "SymbolRef",
            Node::Include { .. } => "Include",
            Node::Comment { .. } => "Comment",
            Node::Custom { kind, .. } => kind,
        }
    }

    /// Child slots in declaration order, including empty ones. Operator
    /// tags, literal values and names are not slots.
    pub fn slots(&self) -> Vec<(&'static str, Slot<'_>)> {
        use Slot::*;
        match self {
            Node::Project { files } => vec![("files", List(files))],
            Node::File { body, .. } | Node::Block { body } => vec![("body", List(body))],
            Node::Return { value } => vec![("value", Optional(*value))],
            Node::If { cond, then, elze } => vec![
                ("cond", Required(*cond)),
                ("then", Required(*then)),
                ("elze", Optional(*elze)),
            ],
            Node::While { cond, body } => {
                vec![("cond", Required(*cond)), ("body", Required(*body))]
            }
            Node::DoWhile { body, cond } => {
                vec![("body", Required(*body)), ("cond", Required(*cond))]
            }
            Node::For {
                init,
                test,
                incr,
                body,
            } => vec![
                ("init", Optional(*init)),
                ("test", Optional(*test)),
                ("incr", Optional(*incr)),
                ("body", Required(*body)),
            ],
            Node::FunctionDecl { params, defn, .. } => {
                vec![("params", List(params)), ("defn", Optional(*defn))]
            }
            Node::UnaryOp { arg, .. } => vec![("arg", Required(*arg))],
            Node::BinaryOp { left, right, .. } => {
                vec![("left", Required(*left)), ("right", Required(*right))]
            }
            Node::AugAssign { target, value, .. } => {
                vec![("target", Required(*target)), ("value", Required(*value))]
            }
            Node::TernaryOp { cond, then, elze } => vec![
                ("cond", Required(*cond)),
                ("then", Required(*then)),
                ("elze", Required(*elze)),
            ],
            Node::Cast { value, .. } => vec![("value", Required(*value))],
            Node::FunctionCall { func, args, .. } => {
                vec![("func", Required(*func)), ("args", List(args))]
            }
            Node::ArrayDef { target, size, body } => vec![
                ("target", Required(*target)),
                ("size", Required(*size)),
                ("body", List(body)),
            ],
            Node::Custom { children, .. } => vec![("children", List(children))],
            Node::Break
            | Node::Continue
            | Node::Pass
            | Node::Constant { .. }
            | Node::String { .. }
            | Node::SymbolRef { .. }
            | Node::Include { .. }
            | Node::Comment { .. } => Vec::new(),
        }
    }

    pub(crate) fn slots_mut(&mut self) -> Vec<(&'static str, SlotMut<'_>)> {
        use SlotMut::*;
        match self {
            Node::Project { files } => vec![("files", List(files))],
            Node::File { body, .. } | Node::Block { body } => vec![("body", List(body))],
            Node::Return { value } => vec![("value", Optional(value))],
            Node::If { cond, then, elze } => vec![
                ("cond", Required(cond)),
                ("then", Required(then)),
                ("elze", Optional(elze)),
            ],
            Node::While { cond, body } => vec![("cond", Required(cond)), ("body", Required(body))],
            Node::DoWhile { body, cond } => vec![("body", Required(body)), ("cond", Required(cond))],
            Node::For {
                init,
                test,
                incr,
                body,
            } => vec![
                ("init", Optional(init)),
                ("test", Optional(test)),
                ("incr", Optional(incr)),
                ("body", Required(body)),
            ],
            Node::FunctionDecl { params, defn, .. } => {
                vec![("params", List(params)), ("defn", Optional(defn))]
            }
            Node::UnaryOp { arg, .. } => vec![("arg", Required(arg))],
            Node::BinaryOp { left, right, .. } => {
                vec![("left", Required(left)), ("right", Required(right))]
            }
            Node::AugAssign { target, value, .. } => {
                vec![("target", Required(target)), ("value", Required(value))]
            }
            Node::TernaryOp { cond, then, elze } => vec![
                ("cond", Required(cond)),
                ("then", Required(then)),
                ("elze", Required(elze)),
            ],
            Node::Cast { value, .. } => vec![("value", Required(value))],
            Node::FunctionCall { func, args, .. } => {
                vec![("func", Required(func)), ("args", List(args))]
            }
            Node::ArrayDef { target, size, body } => vec![
                ("target", Required(target)),
                ("size", Required(size)),
                ("body", List(body)),
            ],
            Node::Custom { children, .. } => vec![("children", List(children))],
            Node::Break
            | Node::Continue
            | Node::Pass
            | Node::Constant { .. }
            | Node::String { .. }
            | Node::SymbolRef { .. }
            | Node::Include { .. }
            | Node::Comment { .. } => Vec::new(),
        }
    }

    /// Present children, field by field, in declaration order
    pub fn fields(&self) -> Vec<(&'static str, Child<'_>)> {
        self.slots()
            .into_iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Required(id) => Some((name, Child::One(id))),
                Slot::Optional(id) => id.map(|id| (name, Child::One(id))),
                Slot::List(ids) => Some((name, Child::Many(ids))),
            })
            .collect()
    }

    /// All child ids, flattened in declaration order
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for (_, child) in self.fields() {
            match child {
                Child::One(id) => out.push(id),
                Child::Many(ids) => out.extend_from_slice(ids),
            }
        }
        out
    }

    /// Rewrite every child id through `f`
    pub(crate) fn map_children(&mut self, mut f: impl FnMut(NodeId) -> NodeId) {
        for (_, slot) in self.slots_mut() {
            match slot {
                SlotMut::Required(id) => *id = f(*id),
                SlotMut::Optional(Some(id)) => *id = f(*id),
                SlotMut::Optional(None) => {}
                SlotMut::List(ids) => {
                    for id in ids.iter_mut() {
                        *id = f(*id);
                    }
                }
            }
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            Node::UnaryOp { .. }
                | Node::BinaryOp { .. }
                | Node::AugAssign { .. }
                | Node::TernaryOp { .. }
                | Node::Cast { .. }
                | Node::FunctionCall { .. }
                | Node::ArrayDef { .. }
                | Node::Constant { .. }
                | Node::String { .. }
                | Node::SymbolRef { .. }
        )
    }

    /// The declared or inferred type carried by the node itself
    pub fn annotated_type(&self) -> Option<&Type> {
        match self {
            Node::SymbolRef { ty, .. } | Node::FunctionCall { ty, .. } => ty.as_ref(),
            Node::Cast { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Node::SymbolRef { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_skip_empty_optionals() {
        let node = Node::For {
            init: None,
            test: Some(NodeId(1)),
            incr: None,
            body: NodeId(2),
        };
        assert_eq!(
            node.fields(),
            vec![("test", Child::One(NodeId(1))), ("body", Child::One(NodeId(2)))]
        );
        assert_eq!(node.slots().len(), 4);
    }

    #[test]
    fn test_children_in_declaration_order() {
        let node = Node::FunctionCall {
            func: NodeId(0),
            args: vec![NodeId(3), NodeId(1)],
            ty: None,
        };
        assert_eq!(node.children(), vec![NodeId(0), NodeId(3), NodeId(1)]);
    }

    #[test]
    fn test_custom_kind_name() {
        let node = Node::Custom {
            kind: "OmpParallel".to_string(),
            attrs: BTreeMap::new(),
            children: vec![],
        };
        assert_eq!(node.kind_name(), "OmpParallel");
        assert!(Node::Break.children().is_empty());
    }
}
