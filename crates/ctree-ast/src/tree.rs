//! Arena tree with maintained parent links

use std::collections::{HashMap, HashSet};
use std::ops::Index;

use ctree_types::Type;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::node::SlotMut;
use crate::{Node, NodeId, Result, Slot, StructuralError};

/// Owns every node of an IR tree.
///
/// Nodes are never removed: a replaced or detached subtree stays in the
/// arena (unreachable from the root) until the tree is dropped. Every
/// slot assignment made through the methods below keeps parent links
/// consistent; [`Tree::fix_parents`] recomputes them from scratch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TreeRepr", into = "TreeRepr")]
pub struct Tree {
    entries: Vec<Entry>,
    next_unique: u32,
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    parent: Option<NodeId>,
}

/// On-disk form: parent links are derived, not stored
#[derive(Serialize, Deserialize)]
struct TreeRepr {
    nodes: Vec<Node>,
    #[serde(default)]
    next_unique: u32,
}

impl From<TreeRepr> for Tree {
    fn from(repr: TreeRepr) -> Self {
        let mut tree = Tree {
            entries: repr
                .nodes
                .into_iter()
                .map(|node| Entry { node, parent: None })
                .collect(),
            next_unique: repr.next_unique,
        };
        tree.fix_parents();
        tree
    }
}

impl From<Tree> for TreeRepr {
    fn from(tree: Tree) -> Self {
        TreeRepr {
            nodes: tree.entries.into_iter().map(|e| e.node).collect(),
            next_unique: tree.next_unique,
        }
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a node whose children are already in the tree, making it their
    /// parent. Children must be detached; passing a node that another
    /// parent still holds leaves the tree shared, which [`crate::validate`]
    /// reports.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.entries.len() as u32);
        for child in node.children() {
            self.set_parent(child, Some(id));
        }
        self.entries.push(Entry { node, parent: None });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.entries.get(id.index()).map(|e| &e.node)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(StructuralError::UnknownNode { id })
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (NodeId(i as u32), &e.node))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(id.index()).and_then(|e| e.parent)
    }

    /// Parent, grandparent, ... up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p)).take(self.entries.len())
    }

    pub fn get_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Nearest ancestor matching `pred`, e.g. the enclosing function
    pub fn enclosing<P>(&self, id: NodeId, pred: P) -> Option<NodeId>
    where
        P: Fn(&Node) -> bool,
    {
        self.ancestors(id).find(|&a| pred(&self[a]))
    }

    /// Pre-order walk starting at (and including) `root`, children visited
    /// in field declaration order
    pub fn walk(&self, root: NodeId) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![root],
        }
    }

    /// Lazily yields every node under `root` (inclusive) that satisfies
    /// `pred`, in pre-order
    pub fn find_all<'a, P>(&'a self, root: NodeId, mut pred: P) -> impl Iterator<Item = NodeId> + 'a
    where
        P: FnMut(&Node) -> bool + 'a,
    {
        self.walk(root).filter(move |&id| pred(&self[id]))
    }

    pub fn find<P>(&self, root: NodeId, mut pred: P) -> Option<NodeId>
    where
        P: FnMut(&Node) -> bool,
    {
        self.walk(root).find(|&id| pred(&self[id]))
    }

    /// Assign a single-node slot. `None` clears an optional slot. Returns
    /// the displaced child, which becomes detached.
    pub fn set_field(
        &mut self,
        parent: NodeId,
        field: &str,
        child: Option<NodeId>,
    ) -> Result<Option<NodeId>> {
        let (old, required) = match self.slot(parent, field)? {
            Slot::Required(id) => (Some(id), true),
            Slot::Optional(id) => (id, false),
            Slot::List(_) => return Err(self.slot_mismatch(parent, field)),
        };
        if required && child.is_none() {
            return Err(self.slot_mismatch(parent, field));
        }
        if let Some(child) = child {
            self.check_attachable(parent, child, old.as_slice())?;
        }

        self.with_slot_mut(parent, field, |slot| match (slot, child) {
            (SlotMut::Required(id), Some(child)) => *id = child,
            (SlotMut::Optional(id), child) => *id = child,
            _ => {}
        })?;
        if let Some(old) = old {
            self.set_parent(old, None);
        }
        if let Some(child) = child {
            self.set_parent(child, Some(parent));
        }
        trace!(%parent, field, "set field");
        Ok(old)
    }

    /// Assign a list slot. Returns the displaced children.
    pub fn set_list(
        &mut self,
        parent: NodeId,
        field: &str,
        children: Vec<NodeId>,
    ) -> Result<Vec<NodeId>> {
        let old = match self.slot(parent, field)? {
            Slot::List(ids) => ids.to_vec(),
            _ => return Err(self.slot_mismatch(parent, field)),
        };
        let mut seen = HashSet::new();
        for &child in &children {
            if !seen.insert(child) {
                return Err(StructuralError::Shared {
                    kind: self.kind(child),
                    id: child,
                });
            }
            self.check_attachable(parent, child, &old)?;
        }

        let assigned = children.clone();
        self.with_slot_mut(parent, field, move |slot| {
            if let SlotMut::List(ids) = slot {
                *ids = assigned;
            }
        })?;
        for &id in &old {
            self.set_parent(id, None);
        }
        for &id in &children {
            self.set_parent(id, Some(parent));
        }
        Ok(old)
    }

    /// Put `new` in the slot `id` occupies. `id` becomes detached; `new`
    /// may be one of its descendants.
    pub fn replace(&mut self, id: NodeId, new: NodeId) -> Result<()> {
        let (parent, field, pos) = self.locate(id)?;
        if new == id {
            return Ok(());
        }
        self.check_attachable(parent, new, &[id])?;

        self.with_slot_mut(parent, field, |slot| match slot {
            SlotMut::Required(slot) => *slot = new,
            SlotMut::Optional(slot) => *slot = Some(new),
            SlotMut::List(ids) => {
                if let Some(slot) = pos.and_then(|p| ids.get_mut(p)) {
                    *slot = new;
                }
            }
        })?;
        self.set_parent(id, None);
        self.set_parent(new, Some(parent));
        trace!(%id, %new, "replace");
        Ok(())
    }

    /// Insert `new` immediately before `id` in the list holding `id`
    pub fn insert_before(&mut self, id: NodeId, new: NodeId) -> Result<()> {
        self.insert_sibling(id, new, 0)
    }

    /// Insert `new` immediately after `id` in the list holding `id`
    pub fn insert_after(&mut self, id: NodeId, new: NodeId) -> Result<()> {
        self.insert_sibling(id, new, 1)
    }

    fn insert_sibling(&mut self, id: NodeId, new: NodeId, offset: usize) -> Result<()> {
        let (parent, field, pos) = self.locate(id)?;
        let Some(pos) = pos else {
            return Err(StructuralError::NotInList {
                kind: self.kind(id),
                id,
            });
        };
        self.check_attachable(parent, new, &[])?;
        self.with_slot_mut(parent, field, |slot| {
            if let SlotMut::List(ids) = slot {
                ids.insert(pos + offset, new);
            }
        })?;
        self.set_parent(new, Some(parent));
        Ok(())
    }

    /// Annotate a `SymbolRef`, `FunctionCall` or `Cast` with a type. A
    /// symbol that already carries a different type is never retyped.
    pub fn set_type(&mut self, id: NodeId, ty: Type) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id.index())
            .ok_or(StructuralError::UnknownNode { id })?;
        match &mut entry.node {
            Node::SymbolRef { name, ty: slot, .. } => {
                if let Some(existing) = slot.as_ref() {
                    if *existing != ty {
                        return Err(StructuralError::Retyped {
                            name: name.clone(),
                            id,
                            from: existing.clone(),
                            to: ty,
                        });
                    }
                }
                *slot = Some(ty);
            }
            Node::FunctionCall { ty: slot, .. } => *slot = Some(ty),
            Node::Cast { ty: slot, .. } => *slot = ty,
            other => {
                return Err(StructuralError::NotTypeable {
                    kind: other.kind_name().to_string(),
                    id,
                })
            }
        }
        Ok(())
    }

    /// A fresh symbol named `<prefix>_<n>`, unique within this tree
    pub fn unique_symbol(&mut self, prefix: &str, ty: Option<Type>) -> NodeId {
        let name = format!("{}_{}", prefix, self.next_unique);
        self.next_unique += 1;
        self.add(Node::SymbolRef {
            name,
            ty,
            is_const: false,
        })
    }

    /// Copy a symbol reference. With `declare` the copy keeps the type and
    /// renders as a declaration; otherwise it is a plain use.
    pub fn copy_symbol(&mut self, id: NodeId, declare: bool) -> Result<NodeId> {
        let copy = match self.node(id)? {
            Node::SymbolRef { name, ty, is_const } => Node::SymbolRef {
                name: name.clone(),
                ty: if declare { ty.clone() } else { None },
                is_const: declare && *is_const,
            },
            other => {
                return Err(StructuralError::WrongKind {
                    expected: "SymbolRef",
                    kind: other.kind_name().to_string(),
                    id,
                })
            }
        };
        Ok(self.add(copy))
    }

    /// Deep copy of the subtree rooted at `id`. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId> {
        let mut node = self.node(id)?.clone();
        let mut mapping = HashMap::new();
        for child in node.children() {
            if !mapping.contains_key(&child) {
                let copy = self.clone_subtree(child)?;
                mapping.insert(child, copy);
            }
        }
        node.map_children(|c| mapping.get(&c).copied().unwrap_or(c));
        Ok(self.add(node))
    }

    /// Recompute every parent link from the child slots
    pub fn fix_parents(&mut self) {
        for entry in &mut self.entries {
            entry.parent = None;
        }
        for index in 0..self.entries.len() {
            let parent = NodeId(index as u32);
            let children = self.entries[index].node.children();
            for child in children {
                self.set_parent(child, Some(parent));
            }
        }
    }

    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.parent = parent;
        }
    }

    pub(crate) fn kind(&self, id: NodeId) -> String {
        self.get(id)
            .map(|n| n.kind_name().to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    fn slot(&self, id: NodeId, field: &str) -> Result<Slot<'_>> {
        self.node(id)?
            .slots()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, slot)| slot)
            .ok_or_else(|| StructuralError::NoSuchField {
                kind: self.kind(id),
                id,
                field: field.to_string(),
            })
    }

    fn with_slot_mut<R>(
        &mut self,
        id: NodeId,
        field: &str,
        f: impl FnOnce(SlotMut<'_>) -> R,
    ) -> Result<R> {
        let kind = self.kind(id);
        let entry = self
            .entries
            .get_mut(id.index())
            .ok_or(StructuralError::UnknownNode { id })?;
        let slot = entry
            .node
            .slots_mut()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, slot)| slot);
        match slot {
            Some(slot) => Ok(f(slot)),
            None => Err(StructuralError::NoSuchField {
                kind,
                id,
                field: field.to_string(),
            }),
        }
    }

    fn slot_mismatch(&self, id: NodeId, field: &str) -> StructuralError {
        StructuralError::SlotMismatch {
            kind: self.kind(id),
            id,
            field: field.to_string(),
        }
    }

    /// The parent of `id`, the field holding it and, for list slots, its
    /// position
    fn locate(&self, id: NodeId) -> Result<(NodeId, &'static str, Option<usize>)> {
        self.node(id)?;
        let parent = self.parent(id).ok_or_else(|| StructuralError::NoParent {
            kind: self.kind(id),
            id,
        })?;
        for (field, slot) in self[parent].slots() {
            match slot {
                Slot::Required(child) | Slot::Optional(Some(child)) if child == id => {
                    return Ok((parent, field, None))
                }
                Slot::List(ids) => {
                    if let Some(pos) = ids.iter().position(|&c| c == id) {
                        return Ok((parent, field, Some(pos)));
                    }
                }
                _ => {}
            }
        }
        Err(StructuralError::ParentMismatch {
            kind: self.kind(id),
            id,
        })
    }

    /// `child` may go under `holder` if that creates no cycle and `child`
    /// is detached or only held from within a subtree being displaced
    fn check_attachable(&self, holder: NodeId, child: NodeId, displaced: &[NodeId]) -> Result<()> {
        self.node(child)?;
        if child == holder || self.ancestors(holder).any(|a| a == child) {
            return Err(StructuralError::Cycle {
                kind: self.kind(holder),
                id: holder,
                child,
            });
        }
        if let Some(current) = self.parent(child) {
            let released = displaced.contains(&child)
                || displaced
                    .iter()
                    .any(|&d| current == d || self.ancestors(current).any(|a| a == d));
            if !released {
                return Err(StructuralError::AlreadyAttached {
                    kind: self.kind(child),
                    id: child,
                    parent: current,
                });
            }
        }
        Ok(())
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.entries[id.index()].node
    }
}

/// Pre-order iterator returned by [`Tree::walk`]
pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            if let Some(node) = self.tree.get(id) {
                self.stack.extend(node.children().into_iter().rev());
                return Some(id);
            }
        }
        None
    }
}
