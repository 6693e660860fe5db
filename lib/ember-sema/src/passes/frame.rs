//! Recursion frames.
//!
//! A [`Frame`] is one entry of an immutable, backward-linked stack living on
//! the call stack: each recursive step borrows its caller's frame and pushes
//! its own node. Seeing a node twice on the same chain means the step is about
//! to start a cycle.

use crate::error::SemaError;
use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    root: NodeId,
    parent: Option<&'a Frame<'a>>,
    node: NodeId,
    depth: usize,
}

impl<'a> Frame<'a> {
    pub fn root(node: NodeId) -> Frame<'static> {
        Frame {
            root: node,
            parent: None,
            node,
            depth: 0,
        }
    }

    pub fn push(&'a self, node: NodeId) -> Frame<'a> {
        Frame {
            root: self.root,
            parent: Some(self),
            node,
            depth: self.depth + 1,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Node of the outermost frame of this chain.
    pub fn root_node(&self) -> NodeId {
        self.root
    }

    pub fn parent(&self) -> Option<&'a Frame<'a>> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frames from this one outwards.
    pub fn iter(&self) -> impl Iterator<Item = &Frame<'a>> {
        std::iter::successors(Some(self), |frame| frame.parent)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.iter().any(|frame| frame.node == node)
    }

    /// Nearest frame (this one included) whose node matches `pred`.
    pub fn first_of(&self, tree: &Tree, pred: impl Fn(&NodeKind) -> bool) -> Option<&Frame<'a>> {
        self.iter()
            .find(|frame| tree.kind(frame.node).is_some_and(&pred))
    }

    /// Next matching frame strictly outside this one.
    pub fn next_of(&self, tree: &Tree, pred: impl Fn(&NodeKind) -> bool) -> Option<&'a Frame<'a>> {
        self.parent.and_then(|parent| {
            std::iter::successors(Some(parent), |frame| frame.parent)
                .find(|frame| tree.kind(frame.node).is_some_and(&pred))
        })
    }

    /// Fail with a [`SemaError::Recursion`] if `node` is already on this chain.
    ///
    /// The reported path runs from the earliest occurrence of `node` down to
    /// the current frame and back to `node`, listing only nodes of the same
    /// category as `node` (type declarations for types, symbols otherwise).
    pub fn raise(&self, tree: &Tree, node: NodeId) -> Result<(), SemaError> {
        if !self.contains(node) {
            return Ok(());
        }

        let is_type = tree.kind(node).is_some_and(NodeKind::is_type_decl);
        let keep = move |kind: &NodeKind| {
            if is_type {
                kind.is_type_decl()
            } else {
                kind.is_symbol()
            }
        };

        // walk outwards over named frames until the earliest occurrence
        let mut cycle = Vec::new();
        let mut earliest = 0;
        let mut cursor = self.first_of(tree, keep);
        while let Some(frame) = cursor {
            cycle.push(frame.node);
            if frame.node == node {
                earliest = cycle.len();
            }
            cursor = frame.next_of(tree, keep);
        }
        cycle.truncate(earliest);
        cycle.reverse();
        cycle.push(node);

        let path: Vec<String> = cycle
            .iter()
            .map(|&id| {
                tree.kind(id)
                    .and_then(NodeKind::symbol_name)
                    .map(|name| tree.name(name).to_string())
                    .unwrap_or_else(|| tree.describe(id))
            })
            .collect();

        tracing::debug!(path = %path.join(" -> "), "cycle detected");
        Err(SemaError::Recursion {
            path,
            loc: tree.loc(node),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Loc;
    use crate::error::ErrorKind;
    use crate::symbol::Visibility;

    fn strukt(tree: &mut Tree, name: &str) -> NodeId {
        let name = tree.intern(name);
        tree.alloc(
            NodeKind::Struct {
                name,
                visibility: Visibility::Public,
                size: None,
            },
            Loc::generated(),
        )
    }

    #[test]
    fn raise_passes_on_fresh_node() {
        let mut tree = Tree::new();
        let a = strukt(&mut tree, "A");
        let root = Frame::root(tree.root());
        assert!(root.raise(&tree, a).is_ok());
    }

    #[test]
    fn raise_reports_shortest_cycle() {
        let mut tree = Tree::new();
        let outer = strukt(&mut tree, "Outer");
        let a = strukt(&mut tree, "A");
        let b = strukt(&mut tree, "B");
        let field = tree.intern("b");
        let field = tree.alloc(
            NodeKind::Field {
                name: field,
                visibility: Visibility::Public,
            },
            Loc::generated(),
        );

        let root = Frame::root(tree.root());
        let f0 = root.push(outer);
        let f1 = f0.push(a);
        let f2 = f1.push(field);
        let f3 = f2.push(b);

        let err = f3.raise(&tree, a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recursion);
        assert_eq!(err.to_string(), "circular definition: A -> B -> A");
    }

    #[test]
    fn first_and_next_skip_bookkeeping() {
        let mut tree = Tree::new();
        let a = strukt(&mut tree, "A");
        let block = tree.alloc(NodeKind::Block, Loc::generated());

        let root = Frame::root(tree.root());
        let f1 = root.push(a);
        let f2 = f1.push(block);

        let first = f2.first_of(&tree, NodeKind::is_type_decl).unwrap();
        assert_eq!(first.node(), a);
        assert!(first.next_of(&tree, NodeKind::is_type_decl).is_none());
        assert_eq!(f2.depth(), 2);
        assert_eq!(f2.root_node(), tree.root());
    }
}
