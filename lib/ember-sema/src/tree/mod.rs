//! The syntax tree the engine resolves.
//!
//! Nodes live in an [`Arena`] and are addressed by stable [`NodeId`]s. A node
//! owns its children (destroying it destroys the subtree) and keeps a
//! non-owning parent id. Attaching a node that already has a parent detaches
//! it first, so the parent/child edges always form a tree.

use std::collections::HashMap;

use crate::context::{self, Arena, Interner, Loc, Symbol};
use crate::error::SemaError;
use crate::passes::collision;
use crate::types::PRIMITIVE_KEYWORDS;

pub mod builder;
pub mod flags;
pub mod kind;

pub use builder::{Expr, TreeBuilder, TypeExpr};
pub use flags::{Access, Phases, QueryFlags, QueryKinds};
pub use kind::{NodeKind, RefData};

pub type NodeId = context::NodeId<Node>;

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Loc,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    access: Access,
    pending: Phases,
}

impl Node {
    fn new(kind: NodeKind, loc: Loc) -> Self {
        Self {
            access: kind.access(),
            pending: kind.initial_phases(),
            kind,
            loc,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn pending(&self) -> Phases {
        self.pending
    }
}

pub struct Tree {
    nodes: Arena<Node>,
    root: NodeId,
    pub interner: Interner,
}

impl Tree {
    /// Create a tree whose root already declares the builtin primitives.
    pub fn new() -> Self {
        let mut nodes = Arena::default();
        let root = nodes.alloc(Node::new(NodeKind::Root, Loc::generated()));
        let mut tree = Self {
            nodes,
            root,
            interner: Interner::default(),
        };

        for (keyword, kind) in PRIMITIVE_KEYWORDS {
            let name = tree.interner.intern(keyword);
            let decl = tree.alloc(NodeKind::PrimitiveDecl { name, kind: *kind }, Loc::generated());
            tree.push_child_raw(root, decl);
        }

        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Allocate a detached node.
    pub fn alloc(&mut self, kind: NodeKind, loc: Loc) -> NodeId {
        self.nodes.alloc(Node::new(kind, loc))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Number of live nodes, builtins included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SemaError> {
        self.nodes.get(id).ok_or_else(|| Self::dangling(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SemaError> {
        self.nodes.get_mut(id).ok_or_else(|| Self::dangling(id))
    }

    fn dangling(id: NodeId) -> SemaError {
        SemaError::structural(format!("node {:?} is not part of the tree", id), Loc::generated())
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|node| &node.kind)
    }

    pub fn loc(&self, id: NodeId) -> Loc {
        self.nodes
            .get(id)
            .map(|node| node.loc.clone())
            .unwrap_or_else(Loc::generated)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn access(&self, id: NodeId) -> Access {
        self.nodes.get(id).map(|node| node.access).unwrap_or_default()
    }

    pub fn pending(&self, id: NodeId) -> Phases {
        self.nodes.get(id).map(|node| node.pending).unwrap_or_default()
    }

    /// Add a phase to a node after construction. Only the deep collision
    /// test may be added this way.
    pub fn add_phase(&mut self, id: NodeId, phase: Phases) -> Result<(), SemaError> {
        if phase != Phases::DEEP_COLLISION {
            return Err(SemaError::structural(
                format!("phase {:?} cannot be re-added to {:?}", phase, id),
                self.loc(id),
            ));
        }
        self.node_mut(id)?.pending.insert(phase);
        Ok(())
    }

    pub(crate) fn clear_phase(&mut self, id: NodeId, phase: Phases) -> Result<(), SemaError> {
        self.node_mut(id)?.pending.remove(phase);
        Ok(())
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|node| node == ancestor)
    }

    /// The nearest ancestor (or `id` itself) matching `pred`.
    pub fn enclosing(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&node| self.kind(node).is_some_and(&pred))
    }

    pub fn enclosing_package(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing(id, |kind| matches!(kind, NodeKind::Package { .. }))
    }

    pub fn enclosing_module(&self, id: NodeId) -> Option<NodeId> {
        self.enclosing(id, |kind| matches!(kind, NodeKind::Module { .. }))
    }

    /// All nodes of the subtree rooted at `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Children of `id` with passthrough children replaced by their own
    /// children, recursively. Scope links (unaliased imports, bases) are kept
    /// out: they are not declarations of this scope.
    pub fn scope_members(&self, id: NodeId) -> Vec<NodeId> {
        self.expand_members(self.children(id))
    }

    /// `nodes` with passthrough nodes replaced by their members.
    pub fn expand_members(&self, nodes: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &node in nodes {
            match self.kind(node) {
                Some(NodeKind::Import { .. }) | Some(NodeKind::Base) => {
                    if self.kind(node).is_some_and(NodeKind::is_symbol) {
                        out.push(node);
                    }
                }
                _ if self.access(node).contains(Access::PASSTHROUGH) => {
                    out.extend(self.scope_members(node));
                }
                _ => out.push(node),
            }
        }
        out
    }

    /// The scope a declaration's members are compared in: the nearest
    /// ancestor that is not a passthrough node.
    pub fn declaring_scope(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&node| !self.access(node).contains(Access::PASSTHROUGH))
    }

    /// Attach `child` as the last child of `parent`, detaching it from its
    /// previous parent first.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SemaError> {
        self.insert(parent, child, usize::MAX)
    }

    /// Attach `child` at `index` among `parent`'s children (clamped).
    pub fn insert(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<(), SemaError> {
        if self.is_within(parent, child) {
            return Err(SemaError::structural(
                "attaching a node below itself would create a cycle",
                self.loc(child),
            ));
        }
        self.node(parent)?;
        if self.node(child)?.parent.is_some() {
            self.detach(child)?;
        }

        let node = self.node_mut(parent)?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);

        self.on_parent_changed(child)?;
        self.on_child_added(parent, child)
    }

    /// Detach `child` from its parent; the subtree stays alive and can be
    /// attached elsewhere.
    pub fn detach(&mut self, child: NodeId) -> Result<(), SemaError> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };

        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;

        self.on_child_removed(parent, child)
    }

    /// Detach and free the whole subtree rooted at `id`.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), SemaError> {
        if id == self.root {
            return Err(SemaError::structural("the root cannot be destroyed", self.loc(id)));
        }
        self.detach(id)?;
        for node in self.descendants(id) {
            self.nodes.remove(node);
        }
        Ok(())
    }

    /// Move every non-builtin child of `fragment`'s root below `parent`.
    ///
    /// Symbols are re-interned into this tree's interner and the attach hooks
    /// run as if the nodes had been built here. Returns the new ids of the
    /// moved top-level nodes.
    pub fn graft(&mut self, fragment: Tree, parent: NodeId) -> Result<Vec<NodeId>, SemaError> {
        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();
        let tops: Vec<NodeId> = fragment
            .children(fragment.root)
            .iter()
            .copied()
            .filter(|&id| !matches!(fragment.kind(id), Some(NodeKind::PrimitiveDecl { .. })))
            .collect();

        let mut moved = Vec::with_capacity(tops.len());
        for top in tops {
            let new_top = self.copy_subtree(&fragment, top, &mut remap)?;
            self.attach(parent, new_top)?;
            moved.push(new_top);
        }

        // resolved candidates may point anywhere inside the fragment
        for &new_id in remap.values() {
            if let Some(NodeKind::Reference(data)) = self.nodes.get_mut(new_id).map(|n| &mut n.kind) {
                if let Some(found) = &mut data.found {
                    found.retain(|old| remap.contains_key(old));
                    for old in found.iter_mut() {
                        *old = remap[&*old];
                    }
                }
            }
        }

        Ok(moved)
    }

    fn copy_subtree(
        &mut self,
        fragment: &Tree,
        id: NodeId,
        remap: &mut HashMap<NodeId, NodeId>,
    ) -> Result<NodeId, SemaError> {
        let source = fragment.node(id)?;
        let kind = self.reintern(fragment, &source.kind);
        let new_id = self.alloc(kind, source.loc.clone());
        self.node_mut(new_id)?.pending = source.pending;
        remap.insert(id, new_id);

        for &child in &source.children {
            let new_child = self.copy_subtree(fragment, child, remap)?;
            self.attach(new_id, new_child)?;
        }
        Ok(new_id)
    }

    fn reintern(&mut self, fragment: &Tree, kind: &NodeKind) -> NodeKind {
        let mut sym = |s: Symbol| self.interner.intern(fragment.name(s));
        match kind.clone() {
            NodeKind::Module { name } => NodeKind::Module { name: sym(name) },
            NodeKind::Package { name, visibility } => NodeKind::Package {
                name: sym(name),
                visibility,
            },
            NodeKind::Import { alias } => NodeKind::Import { alias: alias.map(sym) },
            NodeKind::Struct {
                name,
                visibility,
                size,
            } => NodeKind::Struct {
                name: sym(name),
                visibility,
                size,
            },
            NodeKind::Field { name, visibility } => NodeKind::Field {
                name: sym(name),
                visibility,
            },
            NodeKind::Function { name, visibility } => NodeKind::Function {
                name: sym(name),
                visibility,
            },
            NodeKind::Param { name } => NodeKind::Param { name: sym(name) },
            NodeKind::Variable { name } => NodeKind::Variable { name: sym(name) },
            NodeKind::Constant {
                name,
                visibility,
                value,
            } => NodeKind::Constant {
                name: sym(name),
                visibility,
                value,
            },
            NodeKind::PrimitiveDecl { name, kind } => NodeKind::PrimitiveDecl {
                name: sym(name),
                kind,
            },
            NodeKind::Reference(mut data) => {
                data.name = sym(data.name);
                NodeKind::Reference(data)
            }
            other => other,
        }
    }

    fn push_child_raw(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    fn on_child_added(&mut self, parent: NodeId, child: NodeId) -> Result<(), SemaError> {
        tracing::trace!(
            parent = %self.describe(parent),
            child = %self.describe(child),
            "child attached"
        );

        // symbols reaching a scope through a passthrough node are checked there too
        let mut symbols = Vec::new();
        if self.kind(child).is_some_and(NodeKind::is_symbol) {
            symbols.push(child);
        } else if self.access(child).contains(Access::PASSTHROUGH) {
            symbols.extend(
                self.scope_members(child)
                    .into_iter()
                    .filter(|&id| self.kind(id).is_some_and(NodeKind::is_symbol)),
            );
        }
        for symbol in symbols {
            collision::superficial_test(self, symbol)?;
        }
        Ok(())
    }

    fn on_child_removed(&mut self, parent: NodeId, child: NodeId) -> Result<(), SemaError> {
        tracing::trace!(parent = ?parent, child = ?child, "child detached");
        let callee_removed = self.children(parent).is_empty()
            || matches!(self.kind(child), Some(NodeKind::Reference(_)));
        if let NodeKind::Call { selected } = &mut self.node_mut(parent)?.kind {
            if callee_removed {
                *selected = None;
            }
        }
        Ok(())
    }

    fn on_parent_changed(&mut self, id: NodeId) -> Result<(), SemaError> {
        let node = self.node_mut(id)?;
        if !node.pending.contains(Phases::RESOLVE) {
            return Ok(());
        }
        // results computed in another context no longer apply
        match &mut node.kind {
            NodeKind::Reference(data) => data.found = None,
            NodeKind::Call { selected } => *selected = None,
            _ => {}
        }
        Ok(())
    }

    pub fn describe(&self, id: NodeId) -> String {
        self.kind(id)
            .map(|kind| kind.describe(&self.interner))
            .unwrap_or_else(|| format!("<dead {:?}>", id))
    }

    /// Indented rendering of the subtree rooted at `id`.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let pending = self.pending(id);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.describe(id));
        if !pending.is_empty() {
            out.push_str(&format!(" {:?}", pending));
        }
        out.push('\n');
        for &child in self.children(id) {
            self.dump_into(child, depth + 1, out);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
