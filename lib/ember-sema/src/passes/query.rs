//! Scoped queries: "what is visible from this point of the tree".
//!
//! A query walks the tree under a set of [`QueryFlags`] and hands every node
//! it can see to a [`Visitor`]. The walk proceeds in levels (one per scope it
//! enters); after each level the visitor decides whether to keep going, which
//! is how nearer declarations shadow farther ones.
//!
//! Within a level the scope's own members come first. Scope links (unaliased
//! imports and struct bases) form a second sub-level, followed only when
//! [`QueryFlags::FOLLOW_REFERENCES`] is set and the link is already resolved.
//! Function lookups collect both sub-levels of a level before stopping, so
//! imported overloads are candidates next to local ones.
//! Flags are only ever narrowed as the walk proceeds, and link targets are
//! searched without bubbling up again, so a query always terminates.

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::context::Symbol;
use crate::passes::frame::Frame;
use crate::symbol;
use crate::tree::{Access, NodeId, NodeKind, QueryFlags, QueryKinds, Tree};

pub trait Visitor {
    fn visit(&mut self, tree: &Tree, node: NodeId);

    /// Called once a level of the search is exhausted. Breaking ends the query.
    fn level_done(&mut self, _tree: &Tree) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after a scope's own members, before its scope links. Breaking
    /// skips the links and ends the query.
    fn members_done(&mut self, tree: &Tree) -> ControlFlow<()> {
        self.level_done(tree)
    }
}

/// Side information about a finished query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Scope links the walk had to skip: unresolved ones, and ones currently
    /// being resolved further up the recursion frame.
    pub skipped: Vec<NodeId>,
}

impl QueryOutcome {
    /// Whether every reachable scope was searched.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub struct Query<'q> {
    tree: &'q Tree,
    frame: Option<&'q Frame<'q>>,
    outcome: QueryOutcome,
}

impl<'q> Query<'q> {
    pub fn new(tree: &'q Tree) -> Self {
        Self {
            tree,
            frame: None,
            outcome: QueryOutcome::default(),
        }
    }

    /// Links whose reference is on `frame` are being resolved right now and
    /// must not be followed.
    pub fn with_frame(mut self, frame: &'q Frame<'q>) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn run(mut self, start: NodeId, flags: QueryFlags, visitor: &mut impl Visitor) -> QueryOutcome {
        let _ = self.walk(start, flags, visitor);
        self.outcome
    }

    fn walk(&mut self, start: NodeId, mut flags: QueryFlags, visitor: &mut impl Visitor) -> ControlFlow<()> {
        let tree = self.tree;
        let start = if flags.contains(QueryFlags::FROM_ROOT) {
            tree.root()
        } else {
            start
        };

        if flags.contains(QueryFlags::FIRST_LEVEL_CHILDREN) {
            // the imports of a namespace are not its members
            let level_flags = match tree.kind(start) {
                Some(kind) if kind.is_namespace() => flags.without(QueryFlags::FOLLOW_REFERENCES),
                _ => flags,
            };
            self.level(tree.children(start), level_flags, visitor)?;
        } else if flags.contains(QueryFlags::DOWNWARDS)
            && !flags.contains(QueryFlags::CHILDREN_AT_ROOT)
        {
            self.descend(start, visitor);
            visitor.level_done(tree)?;
        }

        let mut top = start;
        if flags.contains(QueryFlags::UPWARDS) {
            while let Some(parent) = tree.parent(top) {
                if tree.access(top).contains(Access::STOP_SIBLINGS) {
                    flags.remove(QueryFlags::YOUNGER_SIBLINGS);
                }
                if flags.contains(QueryFlags::INCLUDE_PARENTS) {
                    visitor.visit(tree, parent);
                }
                let visible = Self::visible_children(tree, parent, top, flags);
                self.level(&visible, flags, visitor)?;
                top = parent;
            }
        }

        if flags.contains(QueryFlags::DOWNWARDS | QueryFlags::CHILDREN_AT_ROOT)
            && tree.parent(top).is_none()
        {
            self.descend(top, visitor);
            visitor.level_done(tree)?;
        }

        ControlFlow::Continue(())
    }

    /// Children of `parent` visible to a query arriving from `from`.
    fn visible_children(tree: &Tree, parent: NodeId, from: NodeId, flags: QueryFlags) -> Vec<NodeId> {
        let children = tree.children(parent);
        if !tree.access(parent).contains(Access::ORDERED) {
            return children.to_vec();
        }
        if !flags.contains(QueryFlags::YOUNGER_SIBLINGS) {
            return Vec::new();
        }
        let position = children
            .iter()
            .position(|&child| child == from)
            .unwrap_or(children.len());
        children[..position].to_vec()
    }

    fn level(&mut self, nodes: &[NodeId], flags: QueryFlags, visitor: &mut impl Visitor) -> ControlFlow<()> {
        let tree = self.tree;
        for node in tree.expand_members(nodes) {
            visitor.visit(tree, node);
        }
        visitor.members_done(tree)?;

        if flags.contains(QueryFlags::FOLLOW_REFERENCES) {
            let mut seen = HashSet::new();
            for link in Self::links(tree, nodes) {
                self.follow(link, &mut seen, visitor);
            }
        }

        visitor.level_done(tree)
    }

    /// Reference children of the unaliased imports and bases among `nodes`.
    fn links(tree: &Tree, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes
            .iter()
            .copied()
            .filter(|&node| {
                matches!(
                    tree.kind(node),
                    Some(NodeKind::Import { alias: None }) | Some(NodeKind::Base)
                )
            })
            .filter_map(|node| tree.children(node).first().copied())
            .collect()
    }

    fn in_progress(&self, reference: NodeId) -> bool {
        let Some(frame) = self.frame else {
            return false;
        };
        frame.contains(reference)
            || self
                .tree
                .parent(reference)
                .is_some_and(|owner| frame.contains(owner))
    }

    fn follow(&mut self, reference: NodeId, seen: &mut HashSet<NodeId>, visitor: &mut impl Visitor) {
        let tree = self.tree;
        let Some(data) = tree.kind(reference).and_then(NodeKind::as_reference) else {
            return;
        };
        if !data.kinds.is_scope_link() {
            return;
        }
        if self.in_progress(reference) || !data.is_resolved() {
            self.outcome.skipped.push(reference);
            return;
        }

        for &target in data.found.iter().flatten() {
            if !seen.insert(target) {
                continue;
            }
            match tree.kind(target) {
                Some(NodeKind::Struct { .. }) => {
                    for member in tree.scope_members(target) {
                        visitor.visit(tree, member);
                    }
                    for base in Self::links(tree, tree.children(target)) {
                        self.follow(base, seen, visitor);
                    }
                }
                Some(NodeKind::Package { .. }) | Some(NodeKind::Module { .. }) => {
                    for member in tree.scope_members(target) {
                        visitor.visit(tree, member);
                    }
                }
                _ => {}
            }
        }
    }

    /// Visit everything reachable downwards through namespaces and
    /// passthrough nodes.
    fn descend(&mut self, node: NodeId, visitor: &mut impl Visitor) {
        let tree = self.tree;
        for &child in tree.children(node) {
            visitor.visit(tree, child);
            let Some(kind) = tree.kind(child) else {
                continue;
            };
            let access = tree.access(child);
            let is_link = matches!(kind, NodeKind::Import { .. } | NodeKind::Base);
            let enter = kind.is_namespace() || (access.contains(Access::PASSTHROUGH) && !is_link);
            if enter && !access.contains(Access::STOP_SIBLINGS) {
                self.descend(child, visitor);
            }
        }
    }
}

/// Collects every visible symbol with a given name and kind. Stops at the
/// first level that produced a match.
#[derive(Debug, Clone)]
pub struct SymbolCollector {
    name: Symbol,
    kinds: QueryKinds,
    from: NodeId,
    found: Vec<NodeId>,
}

impl SymbolCollector {
    pub fn new(name: Symbol, kinds: QueryKinds, from: NodeId) -> Self {
        Self {
            name,
            kinds,
            from,
            found: Vec::new(),
        }
    }

    pub fn into_found(self) -> Vec<NodeId> {
        self.found
    }
}

impl Visitor for SymbolCollector {
    fn visit(&mut self, tree: &Tree, node: NodeId) {
        let Some(kind) = tree.kind(node) else {
            return;
        };
        if kind.symbol_name() != Some(self.name) {
            return;
        }
        let parent = tree.parent(node).and_then(|parent| tree.kind(parent));
        if !kind.query_kind(parent).intersects(self.kinds) {
            return;
        }
        if !symbol::is_visible(tree, node, self.from) {
            return;
        }
        if !self.found.contains(&node) {
            self.found.push(node);
        }
    }

    fn level_done(&mut self, _tree: &Tree) -> ControlFlow<()> {
        if self.found.is_empty() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    fn members_done(&mut self, tree: &Tree) -> ControlFlow<()> {
        if self.kinds.merges_scope_links() {
            return ControlFlow::Continue(());
        }
        self.level_done(tree)
    }
}

/// Run a name lookup from `start` and return the matches with the outcome.
pub fn lookup(
    tree: &Tree,
    frame: Option<&Frame<'_>>,
    start: NodeId,
    name: Symbol,
    kinds: QueryKinds,
    flags: QueryFlags,
    from: NodeId,
) -> (Vec<NodeId>, QueryOutcome) {
    let mut collector = SymbolCollector::new(name, kinds, from);
    let mut query = Query::new(tree);
    if let Some(frame) = frame {
        query = query.with_frame(frame);
    }
    let outcome = query.run(start, flags, &mut collector);
    (collector.into_found(), outcome)
}
