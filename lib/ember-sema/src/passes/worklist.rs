//! The phase worklist driver.
//!
//! Every node owes a set of phases. The driver runs the phases of one package
//! in order (references, then sizes, then deep collision tests), sweeping a
//! worklist until it is empty. Nodes that cannot finish a phase yet are
//! deferred to the next sweep; a sweep that finishes nothing means the
//! remaining nodes can never finish, and the run fails.

use indexmap::IndexSet;

use crate::config::ResolveConfig;
use crate::error::{Diagnostics, SemaError};
use crate::passes::frame::Frame;
use crate::passes::size::Sizer;
use crate::passes::{collision, overload, reference, typing, ResolveStats, Step};
use crate::tree::{NodeId, NodeKind, Phases, Tree};

/// Phases in the order they run.
pub const PHASES: [Phases; 3] = [Phases::RESOLVE, Phases::SIZE, Phases::DEEP_COLLISION];

fn slot(phase: Phases) -> usize {
    PHASES.iter().position(|&p| p == phase).unwrap_or(0)
}

pub struct Resolver<'r> {
    tree: &'r mut Tree,
    config: &'r ResolveConfig,
    stats: &'r mut ResolveStats,
    queues: [IndexSet<NodeId>; 3],
    progress: usize,
}

impl<'r> Resolver<'r> {
    pub fn new(tree: &'r mut Tree, config: &'r ResolveConfig, stats: &'r mut ResolveStats) -> Self {
        Self {
            tree,
            config,
            stats,
            queues: Default::default(),
            progress: 0,
        }
    }

    /// Run every phase over the subtree rooted at `package`.
    pub fn run(&mut self, package: NodeId) -> Result<(), Diagnostics> {
        tracing::debug!(package = %self.tree.describe(package), "resolve run started");
        self.queues[slot(Phases::RESOLVE)].insert(package);

        for phase in PHASES {
            self.seed(package, phase);
            self.run_phase(phase)?;
        }

        tracing::debug!(package = %self.tree.describe(package), "resolve run finished");
        Ok(())
    }

    /// Queue nodes of the package that owe `phase` without having been
    /// requeued by an earlier phase, such as deep collision tests flagged
    /// after their node was already resolved.
    fn seed(&mut self, package: NodeId, phase: Phases) {
        if phase == Phases::RESOLVE {
            return;
        }
        let mut nodes = self.tree.descendants(package);
        if phase == Phases::DEEP_COLLISION {
            if let Some(scope) = self.tree.parent(package) {
                nodes.extend(self.tree.scope_members(scope));
            }
        }
        for node in nodes {
            if self.tree.pending(node).contains(phase) {
                self.queues[slot(phase)].insert(node);
            }
        }
    }

    fn run_phase(&mut self, phase: Phases) -> Result<(), Diagnostics> {
        let index = slot(phase);
        let mut sweeps = 0;

        loop {
            let batch: Vec<NodeId> = std::mem::take(&mut self.queues[index]).into_iter().collect();
            if batch.is_empty() {
                break;
            }

            sweeps += 1;
            self.record_sweep(phase);
            if sweeps > self.config.max_sweeps {
                return Err(SemaError::structural(
                    format!("phase {:?} did not settle after {} sweeps", phase, self.config.max_sweeps),
                    self.tree.loc(batch[0]),
                )
                .into());
            }

            tracing::trace!(?phase, sweep = sweeps, nodes = batch.len(), "sweep started");
            let before = self.progress;
            let root = Frame::root(self.tree.root());
            for node in batch {
                if self.tree.contains(node) {
                    self.process(node, &root, phase)?;
                }
            }

            if self.progress == before && !self.queues[index].is_empty() {
                return Err(self.stalled(index));
            }
        }

        tracing::debug!(?phase, sweeps, "phase settled");
        Ok(())
    }

    fn record_sweep(&mut self, phase: Phases) {
        match slot(phase) {
            0 => self.stats.resolve_sweeps += 1,
            1 => self.stats.size_sweeps += 1,
            _ => self.stats.collision_sweeps += 1,
        }
    }

    /// Errors for the nodes left over when a sweep made no progress.
    fn stalled(&self, index: usize) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for &node in &self.queues[index] {
            tracing::trace!(subtree = %self.tree.dump(node), "node made no progress");
            let culprit = match self.tree.kind(node) {
                Some(NodeKind::Call { .. }) => self.tree.children(node).first().copied(),
                _ => Some(node),
            };
            let error = match culprit.and_then(|c| self.tree.kind(c)) {
                Some(NodeKind::Reference(_)) => {
                    let culprit = culprit.unwrap_or(node);
                    SemaError::UnresolvedReference {
                        name: reference::chain_text(self.tree, culprit, None),
                        loc: self.tree.loc(culprit),
                    }
                }
                _ => SemaError::structural(
                    format!("{} cannot make progress", self.tree.describe(node)),
                    self.tree.loc(node),
                ),
            };
            if !diagnostics.iter().any(|e| *e == error) {
                diagnostics.push(error);
            }
            if !self.config.collect_unresolved {
                break;
            }
        }
        diagnostics
    }

    /// Run `phase` on `node` under `frame`.
    ///
    /// A node that does not owe `phase` but owes others is requeued for them.
    /// Otherwise the node is raised on the frame, its step runs, and the
    /// phase bit is cleared once the step is done.
    pub fn process(&mut self, node: NodeId, frame: &Frame<'_>, phase: Phases) -> Result<Step, SemaError> {
        let pending = self.tree.pending(node);
        if !pending.contains(phase) {
            if !pending.is_empty() {
                self.requeue(node, pending);
            }
            return Ok(Step::Skipped);
        }

        frame.raise(self.tree, node)?;
        let inner = frame.push(node);
        let step = self.step(node, &inner, phase)?;

        match step {
            Step::Done => {
                self.tree.clear_phase(node, phase)?;
                self.progress += 1;
                let rest = self.tree.pending(node);
                if !rest.is_empty() {
                    self.requeue(node, rest);
                }
            }
            Step::Deferred => {
                self.queues[slot(phase)].insert(node);
            }
            Step::Skipped => {}
        }
        Ok(step)
    }

    fn requeue(&mut self, node: NodeId, phases: Phases) {
        for phase in PHASES {
            if phases.contains(phase) {
                self.queues[slot(phase)].insert(node);
            }
        }
    }

    fn step(&mut self, node: NodeId, frame: &Frame<'_>, phase: Phases) -> Result<Step, SemaError> {
        let kind = self
            .tree
            .kind(node)
            .cloned()
            .ok_or_else(|| SemaError::structural("dangling node in worklist", self.tree.loc(node)))?;

        if phase == Phases::RESOLVE {
            match kind {
                // chained segments are resolved through their head
                NodeKind::Reference(_) if self.is_segment(node) => Ok(Step::Skipped),
                NodeKind::Reference(_) => {
                    let step = reference::resolve_chain(self.tree, frame, node)?;
                    if step == Step::Done {
                        self.stats.references_resolved += 1;
                    }
                    Ok(step)
                }
                NodeKind::Call { .. } => self.resolve_call(node, frame),
                NodeKind::Struct { .. } => self.resolve_struct(node, frame),
                _ => self.cascade(node, frame),
            }
        } else if phase == Phases::SIZE {
            let mut sizer = Sizer {
                config: self.config,
                stats: &mut *self.stats,
            };
            match kind {
                NodeKind::Struct { .. } => sizer.compute_struct(self.tree, frame, node)?,
                NodeKind::Array { .. } => sizer.type_expr_size(self.tree, frame, node)?,
                _ => 0,
            };
            Ok(Step::Done)
        } else {
            self.stats.deep_tests += 1;
            collision::deep_test(self.tree, node)?;
            Ok(Step::Done)
        }
    }

    /// Default resolve step: resolve every child.
    fn cascade(&mut self, node: NodeId, frame: &Frame<'_>) -> Result<Step, SemaError> {
        for child in self.tree.children(node).to_vec() {
            self.process(child, frame, Phases::RESOLVE)?;
        }
        Ok(Step::Done)
    }

    /// Structs resolve their bases before anything that could look inside
    /// them through inheritance.
    fn resolve_struct(&mut self, node: NodeId, frame: &Frame<'_>) -> Result<Step, SemaError> {
        let (bases, members): (Vec<NodeId>, Vec<NodeId>) = self
            .tree
            .children(node)
            .iter()
            .copied()
            .partition(|&child| matches!(self.tree.kind(child), Some(NodeKind::Base)));

        for &base in &bases {
            self.process(base, frame, Phases::RESOLVE)?;
        }
        if bases.iter().any(|&base| self.subtree_pending(base)) {
            return Ok(Step::Deferred);
        }
        for member in members {
            self.process(member, frame, Phases::RESOLVE)?;
        }
        Ok(Step::Done)
    }

    fn resolve_call(&mut self, node: NodeId, frame: &Frame<'_>) -> Result<Step, SemaError> {
        if matches!(self.tree.kind(node), Some(NodeKind::Call { selected: Some(_) })) {
            return Ok(Step::Done);
        }

        let children = self.tree.children(node).to_vec();
        for &child in &children {
            self.process(child, frame, Phases::RESOLVE)?;
        }
        if children.iter().any(|&child| self.subtree_pending(child)) {
            return Ok(Step::Deferred);
        }

        let callee = children
            .iter()
            .copied()
            .find(|&child| matches!(self.tree.kind(child), Some(NodeKind::Reference(_))))
            .ok_or_else(|| SemaError::structural("call without a callee", self.tree.loc(node)))?;
        let candidates = self
            .tree
            .kind(callee)
            .and_then(NodeKind::as_reference)
            .and_then(|data| data.found.clone())
            .unwrap_or_default();

        // declarations in other packages, or later in this one, may not have
        // had their types resolved yet
        let mut settled = true;
        for &candidate in &candidates {
            if !matches!(self.tree.kind(candidate), Some(NodeKind::Function { .. })) {
                continue;
            }
            for part in self.tree.children(candidate).to_vec() {
                if matches!(self.tree.kind(part), Some(NodeKind::ParamList | NodeKind::Returns)) {
                    settled &= self.settle(part, frame)?;
                }
            }
        }
        for arg in typing::call_args(self.tree, node) {
            let declared = typing::target(self.tree, arg)
                .and_then(|decl| typing::declared_type_node(self.tree, decl));
            if let Some(ty) = declared {
                settled &= self.settle(ty, frame)?;
            }
        }
        if !settled {
            return Ok(Step::Deferred);
        }

        let mut args = Vec::new();
        for arg in typing::call_args(self.tree, node) {
            let ty = typing::type_of_expr(self.tree, arg).ok_or_else(|| {
                SemaError::structural(
                    format!("{} does not have a value type", self.tree.describe(arg)),
                    self.tree.loc(arg),
                )
            })?;
            args.push(ty);
        }

        let name = reference::chain_text(self.tree, callee, None);
        let selected = overload::select(self.tree, self.config, node, &name, &candidates, &args)?;
        tracing::trace!(call = %name, selected = ?selected, "overload selected");

        if let NodeKind::Call { selected: choice } = &mut self.tree.node_mut(node)?.kind {
            *choice = Some(selected);
        }
        if let Some(data) = self.tree.node_mut(callee)?.kind.as_reference_mut() {
            data.found = Some(vec![selected]);
        }
        self.stats.calls_selected += 1;
        Ok(Step::Done)
    }

    /// Resolve whatever is still pending below `node` ahead of the worklist.
    /// Returns whether the whole subtree is resolved afterwards.
    fn settle(&mut self, node: NodeId, frame: &Frame<'_>) -> Result<bool, SemaError> {
        for id in self.tree.descendants(node) {
            if self.tree.pending(id).contains(Phases::RESOLVE) {
                self.process(id, frame, Phases::RESOLVE)?;
            }
        }
        Ok(!self.subtree_pending(node))
    }

    fn is_segment(&self, node: NodeId) -> bool {
        self.tree
            .parent(node)
            .is_some_and(|parent| matches!(self.tree.kind(parent), Some(NodeKind::Reference(_))))
    }

    /// Whether `node` or anything below it still owes the resolve phase.
    fn subtree_pending(&self, node: NodeId) -> bool {
        self.tree
            .descendants(node)
            .into_iter()
            .any(|id| self.tree.pending(id).contains(Phases::RESOLVE))
    }
}
