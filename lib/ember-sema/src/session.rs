//! The coordinating side of a build: owns the tree, the gate and the
//! statistics, and hands released packages to the resolver.

use crate::config::ResolveConfig;
use crate::context::{Loc, SourceId, Sources};
use crate::error::{Diagnostics, SemaError};
use crate::gate::{Gate, ImportPath, PackageInfo, PackageState};
use crate::passes::size::{cached_struct_size, Sizer};
use crate::passes::{reference, Frame, ResolveStats, Resolver};
use crate::symbol;
use crate::tree::{NodeId, NodeKind, Tree, TreeBuilder};

pub struct Session {
    tree: Tree,
    sources: Sources,
    config: ResolveConfig,
    gate: Gate,
    stats: ResolveStats,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(ResolveConfig::default())
    }

    pub fn with_config(config: ResolveConfig) -> Self {
        Self {
            tree: Tree::new(),
            sources: Sources::new(),
            config,
            gate: Gate::new(),
            stats: ResolveStats::default(),
        }
    }

    pub fn builder(&mut self) -> TreeBuilder<'_> {
        TreeBuilder::new(&mut self.tree)
    }

    /// Builder whose nodes are located in `source`.
    pub fn builder_for(&mut self, source: SourceId) -> TreeBuilder<'_> {
        TreeBuilder::for_source(&mut self.tree, source)
    }

    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) -> SourceId {
        self.sources.add(name, text)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn stats(&self) -> &ResolveStats {
        &self.stats
    }

    /// Hand a fully built package subtree to the gate.
    pub fn deliver(&mut self, package: NodeId) -> Result<(), SemaError> {
        let name = match self.tree.kind(package) {
            Some(NodeKind::Package { name, .. }) => self.tree.name(*name).to_string(),
            _ => {
                return Err(SemaError::structural(
                    format!("{} is not a package", self.tree.describe(package)),
                    self.tree.loc(package),
                ))
            }
        };
        let module = self
            .tree
            .enclosing_module(package)
            .and_then(|module| self.tree.kind(module))
            .and_then(NodeKind::symbol_name)
            .map(|sym| self.tree.name(sym).to_string());
        let imports = self.imports_of(package);

        self.gate.deliver(package, PackageInfo { module, name, imports });
        Ok(())
    }

    fn imports_of(&self, package: NodeId) -> Vec<ImportPath> {
        self.tree
            .children(package)
            .iter()
            .filter(|&&child| matches!(self.tree.kind(child), Some(NodeKind::Import { .. })))
            .filter_map(|&import| self.tree.children(import).first().copied())
            .map(|head| {
                let names = std::iter::once(head)
                    .chain(reference::segments(&self.tree, head))
                    .filter_map(|segment| self.tree.kind(segment).and_then(NodeKind::as_reference))
                    .map(|data| self.tree.name(data.name).to_string())
                    .collect();
                ImportPath(names)
            })
            .collect()
    }

    /// Run every phase over `package`, then report the outcome to the gate
    /// so its dependents can continue.
    pub fn begin_resolve(&mut self, package: NodeId) -> Result<(), Diagnostics> {
        tracing::info!(package = %symbol::identifier(&self.tree, package), "resolving package");
        let result = Resolver::new(&mut self.tree, &self.config, &mut self.stats).run(package);
        if let Err(diagnostics) = &result {
            tracing::debug!(errors = diagnostics.len(), "package failed");
        }
        self.gate.finish(package, result.is_ok());
        result
    }

    pub fn register_dependent_on_resolve(&mut self, package: NodeId, dependent: NodeId) {
        self.gate.register_dependent_on_resolve(package, dependent);
    }

    pub fn on_package_resolved(&mut self, callback: impl FnMut(NodeId, PackageState) + 'static) {
        self.gate.on_package_resolved(callback);
    }

    /// Resolve every package whose imports have all finished, including the
    /// ones they unblock. Failures are collected, not returned early.
    pub fn release_ready(&mut self) -> Diagnostics {
        self.release(false)
    }

    fn release(&mut self, force: bool) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        while let Some(package) = self.gate.next_release(force) {
            if let Err(errors) = self.begin_resolve(package) {
                diagnostics.extend(errors);
            }
        }
        diagnostics
    }

    /// Resolve everything delivered so far, breaking import cycles and
    /// releasing packages whose imports never arrived.
    pub fn run(&mut self) -> Result<(), Diagnostics> {
        let mut diagnostics = self.release(false);
        diagnostics.extend(self.release(true));
        diagnostics.into_result(())
    }

    /// Deliver every package in the tree that was not delivered yet, then run.
    pub fn resolve_all(&mut self) -> Result<(), Diagnostics> {
        let packages: Vec<NodeId> = self
            .tree
            .descendants(self.tree.root())
            .into_iter()
            .filter(|&id| matches!(self.tree.kind(id), Some(NodeKind::Package { .. })))
            .filter(|&id| !self.gate.is_delivered(id))
            .collect();
        for package in packages {
            self.deliver(package)?;
        }
        self.run()
    }

    /// Byte size of a struct or type expression, computed on first use.
    pub fn size_of(&mut self, node: NodeId) -> Result<u64, SemaError> {
        if let Some(size) = cached_struct_size(&self.tree, node) {
            return Ok(size);
        }
        let frame = Frame::root(self.tree.root());
        let mut sizer = Sizer {
            config: &self.config,
            stats: &mut self.stats,
        };
        match self.tree.kind(node) {
            Some(NodeKind::Struct { .. }) => sizer.struct_size(&mut self.tree, &frame, node),
            _ => sizer.type_expr_size(&mut self.tree, &frame, node),
        }
    }

    pub fn identifier(&self, node: NodeId) -> String {
        symbol::identifier(&self.tree, node)
    }

    /// Overload chosen for a call.
    pub fn selected(&self, call: NodeId) -> Option<NodeId> {
        match self.tree.kind(call)? {
            NodeKind::Call { selected } => *selected,
            _ => None,
        }
    }

    /// Declarations a reference chain resolved to.
    pub fn targets(&self, reference: NodeId) -> Vec<NodeId> {
        self.tree
            .kind(reference)
            .and_then(NodeKind::as_reference)
            .and_then(|data| data.found.clone())
            .unwrap_or_default()
    }

    pub fn position(&self, loc: &Loc) -> String {
        self.sources.position(loc).to_string()
    }

    /// Render every diagnostic against the registered sources.
    pub fn render(&self, diagnostics: &Diagnostics) -> String {
        let mut out = Vec::new();
        for report in diagnostics.reports() {
            if let Err(err) = report.write(self.sources.cache(), &mut out) {
                tracing::warn!(%err, "failed to render diagnostic");
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
