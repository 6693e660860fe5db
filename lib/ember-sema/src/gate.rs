//! Package-level readiness tracking.
//!
//! A package enters the resolver only once every package it imports has been
//! delivered and has finished resolving. Packages register as dependents of
//! the imports they are waiting on and are released when the last of them
//! finishes, so the resolution order is a topological sort driven by
//! notifications.

use std::collections::VecDeque;
use std::fmt;

use indexmap::{IndexMap, IndexSet};

use crate::tree::NodeId;

/// The dotted path written after `import`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportPath(pub Vec<String>);

impl ImportPath {
    /// Whether this path names the package `package` of module `module`.
    /// A single segment names a package in any module.
    pub fn names(&self, module: Option<&str>, package: &str) -> bool {
        match self.0.as_slice() {
            [name] => name == package,
            [m, name] => name == package && module == Some(m.as_str()),
            _ => false,
        }
    }
}

impl fmt::Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageState {
    /// Delivered, waiting on imports.
    Waiting,
    Resolving,
    Resolved,
    Failed,
}

impl PackageState {
    pub fn is_finished(self) -> bool {
        matches!(self, PackageState::Resolved | PackageState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    Delivered(NodeId),
    Released(NodeId),
    Finished(NodeId, PackageState),
}

/// What the gate needs to know about a delivered package.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub module: Option<String>,
    pub name: String,
    pub imports: Vec<ImportPath>,
}

struct Entry {
    info: PackageInfo,
    state: PackageState,
    /// Delivered imports that have not finished yet.
    waiting_on: IndexSet<NodeId>,
    /// Imports no delivered package matches (yet).
    missing: Vec<ImportPath>,
    dependents: IndexSet<NodeId>,
}

impl Entry {
    fn is_ready(&self) -> bool {
        self.state == PackageState::Waiting && self.waiting_on.is_empty() && self.missing.is_empty()
    }
}

type Callback = Box<dyn FnMut(NodeId, PackageState)>;

#[derive(Default)]
pub struct Gate {
    entries: IndexMap<NodeId, Entry>,
    ready: VecDeque<NodeId>,
    events: Vec<GateEvent>,
    callbacks: Vec<Callback>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, package: NodeId) -> Option<PackageState> {
        self.entries.get(&package).map(|entry| entry.state)
    }

    pub fn is_delivered(&self, package: NodeId) -> bool {
        self.entries.contains_key(&package)
    }

    /// Everything that happened so far, in order.
    pub fn events(&self) -> &[GateEvent] {
        &self.events
    }

    /// Packages not finished yet, in delivery order.
    pub fn unfinished(&self) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.state.is_finished())
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn on_package_resolved(&mut self, callback: impl FnMut(NodeId, PackageState) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Record that `dependent` continues once `package` has finished.
    pub fn register_dependent_on_resolve(&mut self, package: NodeId, dependent: NodeId) {
        let finished = match self.entries.get_mut(&package) {
            Some(entry) if !entry.state.is_finished() => {
                entry.dependents.insert(dependent);
                false
            }
            _ => true,
        };
        if !finished {
            if let Some(entry) = self.entries.get_mut(&dependent) {
                entry.waiting_on.insert(package);
            }
        }
    }

    /// A parsed package subtree became available.
    pub fn deliver(&mut self, package: NodeId, info: PackageInfo) {
        if self.entries.contains_key(&package) {
            return;
        }
        tracing::debug!(package = %info.name, imports = info.imports.len(), "package delivered");

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        for import in &info.imports {
            let found = self
                .entries
                .iter()
                .find(|(_, entry)| import.names(entry.info.module.as_deref(), &entry.info.name))
                .map(|(&id, _)| id);
            match found {
                Some(id) => matched.push(id),
                None => missing.push(import.clone()),
            }
        }

        // earlier packages waiting for this one
        let waiters: Vec<NodeId> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .missing
                    .iter()
                    .any(|path| path.names(info.module.as_deref(), &info.name))
            })
            .map(|(&id, _)| id)
            .collect();

        self.entries.insert(
            package,
            Entry {
                info,
                state: PackageState::Waiting,
                waiting_on: IndexSet::new(),
                missing,
                dependents: IndexSet::new(),
            },
        );
        self.events.push(GateEvent::Delivered(package));

        for import in matched {
            if import != package {
                self.register_dependent_on_resolve(import, package);
            }
        }
        for waiter in waiters {
            self.unblock(waiter, package);
        }

        if self.entries.get(&package).is_some_and(Entry::is_ready) {
            self.ready.push_back(package);
        }
    }

    /// `waiter` was missing an import that `package` now provides.
    fn unblock(&mut self, waiter: NodeId, package: NodeId) {
        let Some(provided) = self.entries.get(&package).map(|entry| entry.info.clone()) else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(&waiter) {
            entry
                .missing
                .retain(|path| !path.names(provided.module.as_deref(), &provided.name));
        }
        self.register_dependent_on_resolve(package, waiter);
    }

    /// Next package to hand to the resolver.
    ///
    /// Without `force`, only packages whose imports have all finished are
    /// released. With `force`, and nothing else to do, packages stuck in an
    /// import cycle are released first, then packages waiting on imports
    /// that were never delivered.
    pub fn next_release(&mut self, force: bool) -> Option<NodeId> {
        let mut next = None;
        while let Some(candidate) = self.ready.pop_front() {
            if self.entries.get(&candidate).is_some_and(Entry::is_ready) {
                next = Some(candidate);
                break;
            }
        }

        if next.is_none() && force && !self.any_resolving() {
            let waiting = || {
                self.entries
                    .iter()
                    .filter(|(_, entry)| entry.state == PackageState::Waiting)
            };
            next = waiting()
                .find(|(_, entry)| entry.missing.is_empty())
                .or_else(|| waiting().next())
                .map(|(&id, _)| id);
            if let Some(id) = next {
                tracing::warn!(package = ?id, "releasing package with unfinished imports");
            }
        }

        let id = next?;
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.state = PackageState::Resolving;
        }
        self.events.push(GateEvent::Released(id));
        tracing::debug!(package = ?id, "package released");
        Some(id)
    }

    fn any_resolving(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.state == PackageState::Resolving)
    }

    /// Record the outcome of a resolve run and notify dependents.
    pub fn finish(&mut self, package: NodeId, ok: bool) {
        let state = if ok {
            PackageState::Resolved
        } else {
            PackageState::Failed
        };
        let Some(entry) = self.entries.get_mut(&package) else {
            return;
        };
        entry.state = state;
        let dependents = std::mem::take(&mut entry.dependents);

        self.events.push(GateEvent::Finished(package, state));
        tracing::info!(package = %entry_name(&self.entries, package), ?state, "package finished");
        for callback in &mut self.callbacks {
            callback(package, state);
        }

        for dependent in dependents {
            let Some(entry) = self.entries.get_mut(&dependent) else {
                continue;
            };
            entry.waiting_on.shift_remove(&package);
            if entry.is_ready() {
                tracing::debug!(package = %entry.info.name, "all imports finished");
                self.ready.push_back(dependent);
            }
        }
    }
}

fn entry_name(entries: &IndexMap<NodeId, Entry>, id: NodeId) -> String {
    entries
        .get(&id)
        .map(|entry| match &entry.info.module {
            Some(module) => format!("{}.{}", module, entry.info.name),
            None => entry.info.name.clone(),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeId as RawId;

    fn id(n: usize) -> NodeId {
        RawId::new(n)
    }

    fn info(name: &str, imports: &[&str]) -> PackageInfo {
        PackageInfo {
            module: Some("m".to_string()),
            name: name.to_string(),
            imports: imports
                .iter()
                .map(|path| ImportPath(path.split('.').map(str::to_string).collect()))
                .collect(),
        }
    }

    #[test]
    fn import_is_released_before_importer() {
        let mut gate = Gate::new();
        gate.deliver(id(1), info("p", &["q"]));
        assert_eq!(gate.next_release(false), None);

        gate.deliver(id(2), info("q", &[]));
        assert_eq!(gate.next_release(false), Some(id(2)));
        assert_eq!(gate.next_release(false), None);

        gate.finish(id(2), true);
        assert_eq!(gate.next_release(false), Some(id(1)));
    }

    #[test]
    fn failed_imports_still_notify() {
        let mut gate = Gate::new();
        gate.deliver(id(2), info("q", &[]));
        gate.deliver(id(1), info("p", &["m.q"]));
        assert_eq!(gate.next_release(false), Some(id(2)));
        gate.finish(id(2), false);
        assert_eq!(gate.next_release(false), Some(id(1)));
    }

    #[test]
    fn cycles_are_forced_in_delivery_order() {
        let mut gate = Gate::new();
        gate.deliver(id(1), info("a", &["b", "missing"]));
        gate.deliver(id(2), info("b", &["c"]));
        gate.deliver(id(3), info("c", &["b"]));

        assert_eq!(gate.next_release(false), None);
        assert_eq!(gate.next_release(true), Some(id(2)));
        // nothing else is released while a package is resolving
        assert_eq!(gate.next_release(true), None);
        gate.finish(id(2), true);
        assert_eq!(gate.next_release(true), Some(id(3)));
        gate.finish(id(3), true);
        assert_eq!(gate.next_release(true), Some(id(1)));
    }

    #[test]
    fn callbacks_see_every_outcome() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut gate = Gate::new();
        let sink = Rc::clone(&seen);
        gate.on_package_resolved(move |package, state| sink.borrow_mut().push((package, state)));

        gate.deliver(id(1), info("p", &[]));
        let released = gate.next_release(false).unwrap();
        gate.finish(released, true);
        assert_eq!(*seen.borrow(), vec![(id(1), PackageState::Resolved)]);
    }
}
