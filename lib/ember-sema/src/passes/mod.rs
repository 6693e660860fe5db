pub mod collision;
pub mod frame;
pub mod overload;
pub mod query;
pub mod reference;
pub mod size;
pub mod typing;
pub mod worklist;

pub use frame::Frame;
pub use query::{Query, QueryOutcome, SymbolCollector, Visitor};
pub use worklist::Resolver;

/// Result of running one phase step on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The phase is finished for this node.
    Done,
    /// The node is waiting on something another node has to finish first.
    Deferred,
    /// The phase was not pending for this node.
    Skipped,
}

/// Counters of a session's resolve runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolve_sweeps: usize,
    pub size_sweeps: usize,
    pub collision_sweeps: usize,
    pub references_resolved: usize,
    pub calls_selected: usize,
    pub sizes_computed: usize,
    pub deep_tests: usize,
}
