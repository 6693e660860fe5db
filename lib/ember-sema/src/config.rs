//! Resolution configuration

/// Knobs of a resolve run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Size of a pointer in bytes (default: 8)
    pub pointer_size: u64,
    /// When overload candidates tie with identical parameter types and come
    /// from different imported packages, pick the first imported one instead
    /// of reporting an ambiguity (default: true)
    pub first_import_wins: bool,
    /// Sweeps allowed per phase before the run is declared stuck (default: 64)
    pub max_sweeps: usize,
    /// Report every leftover unresolved reference when the fixed point
    /// stalls, not only the first (default: true)
    pub collect_unresolved: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            pointer_size: 8,
            first_import_wins: true,
            max_sweeps: 64,
            collect_unresolved: true,
        }
    }
}

impl ResolveConfig {
    pub fn with_pointer_size(mut self, bytes: u64) -> Self {
        self.pointer_size = bytes;
        self
    }

    pub fn with_first_import_wins(mut self, enabled: bool) -> Self {
        self.first_import_wins = enabled;
        self
    }

    pub fn with_max_sweeps(mut self, sweeps: usize) -> Self {
        self.max_sweeps = sweeps.max(1);
        self
    }

    pub fn with_collect_unresolved(mut self, enabled: bool) -> Self {
        self.collect_unresolved = enabled;
        self
    }
}
