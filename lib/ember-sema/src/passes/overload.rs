//! Overload selection.
//!
//! A candidate is viable when it takes as many parameters as there are
//! arguments and every argument converts to its parameter without an
//! explicit cast. Viable candidates are scored by how many arguments match
//! their parameter exactly; a unique best score wins.

use crate::config::ResolveConfig;
use crate::error::SemaError;
use crate::passes::typing;
use crate::tree::{NodeId, NodeKind, Tree};
use crate::types::{Compat, Ty};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub function: NodeId,
    pub params: Vec<Ty>,
    /// Number of arguments whose type is identical to the parameter's.
    pub identical: usize,
}

/// Score `function` against `args`, or `None` if it is not viable. Values
/// matched by a callee have no function type and are never viable.
pub fn score(tree: &Tree, function: NodeId, args: &[Ty]) -> Option<Scored> {
    if !matches!(tree.kind(function), Some(NodeKind::Function { .. })) {
        return None;
    }
    let params = typing::param_types(tree, function)
        .into_iter()
        .collect::<Option<Vec<Ty>>>()?;
    if params.len() != args.len() {
        return None;
    }

    let mut identical = 0;
    for (arg, param) in args.iter().zip(&params) {
        match arg.compatibility(param, tree) {
            Compat::Identical => identical += 1,
            Compat::Upcast => {}
            Compat::Downcast | Compat::Incompatible => return None,
        }
    }
    Some(Scored {
        function,
        params,
        identical,
    })
}

/// Pick the best candidate for a call with the given argument types.
pub fn select(
    tree: &Tree,
    config: &ResolveConfig,
    call: NodeId,
    name: &str,
    candidates: &[NodeId],
    args: &[Ty],
) -> Result<NodeId, SemaError> {
    let viable: Vec<Scored> = candidates
        .iter()
        .filter_map(|&candidate| score(tree, candidate, args))
        .collect();

    let Some(best_score) = viable.iter().map(|s| s.identical).max() else {
        let args = args
            .iter()
            .map(|ty| typing::display_ty(tree, ty))
            .collect::<Vec<_>>()
            .join(",");
        return Err(SemaError::UnresolvedReference {
            name: format!("{}({})", name, args),
            loc: tree.loc(call),
        });
    };

    let best: Vec<&Scored> = viable.iter().filter(|s| s.identical == best_score).collect();
    if let [only] = best.as_slice() {
        return Ok(only.function);
    }

    if config.first_import_wins && is_same_function_imported_twice(tree, &best) {
        tracing::debug!(name, "tie between identical imported overloads, first import wins");
        return Ok(best[0].function);
    }

    Err(SemaError::AmbiguousReference {
        name: name.to_string(),
        loc: tree.loc(call),
        candidates: best.iter().map(|s| tree.loc(s.function)).collect(),
    })
}

/// Whether the tied candidates share their parameter types exactly and each
/// comes from a different package.
fn is_same_function_imported_twice(tree: &Tree, tied: &[&Scored]) -> bool {
    let Some(first) = tied.first() else {
        return false;
    };
    if tied.iter().any(|s| s.params != first.params) {
        return false;
    }
    let mut packages = Vec::new();
    for scored in tied {
        match tree.enclosing_package(scored.function) {
            Some(package) if !packages.contains(&package) => packages.push(package),
            _ => return false,
        }
    }
    true
}
