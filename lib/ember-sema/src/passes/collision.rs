//! Duplicate symbol detection.
//!
//! The superficial test runs as soon as a symbol is attached: it only
//! compares names and kinds, and flags the earlier declaration for a deep
//! test instead of failing. The deep test runs once every reference is
//! resolved and compares declarations exactly (parameter types for
//! functions).

use crate::error::SemaError;
use crate::passes::query::{Query, Visitor};
use crate::passes::typing;
use crate::tree::{NodeId, Phases, QueryFlags, QueryKinds, Tree};

/// Collects the other symbols of a scope sharing a name and a kind.
struct PeerCollector {
    symbol: NodeId,
    name: crate::context::Symbol,
    kind: QueryKinds,
    peers: Vec<NodeId>,
}

impl Visitor for PeerCollector {
    fn visit(&mut self, tree: &Tree, node: NodeId) {
        if node == self.symbol {
            return;
        }
        let Some(kind) = tree.kind(node) else {
            return;
        };
        if kind.symbol_name() == Some(self.name) && query_kind(tree, node) == self.kind {
            self.peers.push(node);
        }
    }
}

fn query_kind(tree: &Tree, node: NodeId) -> QueryKinds {
    let parent = tree.parent(node).and_then(|parent| tree.kind(parent));
    tree.kind(node)
        .map(|kind| kind.query_kind(parent))
        .unwrap_or_default()
}

/// Symbols declared in the same scope as `symbol` with its name and kind.
fn peers(tree: &Tree, symbol: NodeId) -> Vec<NodeId> {
    let (Some(scope), Some(name)) = (
        tree.declaring_scope(symbol),
        tree.kind(symbol).and_then(|kind| kind.symbol_name()),
    ) else {
        return Vec::new();
    };

    let mut collector = PeerCollector {
        symbol,
        name,
        kind: query_kind(tree, symbol),
        peers: Vec::new(),
    };
    Query::new(tree).run(
        scope,
        QueryFlags::DOWNWARDS | QueryFlags::FIRST_LEVEL_CHILDREN,
        &mut collector,
    );
    collector.peers
}

pub fn superficial_test(tree: &mut Tree, symbol: NodeId) -> Result<(), SemaError> {
    for other in peers(tree, symbol) {
        tracing::debug!(
            symbol = %tree.describe(symbol),
            other = ?other,
            "possible duplicate, scheduling deep collision test"
        );
        tree.add_phase(other, Phases::DEEP_COLLISION)?;
    }
    Ok(())
}

/// Compare `symbol` against every same-named peer and fail on a true duplicate.
pub fn deep_test(tree: &Tree, symbol: NodeId) -> Result<(), SemaError> {
    let Some(name) = tree.kind(symbol).and_then(|kind| kind.symbol_name()) else {
        return Ok(());
    };
    let signature = is_function(tree, symbol).then(|| typing::param_types(tree, symbol));

    for other in peers(tree, symbol) {
        let duplicate = match &signature {
            Some(params) => *params == typing::param_types(tree, other),
            None => true,
        };
        if !duplicate {
            continue;
        }

        let (earlier, later) = if declared_before(tree, other, symbol) {
            (other, symbol)
        } else {
            (symbol, other)
        };
        return Err(SemaError::DuplicateSymbol {
            name: tree.name(name).to_string(),
            loc: tree.loc(later),
            previous: tree.loc(earlier),
        });
    }
    Ok(())
}

fn is_function(tree: &Tree, node: NodeId) -> bool {
    matches!(tree.kind(node), Some(crate::tree::NodeKind::Function { .. }))
}

fn declared_before(tree: &Tree, a: NodeId, b: NodeId) -> bool {
    let Some(scope) = tree.declaring_scope(a) else {
        return false;
    };
    let members = tree.scope_members(scope);
    let position = |id| members.iter().position(|&m| m == id);
    position(a) < position(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Loc;
    use crate::error::ErrorKind;
    use crate::symbol::Visibility;
    use crate::tree::NodeKind;

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

    fn package(tree: &mut Tree) -> NodeId {
        let name = tree.intern("p");
        let package = tree.alloc(
            NodeKind::Package {
                name,
                visibility: Visibility::Public,
            },
            Loc::generated(),
        );
        let root = tree.root();
        tree.attach(root, package).unwrap();
        package
    }

    #[test]
    fn superficial_hit_flags_the_earlier_symbol() {
        let mut tree = Tree::new();
        let package = package(&mut tree);
        let first = strukt(&mut tree, "A");
        let second = strukt(&mut tree, "A");
        tree.attach(package, first).unwrap();
        tree.attach(package, second).unwrap();

        assert!(tree.pending(first).contains(Phases::DEEP_COLLISION));
        assert!(!tree.pending(second).contains(Phases::DEEP_COLLISION));
    }

    #[test]
    fn deep_test_reports_both_locations() {
        let mut tree = Tree::new();
        let package = package(&mut tree);
        let first = strukt(&mut tree, "A");
        let second = strukt(&mut tree, "A");
        tree.node_mut(second).unwrap().loc = Loc::new(0, 10..11);
        tree.attach(package, first).unwrap();
        tree.attach(package, second).unwrap();

        let err = deep_test(&tree, first).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateSymbol);
        assert!(
            matches!(&err, SemaError::DuplicateSymbol { loc, previous, .. } if loc.span == (10..11) && previous.span == (0..0)),
            "unexpected error {:?}",
            err
        );
    }

    #[test]
    fn different_names_do_not_collide() {
        let mut tree = Tree::new();
        let package = package(&mut tree);
        let a = strukt(&mut tree, "A");
        let b = strukt(&mut tree, "B");
        tree.attach(package, a).unwrap();
        tree.attach(package, b).unwrap();

        assert!(!tree.pending(a).contains(Phases::DEEP_COLLISION));
        assert!(deep_test(&tree, a).is_ok());
    }
}
