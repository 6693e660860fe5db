//! Resolution of (possibly dotted) references.
//!
//! A chain `a.b.c` is a reference `a` whose only reference child is `b`,
//! whose only reference child is `c`. The head is looked up from its own
//! position; every following segment is looked up inside the scope of each
//! candidate of its predecessor. The head finally exposes the candidates of
//! the last segment.

use crate::error::SemaError;
use crate::passes::frame::Frame;
use crate::passes::query;
use crate::passes::typing;
use crate::passes::Step;
use crate::tree::{NodeId, NodeKind, Phases, RefData, Tree};
use crate::types::Ty;

/// Where a chained segment should search, given its predecessor's candidate.
enum ScopeOf {
    Scope(NodeId),
    /// The candidate has a scope, but it is not known yet.
    Pending,
    /// The candidate has no inside to search.
    Opaque,
}

fn scope_of(tree: &Tree, candidate: NodeId) -> ScopeOf {
    match tree.kind(candidate) {
        Some(NodeKind::Module { .. } | NodeKind::Package { .. } | NodeKind::Struct { .. }) => {
            ScopeOf::Scope(candidate)
        }
        Some(NodeKind::Import { alias: Some(_) }) => {
            match tree.children(candidate).first().and_then(|&r| typing::target(tree, r)) {
                Some(package) => ScopeOf::Scope(package),
                None => ScopeOf::Pending,
            }
        }
        Some(NodeKind::Variable { .. } | NodeKind::Param { .. } | NodeKind::Field { .. }) => {
            let Some(ty) = typing::declared_type_node(tree, candidate) else {
                return ScopeOf::Opaque;
            };
            let mut ty = match typing::type_of_type_expr(tree, ty) {
                Some(ty) => ty,
                None => return ScopeOf::Pending,
            };
            loop {
                match ty {
                    Ty::Struct(id) => return ScopeOf::Scope(id),
                    Ty::Pointer(inner) => ty = *inner,
                    _ => return ScopeOf::Opaque,
                }
            }
        }
        _ => ScopeOf::Opaque,
    }
}

/// The segments following `head`, in order.
pub fn segments(tree: &Tree, head: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = head;
    while let Some(next) = tree
        .children(current)
        .iter()
        .copied()
        .find(|&child| matches!(tree.kind(child), Some(NodeKind::Reference(_))))
    {
        out.push(next);
        current = next;
    }
    out
}

/// Dotted text of the chain starting at `head`, up to and including `last`.
pub fn chain_text(tree: &Tree, head: NodeId, last: Option<NodeId>) -> String {
    let mut parts = Vec::new();
    for segment in std::iter::once(head).chain(segments(tree, head)) {
        if let Some(data) = tree.kind(segment).and_then(NodeKind::as_reference) {
            parts.push(tree.name(data.name).to_string());
        }
        if Some(segment) == last {
            break;
        }
    }
    parts.join(".")
}

fn is_callee(tree: &Tree, head: NodeId) -> bool {
    tree.parent(head)
        .is_some_and(|parent| matches!(tree.kind(parent), Some(NodeKind::Call { .. })))
}

fn ref_data(tree: &Tree, node: NodeId) -> Result<RefData, SemaError> {
    tree.kind(node)
        .and_then(NodeKind::as_reference)
        .cloned()
        .ok_or_else(|| SemaError::structural("expected a reference", tree.loc(node)))
}

fn store(tree: &mut Tree, node: NodeId, found: Vec<NodeId>) -> Result<(), SemaError> {
    match tree.node_mut(node)?.kind.as_reference_mut() {
        Some(data) => {
            data.found = Some(found);
            Ok(())
        }
        None => Err(SemaError::structural("expected a reference", tree.loc(node))),
    }
}

/// Resolve the chain whose head is `head`. `frame` already contains `head`.
pub fn resolve_chain(tree: &mut Tree, frame: &Frame<'_>, head: NodeId) -> Result<Step, SemaError> {
    let data = ref_data(tree, head)?;
    let chain = segments(tree, head);

    if data.is_resolved() {
        for &segment in &chain {
            tree.clear_phase(segment, Phases::RESOLVE)?;
        }
        return Ok(Step::Done);
    }

    let (mut candidates, outcome) =
        query::lookup(tree, Some(frame), head, data.name, data.kinds, data.flags, head);
    // overloads behind a pending link would be missing from the set
    let needs_links = candidates.is_empty() || (chain.is_empty() && data.kinds.merges_scope_links());
    if needs_links && !outcome.is_complete() {
        tracing::trace!(reference = %chain_text(tree, head, None), "deferred, scope link pending");
        return Ok(Step::Deferred);
    }
    if candidates.is_empty() {
        return Err(SemaError::UnresolvedReference {
            name: chain_text(tree, head, Some(head)),
            loc: tree.loc(head),
        });
    }

    for &segment in &chain {
        let segment_data = ref_data(tree, segment)?;
        if segment_data.is_resolved() {
            candidates = segment_data.found.unwrap_or_default();
            continue;
        }

        let mut found: Vec<NodeId> = Vec::new();
        let mut complete = true;
        for &candidate in &candidates {
            let scope = match scope_of(tree, candidate) {
                ScopeOf::Scope(scope) => scope,
                ScopeOf::Pending => {
                    complete = false;
                    continue;
                }
                ScopeOf::Opaque => continue,
            };
            let (matches, outcome) = query::lookup(
                tree,
                Some(frame),
                scope,
                segment_data.name,
                segment_data.kinds,
                segment_data.flags,
                head,
            );
            complete &= outcome.is_complete();
            for m in matches {
                if !found.contains(&m) {
                    found.push(m);
                }
            }
        }

        if found.is_empty() {
            return if complete {
                Err(SemaError::UnresolvedReference {
                    name: chain_text(tree, head, Some(segment)),
                    loc: tree.loc(segment),
                })
            } else {
                Ok(Step::Deferred)
            };
        }

        store(tree, segment, found.clone())?;
        tree.clear_phase(segment, Phases::RESOLVE)?;
        candidates = found;
    }

    // only a call narrows its candidates further, by overload selection
    if candidates.len() > 1 && !is_callee(tree, head) {
        return Err(SemaError::AmbiguousReference {
            name: chain_text(tree, head, None),
            loc: tree.loc(head),
            candidates: candidates.iter().map(|&candidate| tree.loc(candidate)).collect(),
        });
    }

    tracing::trace!(
        reference = %chain_text(tree, head, None),
        candidates = candidates.len(),
        "reference resolved"
    );
    store(tree, head, candidates)?;
    Ok(Step::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Loc;
    use crate::error::ErrorKind;
    use crate::symbol::Visibility;
    use crate::tree::{QueryFlags, QueryKinds};

    fn reference(tree: &mut Tree, name: &str, kinds: QueryKinds, flags: QueryFlags) -> NodeId {
        let name = tree.intern(name);
        tree.alloc(NodeKind::Reference(RefData::new(name, kinds, flags)), Loc::generated())
    }

    /// package p { struct Point { x: int } } plus a dangling `Point.<member>` chain.
    fn setup(member: &str) -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.intern("p");
        let package = tree.alloc(
            NodeKind::Package {
                name: p,
                visibility: Visibility::Public,
            },
            Loc::generated(),
        );
        let point = tree.intern("Point");
        let strukt = tree.alloc(
            NodeKind::Struct {
                name: point,
                visibility: Visibility::Public,
                size: None,
            },
            Loc::generated(),
        );
        let x = tree.intern("x");
        let field = tree.alloc(
            NodeKind::Field {
                name: x,
                visibility: Visibility::Public,
            },
            Loc::generated(),
        );
        let block = tree.alloc(NodeKind::Block, Loc::generated());
        let head = reference(&mut tree, "Point", QueryKinds::SCOPES, QueryFlags::LEXICAL);
        let tail = reference(&mut tree, member, QueryKinds::VALUES, QueryFlags::MEMBERS);

        tree.attach(root, package).unwrap();
        tree.attach(package, strukt).unwrap();
        tree.attach(strukt, field).unwrap();
        tree.attach(package, block).unwrap();
        tree.attach(block, head).unwrap();
        tree.attach(head, tail).unwrap();
        (tree, head, field)
    }

    #[test]
    fn chain_root_exposes_leaf_results() {
        let (mut tree, head, field) = setup("x");
        let root = Frame::root(tree.root());
        let frame = root.push(head);
        let step = resolve_chain(&mut tree, &frame, head).unwrap();

        assert_eq!(step, Step::Done);
        assert_eq!(typing::target(&tree, head), Some(field));
        let tail = segments(&tree, head)[0];
        assert!(!tree.pending(tail).contains(Phases::RESOLVE));
    }

    #[test]
    fn missing_member_names_the_chain() {
        let (mut tree, head, _) = setup("y");
        let root = Frame::root(tree.root());
        let frame = root.push(head);
        let err = resolve_chain(&mut tree, &frame, head).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
        assert!(
            matches!(&err, SemaError::UnresolvedReference { name, .. } if name == "Point.y"),
            "unexpected error {:?}",
            err
        );
    }

    #[test]
    fn resolved_reference_is_not_queried_again() {
        let (mut tree, head, field) = setup("x");
        let root = Frame::root(tree.root());
        let frame = root.push(head);
        resolve_chain(&mut tree, &frame, head).unwrap();

        // even with the declaration gone, the stored result stands
        tree.destroy(field).unwrap();
        assert_eq!(resolve_chain(&mut tree, &frame, head).unwrap(), Step::Done);
    }
}
