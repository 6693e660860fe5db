//! Byte sizes of types.
//!
//! Sizes are computed on demand and cached on the struct and array nodes.
//! Struct layout has no padding: a struct is its sized base followed by its
//! fields. Computing a struct's size pushes it on the recursion frame, so a
//! struct containing itself by value fails with the cycle path.

use crate::config::ResolveConfig;
use crate::error::SemaError;
use crate::passes::frame::Frame;
use crate::passes::typing;
use crate::passes::ResolveStats;
use crate::tree::{NodeId, NodeKind, Tree};

pub struct Sizer<'s> {
    pub config: &'s ResolveConfig,
    pub stats: &'s mut ResolveStats,
}

impl Sizer<'_> {
    /// Size of a struct, raising it on `frame` if it still has to be computed.
    pub fn struct_size(&mut self, tree: &mut Tree, frame: &Frame<'_>, id: NodeId) -> Result<u64, SemaError> {
        if let Some(size) = cached_struct_size(tree, id) {
            return Ok(size);
        }
        frame.raise(tree, id)?;
        let frame = frame.push(id);
        self.compute_struct(tree, &frame, id)
    }

    /// Size of a struct whose frame is already on `frame`.
    pub fn compute_struct(&mut self, tree: &mut Tree, frame: &Frame<'_>, id: NodeId) -> Result<u64, SemaError> {
        if let Some(size) = cached_struct_size(tree, id) {
            return Ok(size);
        }
        let name = struct_name(tree, id);

        let mut total: u64 = 0;
        let mut sized_bases = Vec::new();
        for base in children_of(tree, id, |kind| matches!(kind, NodeKind::Base)) {
            let reference = tree
                .children(base)
                .first()
                .copied()
                .ok_or_else(|| SemaError::structural("base without a type", tree.loc(base)))?;
            let target = typing::target(tree, reference).ok_or_else(|| SemaError::UnresolvedReference {
                name: tree.describe(reference),
                loc: tree.loc(reference),
            })?;

            if !matches!(tree.kind(target), Some(NodeKind::Struct { .. })) {
                return Err(SemaError::InheritedShape {
                    name,
                    reason: format!("{} is not a struct", tree.describe(target)),
                    loc: tree.loc(base),
                });
            }
            let size = self.struct_size(tree, &frame.push(base), target)?;
            if size > 0 {
                sized_bases.push(target);
            }
            total = total.checked_add(size).ok_or_else(|| overflow(tree, id))?;
        }

        if sized_bases.len() > 1 {
            let names: Vec<String> = sized_bases.iter().map(|&b| struct_name(tree, b)).collect();
            return Err(SemaError::InheritedShape {
                name,
                reason: format!("more than one sized base ({})", names.join(", ")),
                loc: tree.loc(id),
            });
        }

        for field in children_of(tree, id, |kind| matches!(kind, NodeKind::Field { .. })) {
            let ty = typing::declared_type_node(tree, field)
                .ok_or_else(|| SemaError::structural("field without a type", tree.loc(field)))?;
            let size = self.type_expr_size(tree, &frame.push(field), ty)?;
            total = total.checked_add(size).ok_or_else(|| overflow(tree, id))?;
        }

        if let NodeKind::Struct { size, .. } = &mut tree.node_mut(id)?.kind {
            *size = Some(total);
        }
        self.stats.sizes_computed += 1;
        tracing::trace!(name = %struct_name(tree, id), size = total, "struct size computed");
        Ok(total)
    }

    pub fn type_expr_size(&mut self, tree: &mut Tree, frame: &Frame<'_>, node: NodeId) -> Result<u64, SemaError> {
        let kind = tree
            .kind(node)
            .cloned()
            .ok_or_else(|| SemaError::structural("dangling type expression", tree.loc(node)))?;
        match kind {
            NodeKind::Primitive(prim) => Ok(prim.size()),
            NodeKind::Pointer => Ok(self.config.pointer_size),
            NodeKind::Array { size: Some(size), .. } => Ok(size),
            NodeKind::Array { len, size: None } => {
                let elem = tree
                    .children(node)
                    .first()
                    .copied()
                    .ok_or_else(|| SemaError::structural("array without an element type", tree.loc(node)))?;
                let elem_size = self.type_expr_size(tree, frame, elem)?;
                let total = len.checked_mul(elem_size).ok_or_else(|| overflow(tree, node))?;
                if let NodeKind::Array { size, .. } = &mut tree.node_mut(node)?.kind {
                    *size = Some(total);
                }
                Ok(total)
            }
            NodeKind::Reference(_) => {
                let target = typing::target(tree, node).ok_or_else(|| SemaError::UnresolvedReference {
                    name: tree.describe(node),
                    loc: tree.loc(node),
                })?;
                match tree.kind(target) {
                    Some(NodeKind::PrimitiveDecl { kind, .. }) => Ok(kind.size()),
                    Some(NodeKind::Struct { .. }) => self.struct_size(tree, frame, target),
                    _ => Err(SemaError::structural(
                        format!("{} is not a type", tree.describe(target)),
                        tree.loc(node),
                    )),
                }
            }
            other => Err(SemaError::structural(
                format!("{} is not a type expression", other.describe(&tree.interner)),
                tree.loc(node),
            )),
        }
    }
}

pub fn cached_struct_size(tree: &Tree, id: NodeId) -> Option<u64> {
    match tree.kind(id)? {
        NodeKind::Struct { size, .. } => *size,
        _ => None,
    }
}

/// A size past `u64::MAX`, reported against the struct that holds `node`.
fn overflow(tree: &Tree, node: NodeId) -> SemaError {
    let holder = tree
        .enclosing(node, |kind| matches!(kind, NodeKind::Struct { .. }))
        .unwrap_or(node);
    SemaError::InheritedShape {
        name: struct_name(tree, holder),
        reason: format!("size of {} overflows 64 bits", tree.describe(node)),
        loc: tree.loc(node),
    }
}

fn struct_name(tree: &Tree, id: NodeId) -> String {
    tree.kind(id)
        .and_then(NodeKind::symbol_name)
        .map(|name| tree.name(name).to_string())
        .unwrap_or_else(|| tree.describe(id))
}

fn children_of(tree: &Tree, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
    tree.children(id)
        .iter()
        .copied()
        .filter(|&child| tree.kind(child).is_some_and(&pred))
        .collect()
}
