//! Reading resolved types back out of the tree.
//!
//! These helpers never resolve anything themselves; they return `None` when
//! a type expression still has an unresolved reference in it.

use std::collections::HashSet;

use crate::tree::{NodeId, NodeKind, Tree};
use crate::types::{Hierarchy, PrimKind, Ty};

/// The type expression a declaration was declared with: the first type child
/// of a variable, parameter or field, or the wrapped type of a function's
/// `Returns` clause.
pub fn declared_type_node(tree: &Tree, decl: NodeId) -> Option<NodeId> {
    match tree.kind(decl)? {
        NodeKind::Variable { .. } | NodeKind::Param { .. } | NodeKind::Field { .. } => tree
            .children(decl)
            .iter()
            .copied()
            .find(|&child| tree.kind(child).is_some_and(NodeKind::is_type_expr)),
        NodeKind::Function { .. } => {
            let returns = tree
                .children(decl)
                .iter()
                .copied()
                .find(|&child| matches!(tree.kind(child), Some(NodeKind::Returns)))?;
            tree.children(returns).first().copied()
        }
        _ => None,
    }
}

/// The declaration a resolved reference names. Resolution leaves a single
/// candidate on every reference except a callee awaiting overload selection.
pub fn target(tree: &Tree, reference: NodeId) -> Option<NodeId> {
    tree.kind(reference)?
        .as_reference()?
        .found
        .as_ref()?
        .first()
        .copied()
}

/// The type denoted by a type expression.
pub fn type_of_type_expr(tree: &Tree, node: NodeId) -> Option<Ty> {
    match tree.kind(node)? {
        NodeKind::Primitive(kind) => Some(Ty::Prim(*kind)),
        NodeKind::Array { len, .. } => {
            let elem = tree.children(node).first().copied()?;
            Some(Ty::Array(Box::new(type_of_type_expr(tree, elem)?), *len))
        }
        NodeKind::Pointer => {
            let pointee = tree.children(node).first().copied()?;
            Some(Ty::Pointer(Box::new(type_of_type_expr(tree, pointee)?)))
        }
        NodeKind::Reference(_) => type_of_decl(tree, target(tree, node)?),
        _ => None,
    }
}

/// The type a type declaration stands for.
pub fn type_of_decl(tree: &Tree, decl: NodeId) -> Option<Ty> {
    match tree.kind(decl)? {
        NodeKind::Struct { .. } => Some(Ty::Struct(decl)),
        NodeKind::PrimitiveDecl { kind, .. } => Some(Ty::Prim(*kind)),
        _ => None,
    }
}

/// Declared type of a value declaration; constants are `long`.
pub fn type_of_value(tree: &Tree, decl: NodeId) -> Option<Ty> {
    match tree.kind(decl)? {
        NodeKind::Constant { .. } => Some(Ty::Prim(PrimKind::I64)),
        _ => type_of_type_expr(tree, declared_type_node(tree, decl)?),
    }
}

pub fn return_type(tree: &Tree, function: NodeId) -> Option<Ty> {
    match declared_type_node(tree, function) {
        Some(node) => type_of_type_expr(tree, node),
        None => Some(Ty::Void),
    }
}

/// Type an expression evaluates to.
pub fn type_of_expr(tree: &Tree, expr: NodeId) -> Option<Ty> {
    match tree.kind(expr)? {
        NodeKind::Literal(kind) => Some(Ty::Prim(*kind)),
        NodeKind::Reference(_) => type_of_value(tree, target(tree, expr)?),
        NodeKind::Call { selected } => return_type(tree, (*selected)?),
        NodeKind::Cast => type_of_type_expr(tree, tree.children(expr).first().copied()?),
        _ => None,
    }
}

/// Parameters of a function, in declaration order.
pub fn params(tree: &Tree, function: NodeId) -> Vec<NodeId> {
    tree.children(function)
        .iter()
        .copied()
        .filter(|&child| matches!(tree.kind(child), Some(NodeKind::ParamList)))
        .flat_map(|list| tree.children(list).to_vec())
        .filter(|&param| matches!(tree.kind(param), Some(NodeKind::Param { .. })))
        .collect()
}

pub fn param_types(tree: &Tree, function: NodeId) -> Vec<Option<Ty>> {
    params(tree, function)
        .into_iter()
        .map(|param| type_of_value(tree, param))
        .collect()
}

/// Expressions passed to a call, in order.
pub fn call_args(tree: &Tree, call: NodeId) -> Vec<NodeId> {
    tree.children(call)
        .iter()
        .copied()
        .filter(|&child| matches!(tree.kind(child), Some(NodeKind::ArgList)))
        .flat_map(|list| tree.children(list).to_vec())
        .collect()
}

/// Struct named by a value's declared type, looking through pointers.
pub fn struct_of_value(tree: &Tree, decl: NodeId) -> Option<NodeId> {
    let mut ty = type_of_value(tree, decl)?;
    loop {
        match ty {
            Ty::Struct(id) => return Some(id),
            Ty::Pointer(inner) => ty = *inner,
            _ => return None,
        }
    }
}

/// Direct base structs of a struct, as far as they are resolved.
pub fn bases(tree: &Tree, strukt: NodeId) -> Vec<NodeId> {
    tree.children(strukt)
        .iter()
        .copied()
        .filter(|&child| matches!(tree.kind(child), Some(NodeKind::Base)))
        .filter_map(|base| tree.children(base).first().copied())
        .filter_map(|reference| target(tree, reference))
        .collect()
}

pub fn display_ty(tree: &Tree, ty: &Ty) -> String {
    match ty {
        Ty::Void => "void".to_string(),
        Ty::Prim(kind) => kind.to_string(),
        Ty::Struct(id) => tree
            .kind(*id)
            .and_then(NodeKind::symbol_name)
            .map(|name| tree.name(name).to_string())
            .unwrap_or_else(|| tree.describe(*id)),
        Ty::Array(elem, len) => format!("{}[{}]", display_ty(tree, elem), len),
        Ty::Pointer(inner) => format!("{}*", display_ty(tree, inner)),
    }
}

impl Hierarchy for Tree {
    fn derives_from(&self, derived: NodeId, base: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = bases(self, derived);
        while let Some(next) = stack.pop() {
            if next == base {
                return true;
            }
            if seen.insert(next) {
                stack.extend(bases(self, next));
            }
        }
        false
    }
}
