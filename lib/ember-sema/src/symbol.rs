//! Symbol visibility and structural identifiers.

use crate::passes::typing;
use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// Visible from anywhere inside the declaring module.
    ModulePrivate,
    /// Visible from anywhere inside the declaring package.
    PackagePrivate,
}

/// Whether `symbol` may be seen by a reference located at `from`.
pub fn is_visible(tree: &Tree, symbol: NodeId, from: NodeId) -> bool {
    let Some(kind) = tree.kind(symbol) else {
        return false;
    };
    match kind.visibility() {
        Visibility::Public => true,
        Visibility::ModulePrivate => same_enclosing(tree, symbol, from, Tree::enclosing_module),
        Visibility::PackagePrivate => same_enclosing(tree, symbol, from, Tree::enclosing_package),
    }
}

fn same_enclosing(
    tree: &Tree,
    symbol: NodeId,
    from: NodeId,
    enclosing: fn(&Tree, NodeId) -> Option<NodeId>,
) -> bool {
    // a package's own privacy is judged from where it is declared
    let anchor = match tree.kind(symbol) {
        Some(NodeKind::Package { .. }) | Some(NodeKind::Module { .. }) => tree.parent(symbol),
        _ => Some(symbol),
    };
    match anchor.map(|anchor| enclosing(tree, anchor)) {
        Some(Some(scope)) => enclosing(tree, from) == Some(scope),
        // declared outside any package or module
        _ => true,
    }
}

/// The globally unique identifier of a node, derived from its nesting path:
/// `/module/package/Type.field`, functions carry their parameter types and
/// blocks their position, e.g. `/m/p/f(int,float){0}`.
pub fn identifier(tree: &Tree, id: NodeId) -> String {
    let mut path: Vec<NodeId> = std::iter::once(id).chain(tree.ancestors(id)).collect();
    path.reverse();

    let mut out = String::new();
    let mut inside_type = false;
    for node in path {
        let Some(kind) = tree.kind(node) else {
            continue;
        };
        match kind {
            NodeKind::Root => {}
            NodeKind::Module { name } | NodeKind::Package { name, .. } => {
                out.push('/');
                out.push_str(tree.name(*name));
            }
            NodeKind::Block => {
                let index = tree
                    .parent(node)
                    .map(|parent| {
                        tree.children(parent)
                            .iter()
                            .filter(|&&c| matches!(tree.kind(c), Some(NodeKind::Block)))
                            .position(|&c| c == node)
                            .unwrap_or(0)
                    })
                    .unwrap_or(0);
                out.push_str(&format!("{{{}}}", index));
            }
            NodeKind::Function { name, .. } => {
                out.push(if inside_type { '.' } else { '/' });
                out.push_str(tree.name(*name));
                out.push_str(&signature(tree, node));
            }
            kind => {
                if let Some(name) = kind.symbol_name() {
                    out.push(if inside_type { '.' } else { '/' });
                    out.push_str(tree.name(name));
                }
            }
        }
        inside_type = matches!(kind, NodeKind::Struct { .. });
    }

    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Parameter list of a function as it appears in identifiers and messages.
pub fn signature(tree: &Tree, function: NodeId) -> String {
    let params = typing::param_types(tree, function)
        .into_iter()
        .map(|ty| match ty {
            Some(ty) => typing::display_ty(tree, &ty),
            None => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("({})", params)
}
