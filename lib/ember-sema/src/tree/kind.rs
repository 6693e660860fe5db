//! Node kinds and their per-kind defaults.

use crate::context::{Interner, Symbol};
use crate::symbol::Visibility;
use crate::tree::flags::{Access, Phases, QueryFlags, QueryKinds};
use crate::tree::NodeId;
use crate::types::PrimKind;

/// What a reference segment looks for, and what it found of one reference segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefData {
    pub name: Symbol,
    pub kinds: QueryKinds,
    pub flags: QueryFlags,
    /// Candidates of this segment. Once non-empty, never queried again.
    pub found: Option<Vec<NodeId>>,
}

impl RefData {
    pub fn new(name: Symbol, kinds: QueryKinds, flags: QueryFlags) -> Self {
        Self {
            name,
            kinds,
            flags,
            found: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.found.as_ref().is_some_and(|found| !found.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The compilation root; holds builtin primitives and modules.
    Root,
    Module {
        name: Symbol,
    },
    Package {
        name: Symbol,
        visibility: Visibility,
    },
    /// `import a.b` (a scope link) or `import a.b as c` (a symbol named `c`).
    /// The imported path is the single reference child.
    Import {
        alias: Option<Symbol>,
    },
    Struct {
        name: Symbol,
        visibility: Visibility,
        size: Option<u64>,
    },
    /// Inheritance clause; its single child references the base type.
    Base,
    Field {
        name: Symbol,
        visibility: Visibility,
    },
    /// Children: `ParamList`, optional `Returns`, optional `Block`.
    Function {
        name: Symbol,
        visibility: Visibility,
    },
    ParamList,
    Param {
        name: Symbol,
    },
    /// Wraps the return type expression of a function.
    Returns,
    Block,
    /// Children: declared type, optional initializer expression.
    Variable {
        name: Symbol,
    },
    Constant {
        name: Symbol,
        visibility: Visibility,
        value: i64,
    },
    /// A builtin primitive type declaration seeded under the root.
    PrimitiveDecl {
        name: Symbol,
        kind: PrimKind,
    },
    /// An inline primitive type expression.
    Primitive(PrimKind),
    /// Fixed-size array type expression; the child is the element type.
    Array {
        len: u64,
        size: Option<u64>,
    },
    /// Pointer type expression; the child is the pointee type.
    Pointer,
    Reference(RefData),
    /// Children: callee reference, `ArgList`.
    Call {
        selected: Option<NodeId>,
    },
    ArgList,
    Literal(PrimKind),
    /// Children: target type expression, operand expression.
    Cast,
}

impl NodeKind {
    /// Phases every freshly built node of this kind owes.
    pub fn initial_phases(&self) -> Phases {
        match self {
            NodeKind::Struct { .. } | NodeKind::Array { .. } => Phases::RESOLVE | Phases::SIZE,
            NodeKind::Reference(data) if data.is_resolved() => Phases::empty(),
            // containers; their packages are resolved one by one
            NodeKind::Root | NodeKind::Module { .. } => Phases::empty(),
            NodeKind::PrimitiveDecl { .. } => Phases::empty(),
            _ => Phases::RESOLVE,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            NodeKind::Block => Access::ORDERED,
            NodeKind::Function { .. } => Access::STOP_SIBLINGS,
            NodeKind::ParamList | NodeKind::ArgList | NodeKind::Base => Access::PASSTHROUGH,
            NodeKind::Import { alias: None } => Access::PASSTHROUGH,
            _ => Access::empty(),
        }
    }

    /// Name of the symbol this node declares, if it declares one.
    pub fn symbol_name(&self) -> Option<Symbol> {
        match self {
            NodeKind::Module { name }
            | NodeKind::Package { name, .. }
            | NodeKind::Struct { name, .. }
            | NodeKind::Field { name, .. }
            | NodeKind::Function { name, .. }
            | NodeKind::Param { name }
            | NodeKind::Variable { name }
            | NodeKind::Constant { name, .. }
            | NodeKind::PrimitiveDecl { name, .. } => Some(*name),
            NodeKind::Import { alias } => *alias,
            _ => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        self.symbol_name().is_some()
    }

    /// The query kind this symbol answers to. Functions directly inside a
    /// struct answer as methods.
    pub fn query_kind(&self, parent: Option<&NodeKind>) -> QueryKinds {
        match self {
            NodeKind::Module { .. } => QueryKinds::MODULE,
            NodeKind::Package { .. } => QueryKinds::PACKAGE,
            NodeKind::Import { alias: Some(_) } => QueryKinds::PACKAGE,
            NodeKind::Struct { .. } => QueryKinds::TYPE,
            NodeKind::PrimitiveDecl { .. } => QueryKinds::PRIMITIVE,
            NodeKind::Field { .. } => QueryKinds::FIELD,
            NodeKind::Function { .. } if matches!(parent, Some(NodeKind::Struct { .. })) => {
                QueryKinds::METHOD
            }
            NodeKind::Function { .. } => QueryKinds::FUNCTION,
            NodeKind::Param { .. } => QueryKinds::PARAM,
            NodeKind::Variable { .. } => QueryKinds::VARIABLE,
            NodeKind::Constant { .. } => QueryKinds::CONSTANT,
            _ => QueryKinds::empty(),
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            NodeKind::Package { visibility, .. }
            | NodeKind::Struct { visibility, .. }
            | NodeKind::Field { visibility, .. }
            | NodeKind::Function { visibility, .. }
            | NodeKind::Constant { visibility, .. } => *visibility,
            NodeKind::Import { .. }
            | NodeKind::Param { .. }
            | NodeKind::Variable { .. } => Visibility::PackagePrivate,
            _ => Visibility::Public,
        }
    }

    /// Namespaces are entered by deep downward searches.
    pub fn is_namespace(&self) -> bool {
        matches!(
            self,
            NodeKind::Root | NodeKind::Module { .. } | NodeKind::Package { .. }
        )
    }

    /// Declarations whose inside can be searched by a chained reference.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            NodeKind::Module { .. } | NodeKind::Package { .. } | NodeKind::Struct { .. }
        )
    }

    pub fn is_type_decl(&self) -> bool {
        matches!(self, NodeKind::Struct { .. } | NodeKind::PrimitiveDecl { .. })
    }

    pub fn is_type_expr(&self) -> bool {
        match self {
            NodeKind::Primitive(_) | NodeKind::Array { .. } | NodeKind::Pointer => true,
            NodeKind::Reference(data) => data.kinds.is_scope_link(),
            _ => false,
        }
    }

    pub fn is_expr(&self) -> bool {
        match self {
            NodeKind::Call { .. } | NodeKind::Literal(_) | NodeKind::Cast => true,
            NodeKind::Reference(data) => !data.kinds.is_scope_link(),
            _ => false,
        }
    }

    pub fn as_reference(&self) -> Option<&RefData> {
        match self {
            NodeKind::Reference(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_reference_mut(&mut self) -> Option<&mut RefData> {
        match self {
            NodeKind::Reference(data) => Some(data),
            _ => None,
        }
    }

    /// Short label used by debug dumps and trace logs.
    pub fn describe(&self, interner: &Interner) -> String {
        let name = |sym: &Symbol| interner.resolve(*sym).to_string();
        match self {
            NodeKind::Root => "root".to_string(),
            NodeKind::Module { name: n } => format!("module {}", name(n)),
            NodeKind::Package { name: n, .. } => format!("package {}", name(n)),
            NodeKind::Import { alias: Some(a) } => format!("import as {}", name(a)),
            NodeKind::Import { alias: None } => "import".to_string(),
            NodeKind::Struct { name: n, size, .. } => match size {
                Some(size) => format!("struct {} (size {})", name(n), size),
                None => format!("struct {}", name(n)),
            },
            NodeKind::Base => "base".to_string(),
            NodeKind::Field { name: n, .. } => format!("field {}", name(n)),
            NodeKind::Function { name: n, .. } => format!("fn {}", name(n)),
            NodeKind::ParamList => "params".to_string(),
            NodeKind::Param { name: n } => format!("param {}", name(n)),
            NodeKind::Returns => "returns".to_string(),
            NodeKind::Block => "block".to_string(),
            NodeKind::Variable { name: n } => format!("var {}", name(n)),
            NodeKind::Constant { name: n, value, .. } => format!("const {} = {}", name(n), value),
            NodeKind::PrimitiveDecl { name: n, .. } => format!("primitive {}", name(n)),
            NodeKind::Primitive(kind) => kind.to_string(),
            NodeKind::Array { len, .. } => format!("array[{}]", len),
            NodeKind::Pointer => "pointer".to_string(),
            NodeKind::Reference(data) => {
                let state = match &data.found {
                    Some(found) if !found.is_empty() => format!(" -> {:?}", found),
                    _ => String::new(),
                };
                format!("ref {}{}", name(&data.name), state)
            }
            NodeKind::Call { selected: Some(id) } => format!("call -> {:?}", id),
            NodeKind::Call { selected: None } => "call".to_string(),
            NodeKind::ArgList => "args".to_string(),
            NodeKind::Literal(kind) => format!("literal {}", kind),
            NodeKind::Cast => "cast".to_string(),
        }
    }
}
