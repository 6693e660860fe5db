//! Construction surface used by parsers (and tests) to build trees.
//!
//! The builder knows which query kinds and direction flags a reference needs
//! at each syntactic position, so callers only hand it dotted names.

use crate::context::{Loc, SourceId, Span};
use crate::error::SemaError;
use crate::symbol::Visibility;
use crate::tree::{NodeId, NodeKind, QueryFlags, QueryKinds, RefData, Tree};
use crate::types::PrimKind;

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A possibly dotted type name, including primitive keywords.
    Named(String),
    /// An inline primitive.
    Prim(PrimKind),
    Array(Box<TypeExpr>, u64),
    Pointer(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(path: &str) -> Self {
        TypeExpr::Named(path.to_string())
    }

    pub fn array(elem: TypeExpr, len: u64) -> Self {
        TypeExpr::Array(Box::new(elem), len)
    }

    pub fn pointer(inner: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(inner))
    }
}

/// An expression as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(PrimKind),
    /// A possibly dotted value name.
    Name(String),
    Call(String, Vec<Expr>),
    Cast(TypeExpr, Box<Expr>),
}

impl Expr {
    pub fn lit(kind: PrimKind) -> Self {
        Expr::Literal(kind)
    }

    pub fn name(path: &str) -> Self {
        Expr::Name(path.to_string())
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Expr::Call(callee.to_string(), args)
    }

    pub fn cast(ty: TypeExpr, expr: Expr) -> Self {
        Expr::Cast(ty, Box::new(expr))
    }
}

/// Syntactic position of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Type,
    Value,
    Callee,
    Import,
}

impl Position {
    /// Kinds and flags for segment `index` of a chain of `len` segments.
    fn query(self, index: usize, len: usize) -> (QueryKinds, QueryFlags) {
        let head = index == 0;
        let leaf = index + 1 == len;

        let kinds = match (self, leaf) {
            (Position::Import, _) => QueryKinds::NAMESPACES,
            (Position::Type, true) => QueryKinds::TYPES,
            (Position::Type, false) => QueryKinds::NAMESPACES | QueryKinds::TYPE,
            (Position::Value, true) => QueryKinds::VALUES,
            (Position::Callee, true) => QueryKinds::CALLABLE,
            (Position::Value | Position::Callee, false) => QueryKinds::SCOPES,
        };

        let flags = match (self, head) {
            (Position::Import, true) => QueryFlags::GLOBAL,
            (Position::Import, false) => QueryFlags::DOWNWARDS | QueryFlags::FIRST_LEVEL_CHILDREN,
            // qualified names may start with a namespace anywhere in the tree
            (_, true) if len > 1 => {
                QueryFlags::LEXICAL | QueryFlags::DOWNWARDS | QueryFlags::CHILDREN_AT_ROOT
            }
            (_, true) => QueryFlags::LEXICAL,
            (_, false) => QueryFlags::MEMBERS,
        };

        (kinds, flags)
    }
}

pub struct TreeBuilder<'t> {
    tree: &'t mut Tree,
    source: SourceId,
    next_span: Option<Span>,
    cursor: usize,
}

impl<'t> TreeBuilder<'t> {
    pub fn new(tree: &'t mut Tree) -> Self {
        Self::for_source(tree, 0)
    }

    /// Builder whose nodes are located in `source`.
    pub fn for_source(tree: &'t mut Tree, source: SourceId) -> Self {
        Self {
            tree,
            source,
            next_span: None,
            cursor: 0,
        }
    }

    /// Use `span` as the location of the next node created. Without it each
    /// node gets a distinct one-byte span.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.next_span = Some(span);
        self
    }

    pub fn tree(&self) -> &Tree {
        &*self.tree
    }

    fn loc(&mut self) -> Loc {
        let span = self.next_span.take().unwrap_or_else(|| {
            let start = self.cursor;
            self.cursor += 1;
            start..start + 1
        });
        Loc::new(self.source, span)
    }

    fn add(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, SemaError> {
        let loc = self.loc();
        let id = self.tree.alloc(kind, loc);
        self.tree.attach(parent, id)?;
        Ok(id)
    }

    /// The module `name` under the root, created on first use.
    pub fn module(&mut self, name: &str) -> Result<NodeId, SemaError> {
        let root = self.tree.root();
        let sym = self.tree.intern(name);
        let existing = self
            .tree
            .children(root)
            .iter()
            .copied()
            .find(|&id| matches!(self.tree.kind(id), Some(NodeKind::Module { name }) if *name == sym));
        match existing {
            Some(module) => Ok(module),
            None => self.add(root, NodeKind::Module { name: sym }),
        }
    }

    pub fn package(&mut self, parent: NodeId, name: &str, visibility: Visibility) -> Result<NodeId, SemaError> {
        let name = self.tree.intern(name);
        self.add(parent, NodeKind::Package { name, visibility })
    }

    /// `import a.b` or `import a.b as c`.
    pub fn import(&mut self, scope: NodeId, path: &str, alias: Option<&str>) -> Result<NodeId, SemaError> {
        let alias = alias.map(|alias| self.tree.intern(alias));
        let import = self.add(scope, NodeKind::Import { alias })?;
        self.reference(import, path, Position::Import)?;
        Ok(import)
    }

    pub fn strukt(&mut self, scope: NodeId, name: &str, visibility: Visibility) -> Result<NodeId, SemaError> {
        let name = self.tree.intern(name);
        self.add(
            scope,
            NodeKind::Struct {
                name,
                visibility,
                size: None,
            },
        )
    }

    /// Inheritance clause naming the base type `path`.
    pub fn base(&mut self, strukt: NodeId, path: &str) -> Result<NodeId, SemaError> {
        let base = self.add(strukt, NodeKind::Base)?;
        self.reference(base, path, Position::Type)?;
        Ok(base)
    }

    pub fn field(
        &mut self,
        strukt: NodeId,
        name: &str,
        ty: &TypeExpr,
        visibility: Visibility,
    ) -> Result<NodeId, SemaError> {
        let name = self.tree.intern(name);
        let field = self.add(strukt, NodeKind::Field { name, visibility })?;
        self.type_expr(field, ty)?;
        Ok(field)
    }

    /// A function with its parameter list, optional return type and an
    /// empty body (see [`TreeBuilder::body`]).
    pub fn function(
        &mut self,
        scope: NodeId,
        name: &str,
        params: &[(&str, TypeExpr)],
        returns: Option<&TypeExpr>,
        visibility: Visibility,
    ) -> Result<NodeId, SemaError> {
        let name = self.tree.intern(name);
        let function = self.add(scope, NodeKind::Function { name, visibility })?;

        let list = self.add(function, NodeKind::ParamList)?;
        for (param, ty) in params {
            let param = self.tree.intern(param);
            let param = self.add(list, NodeKind::Param { name: param })?;
            self.type_expr(param, ty)?;
        }
        if let Some(ty) = returns {
            let clause = self.add(function, NodeKind::Returns)?;
            self.type_expr(clause, ty)?;
        }
        self.add(function, NodeKind::Block)?;
        Ok(function)
    }

    /// Body block of a function.
    pub fn body(&self, function: NodeId) -> Result<NodeId, SemaError> {
        self.tree
            .children(function)
            .iter()
            .copied()
            .find(|&child| matches!(self.tree.kind(child), Some(NodeKind::Block)))
            .ok_or_else(|| SemaError::structural("function without a body", self.tree.loc(function)))
    }

    pub fn block(&mut self, parent: NodeId) -> Result<NodeId, SemaError> {
        self.add(parent, NodeKind::Block)
    }

    pub fn variable(
        &mut self,
        block: NodeId,
        name: &str,
        ty: &TypeExpr,
        init: Option<&Expr>,
    ) -> Result<NodeId, SemaError> {
        let name = self.tree.intern(name);
        let variable = self.add(block, NodeKind::Variable { name })?;
        self.type_expr(variable, ty)?;
        if let Some(init) = init {
            self.expr(variable, init)?;
        }
        Ok(variable)
    }

    pub fn constant(
        &mut self,
        scope: NodeId,
        name: &str,
        value: i64,
        visibility: Visibility,
    ) -> Result<NodeId, SemaError> {
        let name = self.tree.intern(name);
        self.add(
            scope,
            NodeKind::Constant {
                name,
                visibility,
                value,
            },
        )
    }

    pub fn type_expr(&mut self, parent: NodeId, ty: &TypeExpr) -> Result<NodeId, SemaError> {
        match ty {
            TypeExpr::Named(path) => self.reference(parent, path, Position::Type),
            TypeExpr::Prim(kind) => self.add(parent, NodeKind::Primitive(*kind)),
            TypeExpr::Array(elem, len) => {
                let array = self.add(parent, NodeKind::Array { len: *len, size: None })?;
                self.type_expr(array, elem)?;
                Ok(array)
            }
            TypeExpr::Pointer(inner) => {
                let pointer = self.add(parent, NodeKind::Pointer)?;
                self.type_expr(pointer, inner)?;
                Ok(pointer)
            }
        }
    }

    /// Add `expr` below `parent`; inside a block this is an expression statement.
    pub fn expr(&mut self, parent: NodeId, expr: &Expr) -> Result<NodeId, SemaError> {
        match expr {
            Expr::Literal(kind) => self.add(parent, NodeKind::Literal(*kind)),
            Expr::Name(path) => self.reference(parent, path, Position::Value),
            Expr::Call(callee, args) => {
                let call = self.add(parent, NodeKind::Call { selected: None })?;
                self.reference(call, callee, Position::Callee)?;
                let list = self.add(call, NodeKind::ArgList)?;
                for arg in args {
                    self.expr(list, arg)?;
                }
                Ok(call)
            }
            Expr::Cast(ty, operand) => {
                let cast = self.add(parent, NodeKind::Cast)?;
                self.type_expr(cast, ty)?;
                self.expr(cast, operand)?;
                Ok(cast)
            }
        }
    }

    /// Build the reference chain for a dotted `path`; returns its head.
    fn reference(&mut self, parent: NodeId, path: &str, position: Position) -> Result<NodeId, SemaError> {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(SemaError::structural("empty reference", self.loc()));
        }

        let mut attach_to = parent;
        let mut head = None;
        for (index, segment) in segments.iter().enumerate() {
            let (kinds, flags) = position.query(index, segments.len());
            let name = self.tree.intern(segment);
            let node = self.add(attach_to, NodeKind::Reference(RefData::new(name, kinds, flags)))?;
            head.get_or_insert(node);
            attach_to = node;
        }
        head.ok_or_else(|| SemaError::structural("empty reference", self.tree.loc(parent)))
    }
}
