//! Primitive kinds, the keyword table, resolved types and the static
//! compatibility lattice used by overload selection.

use std::fmt;

use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimKind {
    pub const ALL: [PrimKind; 12] = [
        PrimKind::Bool,
        PrimKind::Char,
        PrimKind::I8,
        PrimKind::I16,
        PrimKind::I32,
        PrimKind::I64,
        PrimKind::U8,
        PrimKind::U16,
        PrimKind::U32,
        PrimKind::U64,
        PrimKind::F32,
        PrimKind::F64,
    ];

    pub const fn size(self) -> u64 {
        match self {
            PrimKind::Bool | PrimKind::Char | PrimKind::I8 | PrimKind::U8 => 1,
            PrimKind::I16 | PrimKind::U16 => 2,
            PrimKind::I32 | PrimKind::U32 | PrimKind::F32 => 4,
            PrimKind::I64 | PrimKind::U64 | PrimKind::F64 => 8,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, PrimKind::I8 | PrimKind::I16 | PrimKind::I32 | PrimKind::I64)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, PrimKind::U8 | PrimKind::U16 | PrimKind::U32 | PrimKind::U64)
    }

    pub const fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PrimKind::F32 | PrimKind::F64)
    }

    /// Canonical spelling used in identifiers and messages.
    pub const fn name(self) -> &'static str {
        match self {
            PrimKind::Bool => "bool",
            PrimKind::Char => "char",
            PrimKind::I8 => "i8",
            PrimKind::I16 => "i16",
            PrimKind::I32 => "int",
            PrimKind::I64 => "long",
            PrimKind::U8 => "byte",
            PrimKind::U16 => "u16",
            PrimKind::U32 => "uint",
            PrimKind::U64 => "u64",
            PrimKind::F32 => "float",
            PrimKind::F64 => "double",
        }
    }

    pub fn from_keyword(word: &str) -> Option<PrimKind> {
        PRIMITIVE_KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, kind)| *kind)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every spelling of a primitive type the grammar accepts.
pub const PRIMITIVE_KEYWORDS: &[(&str, PrimKind)] = &[
    ("bool", PrimKind::Bool),
    ("char", PrimKind::Char),
    ("i8", PrimKind::I8),
    ("i16", PrimKind::I16),
    ("i32", PrimKind::I32),
    ("int", PrimKind::I32),
    ("i64", PrimKind::I64),
    ("long", PrimKind::I64),
    ("u8", PrimKind::U8),
    ("byte", PrimKind::U8),
    ("u16", PrimKind::U16),
    ("u32", PrimKind::U32),
    ("uint", PrimKind::U32),
    ("u64", PrimKind::U64),
    ("f32", PrimKind::F32),
    ("float", PrimKind::F32),
    ("f64", PrimKind::F64),
    ("double", PrimKind::F64),
];

/// How a value of one type converts to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compat {
    Identical,
    Upcast,
    Downcast,
    Incompatible,
}

impl Compat {
    /// Whether an argument can be passed without an explicit cast.
    pub const fn is_implicit(self) -> bool {
        matches!(self, Compat::Identical | Compat::Upcast)
    }
}

const PRIM_COUNT: usize = PrimKind::ALL.len();

const fn prim_compat(from: PrimKind, to: PrimKind) -> Compat {
    if from as usize == to as usize {
        return Compat::Identical;
    }
    if matches!(from, PrimKind::Bool) || matches!(to, PrimKind::Bool) {
        return Compat::Incompatible;
    }
    if from.is_float() && to.is_float() {
        return if to.size() > from.size() {
            Compat::Upcast
        } else {
            Compat::Downcast
        };
    }
    if from.is_integer() && to.is_float() {
        return Compat::Upcast;
    }
    if from.is_float() {
        return Compat::Downcast;
    }
    if matches!(from, PrimKind::Char) {
        return if to.is_unsigned() || to.size() >= 2 {
            Compat::Upcast
        } else {
            Compat::Downcast
        };
    }
    if matches!(to, PrimKind::Char) {
        return Compat::Downcast;
    }
    let same_sign = from.is_signed() == to.is_signed();
    if same_sign && to.size() > from.size() {
        return Compat::Upcast;
    }
    if from.is_unsigned() && to.is_signed() && to.size() > from.size() {
        return Compat::Upcast;
    }
    Compat::Downcast
}

const fn build_lattice() -> [[Compat; PRIM_COUNT]; PRIM_COUNT] {
    let mut table = [[Compat::Incompatible; PRIM_COUNT]; PRIM_COUNT];
    let mut i = 0;
    while i < PRIM_COUNT {
        let mut j = 0;
        while j < PRIM_COUNT {
            table[i][j] = prim_compat(PrimKind::ALL[i], PrimKind::ALL[j]);
            j += 1;
        }
        i += 1;
    }
    table
}

/// Compatibility of primitive kinds, indexed by (source, destination).
pub static LATTICE: [[Compat; PRIM_COUNT]; PRIM_COUNT] = build_lattice();

pub fn prim_compatibility(from: PrimKind, to: PrimKind) -> Compat {
    LATTICE[from.index()][to.index()]
}

/// A resolved type, as seen by overload selection and size computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    Prim(PrimKind),
    Struct(NodeId),
    Array(Box<Ty>, u64),
    Pointer(Box<Ty>),
}

/// Inheritance queries the lattice needs for struct types.
pub trait Hierarchy {
    /// Whether `derived` inherits from `base`, directly or transitively.
    fn derives_from(&self, derived: NodeId, base: NodeId) -> bool;
}

impl Ty {
    pub fn compatibility(&self, to: &Ty, hierarchy: &impl Hierarchy) -> Compat {
        match (self, to) {
            (Ty::Void, Ty::Void) => Compat::Identical,
            (Ty::Prim(from), Ty::Prim(to)) => prim_compatibility(*from, *to),
            (Ty::Struct(from), Ty::Struct(to)) => {
                if from == to {
                    Compat::Identical
                } else if hierarchy.derives_from(*from, *to) {
                    Compat::Upcast
                } else if hierarchy.derives_from(*to, *from) {
                    Compat::Downcast
                } else {
                    Compat::Incompatible
                }
            }
            (Ty::Array(from, n), Ty::Array(to, m)) => {
                if n == m && from.compatibility(to, hierarchy) == Compat::Identical {
                    Compat::Identical
                } else {
                    Compat::Incompatible
                }
            }
            (Ty::Array(from, _), Ty::Pointer(to)) => {
                if from.compatibility(to, hierarchy) == Compat::Identical {
                    Compat::Upcast
                } else {
                    Compat::Incompatible
                }
            }
            (Ty::Pointer(from), Ty::Pointer(to)) => match (from.as_ref(), to.as_ref()) {
                (Ty::Struct(_), Ty::Struct(_)) => match from.compatibility(to, hierarchy) {
                    Compat::Downcast => Compat::Incompatible,
                    other => other,
                },
                _ if from == to => Compat::Identical,
                _ => Compat::Incompatible,
            },
            _ => Compat::Incompatible,
        }
    }
}
