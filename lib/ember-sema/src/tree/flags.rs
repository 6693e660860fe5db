//! Small typed bitsets carried by nodes and queries.

macro_rules! bitset {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $( $(#[$fmeta:meta])* const $flag:ident = $bit:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            $( $(#[$fmeta])* pub const $flag: Self = Self(1 << $bit); )*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn bits(self) -> $repr {
                self.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0 && other.0 != 0
            }

            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            pub const fn without(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            fn names(self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $( if self.contains(Self::$flag) { names.push(stringify!($flag)); } )*
                names
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if self.is_empty() {
                    return write!(f, "{}(empty)", stringify!($name));
                }
                write!(f, "{}({})", stringify!($name), self.names().join(" | "))
            }
        }
    };
}

bitset! {
    /// Per-node modifiers that shape how scoped queries traverse the tree.
    pub struct Access: u8 {
        /// Children only see the siblings declared before them.
        const ORDERED = 0;
        /// Leaving this node upwards stops younger-sibling visibility, and downward
        /// searches never enter it.
        const STOP_SIBLINGS = 1;
        /// Queries and collision scans treat the children as if they belonged to
        /// this node's parent.
        const PASSTHROUGH = 2;
    }
}

bitset! {
    /// Analysis phases a node still owes.
    pub struct Phases: u8 {
        const RESOLVE = 0;
        const SIZE = 1;
        const DEEP_COLLISION = 2;
    }
}

bitset! {
    /// What kinds of symbols a reference is looking for.
    pub struct QueryKinds: u16 {
        const MODULE = 0;
        const PACKAGE = 1;
        const TYPE = 2;
        const FUNCTION = 3;
        const METHOD = 4;
        const FIELD = 5;
        const VARIABLE = 6;
        const PARAM = 7;
        const CONSTANT = 8;
        const PRIMITIVE = 9;
    }
}

impl QueryKinds {
    /// Type positions: declared types and primitives.
    pub const TYPES: Self = Self::TYPE.union(Self::PRIMITIVE);
    /// Call positions: anything that may hold something callable.
    pub const CALLABLE: Self = Self::FUNCTION
        .union(Self::METHOD)
        .union(Self::VARIABLE)
        .union(Self::PARAM)
        .union(Self::FIELD);
    /// Value positions.
    pub const VALUES: Self = Self::VARIABLE
        .union(Self::PARAM)
        .union(Self::FIELD)
        .union(Self::CONSTANT);
    /// Import positions.
    pub const NAMESPACES: Self = Self::MODULE.union(Self::PACKAGE);
    /// Leading segments of a chain: anything that can be looked inside.
    pub const SCOPES: Self = Self::NAMESPACES
        .union(Self::TYPE)
        .union(Self::VALUES);

    /// Whether a lookup with this mask gathers functions. Overloads reached
    /// through a scope's links then join the scope's own, instead of being
    /// shadowed by them.
    pub const fn merges_scope_links(self) -> bool {
        self.intersects(Self::FUNCTION.union(Self::METHOD))
    }

    /// Whether a reference with this mask names a scope that queries may follow
    /// (imports and base types), rather than a value.
    pub const fn is_scope_link(self) -> bool {
        self.intersects(Self::NAMESPACES.union(Self::TYPE))
            && !self.intersects(Self::VALUES.union(Self::FUNCTION).union(Self::METHOD))
    }
}

bitset! {
    /// Direction and inclusion flags of a scoped query.
    pub struct QueryFlags: u16 {
        /// Ask the parent (bubble up the ancestor chain).
        const UPWARDS = 0;
        /// Ask the children.
        const DOWNWARDS = 1;
        /// Visit each ancestor itself while bubbling.
        const INCLUDE_PARENTS = 2;
        /// Inside ordered scopes, include the siblings declared earlier.
        const YOUNGER_SIBLINGS = 3;
        /// Visit the first level of children of the start node.
        const FIRST_LEVEL_CHILDREN = 4;
        /// Only descend once the upward walk reached the root.
        const CHILDREN_AT_ROOT = 5;
        /// Start at the root instead of the current node.
        const FROM_ROOT = 6;
        /// Continue into declarations named by resolved scope-link references.
        const FOLLOW_REFERENCES = 7;
    }
}

impl QueryFlags {
    /// Plain lexical lookup from a point in the tree.
    pub const LEXICAL: Self = Self::UPWARDS
        .union(Self::YOUNGER_SIBLINGS)
        .union(Self::FOLLOW_REFERENCES);
    /// Lookup of packages and modules for imports.
    pub const GLOBAL: Self = Self::UPWARDS
        .union(Self::DOWNWARDS)
        .union(Self::CHILDREN_AT_ROOT);
    /// Lookup restricted to the inside of one declaration.
    pub const MEMBERS: Self = Self::DOWNWARDS
        .union(Self::FIRST_LEVEL_CHILDREN)
        .union(Self::FOLLOW_REFERENCES);
}
