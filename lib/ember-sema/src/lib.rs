pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod passes;
pub mod pipeline;
pub mod session;
pub mod symbol;
pub mod tree;
pub mod types;

pub use config::ResolveConfig;
pub use error::{Diagnostics, ErrorKind, SemaError};
pub use gate::{GateEvent, PackageState};
pub use passes::ResolveStats;
pub use pipeline::{drive, Delivery};
pub use session::Session;
pub use symbol::Visibility;
pub use tree::{Expr, NodeId, NodeKind, Tree, TreeBuilder, TypeExpr};
pub use types::PrimKind;
