pub mod context;
pub mod converter;
pub mod editor;
pub mod expression;
pub mod path;
pub mod statement;

pub use context::TransformContext;
pub use expression::{compare, BoolExpr, Getter};
pub use path::{Accessor, CompiledPath};
pub use statement::{CompiledCondition, CompiledStatement, ExecutableCondition, ExecutableStatement};
