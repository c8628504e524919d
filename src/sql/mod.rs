//! SQL generation module.
//!
//! Typed expressions and the token layer the query compiler serializes
//! through. It includes:
//!
//! - [`expr`] - Expression AST, values and the typed builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations
//! - [`ddl`] - CREATE TABLE for registered entities
//! - [`dml`] - Typed INSERT
//! - [`validate`] - Syntax check of emitted SQL

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod expr;
pub mod token;
pub mod validate;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect, UnknownDialect};
pub use expr::{
    count_star, lit, AggregateFunc, BinaryOperator, Expr, ExprExt, UnaryOperator, Value,
};
pub use token::{Token, TokenStream};

pub use ddl::{ColumnDef, CreateTable};
pub use dml::Insert;
