//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (SQLite/PG/DuckDB), `` ` `` (MySQL)
//! - Bound parameter placeholders: `?N` (SQLite), `$N` (PG/DuckDB), `?` (MySQL)
//! - Pagination: how to express OFFSET without LIMIT
//! - NULLS FIRST/LAST support
//! - Column types for CREATE TABLE
//!
//! # Usage
//!
//! ```ignore
//! use quarry::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let placeholder = dialect.placeholder(1);  // $1
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use std::fmt;
use std::str::FromStr;

use super::token::TokenStream;
use crate::schema::ValueType;

/// SQL dialect trait - defines how SQL constructs are rendered.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Format a boolean constant.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Placeholder for the bound parameter at 1-based `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(
            helpers::clamp_signed(limit),
            helpers::clamp_signed(offset),
        )
    }

    /// Whether this dialect supports NULLS FIRST/LAST in ORDER BY.
    ///
    /// Dialects without it get a leading `CASE WHEN x IS NULL` sort key.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Column type for an attribute value type.
    fn emit_value_type(&self, ty: ValueType) -> &'static str;

    /// Whether this dialect supports IF NOT EXISTS for CREATE TABLE.
    fn supports_if_not_exists(&self) -> bool {
        true
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    DuckDb,
    MySql,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Sqlite => &Sqlite,
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
            Dialect::MySql => &MySql,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn emit_value_type(&self, ty: ValueType) -> &'static str {
        self.dialect().emit_value_type(ty)
    }

    fn supports_if_not_exists(&self) -> bool {
        self.dialect().supports_if_not_exists()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

/// Error for an unrecognised dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dialect `{0}` (expected sqlite, postgres, duckdb or mysql)")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "mysql" => Ok(Dialect::MySql),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}
