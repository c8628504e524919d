//! DuckDB dialect.

use super::helpers;
use super::SqlDialect;
use crate::schema::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_dollar(index)
    }

    fn emit_value_type(&self, ty: ValueType) -> &'static str {
        match ty {
            ValueType::Int => "BIGINT",
            ValueType::Float => "DOUBLE",
            ValueType::Text => "VARCHAR",
            ValueType::Bool => "BOOLEAN",
        }
    }
}
