//! PostgreSQL dialect.

use super::helpers;
use super::SqlDialect;
use crate::schema::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
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
            ValueType::Float => "DOUBLE PRECISION",
            ValueType::Text => "TEXT",
            ValueType::Bool => "BOOLEAN",
        }
    }
}
