//! SQLite dialect, the dialect of the bundled execution backend.

use super::helpers;
use super::SqlDialect;
use crate::schema::ValueType;
use crate::sql::token::{Token, TokenStream};

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_numbered(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_required_limit(
            helpers::clamp_signed(limit),
            helpers::clamp_signed(offset),
            Token::LitInt(-1),
        )
    }

    // NULLS FIRST/LAST since SQLite 3.30; the bundled library is newer.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    fn emit_value_type(&self, ty: ValueType) -> &'static str {
        match ty {
            ValueType::Int => "INTEGER",
            ValueType::Float => "REAL",
            ValueType::Text => "TEXT",
            ValueType::Bool => "BOOLEAN",
        }
    }
}
