//! MySQL dialect.
//!
//! MySQL has no NULLS FIRST/LAST and no OFFSET without LIMIT; both are
//! emulated.

use super::helpers;
use super::SqlDialect;
use crate::schema::ValueType;
use crate::sql::token::{Token, TokenStream};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_required_limit(limit, offset, Token::LitCount(u64::MAX))
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn emit_value_type(&self, ty: ValueType) -> &'static str {
        match ty {
            ValueType::Int => "BIGINT",
            ValueType::Float => "DOUBLE",
            // TEXT columns cannot be keys without a prefix length.
            ValueType::Text => "VARCHAR(255)",
            ValueType::Bool => "BOOLEAN",
        }
    }
}
