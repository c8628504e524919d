//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: SQLite, Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres, DuckDB
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: SQLite, MySQL
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Cap a row count at `i64::MAX` for engines with signed 64-bit LIMIT/OFFSET.
/// Larger counts exceed any table, so the result is unchanged.
/// Used by: SQLite, Postgres, DuckDB
pub fn clamp_signed(count: Option<u64>) -> Option<u64> {
    count.map(|n| n.min(i64::MAX as u64))
}

/// Emit LIMIT ... OFFSET ... (standard SQL).
/// Used by: Postgres, DuckDB
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit).space().push(Token::LitCount(lim));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset).space().push(Token::LitCount(off));
    }

    ts
}

/// Emit LIMIT/OFFSET where OFFSET is only valid after a LIMIT.
///
/// A missing limit is replaced by `no_limit`.
/// Used by: SQLite (`LIMIT -1`), MySQL (`LIMIT 18446744073709551615`)
pub fn emit_limit_offset_required_limit(
    limit: Option<u64>,
    offset: Option<u64>,
    no_limit: Token,
) -> TokenStream {
    let mut ts = TokenStream::new();

    match (limit, offset) {
        (Some(lim), _) => {
            ts.push(Token::Limit).space().push(Token::LitCount(lim));
        }
        (None, Some(_)) => {
            ts.push(Token::Limit).space().push(no_limit);
        }
        (None, None) => return ts,
    }

    if let Some(off) = offset {
        ts.space().push(Token::Offset).space().push(Token::LitCount(off));
    }

    ts
}

// =============================================================================
// Placeholders
// =============================================================================

/// `$1`, `$2`, ...
/// Used by: Postgres, DuckDB
pub fn placeholder_dollar(index: usize) -> String {
    format!("${}", index)
}

/// `?1`, `?2`, ...
/// Used by: SQLite
pub fn placeholder_numbered(index: usize) -> String {
    format!("?{}", index)
}
