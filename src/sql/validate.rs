//! Syntax check for emitted SQL.
//!
//! Parses generated statements with sqlparser-rs using the parser dialect
//! that matches the target database.

use sqlparser::dialect::{DuckDbDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// # Example
///
/// ```
/// use quarry::sql::validate::validate_sql;
/// use quarry::sql::Dialect;
///
/// validate_sql("SELECT 1", Dialect::Sqlite).unwrap();
/// assert!(validate_sql("SELEC 1", Dialect::Postgres).is_err());
/// ```
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {}: {}\nSQL: {}", dialect, e, sql))
}
