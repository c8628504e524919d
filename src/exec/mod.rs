//! Execution adapter.
//!
//! A [`Backend`] runs compiled [`Statement`]s and returns raw rows of
//! [`Value`]s; decoding into entities and tuples happens in [`row`]. The
//! SQLite backend is the one shipped with the crate.

mod row;
mod sqlite;

pub use row::{Entity, FromResultRow, Relation, ResultRow, Tuple};
pub use sqlite::SqliteBackend;

use thiserror::Error;

use crate::error::{QueryError, QueryResult};
use crate::query::Statement;
use crate::sql::dialect::Dialect;
use crate::sql::expr::Value;

/// Error reported by an execution backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("column {index} has unsupported type {type_name}")]
    UnsupportedType { index: usize, type_name: String },

    /// A scalar subquery produced more than one row.
    #[error("{0}")]
    ScalarSubqueryRows(String),

    #[error("{0}")]
    Other(String),
}

/// Something that can execute statements.
///
/// `query` returns every row as a vector of values in select-list order.
pub trait Backend {
    /// Dialect statements for this backend are compiled to.
    fn dialect(&self) -> Dialect;

    fn query(&self, statement: &Statement) -> Result<Vec<Vec<Value>>, BackendError>;

    /// Run a statement that returns no rows; yields the affected row count.
    fn execute(&self, statement: &Statement) -> Result<usize, BackendError>;
}

/// Run a query statement, logging it and wrapping failures with the SQL.
pub(crate) fn run<B: Backend + ?Sized>(
    backend: &B,
    statement: &Statement,
) -> QueryResult<Vec<Vec<Value>>> {
    tracing::debug!(
        dialect = %backend.dialect(),
        params = statement.params().len(),
        sql = statement.sql(),
        "executing query"
    );
    let rows = backend
        .query(statement)
        .map_err(|err| QueryError::from_backend(statement.sql(), err))?;
    tracing::trace!(rows = rows.len(), "query returned");
    Ok(rows)
}

/// Run a statement without result rows.
pub(crate) fn execute<B: Backend + ?Sized>(backend: &B, statement: &Statement) -> QueryResult<usize> {
    tracing::debug!(
        dialect = %backend.dialect(),
        params = statement.params().len(),
        sql = statement.sql(),
        "executing statement"
    );
    backend
        .execute(statement)
        .map_err(|err| QueryError::from_backend(statement.sql(), err))
}
