//! Error taxonomy for query construction and execution.
//!
//! Construction errors (type checks, alias checks, join resolution) are
//! returned by the builder call that caused them. Execution errors come back
//! from the terminal operations and carry the compiled SQL.

use std::fmt::Display;

use thiserror::Error;

use crate::exec::BackendError;

/// Error type for building and running queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Operand types are incompatible.
    #[error("type mismatch in `{expr}`: {message}")]
    TypeMismatch { expr: String, message: String },

    /// Malformed predicate, e.g. a comparison against a NULL literal.
    #[error("invalid predicate `{expr}`: {message}")]
    InvalidPredicate { expr: String, message: String },

    /// A join, source or subquery reuses an alias already bound.
    #[error("alias `{alias}` is already bound {context}")]
    AliasConflict { alias: String, context: String },

    /// A column refers to an alias that no source or join of the query binds.
    #[error("column `{alias}.{column}` is not bound to any source of the query")]
    UnboundColumn { alias: String, column: String },

    /// A bare entity join was built without an on-predicate.
    #[error("join to `{alias}` has neither a relationship nor an on-predicate; use cross_join for a cartesian product")]
    AmbiguousJoin { alias: String },

    /// Misuse of a join operation.
    #[error("invalid join on `{alias}`: {message}")]
    InvalidJoin { alias: String, message: String },

    /// The query has no source to select from.
    #[error("query has no source entity")]
    NoSource,

    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("entity `{entity}` has no attribute `{attribute}`")]
    UnknownAttribute { entity: String, attribute: String },

    #[error("entity `{entity}` has no relationship `{relationship}`")]
    UnknownRelationship {
        entity: String,
        relationship: String,
    },

    /// Schema registration failed validation.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// `fetch_one` matched more than one row.
    #[error("query returned more than one row:\n{sql}")]
    NonUniqueResult { sql: String },

    /// A scalar subquery operand yielded more than one row (reported by the backend).
    #[error("scalar subquery produced more than one row: {message}")]
    MultipleRowsForScalarSubquery { message: String },

    /// Any other failure reported by the execution backend.
    #[error("backend failed to execute statement: {source}\n{sql}")]
    Backend {
        sql: String,
        #[source]
        source: BackendError,
    },

    /// A returned row does not match the projection layout.
    #[error("cannot decode row: {0}")]
    Decode(String),
}

impl QueryError {
    pub(crate) fn type_mismatch(expr: &impl Display, message: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            expr: expr.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_predicate(expr: &impl Display, message: impl Into<String>) -> Self {
        QueryError::InvalidPredicate {
            expr: expr.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn alias_conflict(alias: &str, context: impl Into<String>) -> Self {
        QueryError::AliasConflict {
            alias: alias.to_string(),
            context: context.into(),
        }
    }

    pub(crate) fn invalid_join(alias: &str, message: impl Into<String>) -> Self {
        QueryError::InvalidJoin {
            alias: alias.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a backend failure, translating the ones that have their own variant.
    pub(crate) fn from_backend(sql: &str, err: BackendError) -> Self {
        match err {
            BackendError::ScalarSubqueryRows(message) => {
                QueryError::MultipleRowsForScalarSubquery { message }
            }
            source => QueryError::Backend {
                sql: sql.to_string(),
                source,
            },
        }
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
