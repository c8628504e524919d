//! SQLite backend (rusqlite).

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use super::{execute, Backend, BackendError};
use crate::config::Settings;
use crate::error::QueryResult;
use crate::query::Statement;
use crate::schema::Schema;
use crate::sql::ddl;
use crate::sql::dialect::Dialect;
use crate::sql::expr::Value;

/// Blocking SQLite connection.
pub struct SqliteBackend {
    conn: Connection,
    log_statements: bool,
    log_params: bool,
}

impl SqliteBackend {
    /// Open or create a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Open the database configured in `[database]` and apply its pragmas.
    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let path = settings
            .database
            .resolved_path()
            .map_err(|err| BackendError::Other(err.to_string()))?;
        let mut backend = if path == ":memory:" {
            Self::open_in_memory()?
        } else {
            Self::open(&path)?
        };
        backend
            .conn
            .busy_timeout(Duration::from_millis(settings.database.busy_timeout_ms))?;
        if settings.database.foreign_keys {
            backend.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        backend.log_statements = settings.query.log_statements;
        backend.log_params = settings.query.log_params;
        tracing::debug!(path = %path, "opened sqlite database");
        Ok(backend)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            log_statements: false,
            log_params: false,
        }
    }

    /// Create a table for every entity of `schema`, referenced tables first.
    pub fn create_schema(&self, schema: &Schema) -> QueryResult<()> {
        for statement in ddl::create_statements(schema, Dialect::Sqlite) {
            execute(self, &statement)?;
        }
        Ok(())
    }

    /// Underlying connection, for statements the builder does not cover.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn log(&self, statement: &Statement) {
        if self.log_statements {
            tracing::info!(sql = statement.sql(), "sqlite");
        }
        if self.log_params {
            tracing::info!(params = ?statement.params(), "sqlite params");
        }
    }
}

impl Backend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&self, statement: &Statement) -> Result<Vec<Vec<Value>>, BackendError> {
        self.log(statement);
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(statement.params().iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for index in 0..width {
                values.push(from_sql(row.get_ref(index)?, index)?);
            }
            out.push(values);
        }
        Ok(out)
    }

    fn execute(&self, statement: &Statement) -> Result<usize, BackendError> {
        self.log(statement);
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        Ok(stmt.execute(params_from_iter(statement.params().iter()))?)
    }
}

// SQLite has no boolean storage class; booleans are stored as 0/1.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
        })
    }
}

fn from_sql(value: ValueRef<'_>, index: usize) -> Result<Value, BackendError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(n) => Ok(Value::Int(n)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(BackendError::UnsupportedType {
            index,
            type_name: "blob".into(),
        }),
    }
}
