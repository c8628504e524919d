//! # quarry
//!
//! A typed query-construction and execution engine for relational data.
//!
//! ## Architecture
//!
//! Queries are composed from schema handles, validated as they are built and
//! compiled to parameterized SQL for the target dialect:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Schema (entities, attributes,               │
//! │              relationships; builder or TOML)             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [EntityPath / ColumnRef]
//! ┌─────────────────────────────────────────────────────────┐
//! │         Query<R> builder + typed Expr (ExprExt)          │
//! │         joins, subqueries, grouping, ordering            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [build]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  QueryPlan (immutable)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compile]
//! ┌─────────────────────────────────────────────────────────┐
//! │         Statement (SQL + params) + RowLayout             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [Backend]
//! ┌─────────────────────────────────────────────────────────┐
//! │            Entity / Tuple / Value results                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! let member = schema.entity("Member")?;
//! let team = schema.entity("Team")?;
//! let members: Vec<Entity> = select_from(&member)
//!     .join(member.relationship("team")?, &team)?
//!     .where_([team.column("name")?.eq("teamA")?])?
//!     .order_by([member.column("age")?.desc()])
//!     .fetch(&backend)?;
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod query;
pub mod schema;
pub mod sql;

pub use error::{QueryError, QueryResult};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::exec::{Backend, Entity, Relation, ResultRow, SqliteBackend, Tuple};
    pub use crate::query::{
        select, select_entity, select_from, select_tuple, OrderByExpr, Projection, Query,
        QueryPlan, Statement, SubQuery,
    };
    pub use crate::schema::{
        AttributeDef, Cardinality, ColumnRef, EntityDef, EntityPath, Schema, SchemaBuilder,
        ValueType,
    };
    pub use crate::sql::dialect::{Dialect, SqlDialect};
    pub use crate::sql::dml::Insert;
    pub use crate::sql::expr::{count_star, lit, Expr, ExprExt, Value};
}
