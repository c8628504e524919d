//! DML (Data Manipulation Language) support.
//!
//! Typed INSERT statements for seeding tables through a [`Backend`]. Values
//! are always bound as parameters.
//!
//! # Examples
//!
//! ```ignore
//! use quarry::sql::dml::Insert;
//!
//! let member = schema.entity("Member")?;
//! Insert::into(&member)
//!     .value("id", 1)?
//!     .value("username", "member1")?
//!     .value("age", 10)?
//!     .execute(&backend)?;
//! ```

use super::dialect::Dialect;
use super::expr::Value;
use super::token::{Token, TokenStream};
use crate::error::{QueryError, QueryResult};
use crate::exec::{self, Backend};
use crate::query::Statement;
use crate::schema::{EntityPath, ValueType};

// ============================================================================
// INSERT
// ============================================================================

/// INSERT of a single row into an entity's table.
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until executed or converted with to_statement()"]
pub struct Insert {
    path: EntityPath,
    /// `(attribute index, value)`, one entry per attribute.
    values: Vec<(usize, Value)>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(path: &EntityPath) -> Self {
        Self {
            path: path.clone(),
            values: Vec::new(),
        }
    }

    /// Set an attribute. Setting it again replaces the earlier value.
    pub fn value(mut self, attribute: &str, value: impl Into<Value>) -> QueryResult<Self> {
        let entity = self.path.definition();
        let index = entity
            .attribute_index(attribute)
            .ok_or_else(|| QueryError::UnknownAttribute {
                entity: entity.name().to_string(),
                attribute: attribute.to_string(),
            })?;
        let attr = &entity.attributes()[index];
        let value = check_value(
            &format!("{}.{}", entity.name(), attr.name()),
            attr.value_type(),
            attr.is_nullable(),
            value.into(),
        )?;

        match self.values.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = value,
            None => self.values.push((index, value)),
        }
        Ok(self)
    }

    /// Convert to SQL for the given dialect.
    pub fn to_statement(&self, dialect: Dialect) -> Statement {
        let entity = self.path.definition();
        let mut values: Vec<&(usize, Value)> = self.values.iter().collect();
        values.sort_by_key(|(index, _)| *index);

        let mut ts = TokenStream::new();
        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .ident(entity.table_name())
            .space()
            .lparen();
        for (i, (index, _)) in values.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.ident(entity.attributes()[*index].column_name());
        }
        ts.rparen().space().push(Token::Values).space().lparen();
        for i in 0..values.len() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Param(i + 1));
        }
        ts.rparen();

        Statement::new(
            ts.serialize(dialect),
            values.into_iter().map(|(_, v)| v.clone()).collect(),
        )
    }

    /// Run the insert; yields the number of rows written.
    pub fn execute<B: Backend + ?Sized>(&self, backend: &B) -> QueryResult<usize> {
        exec::execute(backend, &self.to_statement(backend.dialect()))
    }
}

fn check_value(expr: &str, ty: ValueType, nullable: bool, value: Value) -> QueryResult<Value> {
    match value.value_type() {
        None if nullable => Ok(Value::Null),
        None => Err(QueryError::type_mismatch(&expr, "attribute is not nullable")),
        Some(found) if found == ty => Ok(value),
        Some(ValueType::Int) if ty == ValueType::Float => value
            .coerce(ty)
            .map_err(|_| QueryError::type_mismatch(&expr, format!("expected {}", ty))),
        Some(found) => Err(QueryError::type_mismatch(
            &expr,
            format!("expected {} but got {}", ty, found),
        )),
    }
}
