//! DDL support.
//!
//! Generates `CREATE TABLE` statements for registered entities so a backend
//! can be bootstrapped from the schema alone.
//!
//! # Examples
//!
//! ```ignore
//! use quarry::sql::ddl::CreateTable;
//! use quarry::sql::Dialect;
//!
//! let member = schema.definition("Member").unwrap();
//! println!("{}", CreateTable::for_entity(&schema, member).to_sql(Dialect::Postgres));
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};
use crate::query::Statement;
use crate::schema::{Cardinality, EntityDef, Schema, ValueType};

// ============================================================================
// CREATE TABLE
// ============================================================================

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl CreateTable {
    /// Create a new CREATE TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            if_not_exists: false,
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Table for an entity: one column per attribute, foreign keys of
    /// many-to-one relationships referencing the target's primary key.
    pub fn for_entity(schema: &Schema, entity: &EntityDef) -> Self {
        let mut table = Self::new(entity.table_name()).if_not_exists();
        for attr in entity.attributes() {
            let mut col = ColumnDef::new(attr.column_name(), attr.value_type());
            if !attr.is_nullable() {
                col = col.not_null();
            }
            if attr.is_primary_key() {
                col = col.primary_key();
            }
            let reference = entity
                .relationships()
                .iter()
                .filter(|r| r.cardinality() == Cardinality::ManyToOne)
                .find(|r| r.foreign_key() == attr.name())
                .and_then(|r| schema.definition(r.target()));
            if let Some(target) = reference {
                if let Some(pk) = target.primary_key() {
                    col = col.references(target.table_name(), pk.column_name());
                }
            }
            table = table.column(col);
        }
        table
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Add a column definition.
    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create).space().push(Token::Table);

        // IF NOT EXISTS (dialect-specific)
        if self.if_not_exists && dialect.supports_if_not_exists() {
            ts.space()
                .push(Token::If)
                .space()
                .push(Token::Not)
                .space()
                .push(Token::Exists);
        }

        ts.space().ident(&self.name).space().lparen();
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.newline().indent(1).append(&col.to_tokens());
        }
        ts.newline().rparen();
        ts
    }
}

// ============================================================================
// Column Definition
// ============================================================================

/// Column definition for CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub value_type: ValueType,
    pub not_null: bool,
    pub primary_key: bool,
    /// Referenced `(table, column)`.
    pub references: Option<(String, String)>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            not_null: false,
            primary_key: false,
            references: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some((table.into(), column.into()));
        self
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.ident(&self.name)
            .space()
            .push(Token::TypeName(self.value_type));
        if self.not_null {
            ts.space().push(Token::NotNull);
        }
        if self.primary_key {
            ts.space().push(Token::Primary).space().push(Token::Key);
        }
        if let Some((table, column)) = &self.references {
            ts.space()
                .push(Token::References)
                .space()
                .ident(table)
                .space()
                .lparen()
                .ident(column)
                .rparen();
        }
        ts
    }
}

/// CREATE TABLE statements for every entity, referenced tables first.
pub fn create_statements(schema: &Schema, dialect: Dialect) -> Vec<Statement> {
    let entities: Vec<&EntityDef> = schema.entities().map(|e| &**e).collect();
    let mut ordered: Vec<&EntityDef> = Vec::with_capacity(entities.len());
    let mut visiting: Vec<&str> = Vec::new();
    for entity in &entities {
        visit(schema, entity, &mut ordered, &mut visiting);
    }
    ordered
        .into_iter()
        .map(|entity| {
            Statement::new(
                CreateTable::for_entity(schema, entity).to_sql(dialect),
                Vec::new(),
            )
        })
        .collect()
}

fn visit<'a>(
    schema: &'a Schema,
    entity: &'a EntityDef,
    ordered: &mut Vec<&'a EntityDef>,
    visiting: &mut Vec<&'a str>,
) {
    if ordered.iter().any(|e| e.name() == entity.name()) || visiting.contains(&entity.name()) {
        return;
    }
    visiting.push(entity.name());
    for rel in entity.relationships() {
        if rel.cardinality() != Cardinality::ManyToOne {
            continue;
        }
        if let Some(target) = schema.definition(rel.target()) {
            visit(schema, target, ordered, visiting);
        }
    }
    visiting.pop();
    ordered.push(entity);
}
