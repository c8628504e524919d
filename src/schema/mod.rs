//! Schema registration.
//!
//! Entity types, their typed attributes and the relationships between them
//! are registered once at startup through [`SchemaBuilder`]. The resulting
//! [`Schema`] is immutable and shared behind an `Arc`; queries reference it
//! through [`EntityPath`] and [`ColumnRef`] handles.
//!
//! ```ignore
//! let schema = SchemaBuilder::new()
//!     .entity(
//!         EntityDef::new("Team")
//!             .attribute(AttributeDef::new("id", ValueType::Int).primary_key())
//!             .attribute(AttributeDef::new("name", ValueType::Text))
//!             .one_to_many("members", "Member", "team_id"),
//!     )
//!     .entity(
//!         EntityDef::new("Member")
//!             .attribute(AttributeDef::new("id", ValueType::Int).primary_key())
//!             .attribute(AttributeDef::new("team_id", ValueType::Int))
//!             .many_to_one("team", "Team", "team_id"),
//!     )
//!     .build()?;
//! let member = schema.entity("Member")?;
//! ```

mod loader;
mod path;

pub use path::{ColumnRef, EntityPath, RelationshipRef};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Value type of an attribute or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int,
    Float,
    Text,
    Bool,
}

impl ValueType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }

    /// Whether values of this type have an order usable by range comparisons.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ValueType::Bool)
    }

    /// Whether two types may appear on both sides of a comparison.
    pub fn is_comparable_with(self, other: ValueType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A typed attribute of an entity type, stored in one column.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    name: Arc<str>,
    column: Arc<str>,
    value_type: ValueType,
    nullable: bool,
    primary_key: bool,
}

impl AttributeDef {
    /// Nullable attribute stored in a column of the same name.
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            column: name.into(),
            value_type,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn column(mut self, column: &str) -> Self {
        self.column = column.into();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_name(&self) -> &str {
        &self.column
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}

/// Direction of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The owning entity holds the foreign key (`member.team`).
    ManyToOne,
    /// The target entity holds the foreign key (`team.members`).
    OneToMany,
}

/// Pre-registered association between two entity types.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDef {
    name: Arc<str>,
    target: Arc<str>,
    cardinality: Cardinality,
    foreign_key: Arc<str>,
}

impl RelationshipDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Foreign-key attribute: on the owner for many-to-one, on the target for
    /// one-to-many.
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }
}

/// An entity type: a table with typed attributes and relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    name: Arc<str>,
    table: Arc<str>,
    alias: Arc<str>,
    attributes: Vec<AttributeDef>,
    relationships: Vec<RelationshipDef>,
    key_index: usize,
}

impl EntityDef {
    /// New entity; table and default alias default to the lowercased name.
    pub fn new(name: &str) -> Self {
        let lower = name.to_lowercase();
        Self {
            name: name.into(),
            table: lower.as_str().into(),
            alias: lower.as_str().into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            key_index: 0,
        }
    }

    pub fn table(mut self, table: &str) -> Self {
        self.table = table.into();
        self
    }

    /// Default alias used by [`Schema::entity`].
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn many_to_one(self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relationship(name, target, Cardinality::ManyToOne, foreign_key)
    }

    pub fn one_to_many(self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relationship(name, target, Cardinality::OneToMany, foreign_key)
    }

    pub fn relationship(
        mut self,
        name: &str,
        target: &str,
        cardinality: Cardinality,
        foreign_key: &str,
    ) -> Self {
        self.relationships.push(RelationshipDef {
            name: name.into(),
            target: target.into(),
            cardinality,
            foreign_key: foreign_key.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn default_alias(&self) -> &str {
        &self.alias
    }

    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    pub fn relationships(&self) -> &[RelationshipDef] {
        &self.relationships
    }

    pub fn find_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| &*a.name == name)
    }

    pub(crate) fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| &*a.name == name)
    }

    pub fn find_relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| &*r.name == name)
    }

    /// The primary-key attribute. Registered entities always have one.
    pub fn primary_key(&self) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.primary_key)
    }

    /// Position of the primary key, valid once the entity is registered.
    pub(crate) fn key_index(&self) -> usize {
        self.key_index
    }
}

/// Immutable registry of entity types.
#[derive(Debug)]
pub struct Schema {
    entities: Vec<Arc<EntityDef>>,
    by_name: HashMap<Arc<str>, usize>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Path to an entity under its default alias.
    pub fn entity(self: &Arc<Self>, name: &str) -> QueryResult<EntityPath> {
        let def = self
            .definition(name)
            .ok_or_else(|| QueryError::UnknownEntity(name.to_string()))?;
        Ok(EntityPath::new(Arc::clone(self), Arc::clone(def)))
    }

    pub fn definition(&self, name: &str) -> Option<&Arc<EntityDef>> {
        self.by_name.get(name).map(|&idx| &self.entities[idx])
    }

    /// Entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityDef>> {
        self.entities.iter()
    }
}

/// Collects entity definitions and validates them into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDef>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate all definitions and freeze them.
    pub fn build(self) -> QueryResult<Arc<Schema>> {
        let mut by_name = HashMap::new();
        let mut aliases = HashSet::new();
        let mut entities = Vec::with_capacity(self.entities.len());

        for (idx, mut entity) in self.entities.into_iter().enumerate() {
            if by_name.insert(Arc::clone(&entity.name), idx).is_some() {
                return Err(QueryError::InvalidSchema(format!(
                    "entity `{}` is registered twice",
                    entity.name
                )));
            }
            if !aliases.insert(Arc::clone(&entity.alias)) {
                return Err(QueryError::InvalidSchema(format!(
                    "default alias `{}` of entity `{}` is already used",
                    entity.alias, entity.name
                )));
            }
            entity.key_index = validate_attributes(&entity)?;
            entities.push(entity);
        }

        for entity in &entities {
            for rel in &entity.relationships {
                validate_relationship(entity, rel, &entities, &by_name)?;
            }
        }

        Ok(Arc::new(Schema {
            entities: entities.into_iter().map(Arc::new).collect(),
            by_name,
        }))
    }
}

fn validate_attributes(entity: &EntityDef) -> QueryResult<usize> {
    let mut names = HashSet::new();
    for attr in &entity.attributes {
        if !names.insert(&*attr.name) {
            return Err(QueryError::InvalidSchema(format!(
                "attribute `{}.{}` is declared twice",
                entity.name, attr.name
            )));
        }
    }

    let mut keys = entity
        .attributes
        .iter()
        .enumerate()
        .filter(|(_, a)| a.primary_key)
        .map(|(idx, _)| idx);
    match (keys.next(), keys.next()) {
        (Some(idx), None) => Ok(idx),
        (None, _) => Err(QueryError::InvalidSchema(format!(
            "entity `{}` has no primary key",
            entity.name
        ))),
        (Some(_), Some(_)) => Err(QueryError::InvalidSchema(format!(
            "entity `{}` declares more than one primary key",
            entity.name
        ))),
    }
}

fn validate_relationship(
    entity: &EntityDef,
    rel: &RelationshipDef,
    entities: &[EntityDef],
    by_name: &HashMap<Arc<str>, usize>,
) -> QueryResult<()> {
    let target = by_name
        .get(&rel.target)
        .map(|&idx| &entities[idx])
        .ok_or_else(|| {
            QueryError::InvalidSchema(format!(
                "relationship `{}.{}` targets unknown entity `{}`",
                entity.name, rel.name, rel.target
            ))
        })?;

    // The foreign key lives on the side that references the other's primary key.
    let (holder, referenced) = match rel.cardinality {
        Cardinality::ManyToOne => (entity, target),
        Cardinality::OneToMany => (target, entity),
    };
    let fk = holder.find_attribute(&rel.foreign_key).ok_or_else(|| {
        QueryError::InvalidSchema(format!(
            "relationship `{}.{}` uses foreign key `{}` which `{}` does not declare",
            entity.name, rel.name, rel.foreign_key, holder.name
        ))
    })?;
    let pk = &referenced.attributes[referenced.key_index];
    if !fk.value_type.is_comparable_with(pk.value_type) {
        return Err(QueryError::InvalidSchema(format!(
            "foreign key `{}.{}` is {} but `{}.{}` is {}",
            holder.name, fk.name, fk.value_type, referenced.name, pk.name, pk.value_type
        )));
    }
    Ok(())
}
