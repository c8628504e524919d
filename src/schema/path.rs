//! Typed handles into a registered schema.

use std::fmt;
use std::sync::Arc;

use super::{AttributeDef, Cardinality, EntityDef, RelationshipDef, Schema, ValueType};
use crate::error::{QueryError, QueryResult};
use crate::sql::expr::{AggregateFunc, Expr, ExprExt};

/// A registered entity bound to an alias namespace.
///
/// `schema.entity("Member")` yields the default alias; `with_alias` gives a
/// second, independent namespace over the same entity (needed for subqueries
/// and self joins).
#[derive(Clone)]
pub struct EntityPath {
    schema: Arc<Schema>,
    entity: Arc<EntityDef>,
    alias: Arc<str>,
}

impl EntityPath {
    pub(crate) fn new(schema: Arc<Schema>, entity: Arc<EntityDef>) -> Self {
        let alias = Arc::clone(&entity.alias);
        Self {
            schema,
            entity,
            alias,
        }
    }

    pub fn with_alias(&self, alias: &str) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            entity: Arc::clone(&self.entity),
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) fn alias_arc(&self) -> &Arc<str> {
        &self.alias
    }

    pub fn entity_name(&self) -> &str {
        &self.entity.name
    }

    pub fn definition(&self) -> &EntityDef {
        &self.entity
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Column reference for an attribute of this entity under this alias.
    pub fn column(&self, attribute: &str) -> QueryResult<ColumnRef> {
        self.entity
            .find_attribute(attribute)
            .map(|attr| self.column_for(attr))
            .ok_or_else(|| QueryError::UnknownAttribute {
                entity: self.entity.name.to_string(),
                attribute: attribute.to_string(),
            })
    }

    pub fn primary_key(&self) -> ColumnRef {
        self.column_for(&self.entity.attributes[self.entity.key_index()])
    }

    /// All attribute columns in declaration order.
    pub fn columns(&self) -> Vec<ColumnRef> {
        self.entity
            .attributes
            .iter()
            .map(|attr| self.column_for(attr))
            .collect()
    }

    pub fn relationship(&self, name: &str) -> QueryResult<RelationshipRef> {
        let def = self.entity.find_relationship(name).ok_or_else(|| {
            QueryError::UnknownRelationship {
                entity: self.entity.name.to_string(),
                relationship: name.to_string(),
            }
        })?;
        let target = self.schema.definition(def.target()).ok_or_else(|| {
            QueryError::UnknownEntity(def.target().to_string())
        })?;
        Ok(RelationshipRef {
            source: self.clone(),
            def: def.clone(),
            target: Arc::clone(target),
        })
    }

    /// `count(alias.pk)`, the entity-count aggregate.
    pub fn count(&self) -> Expr {
        Expr::Aggregate {
            func: AggregateFunc::Count,
            arg: Some(Box::new(Expr::Column(self.primary_key()))),
            distinct: false,
        }
    }

    pub(crate) fn same_entity(&self, other: &EntityDef) -> bool {
        self.entity.name == other.name
    }

    fn column_for(&self, attr: &AttributeDef) -> ColumnRef {
        ColumnRef {
            alias: Arc::clone(&self.alias),
            entity: Arc::clone(&self.entity.name),
            attribute: Arc::clone(&attr.name),
            column: Arc::clone(&attr.column),
            value_type: attr.value_type,
            nullable: attr.nullable,
        }
    }
}

impl PartialEq for EntityPath {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias && self.entity.name == other.entity.name
    }
}

impl fmt::Debug for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPath")
            .field("entity", &self.entity.name)
            .field("alias", &self.alias)
            .finish()
    }
}

/// Typed reference to one attribute of an aliased entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    alias: Arc<str>,
    entity: Arc<str>,
    attribute: Arc<str>,
    column: Arc<str>,
    value_type: ValueType,
    nullable: bool,
}

impl ColumnRef {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn entity_name(&self) -> &str {
        &self.entity
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
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
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.attribute)
    }
}

/// A relationship of an aliased entity, e.g. `member.team`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRef {
    source: EntityPath,
    def: RelationshipDef,
    target: Arc<EntityDef>,
}

impl RelationshipRef {
    pub fn source(&self) -> &EntityPath {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn target_entity(&self) -> &str {
        &self.target.name
    }

    pub(crate) fn target_definition(&self) -> &EntityDef {
        &self.target
    }

    pub fn cardinality(&self) -> Cardinality {
        self.def.cardinality()
    }

    pub fn definition(&self) -> &RelationshipDef {
        &self.def
    }

    /// Join condition between the source alias and `target`, derived from
    /// the foreign key.
    pub(crate) fn join_condition(&self, target: &EntityPath) -> QueryResult<Expr> {
        match self.def.cardinality() {
            Cardinality::ManyToOne => self
                .source
                .column(self.def.foreign_key())?
                .eq(target.primary_key()),
            Cardinality::OneToMany => self
                .source
                .primary_key()
                .eq(target.column(self.def.foreign_key())?),
        }
    }
}

impl fmt::Display for RelationshipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source.alias(), self.def.name())
    }
}
