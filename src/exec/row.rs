//! Result rows.
//!
//! Raw backend rows are decoded against the [`RowLayout`] computed when the
//! plan was compiled. Entities keep their attribute values in declaration
//! order and one [`Relation`] slot per relationship of their entity type.

use std::collections::HashMap;
use std::sync::Arc;

use super::Backend;
use crate::error::{QueryError, QueryResult};
use crate::query::compile::{EntityLayout, RowLayout, Slot};
use crate::query::{select_from, Projection, Shape};
use crate::schema::{Cardinality, EntityPath, ValueType};
use crate::sql::expr::{Expr, ExprExt, Value};

/// State of one relationship slot of a decoded entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Not fetched. `key` is the value that identifies the related rows:
    /// the foreign key for to-one, the owner's primary key for to-many.
    NotLoaded { key: Value },
    /// To-one relation; `None` if no row is related.
    Loaded(Option<Box<Entity>>),
    LoadedMany(Vec<Entity>),
}

impl Relation {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Relation::NotLoaded { .. })
    }
}

/// A decoded entity row.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    path: EntityPath,
    values: Vec<Value>,
    relations: Vec<(String, Relation)>,
}

impl Entity {
    pub fn entity_name(&self) -> &str {
        self.path.entity_name()
    }

    pub fn alias(&self) -> &str {
        self.path.alias()
    }

    /// Value of an attribute; `None` for an unknown attribute.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.path
            .definition()
            .attribute_index(attribute)
            .and_then(|i| self.values.get(i))
    }

    /// Primary key value.
    pub fn id(&self) -> &Value {
        &self.values[self.path.definition().key_index()]
    }

    /// Attribute values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.relation(name).is_some_and(Relation::is_loaded)
    }

    /// Loaded to-one relation.
    pub fn related(&self, name: &str) -> Option<&Entity> {
        match self.relation(name) {
            Some(Relation::Loaded(Some(entity))) => Some(entity),
            _ => None,
        }
    }

    /// Loaded to-many relation; empty if not loaded.
    pub fn related_many(&self, name: &str) -> &[Entity] {
        match self.relation(name) {
            Some(Relation::LoadedMany(entities)) => entities,
            _ => &[],
        }
    }

    /// Load a relation with a secondary query and store it in its slot.
    ///
    /// A relation that is already loaded is returned as is.
    pub fn load_relation<B: Backend + ?Sized>(
        &mut self,
        name: &str,
        backend: &B,
    ) -> QueryResult<&Relation> {
        let index = self
            .relations
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| QueryError::UnknownRelationship {
                entity: self.entity_name().to_string(),
                relationship: name.to_string(),
            })?;

        if let Relation::NotLoaded { key } = &self.relations[index].1 {
            let relationship = self.path.relationship(name)?;
            let target = self.path.schema().entity(relationship.target_entity())?;
            let loaded = match relationship.cardinality() {
                Cardinality::ManyToOne if key.is_null() => Relation::Loaded(None),
                Cardinality::ManyToOne => {
                    let found = select_from(&target)
                        .filter(target.primary_key().eq(key.clone())?)?
                        .fetch_one(backend)?;
                    Relation::Loaded(found.map(Box::new))
                }
                Cardinality::OneToMany => {
                    let foreign_key = target.column(relationship.definition().foreign_key())?;
                    let found = select_from(&target)
                        .filter(foreign_key.eq(key.clone())?)?
                        .order_by([target.primary_key().asc()])
                        .fetch(backend)?;
                    Relation::LoadedMany(found)
                }
            };
            tracing::debug!(
                entity = self.entity_name(),
                relation = name,
                "loaded relation"
            );
            self.relations[index].1 = loaded;
        }
        Ok(&self.relations[index].1)
    }

    /// Attributes and loaded relations as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (attr, value) in self.path.definition().attributes().iter().zip(&self.values) {
            map.insert(attr.name().to_string(), value_to_json(value));
        }
        for (name, relation) in &self.relations {
            let json = match relation {
                Relation::NotLoaded { .. } => continue,
                Relation::Loaded(None) => serde_json::Value::Null,
                Relation::Loaded(Some(entity)) => entity.to_json(),
                Relation::LoadedMany(entities) => {
                    serde_json::Value::Array(entities.iter().map(Entity::to_json).collect())
                }
            };
            map.insert(name.clone(), json);
        }
        serde_json::Value::Object(map)
    }

    /// Fold the fetched relations of `other`, a row of the same entity, into self.
    fn merge(&mut self, other: Entity) {
        for (name, incoming) in other.relations {
            let Some((_, existing)) = self.relations.iter_mut().find(|(n, _)| *n == name) else {
                continue;
            };
            match (existing, incoming) {
                (Relation::LoadedMany(mine), Relation::LoadedMany(theirs)) => {
                    for entity in theirs {
                        match mine.iter_mut().find(|e| e.id() == entity.id()) {
                            Some(known) => known.merge(entity),
                            None => mine.push(entity),
                        }
                    }
                }
                (Relation::Loaded(Some(mine)), Relation::Loaded(Some(theirs))) => {
                    mine.merge(*theirs)
                }
                _ => {}
            }
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// A decoded tuple row, addressable by the projection that produced each item.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    projections: Arc<[Projection]>,
    items: Vec<TupleItem>,
}

#[derive(Debug, Clone, PartialEq)]
enum TupleItem {
    Value(Value),
    Entity(Option<Entity>),
}

impl Tuple {
    /// Value of the item selected with `expr`.
    pub fn get(&self, expr: impl Into<Expr>) -> Option<&Value> {
        let expr = expr.into();
        let index = self
            .projections
            .iter()
            .position(|p| matches!(p, Projection::Expr(e) if *e == expr))?;
        self.value(index)
    }

    /// Entity selected with `path`; `None` if absent or NULL on an outer join.
    pub fn entity(&self, path: &EntityPath) -> Option<&Entity> {
        let index = self
            .projections
            .iter()
            .position(|p| matches!(p, Projection::Entity(e) if e == path))?;
        match self.items.get(index) {
            Some(TupleItem::Entity(entity)) => entity.as_ref(),
            _ => None,
        }
    }

    /// Value at a position of the select list.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.items.get(index) {
            Some(TupleItem::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.items
                .iter()
                .map(|item| match item {
                    TupleItem::Value(value) => value_to_json(value),
                    TupleItem::Entity(Some(entity)) => entity.to_json(),
                    TupleItem::Entity(None) => serde_json::Value::Null,
                })
                .collect(),
        )
    }
}

/// One decoded row, shaped by the query's projections.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRow {
    Scalar(Value),
    /// `None` when the entity's primary key is NULL (unmatched outer join).
    Entity(Option<Entity>),
    Tuple(Tuple),
}

impl ResultRow {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ResultRow::Scalar(value) => value_to_json(value),
            ResultRow::Entity(Some(entity)) => entity.to_json(),
            ResultRow::Entity(None) => serde_json::Value::Null,
            ResultRow::Tuple(tuple) => tuple.to_json(),
        }
    }
}

/// Conversion from a decoded row into a query's row type.
pub trait FromResultRow: Sized {
    fn from_result_row(row: ResultRow) -> QueryResult<Self>;
}

impl FromResultRow for ResultRow {
    fn from_result_row(row: ResultRow) -> QueryResult<Self> {
        Ok(row)
    }
}

impl FromResultRow for Value {
    fn from_result_row(row: ResultRow) -> QueryResult<Self> {
        match row {
            ResultRow::Scalar(value) => Ok(value),
            other => Err(QueryError::Decode(format!("expected a scalar row, got {:?}", other))),
        }
    }
}

impl FromResultRow for Entity {
    fn from_result_row(row: ResultRow) -> QueryResult<Self> {
        match row {
            ResultRow::Entity(Some(entity)) => Ok(entity),
            ResultRow::Entity(None) => Err(QueryError::Decode(
                "entity row has a NULL primary key".into(),
            )),
            other => Err(QueryError::Decode(format!("expected an entity row, got {:?}", other))),
        }
    }
}

/// Entity rows that may be missing, as for the target of an outer join.
impl FromResultRow for Option<Entity> {
    fn from_result_row(row: ResultRow) -> QueryResult<Self> {
        match row {
            ResultRow::Entity(entity) => Ok(entity),
            other => Err(QueryError::Decode(format!("expected an entity row, got {:?}", other))),
        }
    }
}

impl FromResultRow for Tuple {
    fn from_result_row(row: ResultRow) -> QueryResult<Self> {
        match row {
            ResultRow::Tuple(tuple) => Ok(tuple),
            other => Err(QueryError::Decode(format!("expected a tuple row, got {:?}", other))),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

impl RowLayout {
    pub(crate) fn decode(&self, rows: Vec<Vec<Value>>) -> QueryResult<Vec<ResultRow>> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() < self.width {
                return Err(QueryError::Decode(format!(
                    "expected {} columns, got {}",
                    self.width,
                    row.len()
                )));
            }
            out.push(self.decode_row(row)?);
        }

        if self.collection_fetch {
            out = merge_by_key(out);
            let offset = usize::try_from(self.offset.unwrap_or(0)).unwrap_or(usize::MAX);
            let limit = self
                .limit
                .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
            out = out.into_iter().skip(offset).take(limit).collect();
        }
        tracing::trace!(rows = out.len(), "decoded rows");
        Ok(out)
    }

    fn decode_row(&self, mut row: Vec<Value>) -> QueryResult<ResultRow> {
        let mut items = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            items.push(match slot {
                Slot::Scalar { index, value_type } => {
                    let raw = std::mem::replace(&mut row[*index], Value::Null);
                    TupleItem::Value(coerce(raw, *value_type)?)
                }
                Slot::Entity(layout) => TupleItem::Entity(decode_entity(layout, &row)?),
            });
        }

        match self.shape {
            Shape::Scalar | Shape::Entity if items.len() == 1 => {
                Ok(match items.pop() {
                    Some(TupleItem::Value(value)) => ResultRow::Scalar(value),
                    Some(TupleItem::Entity(entity)) => ResultRow::Entity(entity),
                    None => ResultRow::Scalar(Value::Null),
                })
            }
            Shape::Scalar | Shape::Entity => Err(QueryError::Decode(format!(
                "expected one projection, found {}",
                items.len()
            ))),
            Shape::Tuple => Ok(ResultRow::Tuple(Tuple {
                projections: Arc::clone(&self.projections),
                items,
            })),
        }
    }
}

fn coerce(value: Value, ty: Option<ValueType>) -> QueryResult<Value> {
    match ty {
        None => Ok(value),
        Some(ty) => value
            .coerce(ty)
            .map_err(|v| QueryError::Decode(format!("cannot read {} as {}", v, ty))),
    }
}

fn decode_entity(layout: &EntityLayout, row: &[Value]) -> QueryResult<Option<Entity>> {
    let def = layout.path.definition();
    let width = def.attributes().len();
    let raw = &row[layout.start..layout.start + width];
    if raw[def.key_index()].is_null() {
        return Ok(None);
    }

    let mut values = Vec::with_capacity(width);
    for (attr, value) in def.attributes().iter().zip(raw) {
        values.push(coerce(value.clone(), Some(attr.value_type()))?);
    }

    let mut relations = Vec::with_capacity(def.relationships().len());
    for rel in def.relationships() {
        let fetched = layout.fetched.iter().find(|f| f.name == rel.name());
        let relation = match fetched {
            Some(f) => match f.cardinality {
                Cardinality::ManyToOne => {
                    Relation::Loaded(decode_entity(&f.layout, row)?.map(Box::new))
                }
                Cardinality::OneToMany => {
                    Relation::LoadedMany(decode_entity(&f.layout, row)?.into_iter().collect())
                }
            },
            None => match rel.cardinality() {
                Cardinality::ManyToOne => Relation::NotLoaded {
                    key: def
                        .attribute_index(rel.foreign_key())
                        .map_or(Value::Null, |i| values[i].clone()),
                },
                Cardinality::OneToMany => Relation::NotLoaded {
                    key: values[def.key_index()].clone(),
                },
            },
        };
        relations.push((rel.name().to_string(), relation));
    }

    Ok(Some(Entity {
        path: layout.path.clone(),
        values,
        relations,
    }))
}

/// Hashable view of a primary key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Null,
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ValueKey::Null,
            Value::Int(n) => ValueKey::Int(*n),
            Value::Float(f) => ValueKey::Float(f.to_bits()),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Bool(b) => ValueKey::Bool(*b),
        }
    }
}

/// Merge entity rows sharing a primary key, keeping first-seen order.
fn merge_by_key(rows: Vec<ResultRow>) -> Vec<ResultRow> {
    let mut merged: Vec<ResultRow> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<ValueKey, usize> = HashMap::new();
    for row in rows {
        match row {
            ResultRow::Entity(Some(entity)) => {
                let key = ValueKey::from(entity.id());
                match seen.get(&key) {
                    Some(&i) => {
                        if let ResultRow::Entity(Some(existing)) = &mut merged[i] {
                            existing.merge(entity);
                        }
                    }
                    None => {
                        seen.insert(key, merged.len());
                        merged.push(ResultRow::Entity(Some(entity)));
                    }
                }
            }
            other => merged.push(other),
        }
    }
    merged
}
