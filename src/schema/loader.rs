//! TOML schema files.
//!
//! ```toml
//! [[entity]]
//! name = "Member"
//! table = "member"
//!
//! [[entity.attribute]]
//! name = "id"
//! type = "int"
//! primary_key = true
//!
//! [[entity.attribute]]
//! name = "team_id"
//! type = "int"
//!
//! [[entity.relationship]]
//! name = "team"
//! target = "Team"
//! cardinality = "many_to_one"
//! foreign_key = "team_id"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{AttributeDef, Cardinality, EntityDef, SchemaBuilder, ValueType};
use crate::error::{QueryError, QueryResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default, rename = "entity")]
    entities: Vec<EntityEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityEntry {
    name: String,
    table: Option<String>,
    alias: Option<String>,
    #[serde(default, rename = "attribute")]
    attributes: Vec<AttributeEntry>,
    #[serde(default, rename = "relationship")]
    relationships: Vec<RelationshipEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeEntry {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    column: Option<String>,
    #[serde(default = "default_nullable")]
    nullable: bool,
    #[serde(default)]
    primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationshipEntry {
    name: String,
    target: String,
    cardinality: Cardinality,
    foreign_key: String,
}

impl SchemaBuilder {
    /// Parse entity definitions from TOML.
    pub fn from_toml(source: &str) -> QueryResult<Self> {
        let file: SchemaFile =
            toml::from_str(source).map_err(|e| QueryError::InvalidSchema(e.to_string()))?;
        Ok(file
            .entities
            .into_iter()
            .fold(SchemaBuilder::new(), |builder, entry| {
                builder.entity(entry.into_definition())
            }))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> QueryResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            QueryError::InvalidSchema(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&source)
    }
}

impl EntityEntry {
    fn into_definition(self) -> EntityDef {
        let mut def = EntityDef::new(&self.name);
        if let Some(table) = &self.table {
            def = def.table(table);
        }
        if let Some(alias) = &self.alias {
            def = def.alias(alias);
        }
        for attr in self.attributes {
            let mut a = AttributeDef::new(&attr.name, attr.value_type);
            if let Some(column) = &attr.column {
                a = a.column(column);
            }
            if !attr.nullable {
                a = a.not_null();
            }
            if attr.primary_key {
                a = a.primary_key();
            }
            def = def.attribute(a);
        }
        for rel in self.relationships {
            def = def.relationship(&rel.name, &rel.target, rel.cardinality, &rel.foreign_key);
        }
        def
    }
}
