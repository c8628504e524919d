//! Shared Team/Member fixture for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use quarry::prelude::*;

pub fn schema() -> Arc<Schema> {
    SchemaBuilder::new()
        .entity(
            EntityDef::new("Team")
                .attribute(AttributeDef::new("id", ValueType::Int).primary_key())
                .attribute(AttributeDef::new("name", ValueType::Text).not_null())
                .one_to_many("members", "Member", "team_id"),
        )
        .entity(
            EntityDef::new("Member")
                .attribute(AttributeDef::new("id", ValueType::Int).primary_key())
                .attribute(AttributeDef::new("username", ValueType::Text))
                .attribute(AttributeDef::new("age", ValueType::Int).not_null())
                .attribute(AttributeDef::new("team_id", ValueType::Int))
                .many_to_one("team", "Team", "team_id"),
        )
        .build()
        .unwrap()
}

/// teamA holds member1 (10) and member2 (20); teamB holds member3 (30) and member4 (40).
pub fn setup() -> (Arc<Schema>, SqliteBackend) {
    let schema = schema();
    let db = SqliteBackend::open_in_memory().unwrap();
    db.create_schema(&schema).unwrap();

    insert_team(&schema, &db, 1, "teamA");
    insert_team(&schema, &db, 2, "teamB");
    insert_member(&schema, &db, 1, Some("member1"), 10, Some(1));
    insert_member(&schema, &db, 2, Some("member2"), 20, Some(1));
    insert_member(&schema, &db, 3, Some("member3"), 30, Some(2));
    insert_member(&schema, &db, 4, Some("member4"), 40, Some(2));
    (schema, db)
}

pub fn insert_team(schema: &Arc<Schema>, db: &SqliteBackend, id: i64, name: &str) {
    let team = schema.entity("Team").unwrap();
    Insert::into(&team)
        .value("id", id)
        .unwrap()
        .value("name", name)
        .unwrap()
        .execute(db)
        .unwrap();
}

pub fn insert_member(
    schema: &Arc<Schema>,
    db: &SqliteBackend,
    id: i64,
    username: Option<&str>,
    age: i64,
    team_id: Option<i64>,
) {
    let member = schema.entity("Member").unwrap();
    Insert::into(&member)
        .value("id", id)
        .unwrap()
        .value("username", username)
        .unwrap()
        .value("age", age)
        .unwrap()
        .value("team_id", team_id)
        .unwrap()
        .execute(db)
        .unwrap();
}

/// Usernames of entities, in order; NULL usernames as `None`.
pub fn usernames(members: &[Entity]) -> Vec<Option<String>> {
    members
        .iter()
        .map(|m| m.get("username").and_then(Value::as_str).map(str::to_string))
        .collect()
}

pub fn ages(members: &[Entity]) -> Vec<i64> {
    members
        .iter()
        .map(|m| m.get("age").and_then(Value::as_i64).unwrap())
        .collect()
}
