//! Schemas registered from TOML files.

use quarry::prelude::*;

fn demo_schema_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/team_member.toml")
}

#[test]
fn test_load_demo_schema() {
    let schema = SchemaBuilder::from_file(demo_schema_path())
        .unwrap()
        .build()
        .unwrap();

    let names: Vec<&str> = schema.entities().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Team", "Member"]);

    let member = schema.definition("Member").unwrap();
    assert_eq!(member.table_name(), "member");
    assert_eq!(member.primary_key().unwrap().name(), "id");
    assert!(!member.find_attribute("age").unwrap().is_nullable());
    assert!(member.find_attribute("username").unwrap().is_nullable());

    let team_rel = member.find_relationship("team").unwrap();
    assert_eq!(team_rel.target(), "Team");
    assert_eq!(team_rel.cardinality(), Cardinality::ManyToOne);

    let members_rel = schema
        .definition("Team")
        .unwrap()
        .find_relationship("members")
        .unwrap();
    assert_eq!(members_rel.cardinality(), Cardinality::OneToMany);
    assert_eq!(members_rel.foreign_key(), "team_id");
}

#[test]
fn test_loaded_schema_round_trip() {
    let schema = SchemaBuilder::from_file(demo_schema_path())
        .unwrap()
        .build()
        .unwrap();
    let db = SqliteBackend::open_in_memory().unwrap();
    db.create_schema(&schema).unwrap();

    let team = schema.entity("Team").unwrap();
    let member = schema.entity("Member").unwrap();
    Insert::into(&team)
        .value("id", 1)
        .unwrap()
        .value("name", "teamA")
        .unwrap()
        .execute(&db)
        .unwrap();
    Insert::into(&member)
        .value("id", 1)
        .unwrap()
        .value("age", 10)
        .unwrap()
        .value("team_id", 1)
        .unwrap()
        .execute(&db)
        .unwrap();

    let found = select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .fetch_join()
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();
    assert_eq!(found.get("username"), Some(&Value::Null));
    assert_eq!(
        found.related("team").and_then(|t| t.get("name")),
        Some(&Value::Text("teamA".into()))
    );
}

#[test]
fn test_foreign_keys_enforced_from_settings() {
    let schema = SchemaBuilder::from_file(demo_schema_path())
        .unwrap()
        .build()
        .unwrap();
    let db = SqliteBackend::from_settings(&quarry::config::Settings::default()).unwrap();
    db.create_schema(&schema).unwrap();

    let member = schema.entity("Member").unwrap();
    let err = Insert::into(&member)
        .value("id", 1)
        .unwrap()
        .value("age", 10)
        .unwrap()
        .value("team_id", 99)
        .unwrap()
        .execute(&db)
        .unwrap_err();
    assert!(matches!(err, QueryError::Backend { .. }));
}

#[test]
fn test_unknown_field_rejected() {
    let source = r#"
[[entity]]
name = "Tag"
colour = "red"
"#;
    assert!(matches!(
        SchemaBuilder::from_toml(source),
        Err(QueryError::InvalidSchema(_))
    ));
}

#[test]
fn test_relationship_to_unknown_entity() {
    let source = r#"
[[entity]]
name = "Member"

[[entity.attribute]]
name = "id"
type = "int"
primary_key = true

[[entity.attribute]]
name = "team_id"
type = "int"

[[entity.relationship]]
name = "team"
target = "Team"
cardinality = "many_to_one"
foreign_key = "team_id"
"#;
    let err = SchemaBuilder::from_toml(source).unwrap().build().unwrap_err();
    assert!(matches!(err, QueryError::InvalidSchema(msg) if msg.contains("Team")));
}

#[test]
fn test_missing_schema_file() {
    let err = SchemaBuilder::from_file("does/not/exist.toml").unwrap_err();
    assert!(matches!(err, QueryError::InvalidSchema(msg) if msg.contains("cannot read")));
}
