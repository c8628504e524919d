//! Fetch joins and lazy relation loading.

#[path = "../common/mod.rs"]
mod common;

use common::{insert_member, insert_team, setup, usernames};
use quarry::prelude::*;

#[test]
fn test_plain_query_leaves_relation_not_loaded() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();

    let found = select_from(&member)
        .filter(member.column("username").unwrap().eq("member1").unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();

    assert!(!found.is_loaded("team"));
    assert_eq!(
        found.relation("team"),
        Some(&Relation::NotLoaded { key: Value::Int(1) })
    );
    assert!(found.related("team").is_none());
}

#[test]
fn test_fetch_join_loads_relation() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let found = select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .fetch_join()
        .unwrap()
        .filter(member.column("username").unwrap().eq("member1").unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();

    assert!(found.is_loaded("team"));
    let loaded = found.related("team").unwrap();
    assert_eq!(loaded.entity_name(), "Team");
    assert_eq!(loaded.get("name"), Some(&Value::Text("teamA".into())));
}

#[test]
fn test_left_fetch_join_without_partner() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, Some("loner"), 50, None);
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let found = select_from(&member)
        .left_join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .fetch_join()
        .unwrap()
        .filter(member.column("id").unwrap().eq(5).unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();

    assert!(found.is_loaded("team"));
    assert_eq!(found.relation("team"), Some(&Relation::Loaded(None)));
}

#[test]
fn test_collection_fetch_merges_rows() {
    let (schema, db) = setup();
    insert_team(&schema, &db, 3, "teamC");
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let teams: Vec<Entity> = select_from(&team)
        .left_join(team.relationship("members").unwrap(), &member)
        .unwrap()
        .fetch_join()
        .unwrap()
        .order_by([
            team.column("id").unwrap().asc(),
            member.column("id").unwrap().asc(),
        ])
        .fetch(&db)
        .unwrap();

    assert_eq!(teams.len(), 3);
    assert_eq!(
        usernames(teams[0].related_many("members")),
        vec![Some("member1".to_string()), Some("member2".to_string())]
    );
    assert_eq!(
        usernames(teams[1].related_many("members")),
        vec![Some("member3".to_string()), Some("member4".to_string())]
    );
    assert!(teams[2].is_loaded("members"));
    assert!(teams[2].related_many("members").is_empty());
}

#[test]
fn test_collection_fetch_pages_owners() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let query = select_from(&team)
        .join(team.relationship("members").unwrap(), &member)
        .unwrap()
        .fetch_join()
        .unwrap()
        .order_by([team.column("id").unwrap().desc()])
        .limit(1);

    let teams: Vec<Entity> = query.clone().fetch(&db).unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].get("name"), Some(&Value::Text("teamB".into())));
    assert_eq!(teams[0].related_many("members").len(), 2);

    assert_eq!(query.fetch_count(&db).unwrap(), 2);
}

#[test]
fn test_load_relation_lazily() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let mut found = select_from(&member)
        .filter(member.column("id").unwrap().eq(3).unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();
    let relation = found.load_relation("team", &db).unwrap();
    assert!(relation.is_loaded());
    assert_eq!(
        found.related("team").and_then(|t| t.get("name")),
        Some(&Value::Text("teamB".into()))
    );

    let mut team_a = select_from(&team)
        .filter(team.column("name").unwrap().eq("teamA").unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();
    assert!(!team_a.is_loaded("members"));
    team_a.load_relation("members", &db).unwrap();
    assert_eq!(
        usernames(team_a.related_many("members")),
        vec![Some("member1".to_string()), Some("member2".to_string())]
    );
}

#[test]
fn test_load_unknown_relation() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();

    let mut found = select_from(&member).fetch_first(&db).unwrap().unwrap();
    assert!(matches!(
        found.load_relation("friends", &db),
        Err(QueryError::UnknownRelationship { .. })
    ));
}

#[test]
fn test_fetch_join_needs_relationship() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let err = select_from(&member)
        .join_entity(&team)
        .unwrap()
        .on(member
            .column("team_id")
            .unwrap()
            .eq(team.column("id").unwrap())
            .unwrap())
        .unwrap()
        .fetch_join()
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { .. }));

    let err = select_from(&member).fetch_join().unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { .. }));
}
