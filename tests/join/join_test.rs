//! Relationship joins, theta joins and on-predicates.

#[path = "../common/mod.rs"]
mod common;

use common::{insert_member, setup, usernames};
use quarry::prelude::*;

#[test]
fn test_inner_join_on_relationship() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let found: Vec<Entity> = select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .filter(team.column("name").unwrap().eq("teamA").unwrap())
        .unwrap()
        .order_by([member.column("id").unwrap().asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(
        usernames(&found),
        vec![Some("member1".to_string()), Some("member2".to_string())]
    );
}

#[test]
fn test_inner_join_drops_rows_without_partner() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, Some("loner"), 50, None);
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let joined = select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .fetch_count(&db)
        .unwrap();
    let outer = select_from(&member)
        .left_join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .fetch_count(&db)
        .unwrap();

    assert_eq!(joined, 4);
    assert_eq!(outer, 5);
}

#[test]
fn test_left_join_with_on_filter() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let rows: Vec<Tuple> = select_tuple([&member, &team])
        .from(&member)
        .unwrap()
        .left_join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .on(team.column("name").unwrap().eq("teamA").unwrap())
        .unwrap()
        .order_by([member.column("id").unwrap().asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(rows.len(), 4);
    let teams: Vec<Option<Value>> = rows
        .iter()
        .map(|row| row.entity(&team).and_then(|t| t.get("name")).cloned())
        .collect();
    assert_eq!(
        teams,
        vec![
            Some(Value::Text("teamA".into())),
            Some(Value::Text("teamA".into())),
            None,
            None,
        ]
    );
    assert!(rows.iter().all(|row| row.entity(&member).is_some()));
}

#[test]
fn test_theta_join() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, Some("teamA"), 0, None);
    insert_member(&schema, &db, 6, Some("teamB"), 0, None);
    insert_member(&schema, &db, 7, Some("teamC"), 0, None);
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let found: Vec<Entity> = select_from(&member)
        .from(&team)
        .unwrap()
        .filter(
            member
                .column("username")
                .unwrap()
                .eq(team.column("name").unwrap())
                .unwrap(),
        )
        .unwrap()
        .order_by([member.column("id").unwrap().asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(
        usernames(&found),
        vec![Some("teamA".to_string()), Some("teamB".to_string())]
    );
}

#[test]
fn test_left_join_on_unrelated_entity() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, Some("teamA"), 0, None);
    insert_member(&schema, &db, 6, Some("teamB"), 0, None);
    insert_member(&schema, &db, 7, Some("teamC"), 0, None);
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let rows: Vec<Tuple> = select_tuple([&member, &team])
        .from(&member)
        .unwrap()
        .left_join_entity(&team)
        .unwrap()
        .on(member
            .column("username")
            .unwrap()
            .eq(team.column("name").unwrap())
            .unwrap())
        .unwrap()
        .order_by([member.column("id").unwrap().asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(rows.len(), 7);
    let matched: Vec<bool> = rows.iter().map(|row| row.entity(&team).is_some()).collect();
    assert_eq!(
        matched,
        vec![false, false, false, false, true, true, false]
    );
}

#[test]
fn test_on_with_and_without_relationship_differ() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();
    let is_team_a = || team.column("name").unwrap().eq("teamA").unwrap();

    let related = select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .on(is_team_a())
        .unwrap()
        .fetch_count(&db)
        .unwrap();
    let unrelated = select_from(&member)
        .join_entity(&team)
        .unwrap()
        .on(is_team_a())
        .unwrap()
        .fetch_count(&db)
        .unwrap();

    assert_eq!(related, 2);
    assert_eq!(unrelated, 4);
}

#[test]
fn test_cross_join_is_explicit() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let pairs = select_from(&member)
        .cross_join(&team)
        .unwrap()
        .fetch_count(&db)
        .unwrap();
    assert_eq!(pairs, 8);

    let err = select_from(&member)
        .cross_join(&team)
        .unwrap()
        .on(team.column("name").unwrap().eq("teamA").unwrap())
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { .. }));
}

#[test]
fn test_bare_join_is_ambiguous() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let err = select_from(&member)
        .join_entity(&team)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::AmbiguousJoin { alias } if alias == "team"));
}

#[test]
fn test_join_alias_conflict() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let err = select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .join(member.relationship("team").unwrap(), &team)
        .unwrap_err();
    assert!(matches!(err, QueryError::AliasConflict { alias, .. } if alias == "team"));

    // The same entity under a second alias is fine.
    let other = team.with_alias("otherTeam");
    assert!(select_from(&member)
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .cross_join(&other)
        .unwrap()
        .build()
        .is_ok());
}

#[test]
fn test_join_target_must_match_relationship() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let other = member.with_alias("other");

    let err = select_from(&member)
        .join(member.relationship("team").unwrap(), &other)
        .unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));
}

#[test]
fn test_join_from_unbound_alias() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let err = select_from(&team)
        .join(member.relationship("team").unwrap(), &team.with_alias("t2"))
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { .. }));
}

#[test]
fn test_on_without_join() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let err = select_from(&member)
        .on(member.column("age").unwrap().gt(1).unwrap())
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { .. }));

    // The error names the selected entity, not the last source.
    let err = select_from(&member)
        .from(&team)
        .unwrap()
        .fetch_join()
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { alias, .. } if alias == "member"));
}

#[test]
fn test_select_outer_joined_entity() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, Some("loner"), 50, None);
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let query = select_entity(&team)
        .from(&member)
        .unwrap()
        .left_join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .order_by([member.column("id").unwrap().asc()]);

    let err = query.clone().build().unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { alias, .. } if alias == "team"));

    let teams: Vec<Option<Entity>> = query.optional().fetch(&db).unwrap();
    let names: Vec<Option<Value>> = teams
        .iter()
        .map(|t| t.as_ref().and_then(|t| t.get("name")).cloned())
        .collect();
    assert_eq!(
        names,
        vec![
            Some(Value::Text("teamA".into())),
            Some(Value::Text("teamA".into())),
            Some(Value::Text("teamB".into())),
            Some(Value::Text("teamB".into())),
            None,
        ]
    );
}

#[test]
fn test_select_inner_joined_entity() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let teams: Vec<Entity> = select_entity(&team)
        .from(&member)
        .unwrap()
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .filter(member.column("age").unwrap().goe(30).unwrap())
        .unwrap()
        .fetch(&db)
        .unwrap();
    assert_eq!(teams.len(), 2);
    assert!(teams
        .iter()
        .all(|t| t.get("name") == Some(&Value::Text("teamB".into()))));
}

#[test]
fn test_on_cannot_reference_later_join() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();
    let later = team.with_alias("later");

    let err = select_from(&member)
        .join_entity(&team)
        .unwrap()
        .on(team
            .column("id")
            .unwrap()
            .eq(later.column("id").unwrap())
            .unwrap())
        .unwrap()
        .join_entity(&later)
        .unwrap()
        .on(later
            .column("id")
            .unwrap()
            .eq(member.column("team_id").unwrap())
            .unwrap())
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, QueryError::InvalidJoin { alias, .. } if alias == "team"));
}

#[test]
fn test_unbound_column() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let err = select_from(&member)
        .filter(team.column("name").unwrap().eq("teamA").unwrap())
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::UnboundColumn { alias, column } if alias == "team" && column == "name"
    ));
}
