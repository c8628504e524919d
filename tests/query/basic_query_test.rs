//! Search, result fetching, sorting and paging against SQLite.

#[path = "../common/mod.rs"]
mod common;

use common::{ages, insert_member, setup, usernames};
use quarry::prelude::*;

#[test]
fn test_search_by_two_predicates() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();

    let found = select_from(&member)
        .filter(
            member
                .column("username")
                .unwrap()
                .eq("member1")
                .unwrap()
                .and(member.column("age").unwrap().eq(10).unwrap())
                .unwrap(),
        )
        .unwrap()
        .fetch_one(&db)
        .unwrap()
        .unwrap();

    assert_eq!(found.get("username"), Some(&Value::Text("member1".into())));
    assert_eq!(found.id(), &Value::Int(1));
}

#[test]
fn test_where_list_matches_and_chain() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let username = member.column("username").unwrap();
    let age = member.column("age").unwrap();

    let listed: Vec<Entity> = select_from(&member)
        .where_([username.clone().eq("member1").unwrap(), age.clone().eq(10).unwrap()])
        .unwrap()
        .fetch(&db)
        .unwrap();
    let chained: Vec<Entity> = select_from(&member)
        .filter(username.eq("member1").unwrap().and(age.eq(10).unwrap()).unwrap())
        .unwrap()
        .fetch(&db)
        .unwrap();

    assert_eq!(listed, chained);
    assert_eq!(listed.len(), 1);
}

#[test]
fn test_where_skips_absent_predicates() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let username_cond: Option<Expr> = None;
    let age_cond = Some(age.goe(20).unwrap());
    let found: Vec<Entity> = select_from(&member)
        .where_([username_cond, age_cond])
        .unwrap()
        .fetch(&db)
        .unwrap();

    assert_eq!(found.len(), 3);
}

#[test]
fn test_between_is_inclusive() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let found: Vec<Entity> = select_from(&member)
        .filter(age.clone().between(10, 30).unwrap())
        .unwrap()
        .order_by([age.asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(ages(&found), vec![10, 20, 30]);
}

#[test]
fn test_result_fetch_variants() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let all = select_from(&member).fetch(&db).unwrap();
    assert_eq!(all.len(), 4);

    let first = select_from(&member)
        .order_by([age.clone().asc()])
        .fetch_first(&db)
        .unwrap()
        .unwrap();
    assert_eq!(first.get("age"), Some(&Value::Int(10)));

    let many = select_from(&member).fetch_one(&db);
    assert!(matches!(many, Err(QueryError::NonUniqueResult { .. })));

    let none = select_from(&member)
        .filter(age.gt(100).unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap();
    assert!(none.is_none());

    assert_eq!(select_from(&member).fetch_count(&db).unwrap(), 4);
}

#[test]
fn test_sort_with_nulls_last() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, None, 100, None);
    insert_member(&schema, &db, 6, Some("member5"), 100, None);
    insert_member(&schema, &db, 7, Some("member6"), 100, None);
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();
    let username = member.column("username").unwrap();

    let found: Vec<Entity> = select_from(&member)
        .filter(age.clone().eq(100).unwrap())
        .unwrap()
        .order_by([age.desc(), username.asc().nulls_last()])
        .fetch(&db)
        .unwrap();

    assert_eq!(
        usernames(&found),
        vec![Some("member5".to_string()), Some("member6".to_string()), None]
    );
}

#[test]
fn test_nulls_first_independent_of_direction() {
    let (schema, db) = setup();
    insert_member(&schema, &db, 5, None, 50, None);
    let member = schema.entity("Member").unwrap();
    let username = member.column("username").unwrap();

    let found: Vec<Entity> = select_from(&member)
        .order_by([username.desc().nulls_first()])
        .fetch(&db)
        .unwrap();

    let names = usernames(&found);
    assert_eq!(names[0], None);
    assert_eq!(names[1], Some("member4".to_string()));
}

#[test]
fn test_paging() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let username = member.column("username").unwrap();

    let query = select_from(&member)
        .order_by([username.desc()])
        .offset(1)
        .limit(2);
    let page: Vec<Entity> = query.clone().fetch(&db).unwrap();

    assert_eq!(
        usernames(&page),
        vec![Some("member3".to_string()), Some("member2".to_string())]
    );
    assert_eq!(query.fetch_count(&db).unwrap(), 4);
}

#[test]
fn test_paging_past_the_end() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let tail: Vec<Entity> = select_from(&member)
        .order_by([age.clone().asc()])
        .offset(3)
        .fetch(&db)
        .unwrap();
    assert_eq!(ages(&tail), vec![40]);

    let empty: Vec<Entity> = select_from(&member)
        .order_by([age.asc()])
        .offset(10)
        .limit(5)
        .fetch(&db)
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_paging_with_huge_counts() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let skipped: Vec<Entity> = select_from(&member).offset(u64::MAX).fetch(&db).unwrap();
    assert!(skipped.is_empty());

    let all: Vec<Entity> = select_from(&member)
        .order_by([age.clone().asc()])
        .limit(u64::MAX)
        .fetch(&db)
        .unwrap();
    assert_eq!(ages(&all), vec![10, 20, 30, 40]);

    let none: Vec<Entity> = select_from(&member)
        .order_by([age.asc()])
        .offset(1 << 63)
        .limit(2)
        .fetch(&db)
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_constant_projection() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let username = member.column("username").unwrap();

    let rows: Vec<Tuple> = select_tuple([Expr::from(username.clone()), lit("active")])
        .from(&member)
        .unwrap()
        .order_by([username.clone().asc()])
        .limit(2)
        .fetch(&db)
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get(username), Some(&Value::Text("member2".into())));
    assert!(rows
        .iter()
        .all(|row| row.get(lit("active")) == Some(&Value::Text("active".into()))));
}

#[test]
fn test_scalar_projection() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let username = member.column("username").unwrap();

    let names: Vec<Value> = select(username.clone())
        .from(&member)
        .unwrap()
        .order_by([username.asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(
        names,
        vec![
            Value::Text("member1".into()),
            Value::Text("member2".into()),
            Value::Text("member3".into()),
            Value::Text("member4".into()),
        ]
    );
}

#[test]
fn test_distinct_tuple() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team_id = member.column("team_id").unwrap();

    let rows: Vec<Value> = select(team_id.clone())
        .from(&member)
        .unwrap()
        .distinct()
        .order_by([team_id.asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(rows, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_like_pattern() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();

    let found: Vec<Entity> = select_from(&member)
        .filter(member.column("username").unwrap().like("%1").unwrap())
        .unwrap()
        .fetch(&db)
        .unwrap();

    assert_eq!(usernames(&found), vec![Some("member1".to_string())]);
}

#[test]
fn test_type_mismatch_is_rejected_at_build_time() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();

    let err = member.column("age").unwrap().eq("ten").unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));

    let err = select_from(&member)
        .filter(member.column("age").unwrap().into())
        .unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));
}

#[test]
fn test_no_source() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();

    let err = select_entity(&member).build().unwrap_err();
    assert!(matches!(err, QueryError::NoSource));
}
