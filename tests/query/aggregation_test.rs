//! Aggregates, grouping and HAVING.

#[path = "../common/mod.rs"]
mod common;

use common::setup;
use quarry::prelude::*;

#[test]
fn test_aggregates_over_all_members() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let count = count_star();
    let sum = age.clone().sum().unwrap();
    let avg = age.clone().avg().unwrap();
    let max = age.clone().max().unwrap();
    let min = age.min().unwrap();

    let row = select_tuple([
        count.clone(),
        sum.clone(),
        avg.clone(),
        max.clone(),
        min.clone(),
    ])
    .from(&member)
    .unwrap()
    .fetch_one(&db)
    .unwrap()
    .unwrap();

    assert_eq!(row.len(), 5);
    assert_eq!(row.get(count), Some(&Value::Int(4)));
    assert_eq!(row.get(sum), Some(&Value::Int(100)));
    assert_eq!(row.get(avg), Some(&Value::Float(25.0)));
    assert_eq!(row.get(max), Some(&Value::Int(40)));
    assert_eq!(row.get(min), Some(&Value::Int(10)));
}

#[test]
fn test_count_rows_of_entity() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();

    let count = select(member.count())
        .from(&member)
        .unwrap()
        .fetch_one(&db)
        .unwrap();

    assert_eq!(count, Some(Value::Int(4)));
}

#[test]
fn test_group_by_team_name() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();
    let name = team.column("name").unwrap();
    let avg = member.column("age").unwrap().avg().unwrap();

    let rows: Vec<Tuple> = select_tuple([Expr::from(name.clone()), avg.clone()])
        .from(&member)
        .unwrap()
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .group_by([name.clone()])
        .order_by([name.clone().asc()])
        .fetch(&db)
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get(name.clone()), Some(&Value::Text("teamA".into())));
    assert_eq!(rows[0].get(avg.clone()), Some(&Value::Float(15.0)));
    assert_eq!(rows[1].get(name), Some(&Value::Text("teamB".into())));
    assert_eq!(rows[1].get(avg), Some(&Value::Float(35.0)));
}

#[test]
fn test_having_filters_groups() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();
    let name = team.column("name").unwrap();
    let avg = member.column("age").unwrap().avg().unwrap();

    let names: Vec<Value> = select(name.clone())
        .from(&member)
        .unwrap()
        .join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .group_by([name])
        .having(avg.gt(20).unwrap())
        .unwrap()
        .fetch(&db)
        .unwrap();

    assert_eq!(names, vec![Value::Text("teamB".into())]);
}

#[test]
fn test_having_must_be_boolean() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();

    let err = select(count_star())
        .from(&member)
        .unwrap()
        .having(member.column("age").unwrap().sum().unwrap())
        .unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));
}

#[test]
fn test_sum_requires_numeric() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();

    assert!(matches!(
        member.column("username").unwrap().sum(),
        Err(QueryError::TypeMismatch { .. })
    ));
}

#[test]
fn test_aggregate_of_empty_set_is_null() {
    let (schema, db) = setup();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();

    let max = select(age.clone().max().unwrap())
        .from(&member)
        .unwrap()
        .filter(age.gt(1000).unwrap())
        .unwrap()
        .fetch_one(&db)
        .unwrap();

    assert_eq!(max, Some(Value::Null));
}
