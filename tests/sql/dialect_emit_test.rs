//! Emitted SQL per dialect, checked with sqlparser.

#[path = "../common/mod.rs"]
mod common;

use quarry::prelude::*;
use quarry::sql::validate::validate_sql;

const DIALECTS: [Dialect; 4] = [
    Dialect::Sqlite,
    Dialect::Postgres,
    Dialect::DuckDb,
    Dialect::MySql,
];

fn reporting_query(schema: &std::sync::Arc<Schema>) -> Query<Tuple> {
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();
    let member_sub = member.with_alias("memberSub");
    let name = team.column("name").unwrap();
    let age = member.column("age").unwrap();

    let youngest = select(member_sub.column("age").unwrap().min().unwrap())
        .from(&member_sub)
        .unwrap()
        .subquery()
        .unwrap();

    select_tuple([Expr::from(name.clone()), age.clone().avg().unwrap()])
        .from(&member)
        .unwrap()
        .left_join(member.relationship("team").unwrap(), &team)
        .unwrap()
        .on(name.clone().ne("archived").unwrap())
        .unwrap()
        .where_([
            age.clone().gt(youngest).unwrap(),
            member.column("username").unwrap().is_not_null(),
        ])
        .unwrap()
        .group_by([name.clone()])
        .having(age.clone().count().goe(1).unwrap())
        .unwrap()
        .order_by([name.desc().nulls_last(), age.avg().unwrap().asc()])
        .offset(1)
        .limit(10)
}

#[test]
fn test_reporting_query_parses_in_every_dialect() {
    let schema = common::schema();
    let query = reporting_query(&schema);
    for dialect in DIALECTS {
        let statement = query.to_statement(dialect).unwrap();
        validate_sql(statement.sql(), dialect).unwrap();
        assert_eq!(statement.params().len(), 2, "{}", statement);

        let count = query.count_statement(dialect).unwrap();
        validate_sql(count.sql(), dialect).unwrap();
    }
}

#[test]
fn test_placeholders_per_dialect() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let age = member.column("age").unwrap();
    let query = select(member.column("id").unwrap())
        .from(&member)
        .unwrap()
        .filter(age.between(18, 65).unwrap())
        .unwrap();

    let where_clause = |dialect: Dialect| {
        let sql = query.to_statement(dialect).unwrap().sql().to_string();
        sql.lines().last().unwrap().to_string()
    };

    assert_eq!(
        where_clause(Dialect::Sqlite),
        r#"WHERE "member"."age" BETWEEN ?1 AND ?2"#
    );
    assert_eq!(
        where_clause(Dialect::Postgres),
        r#"WHERE "member"."age" BETWEEN $1 AND $2"#
    );
    assert_eq!(
        where_clause(Dialect::DuckDb),
        r#"WHERE "member"."age" BETWEEN $1 AND $2"#
    );
    assert_eq!(
        where_clause(Dialect::MySql),
        "WHERE `member`.`age` BETWEEN ? AND ?"
    );
}

#[test]
fn test_empty_in_list_literal_per_dialect() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let query = select_from(&member)
        .filter(member.column("age").unwrap().in_list(Vec::<i64>::new()).unwrap())
        .unwrap();

    for (dialect, literal) in [
        (Dialect::Sqlite, "0"),
        (Dialect::Postgres, "false"),
        (Dialect::DuckDb, "false"),
        (Dialect::MySql, "0"),
    ] {
        let statement = query.to_statement(dialect).unwrap();
        assert!(
            statement.sql().ends_with(&format!("WHERE {}", literal)),
            "{}",
            statement
        );
        validate_sql(statement.sql(), dialect).unwrap();
    }
}

#[test]
fn test_offset_without_limit_per_dialect() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let query = select_from(&member).offset(3);

    let last_line = |dialect: Dialect| {
        let sql = query.to_statement(dialect).unwrap().sql().to_string();
        validate_sql(&sql, dialect).unwrap();
        sql.lines().last().unwrap().to_string()
    };

    assert_eq!(last_line(Dialect::Sqlite), "LIMIT -1 OFFSET 3");
    assert_eq!(last_line(Dialect::Postgres), "OFFSET 3");
    assert_eq!(last_line(Dialect::MySql), "LIMIT 18446744073709551615 OFFSET 3");
}

#[test]
fn test_theta_join_sources() {
    let schema = common::schema();
    let member = schema.entity("Member").unwrap();
    let team = schema.entity("Team").unwrap();

    let statement = select_from(&member)
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
        .to_statement(Dialect::Postgres)
        .unwrap();

    insta::assert_snapshot!(statement.sql(), @r#"
    SELECT
      "member"."id",
      "member"."username",
      "member"."age",
      "member"."team_id"
    FROM "member" AS "member"
    CROSS JOIN "team" AS "team"
    WHERE "member"."username" = "team"."name"
    "#);
    assert!(statement.params().is_empty());
}

#[test]
fn test_ddl_per_dialect() {
    let schema = common::schema();
    for dialect in DIALECTS {
        for statement in quarry::sql::ddl::create_statements(&schema, dialect) {
            validate_sql(statement.sql(), dialect).unwrap();
        }
    }
}

#[test]
fn test_plan_is_reusable_across_dialects() {
    let schema = common::schema();
    let plan = reporting_query(&schema).build().unwrap();

    let sqlite = plan.to_statement(Dialect::Sqlite).unwrap();
    let postgres = plan.to_statement(Dialect::Postgres).unwrap();

    assert_eq!(sqlite.params(), postgres.params());
    assert_ne!(sqlite.sql(), postgres.sql());
    assert_eq!(plan.limit(), Some(10));
    assert_eq!(plan.offset(), Some(1));
    assert_eq!(plan.joins().len(), 1);
}
