//! Plan compilation.
//!
//! Turns a [`QueryPlan`] into a [`Statement`]: SQL text for one dialect plus
//! the parameter values bound to its placeholders, in placeholder order. The
//! compiler also records the [`RowLayout`] the decoder needs to map result
//! columns back onto projections and fetched relations.
//!
//! Output layout:
//!
//! ```text
//! SELECT
//!   "member"."id",
//!   "member"."username"
//! FROM "member" AS "member"
//! INNER JOIN "team" AS "team" ON "member"."team_id" = "team"."id"
//! WHERE "member"."age" >= ?1
//! ORDER BY "member"."age" DESC NULLS LAST
//! LIMIT 2 OFFSET 1
//! ```

use std::fmt;
use std::sync::Arc;

use super::{JoinKind, NullsOrder, OrderByExpr, Projection, QueryPlan, Shape, SortDir, SubQuery};
use crate::error::{QueryError, QueryResult};
use crate::schema::{Cardinality, EntityPath, ValueType};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::expr::{needs_parens, BinaryOperator, Expr, UnaryOperator, Value};
use crate::sql::token::{Token, TokenStream};

/// Compiled SQL with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter values; `params()[i]` binds placeholder `i + 1`.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledQuery {
    pub(crate) statement: Statement,
    pub(crate) layout: RowLayout,
}

// =============================================================================
// Row layout
// =============================================================================

/// Where each projection's values sit in a result row.
#[derive(Debug, Clone)]
pub(crate) struct RowLayout {
    pub(crate) shape: Shape,
    pub(crate) slots: Vec<Slot>,
    pub(crate) projections: Arc<[Projection]>,
    pub(crate) width: usize,
    /// Rows must be merged by root primary key after decoding.
    pub(crate) collection_fetch: bool,
    /// Paging applied after merging, when it cannot be done in SQL.
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Scalar {
        index: usize,
        value_type: Option<ValueType>,
    },
    Entity(EntityLayout),
}

/// Column range of one entity, plus the relations fetched with it.
#[derive(Debug, Clone)]
pub(crate) struct EntityLayout {
    pub(crate) path: EntityPath,
    pub(crate) start: usize,
    pub(crate) fetched: Vec<FetchedRelation>,
}

#[derive(Debug, Clone)]
pub(crate) struct FetchedRelation {
    pub(crate) name: String,
    pub(crate) cardinality: Cardinality,
    pub(crate) layout: EntityLayout,
}

impl EntityLayout {
    fn new(path: EntityPath, start: usize) -> Self {
        Self {
            path,
            start,
            fetched: Vec::new(),
        }
    }

    fn find_mut(&mut self, alias: &str) -> Option<&mut EntityLayout> {
        if self.path.alias() == alias {
            return Some(self);
        }
        self.fetched
            .iter_mut()
            .find_map(|f| f.layout.find_mut(alias))
    }
}

impl RowLayout {
    /// Compute the layout and the select list it implies.
    fn for_plan(plan: &QueryPlan) -> QueryResult<(Self, Vec<Expr>)> {
        let mut columns = projection_columns(plan);
        let mut slots = Vec::with_capacity(plan.projections().len());
        let mut next = 0;
        for projection in plan.projections() {
            match projection {
                Projection::Expr(expr) => {
                    slots.push(Slot::Scalar {
                        index: next,
                        value_type: expr.value_type(),
                    });
                    next += 1;
                }
                Projection::Entity(path) => {
                    slots.push(Slot::Entity(EntityLayout::new(path.clone(), next)));
                    next += path.definition().attributes().len();
                }
            }
        }

        let collection_fetch = plan.has_collection_fetch();
        if collection_fetch && plan.shape() != Shape::Entity {
            let alias = plan
                .joins()
                .iter()
                .find(|j| j.is_collection_fetch())
                .map_or("", |j| j.target().alias());
            return Err(QueryError::invalid_join(
                alias,
                "fetching a to-many relationship needs an entity projection",
            ));
        }

        for join in plan.joins().iter().filter(|j| j.is_fetch()) {
            let Some(relationship) = join.relationship() else {
                continue;
            };
            let owner = relationship.source().alias();
            let layout = slots
                .iter_mut()
                .find_map(|slot| match slot {
                    Slot::Entity(layout) => layout.find_mut(owner),
                    Slot::Scalar { .. } => None,
                })
                .ok_or_else(|| {
                    QueryError::invalid_join(
                        join.target().alias(),
                        format!(
                            "fetch_join() owner `{}` is not an entity projection of the query",
                            owner
                        ),
                    )
                })?;
            layout.fetched.push(FetchedRelation {
                name: relationship.name().to_string(),
                cardinality: relationship.cardinality(),
                layout: EntityLayout::new(join.target().clone(), next),
            });
            let target_columns = join.target().columns();
            next += target_columns.len();
            columns.extend(target_columns.into_iter().map(Expr::Column));
        }

        let (offset, limit) = if collection_fetch {
            (plan.offset(), plan.limit())
        } else {
            (None, None)
        };
        let layout = Self {
            shape: plan.shape(),
            slots,
            projections: plan.projections().to_vec().into(),
            width: next,
            collection_fetch,
            offset,
            limit,
        };
        Ok((layout, columns))
    }
}

/// Select list for the projections alone, entities expanded to their columns.
fn projection_columns(plan: &QueryPlan) -> Vec<Expr> {
    let mut out = Vec::new();
    for projection in plan.projections() {
        match projection {
            Projection::Expr(expr) => out.push(expr.clone()),
            Projection::Entity(path) => out.extend(path.columns().into_iter().map(Expr::Column)),
        }
    }
    out
}

// =============================================================================
// Entry points
// =============================================================================

pub(crate) fn compile(plan: &QueryPlan, dialect: Dialect) -> QueryResult<CompiledQuery> {
    let (layout, columns) = RowLayout::for_plan(plan)?;
    if layout.collection_fetch && (plan.limit().is_some() || plan.offset().is_some()) {
        tracing::warn!(
            "paging a query that fetches a to-many relationship is applied in memory"
        );
    }

    let mut binder = Binder::new(dialect);
    let mut ts = TokenStream::new();
    binder.emit_select(
        &mut ts,
        plan,
        &columns,
        Clauses {
            distinct: plan.is_distinct(),
            ordering: true,
            paging: !layout.collection_fetch,
            column_aliases: false,
        },
    )?;
    Ok(CompiledQuery {
        statement: binder.finish(&ts),
        layout,
    })
}

/// `SELECT COUNT(*)` over the plan with ordering and paging removed.
pub(crate) fn count_statement(plan: &QueryPlan, dialect: Dialect) -> QueryResult<Statement> {
    let columns = projection_columns(plan);
    let mut binder = Binder::new(dialect);
    let mut ts = TokenStream::new();
    ts.push(Token::Select)
        .space()
        .push(Token::FunctionName("count"))
        .lparen()
        .push(Token::Star)
        .rparen()
        .space()
        .push(Token::From)
        .space()
        .lparen()
        .newline();
    binder.depth = 1;
    binder.emit_select(
        &mut ts,
        plan,
        &columns,
        Clauses {
            distinct: plan.is_distinct() || plan.has_collection_fetch(),
            ordering: false,
            paging: false,
            column_aliases: true,
        },
    )?;
    ts.newline()
        .rparen()
        .space()
        .push(Token::As)
        .space()
        .ident("counted");
    Ok(binder.finish(&ts))
}

// =============================================================================
// Emission
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Clauses {
    distinct: bool,
    ordering: bool,
    paging: bool,
    /// Name every select column; derived tables reject duplicate names.
    column_aliases: bool,
}

/// Emits tokens and collects parameter values in placeholder order.
struct Binder {
    dialect: Dialect,
    params: Vec<Value>,
    depth: usize,
}

impl Binder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
            depth: 0,
        }
    }

    fn finish(self, ts: &TokenStream) -> Statement {
        Statement::new(ts.serialize(self.dialect), self.params)
    }

    fn param(&mut self, ts: &mut TokenStream, value: &Value) {
        self.params.push(value.clone());
        ts.push(Token::Param(self.params.len()));
    }

    /// Start a new clause line at the current depth.
    fn line(&self, ts: &mut TokenStream) {
        ts.newline();
        if self.depth > 0 {
            ts.indent(self.depth);
        }
    }

    fn emit_select(
        &mut self,
        ts: &mut TokenStream,
        plan: &QueryPlan,
        columns: &[Expr],
        clauses: Clauses,
    ) -> QueryResult<()> {
        if self.depth > 0 {
            ts.indent(self.depth);
        }
        ts.push(Token::Select);
        if clauses.distinct {
            ts.space().push(Token::Distinct);
        }
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.newline().indent(self.depth + 1);
            self.emit_expr(ts, column)?;
            if clauses.column_aliases {
                ts.space()
                    .push(Token::As)
                    .space()
                    .ident(&format!("c{}", i + 1));
            }
        }

        // FROM: the first source, further sources as cross joins
        let mut sources = plan.sources().iter();
        if let Some(first) = sources.next() {
            self.line(ts);
            ts.push(Token::From).space();
            emit_table(ts, first);
        }
        for source in sources {
            self.line(ts);
            ts.push(Token::Cross).space().push(Token::Join).space();
            emit_table(ts, source);
        }

        for join in plan.joins() {
            self.line(ts);
            match join.kind() {
                JoinKind::Inner => ts.push(Token::Inner),
                JoinKind::LeftOuter => ts.push(Token::Left),
                JoinKind::Cross => ts.push(Token::Cross),
            };
            ts.space().push(Token::Join).space();
            emit_table(ts, join.target());
            if let Some(condition) = join.condition() {
                ts.space().push(Token::On).space();
                self.emit_expr(ts, condition)?;
            }
        }

        if let Some(predicate) = plan.predicate() {
            self.line(ts);
            ts.push(Token::Where).space();
            self.emit_expr(ts, predicate)?;
        }

        if !plan.group_by().is_empty() {
            self.line(ts);
            ts.push(Token::GroupBy).space();
            for (i, expr) in plan.group_by().iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                self.emit_expr(ts, expr)?;
            }
        }

        if let Some(having) = plan.having() {
            self.line(ts);
            ts.push(Token::Having).space();
            self.emit_expr(ts, having)?;
        }

        if clauses.ordering && !plan.order_by().is_empty() {
            self.line(ts);
            ts.push(Token::OrderBy).space();
            for (i, item) in plan.order_by().iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                self.emit_order(ts, item)?;
            }
        }

        if clauses.paging {
            let paging = self.dialect.emit_limit_offset(plan.limit(), plan.offset());
            if !paging.is_empty() {
                self.line(ts);
                ts.append(&paging);
            }
        }
        Ok(())
    }

    fn emit_order(&mut self, ts: &mut TokenStream, item: &OrderByExpr) -> QueryResult<()> {
        let nulls = item.nulls();
        if let (Some(order), false) = (nulls, self.dialect.supports_nulls_ordering()) {
            // CASE WHEN x IS NULL THEN 1 ELSE 0 END sorts NULLs last ascending
            let (null_key, other_key) = match order {
                NullsOrder::First => (0, 1),
                NullsOrder::Last => (1, 0),
            };
            ts.push(Token::Case).space().push(Token::When).space();
            self.emit_operand(ts, item.expr())?;
            ts.space()
                .push(Token::IsNull)
                .space()
                .push(Token::Then)
                .space()
                .push(Token::LitInt(null_key))
                .space()
                .push(Token::Else)
                .space()
                .push(Token::LitInt(other_key))
                .space()
                .push(Token::End)
                .comma()
                .space();
        }

        self.emit_expr(ts, item.expr())?;
        ts.space().push(match item.dir() {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
        if let (Some(order), true) = (nulls, self.dialect.supports_nulls_ordering()) {
            ts.space().push(match order {
                NullsOrder::First => Token::NullsFirst,
                NullsOrder::Last => Token::NullsLast,
            });
        }
        Ok(())
    }

    fn emit_expr(&mut self, ts: &mut TokenStream, expr: &Expr) -> QueryResult<()> {
        match expr {
            Expr::Column(col) => {
                ts.qualified(col.alias(), col.column_name());
            }
            Expr::Literal(value) => self.param(ts, value),
            Expr::Unary {
                op: UnaryOperator::Not,
                expr,
            } => {
                ts.push(Token::Not).space().lparen();
                self.emit_expr(ts, expr)?;
                ts.rparen();
            }
            Expr::Binary { left, op, right } => {
                self.emit_child(ts, *op, left, false)?;
                ts.space().push(op.token()).space();
                self.emit_child(ts, *op, right, true)?;
            }
            Expr::Aggregate {
                func,
                arg,
                distinct,
            } => {
                ts.push(Token::FunctionName(func.name())).lparen();
                match arg {
                    None => {
                        ts.push(Token::Star);
                    }
                    Some(arg) => {
                        if *distinct {
                            ts.push(Token::Distinct).space();
                        }
                        self.emit_expr(ts, arg)?;
                    }
                }
                ts.rparen();
            }
            Expr::Subquery(sub) => self.emit_subquery(ts, sub)?,
            Expr::In {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    // x IN () matches nothing, x NOT IN () everything
                    ts.push(Token::LitBool(*negated));
                    return Ok(());
                }
                self.emit_operand(ts, expr)?;
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space().lparen();
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    self.emit_expr(ts, item)?;
                }
                ts.rparen();
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                self.emit_operand(ts, expr)?;
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space();
                self.emit_subquery(ts, subquery)?;
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.emit_operand(ts, expr)?;
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::Between).space();
                self.emit_operand(ts, low)?;
                ts.space().push(Token::And).space();
                self.emit_operand(ts, high)?;
            }
            Expr::IsNull { expr, negated } => {
                self.emit_operand(ts, expr)?;
                ts.space().push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }
        }
        Ok(())
    }

    fn emit_child(
        &mut self,
        ts: &mut TokenStream,
        parent: BinaryOperator,
        child: &Expr,
        is_right: bool,
    ) -> QueryResult<()> {
        if needs_parens(parent, child, is_right) {
            ts.lparen();
            self.emit_expr(ts, child)?;
            ts.rparen();
            Ok(())
        } else {
            self.emit_expr(ts, child)
        }
    }

    /// Operand of a postfix or infix keyword form; compound operands get parens.
    fn emit_operand(&mut self, ts: &mut TokenStream, expr: &Expr) -> QueryResult<()> {
        let compound = matches!(
            expr,
            Expr::Binary { .. }
                | Expr::In { .. }
                | Expr::InSubquery { .. }
                | Expr::Between { .. }
                | Expr::IsNull { .. }
        );
        if compound {
            ts.lparen();
            self.emit_expr(ts, expr)?;
            ts.rparen();
            Ok(())
        } else {
            self.emit_expr(ts, expr)
        }
    }

    fn emit_subquery(&mut self, ts: &mut TokenStream, sub: &SubQuery) -> QueryResult<()> {
        let plan = sub.plan();
        let columns = projection_columns(plan);
        ts.lparen().newline();
        self.depth += 1;
        let result = self.emit_select(
            ts,
            plan,
            &columns,
            Clauses {
                distinct: plan.is_distinct(),
                ordering: true,
                paging: true,
                column_aliases: false,
            },
        );
        self.depth -= 1;
        result?;
        self.line(ts);
        ts.rparen();
        Ok(())
    }
}

/// `"table" AS "alias"`
fn emit_table(ts: &mut TokenStream, path: &EntityPath) {
    ts.ident(path.definition().table_name())
        .space()
        .push(Token::As)
        .space()
        .ident(path.alias());
}
