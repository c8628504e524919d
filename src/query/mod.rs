//! Query builder.
//!
//! A [`Query`] accumulates projections, sources, joins, predicates, grouping,
//! ordering and paging. Every builder call that can fail returns the error
//! immediately; nothing is deferred to the database. [`Query::build`] turns
//! the accumulated state into an immutable [`QueryPlan`] after resolving joins
//! and checking that every column is bound.
//!
//! # Example
//!
//! ```ignore
//! let member = schema.entity("Member")?;
//! let team = schema.entity("Team")?;
//!
//! let members = select_from(&member)
//!     .join(member.relationship("team")?, &team)?
//!     .where_([team.column("name")?.eq("teamA")?])?
//!     .order_by([member.column("age")?.desc()])
//!     .fetch(&db)?;
//! ```

pub mod compile;
mod join;
mod subquery;

pub use compile::Statement;
pub use join::{JoinEdge, JoinKind, JoinState};
pub use subquery::SubQuery;

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{QueryError, QueryResult};
use crate::exec::{self, Backend, Entity, FromResultRow, Tuple};
use crate::schema::{ColumnRef, EntityPath, RelationshipRef, ValueType};
use crate::sql::dialect::Dialect;
use crate::sql::expr::{Expr, Value};
use join::PendingJoin;

// =============================================================================
// Projections and ordering
// =============================================================================

/// Row shape produced by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Scalar,
    Entity,
    Tuple,
}

/// One item of the select list.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Expr(Expr),
    /// All attributes of the aliased entity, decoded into an [`Entity`].
    Entity(EntityPath),
}

impl From<Expr> for Projection {
    fn from(expr: Expr) -> Self {
        Projection::Expr(expr)
    }
}

impl From<ColumnRef> for Projection {
    fn from(col: ColumnRef) -> Self {
        Projection::Expr(Expr::Column(col))
    }
}

impl From<&EntityPath> for Projection {
    fn from(path: &EntityPath) -> Self {
        Projection::Entity(path.clone())
    }
}

impl From<EntityPath> for Projection {
    fn from(path: EntityPath) -> Self {
        Projection::Entity(path)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Placement of NULLs in a sort key, independent of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    expr: Expr,
    dir: SortDir,
    nulls: Option<NullsOrder>,
}

impl OrderByExpr {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
            nulls: None,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: SortDir::Desc,
            nulls: None,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn dir(&self) -> SortDir {
        self.dir
    }

    pub fn nulls(&self) -> Option<NullsOrder> {
        self.nulls
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Select whole entities from `path`, which also becomes the first source.
pub fn select_from(path: &EntityPath) -> Query<Entity> {
    let mut query = Query::new(Shape::Entity, vec![Projection::Entity(path.clone())]);
    query.sources.push(path.clone());
    query
}

/// Select whole entities of `path`; sources are added with [`Query::from`].
pub fn select_entity(path: &EntityPath) -> Query<Entity> {
    Query::new(Shape::Entity, vec![Projection::Entity(path.clone())])
}

/// Select a single expression per row.
pub fn select(expr: impl Into<Expr>) -> Query<Value> {
    Query::new(Shape::Scalar, vec![Projection::Expr(expr.into())])
}

/// Select several expressions or entities per row.
pub fn select_tuple<I, P>(projections: I) -> Query<Tuple>
where
    I: IntoIterator<Item = P>,
    P: Into<Projection>,
{
    Query::new(
        Shape::Tuple,
        projections.into_iter().map(Into::into).collect(),
    )
}

// =============================================================================
// Builder
// =============================================================================

/// Query under construction; `R` is the row type its terminals return.
#[derive(Debug)]
#[must_use = "builders have no effect until used"]
pub struct Query<R> {
    shape: Shape,
    projections: Vec<Projection>,
    distinct: bool,
    sources: Vec<EntityPath>,
    joins: Vec<PendingJoin>,
    predicates: Vec<Expr>,
    group_by: Vec<Expr>,
    having: Vec<Expr>,
    order_by: Vec<OrderByExpr>,
    offset: Option<u64>,
    limit: Option<u64>,
    optional_rows: bool,
    _row: PhantomData<fn() -> R>,
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            projections: self.projections.clone(),
            distinct: self.distinct,
            sources: self.sources.clone(),
            joins: self.joins.clone(),
            predicates: self.predicates.clone(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: self.order_by.clone(),
            offset: self.offset,
            limit: self.limit,
            optional_rows: self.optional_rows,
            _row: PhantomData,
        }
    }
}

impl<R> Query<R> {
    fn new(shape: Shape, projections: Vec<Projection>) -> Self {
        Self {
            shape,
            projections,
            distinct: false,
            sources: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            optional_rows: false,
            _row: PhantomData,
        }
    }

    /// Add a source. Several sources form a theta join filtered by `where_`.
    pub fn from(mut self, path: &EntityPath) -> QueryResult<Self> {
        if self.is_bound(path.alias()) {
            return Err(QueryError::alias_conflict(
                path.alias(),
                "by another source or join of the query",
            ));
        }
        self.sources.push(path.clone());
        Ok(self)
    }

    /// Inner join along a relationship of an already bound alias.
    pub fn join(self, relationship: RelationshipRef, target: &EntityPath) -> QueryResult<Self> {
        self.join_relationship(JoinKind::Inner, relationship, target)
    }

    /// Left outer join along a relationship; unmatched rows keep a NULL target.
    pub fn left_join(
        self,
        relationship: RelationshipRef,
        target: &EntityPath,
    ) -> QueryResult<Self> {
        self.join_relationship(JoinKind::LeftOuter, relationship, target)
    }

    /// Inner join to an unrelated entity; needs an `on(...)` predicate.
    pub fn join_entity(self, target: &EntityPath) -> QueryResult<Self> {
        self.push_join(JoinKind::Inner, target, None)
    }

    /// Left outer join to an unrelated entity; needs an `on(...)` predicate.
    pub fn left_join_entity(self, target: &EntityPath) -> QueryResult<Self> {
        self.push_join(JoinKind::LeftOuter, target, None)
    }

    /// Explicit cartesian product with `target`.
    pub fn cross_join(self, target: &EntityPath) -> QueryResult<Self> {
        self.push_join(JoinKind::Cross, target, None)
    }

    /// Attach an on-predicate to the most recent join.
    pub fn on(mut self, predicate: Expr) -> QueryResult<Self> {
        require_bool(&predicate, "on-predicate")?;
        self.check_subqueries(&predicate)?;
        let projected = self.projected_alias();
        match self.joins.last_mut() {
            Some(join) => join.add_on(predicate)?,
            None => {
                return Err(QueryError::invalid_join(
                    &projected,
                    "on() must follow a join",
                ))
            }
        }
        Ok(self)
    }

    /// Load the most recent relationship join's target with the owner.
    pub fn fetch_join(mut self) -> QueryResult<Self> {
        let projected = self.projected_alias();
        match self.joins.last_mut() {
            Some(join) => join.mark_fetch()?,
            None => {
                return Err(QueryError::invalid_join(
                    &projected,
                    "fetch_join() must follow a relationship join",
                ))
            }
        }
        Ok(self)
    }

    /// AND-combine the given predicates into the WHERE clause, skipping `None`.
    pub fn where_<I, P>(mut self, predicates: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<Expr>>,
    {
        for predicate in predicates.into_iter().filter_map(Into::into) {
            self = self.filter(predicate)?;
        }
        Ok(self)
    }

    /// Append one predicate to the WHERE clause.
    pub fn filter(mut self, predicate: Expr) -> QueryResult<Self> {
        require_bool(&predicate, "where predicate")?;
        self.check_subqueries(&predicate)?;
        self.predicates.push(predicate);
        Ok(self)
    }

    pub fn group_by<I, E>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.group_by.extend(exprs.into_iter().map(Into::into));
        self
    }

    pub fn having(mut self, predicate: Expr) -> QueryResult<Self> {
        require_bool(&predicate, "having predicate")?;
        self.check_subqueries(&predicate)?;
        self.having.push(predicate);
        Ok(self)
    }

    /// Append sort keys; earlier keys take precedence.
    pub fn order_by(mut self, specs: impl IntoIterator<Item = OrderByExpr>) -> Self {
        self.order_by.extend(specs);
        self
    }

    /// Skip the first `offset` rows (0-based).
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Resolve joins and check every column; no free columns allowed.
    pub fn build(self) -> QueryResult<QueryPlan> {
        self.build_plan(false).map(|(plan, _)| plan)
    }

    /// Build the plan as a subquery operand. Columns of aliases the plan does
    /// not bind are recorded as free and resolved by the enclosing query.
    pub fn subquery(self) -> QueryResult<SubQuery> {
        let (plan, free) = self.build_plan(true)?;
        SubQuery::new(plan, free)
    }

    /// Compile without executing.
    pub fn to_statement(&self, dialect: Dialect) -> QueryResult<Statement> {
        self.clone().build()?.to_statement(dialect)
    }

    /// The statement `fetch_count` runs.
    pub fn count_statement(&self, dialect: Dialect) -> QueryResult<Statement> {
        compile::count_statement(&self.clone().build()?, dialect)
    }

    /// Number of rows the query yields, ignoring ordering and paging.
    pub fn fetch_count<B: Backend + ?Sized>(self, backend: &B) -> QueryResult<u64> {
        let statement = compile::count_statement(&self.build()?, backend.dialect())?;
        let rows = exec::run(backend, &statement)?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .ok_or_else(|| QueryError::Decode("count query returned no integer".into()))?;
        u64::try_from(count).map_err(|_| QueryError::Decode(format!("negative count {}", count)))
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        target: &EntityPath,
        relationship: Option<RelationshipRef>,
    ) -> QueryResult<Self> {
        if self.is_bound(target.alias()) {
            return Err(QueryError::alias_conflict(
                target.alias(),
                "by an earlier source or join; join it again under another alias with with_alias()",
            ));
        }
        self.joins
            .push(PendingJoin::new(kind, target.clone(), relationship));
        Ok(self)
    }

    fn join_relationship(
        self,
        kind: JoinKind,
        relationship: RelationshipRef,
        target: &EntityPath,
    ) -> QueryResult<Self> {
        if !self.is_bound(relationship.source().alias()) {
            return Err(QueryError::invalid_join(
                target.alias(),
                format!(
                    "relationship `{}` starts from an alias the query does not bind",
                    relationship
                ),
            ));
        }
        if !target.same_entity(relationship.target_definition()) {
            return Err(QueryError::type_mismatch(
                &relationship,
                format!(
                    "relationship targets {} but the join target is {}",
                    relationship.target_entity(),
                    target.entity_name()
                ),
            ));
        }
        self.push_join(kind, target, Some(relationship))
    }

    /// Alias of the first selected entity or column, for error reports.
    fn projected_alias(&self) -> String {
        let mut columns = Vec::new();
        for projection in &self.projections {
            match projection {
                Projection::Entity(path) => return path.alias().to_string(),
                Projection::Expr(expr) => expr.collect_columns(&mut columns),
            }
            if let Some(col) = columns.first() {
                return col.alias().to_string();
            }
        }
        String::new()
    }

    fn bound_aliases(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .map(EntityPath::alias)
            .chain(self.joins.iter().map(|j| j.target().alias()))
    }

    fn is_bound(&self, alias: &str) -> bool {
        self.bound_aliases().any(|a| a == alias)
    }

    fn check_subqueries(&self, expr: &Expr) -> QueryResult<()> {
        let mut subqueries = Vec::new();
        expr.collect_subqueries(&mut subqueries);
        for sub in subqueries {
            sub.check_disjoint(self.bound_aliases())?;
        }
        Ok(())
    }

    fn build_plan(self, correlated: bool) -> QueryResult<(QueryPlan, Vec<ColumnRef>)> {
        if self.sources.is_empty() {
            return Err(QueryError::NoSource);
        }

        let mut scope = Scope {
            bound: self.sources.iter().map(|s| Arc::clone(s.alias_arc())).collect(),
            later: self
                .joins
                .iter()
                .map(|j| Arc::clone(j.target().alias_arc()))
                .collect(),
            free: Vec::new(),
            correlated,
        };

        let mut joins = Vec::with_capacity(self.joins.len());
        for pending in self.joins {
            let edge = pending.bind()?;
            let target = Arc::clone(edge.target().alias_arc());
            scope.later.retain(|alias| *alias != target);
            scope.bound.push(target);
            if let Some(condition) = edge.condition() {
                scope.resolve_join(edge.target().alias(), condition)?;
            }
            joins.push(edge);
        }

        if self.shape == Shape::Entity && !self.optional_rows {
            if let Some(Projection::Entity(path)) = self.projections.first() {
                let outer = joins.iter().any(|j| {
                    j.kind() == JoinKind::LeftOuter && j.target().alias() == path.alias()
                });
                if outer {
                    return Err(QueryError::invalid_join(
                        path.alias(),
                        "the selected entity is outer-joined and may be missing; \
                         use optional() or select_tuple()",
                    ));
                }
            }
        }

        for projection in &self.projections {
            match projection {
                Projection::Expr(expr) => scope.resolve(expr)?,
                Projection::Entity(path) if !scope.binds(path.alias()) => {
                    return Err(QueryError::UnboundColumn {
                        alias: path.alias().to_string(),
                        column: "*".into(),
                    })
                }
                Projection::Entity(_) => {}
            }
        }
        for expr in self
            .predicates
            .iter()
            .chain(&self.group_by)
            .chain(&self.having)
            .chain(self.order_by.iter().map(OrderByExpr::expr))
        {
            scope.resolve(expr)?;
        }

        let plan = QueryPlan {
            shape: self.shape,
            projections: self.projections,
            distinct: self.distinct,
            sources: self.sources,
            joins,
            predicate: Expr::conjunction(self.predicates),
            group_by: self.group_by,
            having: Expr::conjunction(self.having),
            order_by: self.order_by,
            offset: self.offset,
            limit: self.limit,
        };

        let mut subqueries = Vec::new();
        for expr in plan.expressions() {
            expr.collect_subqueries(&mut subqueries);
        }
        for sub in subqueries {
            sub.check_disjoint(plan.bound_aliases().map(|a| &**a))?;
        }

        Ok((plan, scope.free))
    }
}

impl Query<Entity> {
    /// Decode rows as `Option<Entity>`; a row without the selected entity,
    /// such as an unmatched outer join, yields `None`.
    pub fn optional(self) -> Query<Option<Entity>> {
        Query {
            shape: self.shape,
            projections: self.projections,
            distinct: self.distinct,
            sources: self.sources,
            joins: self.joins,
            predicates: self.predicates,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
            offset: self.offset,
            limit: self.limit,
            optional_rows: true,
            _row: PhantomData,
        }
    }
}

impl<R: FromResultRow> Query<R> {
    /// Execute and decode every row.
    pub fn fetch<B: Backend + ?Sized>(self, backend: &B) -> QueryResult<Vec<R>> {
        self.run(backend).map(|(_, rows)| rows)
    }

    /// At most one row; more than one is a [`QueryError::NonUniqueResult`].
    pub fn fetch_one<B: Backend + ?Sized>(mut self, backend: &B) -> QueryResult<Option<R>> {
        self.limit = Some(self.limit.map_or(2, |n| n.min(2)));
        let (statement, mut rows) = self.run(backend)?;
        if rows.len() > 1 {
            return Err(QueryError::NonUniqueResult {
                sql: statement.sql().to_string(),
            });
        }
        Ok(rows.pop())
    }

    /// First row, if any.
    pub fn fetch_first<B: Backend + ?Sized>(mut self, backend: &B) -> QueryResult<Option<R>> {
        self.limit = Some(self.limit.map_or(1, |n| n.min(1)));
        let (_, rows) = self.run(backend)?;
        Ok(rows.into_iter().next())
    }

    fn run<B: Backend + ?Sized>(self, backend: &B) -> QueryResult<(Statement, Vec<R>)> {
        let plan = self.build()?;
        let compiled = compile::compile(&plan, backend.dialect())?;
        let raw = exec::run(backend, &compiled.statement)?;
        let rows = compiled
            .layout
            .decode(raw)?
            .into_iter()
            .map(R::from_result_row)
            .collect::<QueryResult<Vec<R>>>()?;
        Ok((compiled.statement, rows))
    }
}

fn require_bool(predicate: &Expr, what: &str) -> QueryResult<()> {
    match predicate.value_type() {
        Some(ValueType::Bool) => Ok(()),
        Some(ty) => Err(QueryError::type_mismatch(
            predicate,
            format!("{} must be boolean, found {}", what, ty),
        )),
        None => Err(QueryError::invalid_predicate(
            predicate,
            format!("{} is an untyped NULL", what),
        )),
    }
}

/// Alias bookkeeping while a plan is built.
struct Scope {
    bound: Vec<Arc<str>>,
    later: Vec<Arc<str>>,
    free: Vec<ColumnRef>,
    correlated: bool,
}

impl Scope {
    fn binds(&self, alias: &str) -> bool {
        self.bound.iter().any(|a| &**a == alias)
    }

    fn resolve(&mut self, expr: &Expr) -> QueryResult<()> {
        let mut columns = Vec::new();
        expr.collect_columns(&mut columns);
        for col in columns {
            if self.binds(col.alias()) {
                continue;
            }
            if !self.correlated {
                return Err(QueryError::UnboundColumn {
                    alias: col.alias().to_string(),
                    column: col.attribute().to_string(),
                });
            }
            if !self.free.contains(&col) {
                self.free.push(col);
            }
        }
        Ok(())
    }

    /// Like `resolve`, but a join condition may not look ahead to later joins.
    fn resolve_join(&mut self, target: &str, condition: &Expr) -> QueryResult<()> {
        let mut columns = Vec::new();
        condition.collect_columns(&mut columns);
        if let Some(col) = columns
            .iter()
            .find(|c| self.later.iter().any(|a| &**a == c.alias()))
        {
            return Err(QueryError::invalid_join(
                target,
                format!(
                    "on-predicate refers to `{}`, which is joined later",
                    col.alias()
                ),
            ));
        }
        self.resolve(condition)
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Immutable, validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    shape: Shape,
    projections: Vec<Projection>,
    distinct: bool,
    sources: Vec<EntityPath>,
    joins: Vec<JoinEdge>,
    predicate: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    order_by: Vec<OrderByExpr>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl QueryPlan {
    pub(crate) fn shape(&self) -> Shape {
        self.shape
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn sources(&self) -> &[EntityPath] {
        &self.sources
    }

    pub fn joins(&self) -> &[JoinEdge] {
        &self.joins
    }

    /// The AND of all WHERE predicates.
    pub fn predicate(&self) -> Option<&Expr> {
        self.predicate.as_ref()
    }

    pub fn group_by(&self) -> &[Expr] {
        &self.group_by
    }

    pub fn having(&self) -> Option<&Expr> {
        self.having.as_ref()
    }

    pub fn order_by(&self) -> &[OrderByExpr] {
        &self.order_by
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Aliases bound by sources and joins, in binding order.
    pub fn bound_aliases(&self) -> impl Iterator<Item = &Arc<str>> {
        self.sources
            .iter()
            .map(EntityPath::alias_arc)
            .chain(self.joins.iter().map(|j| j.target().alias_arc()))
    }

    pub(crate) fn has_collection_fetch(&self) -> bool {
        self.joins.iter().any(JoinEdge::is_collection_fetch)
    }

    /// Every expression of the plan outside nested subqueries.
    pub(crate) fn expressions(&self) -> Vec<&Expr> {
        let mut out: Vec<&Expr> = self
            .projections
            .iter()
            .filter_map(|p| match p {
                Projection::Expr(expr) => Some(expr),
                Projection::Entity(_) => None,
            })
            .collect();
        out.extend(self.joins.iter().filter_map(JoinEdge::condition));
        out.extend(self.predicate.iter());
        out.extend(self.group_by.iter());
        out.extend(self.having.iter());
        out.extend(self.order_by.iter().map(OrderByExpr::expr));
        out
    }

    pub fn to_statement(&self, dialect: Dialect) -> QueryResult<Statement> {
        compile::compile(self, dialect).map(|compiled| compiled.statement)
    }
}
