//! Subquery embedding.
//!
//! A finished plan becomes a [`SubQuery`] operand through
//! [`Query::subquery`](super::Query::subquery). It must select exactly one
//! column and bind its own aliases: an alias also bound by an enclosing query
//! is an [`AliasConflict`](QueryError::AliasConflict). Columns of aliases the
//! subquery does not bind are kept as free columns and must be bound by the
//! enclosing query (a correlated subquery).
//!
//! Single-row production of a scalar subquery is not verified here.

use std::fmt;
use std::sync::Arc;

use super::{Projection, QueryPlan};
use crate::error::{QueryError, QueryResult};
use crate::schema::{ColumnRef, ValueType};
use crate::sql::expr::Expr;

/// A plan embedded as a scalar or set operand.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    plan: QueryPlan,
    free: Vec<ColumnRef>,
    namespace: Vec<Arc<str>>,
}

impl SubQuery {
    pub(crate) fn new(plan: QueryPlan, free: Vec<ColumnRef>) -> QueryResult<Self> {
        let single = matches!(plan.projections(), [Projection::Expr(_)]);
        let namespace = namespace_of(&plan);
        let sub = Self {
            plan,
            free,
            namespace,
        };
        if !single {
            return Err(QueryError::type_mismatch(
                &sub,
                "a subquery operand must select exactly one column",
            ));
        }
        Ok(sub)
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Type of the single selected column.
    pub fn value_type(&self) -> Option<ValueType> {
        match self.plan.projections() {
            [Projection::Expr(expr)] => expr.value_type(),
            _ => None,
        }
    }

    /// Columns of enclosing aliases the subquery refers to.
    pub fn free_columns(&self) -> &[ColumnRef] {
        &self.free
    }

    pub fn is_correlated(&self) -> bool {
        !self.free.is_empty()
    }

    /// Every alias bound by this subquery or by subqueries nested in it.
    pub fn namespace(&self) -> &[Arc<str>] {
        &self.namespace
    }

    /// Fail if any alias of the subquery is also bound in `enclosing`.
    pub(crate) fn check_disjoint<'a>(
        &self,
        mut enclosing: impl Iterator<Item = &'a str>,
    ) -> QueryResult<()> {
        match enclosing.find(|alias| self.namespace.iter().any(|own| &**own == *alias)) {
            Some(alias) => Err(QueryError::alias_conflict(
                alias,
                "by the enclosing query; give the subquery its own alias with with_alias()",
            )),
            None => Ok(()),
        }
    }
}

fn namespace_of(plan: &QueryPlan) -> Vec<Arc<str>> {
    let mut out: Vec<Arc<str>> = plan.bound_aliases().cloned().collect();
    let mut nested = Vec::new();
    for expr in plan.expressions() {
        expr.collect_subqueries(&mut nested);
    }
    for sub in nested {
        for alias in sub.namespace() {
            if !out.contains(alias) {
                out.push(Arc::clone(alias));
            }
        }
    }
    out
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(select ")?;
        for (i, projection) in self.plan.projections().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match projection {
                Projection::Expr(expr) => write!(f, "{}", expr)?,
                Projection::Entity(path) => f.write_str(path.alias())?,
            }
        }
        f.write_str(" from ")?;
        for (i, source) in self.plan.sources().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", source.entity_name(), source.alias())?;
        }
        if let Some(predicate) = self.plan.predicate() {
            write!(f, " where {}", predicate)?;
        }
        f.write_str(")")
    }
}

impl From<SubQuery> for Projection {
    fn from(sub: SubQuery) -> Self {
        Projection::Expr(Expr::from(sub))
    }
}
