//! Join resolution.
//!
//! Every join starts as a [`PendingJoin`] while the query is being built and
//! becomes a [`JoinEdge`] when the plan is finalized. Its state moves
//! `Unresolved -> Typed -> Bound`:
//!
//! - a relationship join (`join(member.team, team)`) is `Typed` immediately;
//!   its ON clause comes from the relationship's foreign key and an extra
//!   `on(...)` only narrows the one partner each source row already has;
//! - a bare entity join (`join_entity(team)`) stays `Unresolved` until an
//!   `on(...)` predicate is supplied. It then pairs every source row with
//!   every target row and keeps the pairs the predicate accepts;
//! - an explicit `cross_join` is `Typed` with no condition at all.
//!
//! A join still `Unresolved` when the plan is built is an error: a cartesian
//! product is never produced by accident.

use crate::error::{QueryError, QueryResult};
use crate::schema::{Cardinality, EntityPath, RelationshipRef};
use crate::sql::expr::{Expr, ExprExt};

/// Kind of join emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    Cross,
}

/// Resolution state of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    /// Bare target without relationship or on-predicate.
    Unresolved,
    /// Relationship known, on-predicate supplied, or explicit cross join.
    Typed,
    /// Condition derived and alias checked; part of a built plan.
    Bound,
}

/// A join as recorded by the builder.
#[derive(Debug, Clone)]
pub(crate) struct PendingJoin {
    kind: JoinKind,
    target: EntityPath,
    relationship: Option<RelationshipRef>,
    on: Option<Expr>,
    fetch: bool,
}

impl PendingJoin {
    pub(crate) fn new(
        kind: JoinKind,
        target: EntityPath,
        relationship: Option<RelationshipRef>,
    ) -> Self {
        Self {
            kind,
            target,
            relationship,
            on: None,
            fetch: false,
        }
    }

    pub(crate) fn state(&self) -> JoinState {
        if self.kind == JoinKind::Cross || self.relationship.is_some() || self.on.is_some() {
            JoinState::Typed
        } else {
            JoinState::Unresolved
        }
    }

    pub(crate) fn target(&self) -> &EntityPath {
        &self.target
    }

    /// AND `predicate` onto the join's on-clause.
    pub(crate) fn add_on(&mut self, predicate: Expr) -> QueryResult<()> {
        if self.kind == JoinKind::Cross {
            return Err(QueryError::invalid_join(
                self.target.alias(),
                "a cross join takes no on-predicate; use join_entity() instead",
            ));
        }
        self.on = match self.on.take() {
            Some(existing) => Some(existing.and(predicate)?),
            None => Some(predicate),
        };
        Ok(())
    }

    pub(crate) fn mark_fetch(&mut self) -> QueryResult<()> {
        if self.relationship.is_none() {
            return Err(QueryError::invalid_join(
                self.target.alias(),
                "fetch_join() needs a relationship join",
            ));
        }
        self.fetch = true;
        Ok(())
    }

    /// Derive the final join condition.
    pub(crate) fn bind(self) -> QueryResult<JoinEdge> {
        if self.state() == JoinState::Unresolved {
            return Err(QueryError::AmbiguousJoin {
                alias: self.target.alias().to_string(),
            });
        }

        let condition = match &self.relationship {
            Some(rel) => {
                let base = rel.join_condition(&self.target)?;
                match &self.on {
                    Some(on) => Some(base.and(on.clone())?),
                    None => Some(base),
                }
            }
            None => self.on.clone(),
        };

        Ok(JoinEdge {
            kind: self.kind,
            target: self.target,
            relationship: self.relationship,
            on: self.on,
            condition,
            fetch: self.fetch,
        })
    }
}

/// A resolved join of a built plan.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinEdge {
    kind: JoinKind,
    target: EntityPath,
    relationship: Option<RelationshipRef>,
    on: Option<Expr>,
    condition: Option<Expr>,
    fetch: bool,
}

impl JoinEdge {
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn state(&self) -> JoinState {
        JoinState::Bound
    }

    /// Alias on the left of a relationship join; `None` for ad-hoc joins.
    pub fn left_alias(&self) -> Option<&str> {
        self.relationship.as_ref().map(|r| r.source().alias())
    }

    pub fn target(&self) -> &EntityPath {
        &self.target
    }

    pub fn relationship(&self) -> Option<&RelationshipRef> {
        self.relationship.as_ref()
    }

    /// The caller-supplied on-predicate, without the relationship condition.
    pub fn on_predicate(&self) -> Option<&Expr> {
        self.on.as_ref()
    }

    /// Full ON clause as emitted.
    pub fn condition(&self) -> Option<&Expr> {
        self.condition.as_ref()
    }

    pub fn is_fetch(&self) -> bool {
        self.fetch
    }

    pub(crate) fn is_collection_fetch(&self) -> bool {
        self.fetch
            && self
                .relationship
                .as_ref()
                .is_some_and(|r| r.cardinality() == Cardinality::OneToMany)
    }
}
