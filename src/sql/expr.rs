//! Expression AST and typed builder DSL.
//!
//! Expressions are built from schema column references and literal values
//! through [`ExprExt`]. Every builder checks operand types when it is called
//! and returns a [`QueryError`] instead of an expression that could only fail
//! once it reaches the database.
//!
//! ```ignore
//! let age = member.column("age")?;
//! let adults = age.clone().goe(18)?.and(age.lt(65)?)?;
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::{QueryError, QueryResult};
use crate::query::{OrderByExpr, SubQuery};
use crate::schema::{ColumnRef, ValueType};
use crate::sql::token::Token;

// =============================================================================
// Values
// =============================================================================

/// A typed value: a literal in an expression or a column read from a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// `None` for NULL, which has no type of its own.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Text(_) => Some(ValueType::Text),
            Value::Bool(_) => Some(ValueType::Bool),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of an integer or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert a value read from a backend to the declared type.
    ///
    /// Backends without a boolean storage class return integers; aggregates
    /// may widen integers to floats. Returns the original value on failure.
    pub fn coerce(self, ty: ValueType) -> Result<Value, Value> {
        match (self, ty) {
            (Value::Null, _) => Ok(Value::Null),
            (v @ Value::Int(_), ValueType::Int) => Ok(v),
            (Value::Int(n), ValueType::Float) => Ok(Value::Float(n as f64)),
            (Value::Int(n), ValueType::Bool) => Ok(Value::Bool(n != 0)),
            (Value::Float(f), ValueType::Int) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Value::Int(f as i64))
            }
            (v @ Value::Float(_), ValueType::Float) => Ok(v),
            (v @ Value::Text(_), ValueType::Text) => Ok(v),
            (v @ Value::Bool(_), ValueType::Bool) => Ok(v),
            (Value::Bool(b), ValueType::Int) => Ok(Value::Int(i64::from(b))),
            (other, _) => Err(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => {
                let mut buffer = ryu::Buffer::new();
                f.write_str(buffer.format(*x))
            }
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }

            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::Literal(Value::from(v))
                }
            }
        )*
    };
}

value_from! {
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Option<T>> for Expr {
    fn from(v: Option<T>) -> Self {
        Expr::Literal(Value::from(v))
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

// =============================================================================
// Operators
// =============================================================================

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    pub(crate) fn token(self) -> Token {
        match self {
            BinaryOperator::Eq => Token::Eq,
            BinaryOperator::Ne => Token::Ne,
            BinaryOperator::Lt => Token::Lt,
            BinaryOperator::Lte => Token::Lte,
            BinaryOperator::Gt => Token::Gt,
            BinaryOperator::Gte => Token::Gte,
            BinaryOperator::Like => Token::Like,
            BinaryOperator::And => Token::And,
            BinaryOperator::Or => Token::Or,
            BinaryOperator::Add => Token::Plus,
            BinaryOperator::Sub => Token::Minus,
            BinaryOperator::Mul => Token::Mul,
            BinaryOperator::Div => Token::Div,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Like => "like",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }

    /// Binding strength; higher binds tighter.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Lte
            | BinaryOperator::Gt
            | BinaryOperator::Gte
            | BinaryOperator::Like => 3,
            BinaryOperator::Add | BinaryOperator::Sub => 4,
            BinaryOperator::Mul | BinaryOperator::Div => 5,
        }
    }

    /// Whether `a op (b op c)` equals `(a op b) op c`.
    pub(crate) fn is_associative(self) -> bool {
        matches!(
            self,
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Add | BinaryOperator::Mul
        )
    }

    fn is_range(self) -> bool {
        matches!(
            self,
            BinaryOperator::Lt | BinaryOperator::Lte | BinaryOperator::Gt | BinaryOperator::Gte
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFunc {
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Avg => "avg",
            AggregateFunc::Max => "max",
            AggregateFunc::Min => "min",
        }
    }
}

// =============================================================================
// Expression AST
// =============================================================================

/// A typed expression node. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// `arg == None` is `count(*)`.
    Aggregate {
        func: AggregateFunc,
        arg: Option<Box<Expr>>,
        distinct: bool,
    },
    /// Scalar subquery operand.
    Subquery(Box<SubQuery>),
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<SubQuery>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

impl Expr {
    /// Result type of the expression; `None` for an untyped NULL literal.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Expr::Column(col) => Some(col.value_type()),
            Expr::Literal(v) => v.value_type(),
            Expr::Unary { .. }
            | Expr::In { .. }
            | Expr::InSubquery { .. }
            | Expr::Between { .. }
            | Expr::IsNull { .. } => Some(ValueType::Bool),
            Expr::Binary { left, op, right } => match op {
                BinaryOperator::Add
                | BinaryOperator::Sub
                | BinaryOperator::Mul
                | BinaryOperator::Div => {
                    let float = [left, right]
                        .iter()
                        .any(|e| e.value_type() == Some(ValueType::Float));
                    Some(if float { ValueType::Float } else { ValueType::Int })
                }
                _ => Some(ValueType::Bool),
            },
            Expr::Aggregate { func, arg, .. } => match func {
                AggregateFunc::Count => Some(ValueType::Int),
                AggregateFunc::Avg => Some(ValueType::Float),
                _ => arg.as_ref().and_then(|a| a.value_type()),
            },
            Expr::Subquery(sub) => sub.value_type(),
        }
    }

    /// Whether the expression contains an aggregate outside any subquery.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Subquery(_) => false,
            other => other.children().iter().any(|c| c.is_aggregate()),
        }
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Subquery(_) => vec![],
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::InSubquery { expr, .. } => {
                vec![&**expr]
            }
            Expr::Binary { left, right, .. } => vec![&**left, &**right],
            Expr::Aggregate { arg, .. } => arg.iter().map(|a| &**a).collect(),
            Expr::In { expr, list, .. } => {
                let mut out: Vec<&Expr> = vec![&**expr];
                out.extend(list.iter());
                out
            }
            Expr::Between {
                expr, low, high, ..
            } => vec![&**expr, &**low, &**high],
        }
    }

    /// Column references this expression needs bound by the enclosing query:
    /// its own columns plus the free columns of embedded subqueries.
    pub(crate) fn collect_columns(&self, out: &mut Vec<ColumnRef>) {
        match self {
            Expr::Column(col) => out.push(col.clone()),
            Expr::Subquery(sub) => out.extend(sub.free_columns().iter().cloned()),
            Expr::InSubquery { expr, subquery, .. } => {
                expr.collect_columns(out);
                out.extend(subquery.free_columns().iter().cloned());
            }
            other => {
                for child in other.children() {
                    child.collect_columns(out);
                }
            }
        }
    }

    /// Subqueries embedded directly in this expression.
    pub(crate) fn collect_subqueries<'a>(&'a self, out: &mut Vec<&'a SubQuery>) {
        match self {
            Expr::Subquery(sub) => out.push(&**sub),
            Expr::InSubquery { expr, subquery, .. } => {
                expr.collect_subqueries(out);
                out.push(&**subquery);
            }
            other => {
                for child in other.children() {
                    child.collect_subqueries(out);
                }
            }
        }
    }

    /// AND-combine predicates left to right.
    pub(crate) fn conjunction(predicates: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        predicates.into_iter().reduce(|acc, next| Expr::Binary {
            left: Box::new(acc),
            op: BinaryOperator::And,
            right: Box::new(next),
        })
    }
}

impl From<ColumnRef> for Expr {
    fn from(col: ColumnRef) -> Self {
        Expr::Column(col)
    }
}

impl From<&ColumnRef> for Expr {
    fn from(col: &ColumnRef) -> Self {
        Expr::Column(col.clone())
    }
}

impl From<SubQuery> for Expr {
    fn from(sub: SubQuery) -> Self {
        Expr::Subquery(Box::new(sub))
    }
}

/// Whether `child` needs parentheses under a binary `parent`.
pub(crate) fn needs_parens(parent: BinaryOperator, child: &Expr, is_right: bool) -> bool {
    match child {
        Expr::Binary { op, .. } => {
            op.precedence() < parent.precedence()
                || (is_right && op.precedence() == parent.precedence() && !parent.is_associative())
                || (op.precedence() == parent.precedence() && *op != parent)
        }
        Expr::In { .. } | Expr::InSubquery { .. } | Expr::Between { .. } | Expr::IsNull { .. } => {
            parent.precedence() >= 3
        }
        _ => false,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(col) => write!(f, "{}", col),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Unary { expr, .. } => write!(f, "not ({})", expr),
            Expr::Binary { left, op, right } => {
                fmt_operand(f, *op, left, false)?;
                write!(f, " {} ", op.symbol())?;
                fmt_operand(f, *op, right, true)
            }
            Expr::Aggregate {
                func,
                arg,
                distinct,
            } => match arg {
                None => write!(f, "{}(*)", func.name()),
                Some(arg) if *distinct => write!(f, "{}(distinct {})", func.name(), arg),
                Some(arg) => write!(f, "{}({})", func.name(), arg),
            },
            Expr::Subquery(sub) => write!(f, "{}", sub),
            Expr::In {
                expr,
                list,
                negated,
            } => {
                write!(f, "{} {}in (", expr, if *negated { "not " } else { "" })?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => write!(
                f,
                "{} {}in {}",
                expr,
                if *negated { "not " } else { "" },
                subquery
            ),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}between {} and {}",
                expr,
                if *negated { "not " } else { "" },
                low,
                high
            ),
            Expr::IsNull { expr, negated } => {
                write!(f, "{} is {}null", expr, if *negated { "not " } else { "" })
            }
        }
    }
}

fn fmt_operand(
    f: &mut fmt::Formatter<'_>,
    parent: BinaryOperator,
    child: &Expr,
    is_right: bool,
) -> fmt::Result {
    if needs_parens(parent, child, is_right) {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

// =============================================================================
// Type checks
// =============================================================================

const NULL_COMPARISON: &str = "comparison with a NULL literal; use is_null() or is_not_null()";

fn operand_type(whole: &Expr, operand: &Expr) -> QueryResult<ValueType> {
    operand
        .value_type()
        .ok_or_else(|| QueryError::invalid_predicate(whole, NULL_COMPARISON))
}

fn check_comparable(whole: &Expr, left: &Expr, right: &Expr, ordered: bool) -> QueryResult<()> {
    let lt = operand_type(whole, left)?;
    let rt = operand_type(whole, right)?;
    if !lt.is_comparable_with(rt) {
        return Err(QueryError::type_mismatch(
            whole,
            format!("cannot compare {} with {}", lt, rt),
        ));
    }
    if ordered && !lt.is_ordered() {
        return Err(QueryError::type_mismatch(
            whole,
            format!("range comparison needs numeric or text operands, found {}", lt),
        ));
    }
    Ok(())
}

fn require_type(
    whole: &Expr,
    operand: &Expr,
    accepts: impl Fn(ValueType) -> bool,
    expected: &str,
) -> QueryResult<()> {
    match operand.value_type() {
        Some(ty) if accepts(ty) => Ok(()),
        Some(ty) => Err(QueryError::type_mismatch(
            whole,
            format!("expected {} operand, found {}", expected, ty),
        )),
        None => Err(QueryError::invalid_predicate(whole, NULL_COMPARISON)),
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> QueryResult<Expr> {
    let expr = Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    };
    if let Expr::Binary { left, right, .. } = &expr {
        match op {
            BinaryOperator::And | BinaryOperator::Or => {
                require_type(&expr, left, |t| t == ValueType::Bool, "boolean")?;
                require_type(&expr, right, |t| t == ValueType::Bool, "boolean")?;
            }
            BinaryOperator::Like => {
                require_type(&expr, left, |t| t == ValueType::Text, "text")?;
                require_type(&expr, right, |t| t == ValueType::Text, "text")?;
            }
            BinaryOperator::Add
            | BinaryOperator::Sub
            | BinaryOperator::Mul
            | BinaryOperator::Div => {
                require_type(&expr, left, ValueType::is_numeric, "numeric")?;
                require_type(&expr, right, ValueType::is_numeric, "numeric")?;
            }
            _ => check_comparable(&expr, left, right, op.is_range())?,
        }
    }
    Ok(expr)
}

fn between(expr: Expr, low: Expr, high: Expr, negated: bool) -> QueryResult<Expr> {
    let whole = Expr::Between {
        expr: Box::new(expr),
        low: Box::new(low),
        high: Box::new(high),
        negated,
    };
    if let Expr::Between { expr, low, high, .. } = &whole {
        check_comparable(&whole, expr, low, true)?;
        check_comparable(&whole, expr, high, true)?;
    }
    Ok(whole)
}

fn in_list(expr: Expr, list: Vec<Expr>, negated: bool) -> QueryResult<Expr> {
    let whole = Expr::In {
        expr: Box::new(expr),
        list,
        negated,
    };
    if let Expr::In { expr, list, .. } = &whole {
        operand_type(&whole, expr)?;
        for item in list {
            check_comparable(&whole, expr, item, false)?;
        }
    }
    Ok(whole)
}

fn in_subquery(expr: Expr, subquery: SubQuery, negated: bool) -> QueryResult<Expr> {
    let whole = Expr::InSubquery {
        expr: Box::new(expr),
        subquery: Box::new(subquery),
        negated,
    };
    if let Expr::InSubquery { expr, subquery, .. } = &whole {
        let lt = operand_type(&whole, expr)?;
        if let Some(rt) = subquery.value_type() {
            if !lt.is_comparable_with(rt) {
                return Err(QueryError::type_mismatch(
                    &whole,
                    format!("cannot compare {} with subquery of {}", lt, rt),
                ));
            }
        }
    }
    Ok(whole)
}

fn aggregate(
    func: AggregateFunc,
    arg: Expr,
    accepts: impl Fn(ValueType) -> bool,
    expected: &str,
) -> QueryResult<Expr> {
    let whole = Expr::Aggregate {
        func,
        arg: Some(Box::new(arg)),
        distinct: false,
    };
    if let Expr::Aggregate { arg: Some(arg), .. } = &whole {
        match arg.value_type() {
            Some(ty) if accepts(ty) => {}
            Some(ty) => {
                return Err(QueryError::type_mismatch(
                    &whole,
                    format!("{} needs {} values, found {}", func.name(), expected, ty),
                ))
            }
            None => {
                return Err(QueryError::type_mismatch(
                    &whole,
                    format!("{} of an untyped NULL", func.name()),
                ))
            }
        }
    }
    Ok(whole)
}

// =============================================================================
// Builder DSL
// =============================================================================

/// Typed expression builders, available on [`Expr`] and [`ColumnRef`].
///
/// Comparison, logic, arithmetic and most aggregates check operand types and
/// return `QueryResult<Expr>`; null checks, counts and ordering cannot fail.
pub trait ExprExt: Into<Expr> + Sized {
    // === Comparison ===

    fn eq(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Eq, other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Ne, other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Gt, other.into())
    }

    /// Greater than or equal.
    fn goe(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Gte, other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Lt, other.into())
    }

    /// Less than or equal.
    fn loe(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Lte, other.into())
    }

    /// Inclusive on both ends.
    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> QueryResult<Expr> {
        between(self.into(), low.into(), high.into(), false)
    }

    fn not_between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> QueryResult<Expr> {
        between(self.into(), low.into(), high.into(), true)
    }

    /// An empty list matches nothing.
    fn in_list<I, V>(self, values: I) -> QueryResult<Expr>
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        in_list(self.into(), values.into_iter().map(Into::into).collect(), false)
    }

    /// An empty list matches everything.
    fn not_in<I, V>(self, values: I) -> QueryResult<Expr>
    where
        I: IntoIterator<Item = V>,
        V: Into<Expr>,
    {
        in_list(self.into(), values.into_iter().map(Into::into).collect(), true)
    }

    fn in_subquery(self, subquery: SubQuery) -> QueryResult<Expr> {
        in_subquery(self.into(), subquery, false)
    }

    fn not_in_subquery(self, subquery: SubQuery) -> QueryResult<Expr> {
        in_subquery(self.into(), subquery, true)
    }

    fn like(self, pattern: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Like, pattern.into())
    }

    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into()),
            negated: false,
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into()),
            negated: true,
        }
    }

    // === Logic ===

    fn and(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Or, other.into())
    }

    fn not(self) -> QueryResult<Expr> {
        let expr: Expr = self.into();
        let whole = Expr::Unary {
            op: UnaryOperator::Not,
            expr: Box::new(expr),
        };
        if let Expr::Unary { expr, .. } = &whole {
            require_type(&whole, expr, |t| t == ValueType::Bool, "boolean")?;
        }
        Ok(whole)
    }

    // === Arithmetic ===

    fn add(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Add, other.into())
    }

    fn sub(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Sub, other.into())
    }

    fn mul(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Mul, other.into())
    }

    fn div(self, other: impl Into<Expr>) -> QueryResult<Expr> {
        binary(self.into(), BinaryOperator::Div, other.into())
    }

    // === Aggregates ===

    fn count(self) -> Expr {
        Expr::Aggregate {
            func: AggregateFunc::Count,
            arg: Some(Box::new(self.into())),
            distinct: false,
        }
    }

    fn count_distinct(self) -> Expr {
        Expr::Aggregate {
            func: AggregateFunc::Count,
            arg: Some(Box::new(self.into())),
            distinct: true,
        }
    }

    fn sum(self) -> QueryResult<Expr> {
        aggregate(AggregateFunc::Sum, self.into(), ValueType::is_numeric, "numeric")
    }

    fn avg(self) -> QueryResult<Expr> {
        aggregate(AggregateFunc::Avg, self.into(), ValueType::is_numeric, "numeric")
    }

    fn max(self) -> QueryResult<Expr> {
        aggregate(AggregateFunc::Max, self.into(), ValueType::is_ordered, "ordered")
    }

    fn min(self) -> QueryResult<Expr> {
        aggregate(AggregateFunc::Min, self.into(), ValueType::is_ordered, "ordered")
    }

    // === Ordering ===

    fn asc(self) -> OrderByExpr {
        OrderByExpr::asc(self.into())
    }

    fn desc(self) -> OrderByExpr {
        OrderByExpr::desc(self.into())
    }
}

impl ExprExt for Expr {}
impl ExprExt for ColumnRef {}

/// `count(*)`
pub fn count_star() -> Expr {
    Expr::Aggregate {
        func: AggregateFunc::Count,
        arg: None,
        distinct: false,
    }
}

/// Literal value expression.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}
