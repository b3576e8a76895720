//! Composable condition and value expressions.
//!
//! An [`Expression`] is a closed tree of comparisons, logical groups and raw
//! fragments. Rendering walks the tree without touching it and produces SQL
//! with `?` placeholders plus the parameters in placeholder order, so the
//! same expression always renders to the same [`Fragment`].
//!
//! ```
//! use objsql::{col, Expression};
//! let adult_members = col("age").ge(18).and(Expression::raw("name LIKE ?", objsql::values!["A%"]));
//! let fragment = adult_members.render().unwrap();
//! assert_eq!(fragment.sql, "(age >= ? AND (name LIKE ?))");
//! assert_eq!(fragment.params.len(), 2);
//! ```

use chrono::NaiveDateTime;

use crate::column::{Columnizable, Position};
use crate::dataset::Dataset;
use crate::datatype::Value;
use crate::dialect::{count_placeholders, Dialect, Neutral};
use crate::error::{ObjsqlError, Result};
use crate::statement::Fragment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl ComparisonOp {
    fn sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
            ComparisonOp::In => "IN",
            ComparisonOp::NotIn => "NOT IN",
            ComparisonOp::IsNull => "IS NULL",
            ComparisonOp::IsNotNull => "IS NOT NULL",
        }
    }
    fn is_unary(&self) -> bool {
        matches!(self, ComparisonOp::IsNull | ComparisonOp::IsNotNull)
    }
    fn is_membership(&self) -> bool {
        matches!(self, ComparisonOp::In | ComparisonOp::NotIn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// The right hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(Columnizable),
    List(Vec<Columnizable>),
    Subquery(Box<Dataset>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Comparison {
        op: ComparisonOp,
        left: Option<Columnizable>,
        right: Option<Operand>,
    },
    Logical {
        op: LogicalOp,
        operands: Vec<Expression>,
    },
    Raw {
        text: String,
        params: Vec<Value>,
    },
}

impl Expression {
    pub fn comparison(op: ComparisonOp, left: Option<Columnizable>, right: Option<Operand>) -> Self {
        Expression::Comparison { op, left, right }
    }
    pub fn all(operands: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Logical {
            op: LogicalOp::And,
            operands: operands.into_iter().collect(),
        }
    }
    pub fn any(operands: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Logical {
            op: LogicalOp::Or,
            operands: operands.into_iter().collect(),
        }
    }
    pub fn negate(operand: Expression) -> Self {
        Expression::Logical {
            op: LogicalOp::Not,
            operands: vec![operand],
        }
    }
    /// Caller supplied SQL, passed through untouched apart from parameter
    /// binding. Nothing here guards against injection.
    pub fn raw(text: &str, params: Vec<Value>) -> Self {
        Expression::Raw {
            text: text.to_string(),
            params,
        }
    }

    /// Joins with AND, flattening into an existing AND group.
    pub fn and(self, other: Expression) -> Self {
        match self {
            Expression::Logical {
                op: LogicalOp::And,
                mut operands,
            } if !operands.is_empty() => {
                operands.push(other);
                Expression::all(operands)
            }
            first => Expression::all([first, other]),
        }
    }
    pub fn or(self, other: Expression) -> Self {
        match self {
            Expression::Logical {
                op: LogicalOp::Or,
                mut operands,
            } if !operands.is_empty() => {
                operands.push(other);
                Expression::any(operands)
            }
            first => Expression::any([first, other]),
        }
    }

    pub fn render(&self) -> Result<Fragment> {
        self.render_with(&Neutral)
    }

    pub fn render_with(&self, dialect: &dyn Dialect) -> Result<Fragment> {
        let mut out = Fragment::new();
        self.write(&mut out, dialect)?;
        Ok(out)
    }

    pub(crate) fn write(&self, out: &mut Fragment, dialect: &dyn Dialect) -> Result<()> {
        match self {
            Expression::Comparison { op, left, right } => {
                let left = left.as_ref().ok_or_else(|| {
                    ObjsqlError::Compilation(format!("'{}' comparison is missing its left operand", op.sql()))
                })?;
                left.write(Position::Nested, out)?;
                let (op, right) = match null_test(*op, right) {
                    Some(test) => (test, None),
                    None => (*op, right.as_ref()),
                };
                out.push(" ");
                out.push(op.sql());
                match (op.is_unary(), right) {
                    (true, None) => {}
                    (true, Some(_)) => {
                        return Err(ObjsqlError::Compilation(format!(
                            "'{}' does not take a right operand",
                            op.sql()
                        )));
                    }
                    (false, None) => {
                        return Err(ObjsqlError::Compilation(format!(
                            "'{}' comparison is missing its right operand",
                            op.sql()
                        )));
                    }
                    (false, Some(operand)) => {
                        out.push(" ");
                        write_operand(op, operand, out, dialect)?;
                    }
                }
            }
            Expression::Logical { op, operands } => match op {
                LogicalOp::Not => {
                    if operands.len() != 1 {
                        return Err(ObjsqlError::Compilation(format!(
                            "NOT takes exactly one operand, got {}",
                            operands.len()
                        )));
                    }
                    out.push("NOT ");
                    write_grouped(&operands[0], out, dialect)?;
                }
                LogicalOp::And | LogicalOp::Or => {
                    if operands.is_empty() {
                        return Err(ObjsqlError::Compilation(format!(
                            "{} requires at least one operand",
                            if *op == LogicalOp::And { "AND" } else { "OR" }
                        )));
                    }
                    let joiner = if *op == LogicalOp::And { " AND " } else { " OR " };
                    out.push("(");
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            out.push(joiner);
                        }
                        match operand {
                            Expression::Raw { .. } => write_grouped(operand, out, dialect)?,
                            other => other.write(out, dialect)?,
                        }
                    }
                    out.push(")");
                }
            },
            Expression::Raw { text, params } => {
                let placeholders = count_placeholders(text);
                if placeholders != params.len() {
                    return Err(ObjsqlError::Compilation(format!(
                        "raw fragment '{}' has {} placeholders but {} parameters",
                        text,
                        placeholders,
                        params.len()
                    )));
                }
                out.push(text);
                out.params.extend(params.iter().cloned());
            }
        }
        Ok(())
    }
}

// `= NULL` and `!= NULL` against a null literal become IS [NOT] NULL.
fn null_test(op: ComparisonOp, right: &Option<Operand>) -> Option<ComparisonOp> {
    match (op, right) {
        (ComparisonOp::Eq, Some(Operand::Single(Columnizable::Literal(Value::Null)))) => {
            Some(ComparisonOp::IsNull)
        }
        (ComparisonOp::Ne, Some(Operand::Single(Columnizable::Literal(Value::Null)))) => {
            Some(ComparisonOp::IsNotNull)
        }
        _ => None,
    }
}

// Wraps anything that is not already a parenthesised group.
fn write_grouped(expression: &Expression, out: &mut Fragment, dialect: &dyn Dialect) -> Result<()> {
    match expression {
        Expression::Logical {
            op: LogicalOp::And | LogicalOp::Or,
            ..
        } => expression.write(out, dialect),
        other => {
            out.push("(");
            other.write(out, dialect)?;
            out.push(")");
            Ok(())
        }
    }
}

fn write_operand(op: ComparisonOp, operand: &Operand, out: &mut Fragment, dialect: &dyn Dialect) -> Result<()> {
    match (op.is_membership(), operand) {
        (true, Operand::List(items)) => {
            if items.is_empty() {
                return Err(ObjsqlError::Compilation(format!("'{}' list is empty", op.sql())));
            }
            out.push("(");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                item.write(Position::Nested, out)?;
            }
            out.push(")");
        }
        (true, Operand::Subquery(dataset)) => {
            out.push("(");
            dataset.write(out, dialect)?;
            out.push(")");
        }
        (true, Operand::Single(_)) => {
            return Err(ObjsqlError::Compilation(format!(
                "'{}' expects a list or a dataset",
                op.sql()
            )));
        }
        (false, Operand::Single(item)) => item.write(Position::Nested, out)?,
        (false, _) => {
            return Err(ObjsqlError::Compilation(format!(
                "'{}' expects a single operand",
                op.sql()
            )));
        }
    }
    Ok(())
}

// ------------- Comparison builders -------------
impl Columnizable {
    fn compare(self, op: ComparisonOp, right: Option<Operand>) -> Expression {
        Expression::comparison(op, Some(self), right)
    }
    pub fn eq(self, right: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Eq, Some(right.into()))
    }
    pub fn ne(self, right: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Ne, Some(right.into()))
    }
    pub fn lt(self, right: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Lt, Some(right.into()))
    }
    pub fn le(self, right: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Le, Some(right.into()))
    }
    pub fn gt(self, right: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Gt, Some(right.into()))
    }
    pub fn ge(self, right: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Ge, Some(right.into()))
    }
    pub fn like(self, pattern: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::Like, Some(pattern.into()))
    }
    pub fn not_like(self, pattern: impl Into<Operand>) -> Expression {
        self.compare(ComparisonOp::NotLike, Some(pattern.into()))
    }
    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expression {
        let items = values
            .into_iter()
            .map(|v| Columnizable::Literal(v.into()))
            .collect();
        self.compare(ComparisonOp::In, Some(Operand::List(items)))
    }
    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expression {
        let items = values
            .into_iter()
            .map(|v| Columnizable::Literal(v.into()))
            .collect();
        self.compare(ComparisonOp::NotIn, Some(Operand::List(items)))
    }
    pub fn in_dataset(self, dataset: Dataset) -> Expression {
        self.compare(ComparisonOp::In, Some(Operand::Subquery(Box::new(dataset))))
    }
    pub fn is_null(self) -> Expression {
        self.compare(ComparisonOp::IsNull, None)
    }
    pub fn is_not_null(self) -> Expression {
        self.compare(ComparisonOp::IsNotNull, None)
    }
}

// ------------- Operand conversions -------------
impl From<Columnizable> for Operand {
    fn from(c: Columnizable) -> Self {
        Operand::Single(c)
    }
}
impl From<Vec<Columnizable>> for Operand {
    fn from(items: Vec<Columnizable>) -> Self {
        Operand::List(items)
    }
}
impl From<Dataset> for Operand {
    fn from(dataset: Dataset) -> Self {
        Operand::Subquery(Box::new(dataset))
    }
}

// literals on the right hand side are bound as parameters
macro_rules! literal_operand {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Single(Columnizable::Literal(Value::from(v)))
                }
            }
        )+
    };
}
literal_operand!(Value, i64, i32, f64, bool, &str, String, NaiveDateTime);
