//! The fluent SELECT builder.
//!
//! A [`Dataset`] is a plain value: every builder call consumes it and hands
//! back the refined value, and `clone()` gives a fully independent copy. It
//! is meant to be built and consumed by one caller at a time.
//!
//! ```
//! use objsql::{col, count_all, Dataset};
//! let dataset = Dataset::new()
//!     .select([col("gender"), count_all().alias("members")])
//!     .from("members")
//!     .filter(col("name").like("A%"))
//!     .group_by([col("gender")])
//!     .order_by([col("members").desc()])
//!     .limit(10)
//!     .unwrap();
//! let statement = dataset.compile().unwrap();
//! assert_eq!(
//!     statement.sql,
//!     "SELECT gender, COUNT(*) AS members FROM members WHERE name LIKE ? \
//!      GROUP BY gender ORDER BY members DESC LIMIT 10"
//! );
//! ```

use crate::column::{Columnizable, Position};
use crate::dialect::{Dialect, Neutral};
use crate::error::{ObjsqlError, Result};
use crate::expr::Expression;
use crate::statement::{Fragment, Statement};

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Table { name: String, alias: Option<String> },
    Nested { dataset: Box<Dataset>, alias: String },
}

impl Source {
    pub fn table(name: &str) -> Self {
        Source::Table {
            name: name.to_string(),
            alias: None,
        }
    }
    pub fn aliased(name: &str, alias: &str) -> Self {
        Source::Table {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }
    pub fn nested(dataset: Dataset, alias: &str) -> Self {
        Source::Nested {
            dataset: Box::new(dataset),
            alias: alias.to_string(),
        }
    }
    fn write(&self, out: &mut Fragment, dialect: &dyn Dialect) -> Result<()> {
        match self {
            Source::Table { name, alias } => {
                if name.is_empty() {
                    return Err(ObjsqlError::Compilation("table name is empty".into()));
                }
                out.push(name);
                if let Some(alias) = alias {
                    out.push(" AS ");
                    out.push(alias);
                }
            }
            Source::Nested { dataset, alias } => {
                out.push("(");
                dataset.write(out, dialect)?;
                out.push(") AS ");
                out.push(alias);
            }
        }
        Ok(())
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::table(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub source: Source,
    pub on: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub key: Columnizable,
    pub descending: bool,
}

impl Columnizable {
    pub fn asc(self) -> OrderKey {
        OrderKey {
            key: self,
            descending: false,
        }
    }
    pub fn desc(self) -> OrderKey {
        OrderKey {
            key: self,
            descending: true,
        }
    }
}

impl From<Columnizable> for OrderKey {
    fn from(key: Columnizable) -> Self {
        key.asc()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    projections: Vec<Columnizable>,
    source: Option<Source>,
    joins: Vec<Join>,
    filters: Vec<Expression>,
    group_by: Vec<Columnizable>,
    having: Option<Expression>,
    order_by: Vec<OrderKey>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the projection list. Nothing selected renders as `*`.
    pub fn select(mut self, columns: impl IntoIterator<Item = Columnizable>) -> Self {
        self.projections.extend(columns);
        self
    }
    pub fn from(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }
    /// Adds a WHERE condition; repeated calls are combined with AND.
    pub fn filter(mut self, expression: Expression) -> Self {
        self.filters.push(expression);
        self
    }
    pub fn join(mut self, source: impl Into<Source>, on: Expression) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            source: source.into(),
            on,
        });
        self
    }
    pub fn left_join(mut self, source: impl Into<Source>, on: Expression) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            source: source.into(),
            on,
        });
        self
    }
    pub fn group_by(mut self, keys: impl IntoIterator<Item = Columnizable>) -> Self {
        self.group_by.extend(keys);
        self
    }
    pub fn having(mut self, expression: Expression) -> Self {
        self.having = Some(expression);
        self
    }
    pub fn order_by<K: Into<OrderKey>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.order_by.extend(keys.into_iter().map(Into::into));
        self
    }
    pub fn limit(mut self, limit: i64) -> Result<Self> {
        self.limit = Some(non_negative("limit", limit)?);
        Ok(self)
    }
    pub fn offset(mut self, offset: i64) -> Result<Self> {
        self.offset = Some(non_negative("offset", offset)?);
        Ok(self)
    }

    /// Compiles into the dialect neutral form.
    pub fn compile(&self) -> Result<Statement> {
        self.compile_with(&Neutral)
    }

    pub fn compile_with(&self, dialect: &dyn Dialect) -> Result<Statement> {
        let mut out = Fragment::new();
        self.write(&mut out, dialect)?;
        Ok(Statement::finish(out, dialect))
    }

    pub(crate) fn write(&self, out: &mut Fragment, dialect: &dyn Dialect) -> Result<()> {
        out.push("SELECT ");
        if self.projections.is_empty() {
            out.push("*");
        }
        for (i, projection) in self.projections.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            projection.write(Position::Projection, out)?;
        }
        match &self.source {
            Some(source) => {
                out.push(" FROM ");
                source.write(out, dialect)?;
            }
            None if !self.joins.is_empty() => {
                return Err(ObjsqlError::Compilation("join without a source dataset".into()));
            }
            None => {}
        }
        for join in &self.joins {
            out.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::Left => " LEFT JOIN ",
            });
            join.source.write(out, dialect)?;
            out.push(" ON ");
            join.on.write(out, dialect)?;
        }
        match self.filters.as_slice() {
            [] => {}
            [only] => {
                out.push(" WHERE ");
                only.write(out, dialect)?;
            }
            many => {
                out.push(" WHERE ");
                Expression::all(many.iter().cloned()).write(out, dialect)?;
            }
        }
        if !self.group_by.is_empty() {
            out.push(" GROUP BY ");
            for (i, key) in self.group_by.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                key.write(Position::Key, out)?;
            }
        }
        if let Some(having) = &self.having {
            out.push(" HAVING ");
            having.write(out, dialect)?;
        }
        if !self.order_by.is_empty() {
            out.push(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                order.key.write(Position::Key, out)?;
                out.push(if order.descending { " DESC" } else { " ASC" });
            }
        }
        if let Some(window) = dialect.limit_offset(self.limit, self.offset) {
            out.push(" ");
            out.push(&window);
        }
        Ok(())
    }
}

fn non_negative(clause: &str, n: i64) -> Result<u64> {
    u64::try_from(n).map_err(|_| {
        ObjsqlError::InvalidArgument(format!("{} must be non-negative, got {}", clause, n))
    })
}
