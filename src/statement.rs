// Compiled SQL and the write statements the persistence engine issues
use crate::dialect::Dialect;
use crate::error::{ObjsqlError, Result};
use crate::expr::Expression;
use crate::datatype::Value;

/// A rendered piece of SQL together with its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }
    pub(crate) fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }
    pub(crate) fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }
    pub(crate) fn append(&mut self, other: Fragment) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }
}

/// A complete statement, ready for a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
    pub(crate) fn finish(fragment: Fragment, dialect: &dyn Dialect) -> Self {
        Self {
            sql: dialect.finalize(fragment.sql),
            params: fragment.params,
        }
    }
}

// ------------- Insert -------------
#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    values: Vec<(String, Value)>,
}

impl Insert {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            values: Vec::new(),
        }
    }
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.values.push((column.to_string(), value.into()));
        self
    }
    pub fn compile_with(&self, dialect: &dyn Dialect) -> Result<Statement> {
        let mut out = Fragment::new();
        if self.values.is_empty() {
            out.push(&format!("INSERT INTO {} DEFAULT VALUES", self.table));
            return Ok(Statement::finish(out, dialect));
        }
        let columns: Vec<&str> = self.values.iter().map(|(c, _)| c.as_str()).collect();
        out.push(&format!("INSERT INTO {} ({}) VALUES (", self.table, columns.join(", ")));
        for (i, (_, value)) in self.values.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            out.bind(value.clone());
        }
        out.push(")");
        Ok(Statement::finish(out, dialect))
    }
}

// ------------- Update -------------
#[derive(Debug, Clone)]
pub struct Update {
    table: String,
    assignments: Vec<(String, Value)>,
    filter: Option<Expression>,
}

impl Update {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            assignments: Vec::new(),
            filter: None,
        }
    }
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assignments.push((column.to_string(), value.into()));
        self
    }
    pub fn filter(mut self, expression: Expression) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expression),
            None => expression,
        });
        self
    }
    pub fn compile_with(&self, dialect: &dyn Dialect) -> Result<Statement> {
        if self.assignments.is_empty() {
            return Err(ObjsqlError::Compilation(format!(
                "update of '{}' has no assignments",
                self.table
            )));
        }
        let mut out = Fragment::new();
        out.push(&format!("UPDATE {} SET ", self.table));
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            out.push(column);
            out.push(" = ");
            match value {
                Value::Null => out.push("NULL"),
                other => out.bind(other.clone()),
            }
        }
        if let Some(filter) = &self.filter {
            out.push(" WHERE ");
            out.append(filter.render_with(dialect)?);
        }
        Ok(Statement::finish(out, dialect))
    }
}

// ------------- Delete -------------
#[derive(Debug, Clone)]
pub struct Delete {
    table: String,
    filter: Option<Expression>,
}

impl Delete {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filter: None,
        }
    }
    pub fn filter(mut self, expression: Expression) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expression),
            None => expression,
        });
        self
    }
    pub fn compile_with(&self, dialect: &dyn Dialect) -> Result<Statement> {
        let mut out = Fragment::new();
        out.push(&format!("DELETE FROM {}", self.table));
        if let Some(filter) = &self.filter {
            out.push(" WHERE ");
            out.append(filter.render_with(dialect)?);
        }
        Ok(Statement::finish(out, dialect))
    }
}
