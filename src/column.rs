// Projectable and referenceable elements of a query
use crate::datatype::Value;
use crate::error::{ObjsqlError, Result};
use crate::statement::Fragment;

/// Anything that can be projected, grouped on, ordered by or compared.
#[derive(Debug, Clone, PartialEq)]
pub enum Columnizable {
    Column {
        table: Option<String>,
        name: String,
    },
    Function {
        name: String,
        args: Vec<Columnizable>,
    },
    Literal(Value),
    Alias {
        inner: Box<Columnizable>,
        alias: String,
    },
}

/// Where a columnizable is being rendered, which decides what an alias means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    // outermost SELECT list, the only place an alias is declared
    Projection,
    // GROUP BY and ORDER BY, where an alias is referenced by name
    Key,
    Nested,
}

/// A column reference, optionally qualified: `col("name")`, `col("m.name")`, `col("*")`.
pub fn col(reference: &str) -> Columnizable {
    match reference.split_once('.') {
        Some((table, name)) => Columnizable::Column {
            table: Some(table.to_string()),
            name: name.to_string(),
        },
        None => Columnizable::Column {
            table: None,
            name: reference.to_string(),
        },
    }
}

pub fn lit(value: impl Into<Value>) -> Columnizable {
    Columnizable::Literal(value.into())
}

pub fn func(name: &str, args: impl IntoIterator<Item = Columnizable>) -> Columnizable {
    Columnizable::Function {
        name: name.to_string(),
        args: args.into_iter().collect(),
    }
}

pub fn count(arg: Columnizable) -> Columnizable {
    func("COUNT", [arg])
}
pub fn count_all() -> Columnizable {
    func("COUNT", [col("*")])
}
pub fn sum(arg: Columnizable) -> Columnizable {
    func("SUM", [arg])
}
pub fn avg(arg: Columnizable) -> Columnizable {
    func("AVG", [arg])
}
pub fn min(arg: Columnizable) -> Columnizable {
    func("MIN", [arg])
}
pub fn max(arg: Columnizable) -> Columnizable {
    func("MAX", [arg])
}

impl Columnizable {
    pub fn alias(self, alias: &str) -> Columnizable {
        Columnizable::Alias {
            inner: Box::new(self),
            alias: alias.to_string(),
        }
    }

    /// Renders in projection position.
    pub fn render(&self) -> Result<Fragment> {
        let mut out = Fragment::new();
        self.write(Position::Projection, &mut out)?;
        Ok(out)
    }

    pub(crate) fn write(&self, position: Position, out: &mut Fragment) -> Result<()> {
        match self {
            Columnizable::Column { table, name } => {
                if name.is_empty() {
                    return Err(ObjsqlError::Compilation("column name is empty".into()));
                }
                if let Some(table) = table {
                    out.push(table);
                    out.push(".");
                }
                out.push(name);
            }
            Columnizable::Function { name, args } => {
                if name.is_empty() {
                    return Err(ObjsqlError::Compilation("function name is empty".into()));
                }
                out.push(name);
                out.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    arg.write(Position::Nested, out)?;
                }
                out.push(")");
            }
            Columnizable::Literal(Value::Null) => out.push("NULL"),
            Columnizable::Literal(value) => out.bind(value.clone()),
            Columnizable::Alias { inner, alias } => match position {
                Position::Projection => {
                    inner.write(Position::Nested, out)?;
                    out.push(" AS ");
                    out.push(alias);
                }
                Position::Key => out.push(alias),
                Position::Nested => {
                    return Err(ObjsqlError::Compilation(format!(
                        "alias '{}' is only allowed in the outermost projection",
                        alias
                    )));
                }
            },
        }
        Ok(())
    }
}

impl From<&str> for Columnizable {
    fn from(reference: &str) -> Self {
        col(reference)
    }
}
