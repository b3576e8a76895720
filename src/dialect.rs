//! Store specific finishing of compiled statements.
//!
//! Compilation always emits `?` placeholders and plain `LIMIT`/`OFFSET`
//! clauses. A [`Dialect`] rewrites the few places where stores disagree.

/// Finishing rules for one store.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Renders the trailing row window. `None` when neither bound is set.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, None) => None,
            (Some(l), None) => Some(format!("LIMIT {}", l)),
            (None, Some(o)) => Some(format!("OFFSET {}", o)),
            (Some(l), Some(o)) => Some(format!("LIMIT {} OFFSET {}", l, o)),
        }
    }

    /// Rewrites `?` placeholders of a complete statement.
    fn finalize(&self, sql: String) -> String {
        sql
    }
}

/// The dialect neutral intermediate form.
#[derive(Debug, Default, Clone, Copy)]
pub struct Neutral;

impl Dialect for Neutral {
    fn name(&self) -> &'static str {
        "neutral"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }
    // SQLite only understands OFFSET as part of a LIMIT clause
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, Some(o)) => Some(format!("LIMIT -1 OFFSET {}", o)),
            _ => Neutral.limit_offset(limit, offset),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match (limit, offset) {
            (None, Some(o)) => Some(format!("LIMIT {} OFFSET {}", u64::MAX, o)),
            _ => Neutral.limit_offset(limit, offset),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }
    fn finalize(&self, sql: String) -> String {
        let mut out = String::with_capacity(sql.len() + 8);
        let mut index = 0;
        for (c, quoted) in scan(&sql) {
            if c == '?' && !quoted {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Walks `sql` yielding each character together with whether it sits inside
/// a single or double quoted literal.
fn scan(sql: &str) -> impl Iterator<Item = (char, bool)> + '_ {
    let mut quote: Option<char> = None;
    sql.chars().map(move |c| match quote {
        Some(q) => {
            if c == q {
                quote = None;
            }
            (c, true)
        }
        None => {
            if c == '\'' || c == '"' {
                quote = Some(c);
                (c, true)
            } else {
                (c, false)
            }
        }
    })
}

/// Counts `?` placeholders outside quoted literals.
pub fn count_placeholders(sql: &str) -> usize {
    scan(sql).filter(|(c, quoted)| *c == '?' && !quoted).count()
}
