// used for persistence
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::datatype::Value;
use crate::dialect::{self, Dialect};
use crate::error::Result;
use crate::record::AttributeMap;
use crate::statement::Statement;

/// Where the bundled SQLite store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

/// The boundary to the underlying relational store.
///
/// A store executes finished statements and decodes rows into attribute
/// maps. The engine scopes batches through [`Store::transaction`];
/// implementations must not begin transactions of their own.
pub trait Store {
    fn dialect(&self) -> &dyn Dialect;
    /// Runs any statement and returns the affected rows, or the number of
    /// rows produced when the statement returns rows.
    fn execute(&self, statement: &Statement) -> Result<usize>;
    /// Runs an INSERT and returns the key the store generated for it.
    fn insert(&self, statement: &Statement) -> Result<Value>;
    fn query(&self, statement: &Statement) -> Result<Vec<AttributeMap>>;
    /// Runs `work` inside one transaction. Nothing `work` wrote survives
    /// unless it succeeds and the commit goes through.
    fn transaction<T>(&self, work: impl FnOnce(&Self) -> Result<T>) -> Result<T>
    where
        Self: Sized;
}

// ------------- SQLite -------------
pub struct SqliteStore {
    connection: Connection,
    dialect: dialect::Sqlite,
}

impl SqliteStore {
    pub fn open(mode: &PersistenceMode) -> Result<Self> {
        let connection = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        debug!(?mode, "opened sqlite store");
        Ok(Self::from_connection(connection))
    }
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&PersistenceMode::InMemory)
    }
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection,
            dialect: dialect::Sqlite,
        }
    }
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Store for SqliteStore {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }
    fn execute(&self, statement: &Statement) -> Result<usize> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        let mut prepared = match self.connection.prepare_cached(&statement.sql) {
            Ok(prepared) => prepared,
            // scripts of several statements take no parameters
            Err(rusqlite::Error::MultipleStatement) if statement.params.is_empty() => {
                self.connection.execute_batch(&statement.sql)?;
                return Ok(self.connection.changes() as usize);
            }
            Err(e) => return Err(e.into()),
        };
        if prepared.column_count() > 0 {
            let mut rows = prepared.query(params_from_iter(statement.params.iter()))?;
            let mut produced = 0;
            while rows.next()?.is_some() {
                produced += 1;
            }
            return Ok(produced);
        }
        Ok(prepared.execute(params_from_iter(statement.params.iter()))?)
    }
    fn insert(&self, statement: &Statement) -> Result<Value> {
        self.execute(statement)?;
        Ok(Value::Integer(self.connection.last_insert_rowid()))
    }
    fn query(&self, statement: &Statement) -> Result<Vec<AttributeMap>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "query");
        let mut prepared = self.connection.prepare_cached(&statement.sql)?;
        let columns: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = prepared.query(params_from_iter(statement.params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = AttributeMap::new();
            for (i, column) in columns.iter().enumerate() {
                map.insert(column.clone(), Value::from(row.get_ref(i)?));
            }
            result.push(map);
        }
        Ok(result)
    }
    fn transaction<T>(&self, work: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        // the guard rolls back on drop whenever the connection is still
        // inside the transaction, including after a failed COMMIT
        let transaction = self.connection.unchecked_transaction()?;
        let value = work(self)?;
        transaction.commit()?;
        Ok(value)
    }
}
