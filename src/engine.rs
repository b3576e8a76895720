//! Create, update, destroy and point reads for [`Record`] types.
//!
//! Every operation is one bounded unit: it compiles its statement, acquires
//! the store for its own duration and releases it on every exit path.
//! Compilation and validation finish before the store is touched, so a
//! rejected or malformed write has no side effects. Batched creates run in a
//! single transaction that is rolled back unless every row succeeds.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::column::{col, count_all};
use crate::dataset::Dataset;
use crate::datatype::Value;
use crate::dialect::count_placeholders;
use crate::error::{ObjsqlError, Result};
use crate::expr::Expression;
use crate::persist::{SqliteStore, Store};
use crate::record::{AttributeMap, Record, RecordMapper};
use crate::settings::Settings;
use crate::statement::{Delete, Insert, Statement, Update};
use crate::validate::Violation;

/// Result of a write that may be refused by validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Committed(T),
    Rejected(Vec<Violation>),
}

impl<T> Outcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed(_))
    }
    pub fn committed(self) -> Option<T> {
        match self {
            Outcome::Committed(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }
    pub fn violations(&self) -> &[Violation] {
        match self {
            Outcome::Committed(_) => &[],
            Outcome::Rejected(violations) => violations,
        }
    }
}

pub struct PersistenceEngine<S: Store> {
    store: Arc<Mutex<S>>,
    mapper: RecordMapper,
}

impl<S: Store> Clone for PersistenceEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mapper: self.mapper,
        }
    }
}

impl PersistenceEngine<SqliteStore> {
    /// Opens the configured SQLite store, in memory when no path is set.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = SqliteStore::open(&settings.persistence_mode())?;
        Ok(Self::with_mapper(store, settings.mapper()))
    }
}

impl<S: Store> PersistenceEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_mapper(store, RecordMapper::default())
    }
    pub fn with_mapper(store: S, mapper: RecordMapper) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            mapper,
        }
    }
    pub fn mapper(&self) -> &RecordMapper {
        &self.mapper
    }
    fn acquire(&self) -> Result<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|e| ObjsqlError::Lock(e.to_string()))
    }

    // ------------- Create -------------
    pub fn create<R: Record>(&self, record: R, skip_validation: bool) -> Result<Outcome<R>> {
        if !skip_validation {
            let violations = record.validate();
            if !violations.is_empty() {
                warn!(table = R::TABLE_NAME, violations = violations.len(), "create rejected");
                return Ok(Outcome::Rejected(violations));
            }
        }
        let store = self.acquire()?;
        let created = insert_record(&*store, record)?;
        Ok(Outcome::Committed(created))
    }

    /// Inserts all records or none of them.
    pub fn create_all<R: Record>(&self, records: Vec<R>, skip_validation: bool) -> Result<Outcome<Vec<R>>> {
        if !skip_validation {
            for (index, record) in records.iter().enumerate() {
                let violations = record.validate();
                if !violations.is_empty() {
                    warn!(table = R::TABLE_NAME, index, violations = violations.len(), "batch create rejected");
                    return Ok(Outcome::Rejected(violations));
                }
            }
        }
        let store = self.acquire()?;
        let created = store
            .transaction(|store| {
                records
                    .into_iter()
                    .map(|record| insert_record(store, record))
                    .collect::<Result<Vec<R>>>()
            })
            .inspect_err(|e| warn!(table = R::TABLE_NAME, error = %e, "batch rolled back"))?;
        info!(table = R::TABLE_NAME, rows = created.len(), "batch created");
        Ok(Outcome::Committed(created))
    }

    /// Creates the record when its key is unset, otherwise updates it and
    /// falls back to creating it when no row carries that key.
    pub fn save<R: Record>(&self, record: R, skip_validation: bool) -> Result<Outcome<R>> {
        let id = record.primary_key();
        if id.is_null() {
            return self.create(record, skip_validation);
        }
        if assignments(&record).is_empty() {
            // only the key is set, so there is nothing to update
            if self.query_by_primary_key::<R>(id)?.is_none() {
                return self.create(record, skip_validation);
            }
            if !skip_validation {
                let violations = record.validate();
                if !violations.is_empty() {
                    return Ok(Outcome::Rejected(violations));
                }
            }
            return Ok(Outcome::Committed(record));
        }
        match self.update(id, &record, skip_validation)? {
            Outcome::Committed(0) => self.create(record, true),
            Outcome::Committed(_) => Ok(Outcome::Committed(record)),
            Outcome::Rejected(violations) => Ok(Outcome::Rejected(violations)),
        }
    }

    // ------------- Update -------------
    /// Writes the set attributes of `record` to the row keyed by `id`.
    /// Zero affected rows means no such row.
    pub fn update<R: Record>(&self, id: impl Into<Value>, record: &R, skip_validation: bool) -> Result<Outcome<usize>> {
        let id = id.into();
        if id.is_null() {
            return Err(ObjsqlError::InvalidArgument(format!(
                "update of {} needs a primary key",
                R::TABLE_NAME
            )));
        }
        if !skip_validation {
            let violations = record.validate();
            if !violations.is_empty() {
                warn!(table = R::TABLE_NAME, violations = violations.len(), "update rejected");
                return Ok(Outcome::Rejected(violations));
            }
        }
        let mut update = Update::table(R::TABLE_NAME);
        for (name, value) in assignments(record) {
            update = update.set(name, value);
        }
        let update = update.filter(col(R::PRIMARY_KEY).eq(id));
        let store = self.acquire()?;
        let statement = update.compile_with(store.dialect())?;
        let rows = store.execute(&statement)?;
        debug!(table = R::TABLE_NAME, rows, "updated by primary key");
        Ok(Outcome::Committed(rows))
    }

    /// `UPDATE <table> SET <update_clause> WHERE <predicate_clause>`, with the
    /// parameters of both clauses flattened in that order.
    pub fn update_where<R: Record>(&self, update_clause: &str, predicate_clause: &str, params: Vec<Value>) -> Result<usize> {
        let expected = count_placeholders(update_clause) + count_placeholders(predicate_clause);
        if expected != params.len() {
            return Err(ObjsqlError::Compilation(format!(
                "update of {} has {} placeholders but {} parameters",
                R::TABLE_NAME,
                expected,
                params.len()
            )));
        }
        let mut params = params;
        let predicate_params = params.split_off(count_placeholders(update_clause));
        let set = Expression::raw(update_clause, params).render()?;
        let predicate = Expression::raw(predicate_clause, predicate_params).render()?;
        let mut values = set.params;
        values.extend(predicate.params);
        let sql = format!("UPDATE {} SET {} WHERE {}", R::TABLE_NAME, set.sql, predicate.sql);
        let store = self.acquire()?;
        let statement = Statement::new(store.dialect().finalize(sql), values);
        let rows = store.execute(&statement)?;
        debug!(table = R::TABLE_NAME, rows, "updated by predicate");
        Ok(rows)
    }

    // ------------- Destroy -------------
    pub fn destroy<R: Record>(&self, id: impl Into<Value>) -> Result<usize> {
        let id = id.into();
        if id.is_null() {
            return Err(ObjsqlError::InvalidArgument(format!(
                "destroy of {} needs a primary key",
                R::TABLE_NAME
            )));
        }
        self.run_delete::<R>(col(R::PRIMARY_KEY).eq(id))
    }

    pub fn destroy_where<R: Record>(&self, predicate_clause: &str, params: Vec<Value>) -> Result<usize> {
        self.run_delete::<R>(Expression::raw(predicate_clause, params))
    }

    fn run_delete<R: Record>(&self, filter: Expression) -> Result<usize> {
        let delete = Delete::table(R::TABLE_NAME).filter(filter);
        let store = self.acquire()?;
        let statement = delete.compile_with(store.dialect())?;
        let rows = store.execute(&statement)?;
        debug!(table = R::TABLE_NAME, rows, "destroyed");
        Ok(rows)
    }

    // ------------- Read -------------
    pub fn query_by_primary_key<R: Record>(&self, id: impl Into<Value>) -> Result<Option<R>> {
        let dataset = Dataset::new()
            .from(R::TABLE_NAME)
            .filter(col(R::PRIMARY_KEY).eq(id.into()))
            .limit(1)?;
        Ok(self.fetch_as::<R>(&dataset)?.into_iter().next())
    }

    pub fn query<R: Record>(&self, predicate_clause: &str, params: Vec<Value>) -> Result<Vec<R>> {
        let dataset = Dataset::new()
            .from(R::TABLE_NAME)
            .filter(Expression::raw(predicate_clause, params));
        self.fetch_as::<R>(&dataset)
    }

    /// The first matching record, or `None` when nothing matches.
    pub fn query_first<R: Record>(&self, predicate_clause: &str, params: Vec<Value>) -> Result<Option<R>> {
        let dataset = Dataset::new()
            .from(R::TABLE_NAME)
            .filter(Expression::raw(predicate_clause, params))
            .limit(1)?;
        Ok(self.fetch_as::<R>(&dataset)?.into_iter().next())
    }

    pub fn count_all<R: Record>(&self) -> Result<i64> {
        self.run_count(Dataset::new().from(R::TABLE_NAME))
    }

    pub fn count<R: Record>(&self, predicate_clause: &str, params: Vec<Value>) -> Result<i64> {
        self.run_count(
            Dataset::new()
                .from(R::TABLE_NAME)
                .filter(Expression::raw(predicate_clause, params)),
        )
    }

    fn run_count(&self, dataset: Dataset) -> Result<i64> {
        let rows = self.fetch(&dataset.select([count_all().alias("count")]))?;
        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_integer)
            .ok_or_else(|| ObjsqlError::Persistence("count returned no rows".into()))
    }

    /// Runs any dataset and returns the raw rows.
    pub fn fetch(&self, dataset: &Dataset) -> Result<Vec<AttributeMap>> {
        let store = self.acquire()?;
        let statement = dataset.compile_with(store.dialect())?;
        store.query(&statement)
    }

    /// Runs a dataset over `R`'s columns and maps each row to a record.
    pub fn fetch_as<R: Record>(&self, dataset: &Dataset) -> Result<Vec<R>> {
        let rows = self.fetch(dataset)?;
        let mapper = RecordMapper::new(self.mapper.key_style, false);
        rows.into_iter()
            .map(|row| mapper.from_map::<R>(row, true))
            .collect()
    }

    /// Runs a statement or a script as is, without mapping. Returns the
    /// affected rows, or the number of rows a query produced.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        let store = self.acquire()?;
        store.execute(&Statement::new(sql, Vec::new()))
    }
}

// The set attributes of `record` other than its primary key.
fn assignments<R: Record>(record: &R) -> Vec<(&'static str, Value)> {
    R::attributes()
        .iter()
        .filter(|attribute| attribute.name != R::PRIMARY_KEY)
        .map(|attribute| (attribute.name, (attribute.get)(record)))
        .filter(|(_, value)| !value.is_null())
        .collect()
}

fn insert_record<R: Record, S: Store>(store: &S, mut record: R) -> Result<R> {
    let mut insert = Insert::table(R::TABLE_NAME);
    let mut generated = true;
    for attribute in R::attributes() {
        let value = (attribute.get)(&record);
        if attribute.name == R::PRIMARY_KEY {
            if value.is_null() {
                continue;
            }
            generated = false;
        }
        if !value.is_null() {
            insert = insert.value(attribute.name, value);
        }
    }
    let statement = insert.compile_with(store.dialect())?;
    let id = store.insert(&statement)?;
    if generated {
        record.set_primary_key(id)?;
    }
    debug!(table = R::TABLE_NAME, id = %record.primary_key(), "created");
    Ok(record)
}
