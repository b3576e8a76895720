//! objsql – a lightweight object-relational mapping layer.
//!
//! objsql lets application code describe reads and writes against a
//! relational store without hand-writing SQL for the common cases, while
//! still composing non-trivial reads (joins, grouping, ordering).
//!
//! ## Modules
//! * [`column`] – [`Columnizable`]: columns, function calls, literals and aliases.
//! * [`expr`] – [`Expression`]: comparisons, logical groups and raw fragments
//!   rendering to SQL plus positional parameters.
//! * [`dataset`] – [`Dataset`], the fluent SELECT builder.
//! * [`statement`] – compiled [`Statement`]s and the INSERT/UPDATE/DELETE builders.
//! * [`dialect`] – store specific finishing (placeholders, LIMIT/OFFSET).
//! * [`datatype`] – the [`Value`] type and attribute coercion.
//! * [`record`] – the [`Record`] trait, static attribute schemas and the [`RecordMapper`].
//! * [`validate`] – declarative rules producing [`Violation`]s.
//! * [`persist`] – the [`Store`] boundary and the bundled SQLite store.
//! * [`engine`] – the [`PersistenceEngine`]: create, update, destroy and reads.
//! * [`settings`] – configuration and logging setup.
//!
//! ## Quick Start
//! ```
//! use objsql::{col, Dataset, PersistenceEngine, SqliteStore};
//! let engine = PersistenceEngine::new(SqliteStore::open_in_memory().unwrap());
//! engine.execute("create table notes (id integer primary key, body text)").unwrap();
//! engine.execute("insert into notes (body) values ('hello')").unwrap();
//! let rows = engine
//!     .fetch(&Dataset::new().select([col("body")]).from("notes"))
//!     .unwrap();
//! assert_eq!(rows[0]["body"], objsql::Value::from("hello"));
//! ```
//!
//! ## Errors
//! Malformed compositions fail with [`ObjsqlError::Compilation`] before any
//! statement reaches the store. Validation failures are not errors: writes
//! return [`Outcome::Rejected`] carrying the violations. Store failures are
//! surfaced as [`ObjsqlError::Persistence`] and never retried.

pub mod column;
pub mod dataset;
pub mod datatype;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod expr;
pub mod persist;
pub mod record;
pub mod settings;
pub mod statement;
pub mod validate;

pub use column::{avg, col, count, count_all, func, lit, max, min, sum, Columnizable};
pub use dataset::{Dataset, JoinKind, OrderKey, Source};
pub use datatype::{AttributeKind, ExtendedAttributes, Value};
pub use engine::{Outcome, PersistenceEngine};
pub use error::{ObjsqlError, Result};
pub use expr::{ComparisonOp, Expression, LogicalOp, Operand};
pub use persist::{PersistenceMode, SqliteStore, Store};
pub use record::{attributes_from_json, Attribute, AttributeMap, KeyStyle, Record, RecordMapper};
pub use settings::Settings;
pub use statement::{Fragment, Statement};
pub use validate::{Check, Rule, Violation};
