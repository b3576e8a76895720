// Settings are read from an optional file and then from OBJSQL_* environment variables
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::persist::PersistenceMode;
use crate::record::{KeyStyle, RecordMapper};

pub const ENV_PREFIX: &str = "OBJSQL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file; in memory when unset.
    pub database_path: Option<String>,
    /// Key style of attribute maps produced by the mapper.
    pub key_style: KeyStyle,
    /// Fail on unknown attribute keys instead of ignoring them.
    pub strict_mapping: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            key_style: KeyStyle::Camel,
            strict_mapping: false,
            log_filter: "objsql=info".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (any format `config` understands, the file
    /// may be absent) overlaid with `OBJSQL_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        match &self.database_path {
            Some(path) => PersistenceMode::File(path.clone()),
            None => PersistenceMode::InMemory,
        }
    }

    pub fn mapper(&self) -> RecordMapper {
        RecordMapper::new(self.key_style, self.strict_mapping)
    }
}

/// Installs a fmt subscriber; `RUST_LOG` takes precedence over `filter`.
/// Calling it again once a subscriber is installed does nothing.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
