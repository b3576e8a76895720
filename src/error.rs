// Central error type for objsql
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObjsqlError {
    #[error("Compilation error: {0}")]
    Compilation(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Mapping error: {0}")]
    Mapping(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, ObjsqlError>;

// Helper conversions
impl From<rusqlite::Error> for ObjsqlError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}
impl From<config::ConfigError> for ObjsqlError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
impl From<serde_json::Error> for ObjsqlError {
    fn from(e: serde_json::Error) -> Self {
        Self::Mapping(e.to_string())
    }
}
