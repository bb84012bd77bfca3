//! Error types for the DYNX data-access layer.
//!
//! Recoverable conditions are returned as `DynxResult<T>`. Contract violations
//! (closed cursor, wrong cursor mode, missing DDL privilege) panic instead.

use thiserror::Error;

/// Client status reported by the storage protocol when the engine itself failed.
pub const CLIENT_STATUS_DB_ERROR: u16 = 502;

/// Engine error code for a unique-key violation (`HA_ERR_FOUND_DUPP_KEY`).
pub const ENGINE_ERR_DUPLICATE_KEY: u32 = 121;

/// Unified error type for all DYNX operations.
#[derive(Debug, Error)]
pub enum DynxError {
    /// Filter expression does not match `field op value`
    #[error("invalid filter '{expr}': {reason}")]
    InvalidFilter { expr: String, reason: String },

    /// Unique index violated on insert
    #[error("duplicate key in table '{table}': {message}")]
    DuplicateKey { table: String, message: String },

    /// Data-path error reported by the storage protocol
    #[error("engine error (status {status}, code {code}): {message}")]
    Engine {
        status: u16,
        code: u32,
        message: String,
    },

    /// DDL / introspection error reported by the SQL path
    #[error("SQL error {code}: {message}")]
    Sql { code: u32, message: String },

    /// Requested table does not exist
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Requested column does not exist
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Stored text could not be decoded as the expected type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Invalid arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Missing privilege to toggle the engine's metadata cache around DDL
    #[error("schema privilege error: {0}")]
    SchemaPrivilege(String),
}

/// Result type alias for all DYNX operations.
pub type DynxResult<T> = Result<T, DynxError>;

impl DynxError {
    /// Builds a data-path error, mapping the duplicate-key code to [`DynxError::DuplicateKey`].
    pub fn from_engine(table: &str, status: u16, code: u32, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == CLIENT_STATUS_DB_ERROR && code == ENGINE_ERR_DUPLICATE_KEY {
            DynxError::DuplicateKey {
                table: table.to_string(),
                message,
            }
        } else {
            DynxError::Engine {
                status,
                code,
                message,
            }
        }
    }

    /// Unique-index violation 여부
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DynxError::DuplicateKey { .. })
    }
}

impl From<serde_json::Error> for DynxError {
    fn from(err: serde_json::Error) -> Self {
        DynxError::Serialization(err.to_string())
    }
}
