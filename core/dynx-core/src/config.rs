//! Database configuration
//!
//! JSON 파일, 문자열, 환경 변수(`DYNX_*`)에서 읽을 수 있습니다. Environment
//! variables override whatever was loaded before them.

use crate::error::{DynxError, DynxResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Default size of the storage-protocol connection pool.
pub const DEFAULT_DATA_POOL_SIZE: usize = 64;

/// Default size of the SQL (DDL/introspection) connection pool.
pub const DEFAULT_SQL_POOL_SIZE: usize = 16;

/// Global variable that switches the engine's table-metadata cache.
pub const DEFAULT_METADATA_CACHE_VARIABLE: &str = "tdh_socket_cache_table_on";

/// 데이터베이스 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// logical database name, carried in log spans
    pub database: String,
    /// storage-protocol connections
    pub data_pool_size: usize,
    /// SQL connections
    pub sql_pool_size: usize,
    /// variable toggled around DDL
    pub metadata_cache_variable: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database: "dynx".to_string(),
            data_pool_size: DEFAULT_DATA_POOL_SIZE,
            sql_pool_size: DEFAULT_SQL_POOL_SIZE,
            metadata_cache_variable: DEFAULT_METADATA_CACHE_VARIABLE.to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_data_pool_size(mut self, size: usize) -> Self {
        self.data_pool_size = size;
        self
    }

    pub fn with_sql_pool_size(mut self, size: usize) -> Self {
        self.sql_pool_size = size;
        self
    }

    pub fn with_metadata_cache_variable(mut self, variable: impl Into<String>) -> Self {
        self.metadata_cache_variable = variable.into();
        self
    }

    /// 설정 값 검증
    pub fn validate(&self) -> DynxResult<()> {
        if self.database.trim().is_empty() {
            return Err(DynxError::Config("database name is empty".to_string()));
        }
        if self.data_pool_size == 0 {
            return Err(DynxError::Config(
                "data_pool_size must be at least 1".to_string(),
            ));
        }
        if self.sql_pool_size == 0 {
            return Err(DynxError::Config(
                "sql_pool_size must be at least 1".to_string(),
            ));
        }
        let variable = &self.metadata_cache_variable;
        if variable.is_empty()
            || !variable
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DynxError::Config(format!(
                "invalid metadata_cache_variable '{variable}'"
            )));
        }
        Ok(())
    }

    /// JSON 문자열에서 로드 (누락된 필드는 기본값)
    pub fn from_json_str(json: &str) -> DynxResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// JSON 파일에서 로드
    pub fn from_file(path: &Path) -> DynxResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Default configuration with `DYNX_*` overrides applied.
    pub fn from_env() -> DynxResult<Self> {
        Self::default().load_from_env()
    }

    /// 환경 변수 오버라이드 적용
    ///
    /// `DYNX_DATABASE`, `DYNX_DATA_POOL_SIZE`, `DYNX_SQL_POOL_SIZE`,
    /// `DYNX_METADATA_CACHE_VARIABLE`
    pub fn load_from_env(mut self) -> DynxResult<Self> {
        if let Ok(value) = env::var("DYNX_DATABASE") {
            self.database = value;
        }
        if let Some(size) = env_usize("DYNX_DATA_POOL_SIZE")? {
            self.data_pool_size = size;
        }
        if let Some(size) = env_usize("DYNX_SQL_POOL_SIZE")? {
            self.sql_pool_size = size;
        }
        if let Ok(value) = env::var("DYNX_METADATA_CACHE_VARIABLE") {
            self.metadata_cache_variable = value;
        }
        self.validate()?;
        Ok(self)
    }

    /// JSON 직렬화
    pub fn to_json(&self) -> DynxResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn env_usize(name: &str) -> DynxResult<Option<usize>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DynxError::Config(format!("{name}='{value}' is not a positive integer"))),
        Err(_) => Ok(None),
    }
}
