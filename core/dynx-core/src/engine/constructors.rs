//! Database Constructors — factory methods for creating Database instances

use crate::config::DatabaseConfig;
use crate::engine::Database;
use crate::error::DynxResult;
use crate::schema::{SchemaCache, SchemaEvolver};
use crate::storage::Connector;
use crate::storage::memory::MemoryEngine;
use crate::storage::pool::ConnectionPool;
use std::sync::Arc;
use tracing::{info, instrument};

impl Database {
    /// 데이터베이스를 엽니다.
    ///
    /// 두 커넥션 풀을 채우고 기존 테이블의 스키마를 모두 읽어 캐시에 올립니다.
    ///
    /// # 인자
    ///
    /// * `config` - 풀 크기와 메타데이터 캐시 변수
    /// * `connector` - 데이터/SQL 커넥션 팩토리
    #[instrument(skip(config, connector), fields(database = %config.database))]
    pub fn open(config: DatabaseConfig, connector: &dyn Connector) -> DynxResult<Self> {
        config.validate()?;
        info!(
            data_pool = config.data_pool_size,
            sql_pool = config.sql_pool_size,
            "Opening database"
        );

        let data = ConnectionPool::build("data", config.data_pool_size, || {
            connector.connect_data()
        })?;
        let sql = Arc::new(ConnectionPool::build("sql", config.sql_pool_size, || {
            connector.connect_sql()
        })?);

        let cache = Arc::new(SchemaCache::new());
        let tables = {
            let mut conn = sql.checkout();
            cache.load_all(conn.as_mut())?
        };
        info!("Loaded schema of {} tables", tables);

        let evolver = SchemaEvolver::new(
            Arc::clone(&cache),
            Arc::clone(&sql),
            &config.metadata_cache_variable,
        );

        Ok(Self {
            config,
            data,
            sql,
            cache,
            evolver,
        })
    }

    /// 인메모리 데이터베이스를 엽니다 (테스트/예제용).
    ///
    /// # 예제
    ///
    /// ```rust
    /// use dynx_core::Database;
    ///
    /// # fn main() -> dynx_core::DynxResult<()> {
    /// let db = Database::open_in_memory()?;
    /// db.insert("users", "name", "alice", "", &[])?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn open_in_memory() -> DynxResult<Self> {
        let config = DatabaseConfig::new("memory")
            .with_data_pool_size(8)
            .with_sql_pool_size(2);
        Self::open(config, &MemoryEngine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_open_loads_existing_schema() {
        let engine = MemoryEngine::new();
        engine.create_table_with_columns("thread", &[("tid", ColumnType::Int)]);

        let db = Database::open(DatabaseConfig::new("forum").with_data_pool_size(2), &engine)
            .unwrap();
        assert_eq!(db.schema("thread").column_type("tid"), Some(ColumnType::Int));
        assert_eq!(db.config().database, "forum");
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let engine = MemoryEngine::new();
        assert!(Database::open(DatabaseConfig::default().with_sql_pool_size(0), &engine).is_err());
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.data.capacity(), 8);
        assert_eq!(db.sql.capacity(), 2);
    }
}
