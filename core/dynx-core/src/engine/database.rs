//! Database struct definition — the core data structure

use crate::config::DatabaseConfig;
use crate::schema::{SchemaCache, SchemaEvolver, SqlPool, TableSchema};
use crate::storage::DataConnection;
use crate::storage::pool::{ConnectionPool, PoolStats};
use std::sync::Arc;

/// 데이터 커넥션 풀
pub type DataPool = ConnectionPool<Box<dyn DataConnection>>;

/// DYNX 데이터베이스
///
/// 스키마를 미리 선언하지 않고 타입이 있는 레코드를 저장하고 조회하는 메인
/// API입니다. 테이블, 컬럼, 인덱스는 처음 사용될 때 만들어집니다.
///
/// # 데이터 흐름
///
/// - **쓰기**: Schema Evolver가 테이블/컬럼/인덱스를 보장 → 키와 값을 wire
///   텍스트로 변환 → update / insert
/// - **읽기**: 구조 확인 → 필터 파싱과 해시 변환 → 스캔 계획 → get
/// - **배치**: 커서가 쓰기를 모았다가 `commit()` 에서 한 번에 전송
///
/// # 예제
///
/// ```rust
/// use dynx_core::{Database, Scan, values};
///
/// # fn main() -> dynx_core::DynxResult<()> {
/// let db = Database::open_in_memory()?;
/// db.update_insert("thread", "tid", 1, "subject, collect", &values!["hello", 0])?;
/// let subjects = db.get_col("thread", "tid, subject", &Scan::all())?;
/// assert_eq!(subjects, vec!["1".to_string()]);
/// # Ok(())
/// # }
/// ```
pub struct Database {
    pub(crate) config: DatabaseConfig,

    /// storage-protocol connections, one per live cursor
    pub(crate) data: DataPool,

    /// SQL connections for introspection and DDL
    pub(crate) sql: Arc<SqlPool>,

    /// shared schema snapshots
    pub(crate) cache: Arc<SchemaCache>,

    pub(crate) evolver: SchemaEvolver,
}

impl Database {
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Cached schema of `table` (minimal when unknown).
    pub fn schema(&self, table: &str) -> Arc<TableSchema> {
        self.cache.describe(table)
    }

    /// Re-reads `table` from the store.
    pub fn reload_schema(&self, table: &str) -> crate::DynxResult<Arc<TableSchema>> {
        let mut conn = self.sql.checkout();
        self.cache.reload(conn.as_mut(), table)
    }

    pub fn evolver(&self) -> &SchemaEvolver {
        &self.evolver
    }

    pub fn data_pool_stats(&self) -> PoolStats {
        self.data.stats()
    }

    pub fn sql_pool_stats(&self) -> PoolStats {
        self.sql.stats()
    }
}
