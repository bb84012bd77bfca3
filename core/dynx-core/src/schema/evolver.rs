//! Schema Evolver — 테이블/컬럼/인덱스를 사용 시점에 생성
//!
//! 모든 연산은 캐시를 먼저 확인하고, 없을 때만 DDL을 실행한 뒤 캐시를
//! 다시 읽습니다. A DDL error is followed by a reload; when the structure
//! exists afterwards a concurrent evolver won the race and the error is
//! absorbed.
//!
//! Long-string columns are indexed through a `hash_` companion. Before any
//! unique index over a companion is created, every row whose companion is
//! still NULL while its source is not gets its digest; NULL sources keep a
//! NULL digest so they never collide. The step is driven by the rows, so a
//! caller that lost the `ADD COLUMN` race, or a retry after a failed
//! backfill, repeats it safely.

use crate::error::{DynxError, DynxResult};
use crate::query::ScanPlan;
use crate::schema::cache::SchemaCache;
use crate::schema::ddl::DdlStatement;
use crate::schema::hash;
use crate::schema::types::{ColumnType, IDENTITY_COLUMN, TableSchema, hash_column_name};
use crate::storage::batch::BatchPipeline;
use crate::storage::pool::ConnectionPool;
use crate::storage::{
    CompareOp, DataConnection, GetRequest, Operation, SqlConnection, UpdateRequest,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// MySQL `ER_SPECIFIC_ACCESS_DENIED_ERROR`
pub const SQL_ERR_ACCESS_DENIED: u32 = 1227;

/// Hash updates sent per backfill round trip.
pub const BACKFILL_CHUNK: usize = 1000;

/// SQL 커넥션 풀
pub type SqlPool = ConnectionPool<Box<dyn SqlConnection>>;

// ════════════════════════════════════════════
// Metadata-cache suspension
// ════════════════════════════════════════════

/// 엔진 메타데이터 캐시 일시 중지 (참조 카운트)
///
/// The first DDL in flight switches the engine's table-metadata cache off,
/// the last one switches it back on. The toggle statements run while the
/// counter lock is held so on/off pairs never interleave; the DDL itself runs
/// outside it.
struct MetadataSuspension {
    variable: String,
    in_flight: Mutex<usize>,
}

impl MetadataSuspension {
    fn new(variable: String) -> Self {
        Self {
            variable,
            in_flight: Mutex::new(0),
        }
    }

    fn enter(&self, conn: &mut dyn SqlConnection) -> DynxResult<()> {
        let mut in_flight = self.in_flight.lock();
        if *in_flight == 0 {
            self.toggle(conn, false)?;
        }
        *in_flight += 1;
        Ok(())
    }

    fn exit(&self, conn: &mut dyn SqlConnection) {
        let mut in_flight = self.in_flight.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            if let Err(err) = self.toggle(conn, true) {
                warn!(variable = %self.variable, error = %err, "failed to resume metadata cache");
            }
        }
    }

    fn toggle(&self, conn: &mut dyn SqlConnection, enabled: bool) -> DynxResult<()> {
        let stmt = DdlStatement::SetGlobal {
            variable: self.variable.clone(),
            enabled,
        };
        match conn.execute(&stmt) {
            Ok(()) => {
                debug!(%stmt, "metadata cache toggled");
                Ok(())
            }
            Err(err) if is_privilege_error(&err) => {
                // 권한 없이 스키마를 바꾸면 다른 커넥션이 옛 메타데이터를 봅니다.
                panic!(
                    "{}",
                    DynxError::SchemaPrivilege(format!("cannot execute `{stmt}`: {err}"))
                );
            }
            Err(err) => Err(err),
        }
    }

    fn depth(&self) -> usize {
        *self.in_flight.lock()
    }
}

fn is_privilege_error(err: &DynxError) -> bool {
    matches!(
        err,
        DynxError::Sql { code, .. } if *code == SQL_ERR_ACCESS_DENIED
    ) || matches!(err, DynxError::SchemaPrivilege(_))
}

// ════════════════════════════════════════════
// Evolver
// ════════════════════════════════════════════

/// 스키마 진화기
pub struct SchemaEvolver {
    cache: Arc<SchemaCache>,
    sql: Arc<SqlPool>,
    suspension: MetadataSuspension,
}

impl SchemaEvolver {
    pub fn new(cache: Arc<SchemaCache>, sql: Arc<SqlPool>, metadata_cache_variable: &str) -> Self {
        Self {
            cache,
            sql,
            suspension: MetadataSuspension::new(metadata_cache_variable.to_string()),
        }
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// DDL statements currently holding the metadata cache suspended.
    pub fn ddl_in_flight(&self) -> usize {
        self.suspension.depth()
    }

    /// 테이블이 없으면 식별 컬럼만 가진 테이블을 만듭니다.
    #[instrument(skip(self))]
    pub fn ensure_table(&self, table: &str) -> DynxResult<Arc<TableSchema>> {
        if let Some(schema) = self.cache.get(table) {
            return Ok(schema);
        }

        let mut conn = self.sql.checkout();
        // the cache may simply not have seen a table created elsewhere
        let schema = self.cache.reload(conn.as_mut(), table)?;
        if self.cache.contains(table) {
            return Ok(schema);
        }

        let stmt = DdlStatement::CreateTable {
            table: table.to_string(),
        };
        self.apply(conn.as_mut(), &stmt, |s| self.cache.contains(&s.name))
    }

    /// 컬럼이 없으면 추가합니다. 이 호출이 컬럼을 만들었는지 반환합니다.
    ///
    /// The identity column is never altered.
    #[instrument(skip(self))]
    pub fn ensure_column(&self, table: &str, column: &str, kind: ColumnType) -> DynxResult<bool> {
        if column == IDENTITY_COLUMN {
            return Ok(false);
        }
        let schema = self.ensure_table(table)?;
        if schema.has_column(column) {
            return Ok(false);
        }

        let mut conn = self.sql.checkout();
        let stmt = DdlStatement::AddColumn {
            table: table.to_string(),
            column: column.to_string(),
            column_type: kind,
        };
        match self.execute(conn.as_mut(), &stmt) {
            Ok(()) => {
                self.cache.reload(conn.as_mut(), table)?;
                Ok(true)
            }
            Err(err) => {
                let schema = self.cache.reload(conn.as_mut(), table)?;
                if schema.has_column(column) {
                    warn!(table, column, error = %err, "column created concurrently");
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Creates and backfills the `hash_` companion of a long-string column.
    ///
    /// Returns whether the companion was created by this call. Columns that
    /// are not long strings need no companion. Only the creating call
    /// backfills here; index creation repeats the backfill for whatever is
    /// still missing.
    #[instrument(skip(self, data))]
    pub fn ensure_hash_column(
        &self,
        data: &mut dyn DataConnection,
        table: &str,
        column: &str,
    ) -> DynxResult<bool> {
        let schema = self.ensure_table(table)?;
        if !schema.is_hashed(column) {
            return Ok(false);
        }
        if !self.ensure_column(table, &hash_column_name(column), ColumnType::Hash)? {
            return Ok(false);
        }
        self.backfill(data, table, column)?;
        Ok(true)
    }

    /// 인덱스를 보장하고 `(식별자, 컬럼별 해시 여부)`를 반환합니다.
    ///
    /// Every column must already exist. Hash companions are created first;
    /// when the index is missing, rows without a digest are backfilled and
    /// then one unique index named by the `$`-joined identifier is created
    /// over the resolved identifiers.
    #[instrument(skip(self, data))]
    pub fn ensure_index(
        &self,
        data: &mut dyn DataConnection,
        table: &str,
        columns: &[String],
    ) -> DynxResult<(String, Vec<bool>)> {
        if columns.is_empty() {
            return Err(DynxError::InvalidArguments(format!(
                "index on '{table}' needs at least one column"
            )));
        }

        let schema = self.ensure_table(table)?;
        let mut hashed = Vec::with_capacity(columns.len());
        for column in columns {
            if !schema.has_column(column) {
                return Err(DynxError::ColumnNotFound {
                    table: table.to_string(),
                    column: column.clone(),
                });
            }
            let is_hashed = schema.is_hashed(column);
            if is_hashed {
                self.ensure_column(table, &hash_column_name(column), ColumnType::Hash)?;
            }
            hashed.push(is_hashed);
        }

        let schema = self.cache.describe(table);
        let identifier = schema.index_identifier(columns);
        if schema.has_index(&identifier) {
            return Ok((identifier, hashed));
        }

        for (column, _) in columns.iter().zip(&hashed).filter(|(_, h)| **h) {
            self.backfill(data, table, column)?;
        }

        let stmt = DdlStatement::CreateUniqueIndex {
            table: table.to_string(),
            name: identifier.clone(),
            columns: columns.iter().map(|c| schema.column_identifier(c)).collect(),
        };
        let mut conn = self.sql.checkout();
        let name = identifier.clone();
        self.apply(conn.as_mut(), &stmt, move |s| s.has_index(&name))?;
        Ok((identifier, hashed))
    }

    /// Snapshot for a read: the table and every column must already exist.
    ///
    /// Reads never create structure; a miss triggers one reload before it is
    /// reported.
    pub fn require(&self, table: &str, columns: &[String]) -> DynxResult<Arc<TableSchema>> {
        let satisfied = |schema: &TableSchema| columns.iter().all(|c| schema.has_column(c));

        let schema = match self.cache.get(table) {
            Some(schema) if satisfied(&schema) => return Ok(schema),
            _ => {
                let mut conn = self.sql.checkout();
                self.cache.reload(conn.as_mut(), table)?
            }
        };

        if !self.cache.contains(table) {
            return Err(DynxError::TableNotFound(table.to_string()));
        }
        match columns.iter().find(|c| !schema.has_column(c)) {
            Some(column) => Err(DynxError::ColumnNotFound {
                table: table.to_string(),
                column: column.clone(),
            }),
            None => Ok(schema),
        }
    }

    // ────────────────────────────────────────
    // internals
    // ────────────────────────────────────────

    /// Executes `stmt` with the metadata cache suspended.
    fn execute(&self, conn: &mut dyn SqlConnection, stmt: &DdlStatement) -> DynxResult<()> {
        self.suspension.enter(conn)?;
        info!(%stmt, "executing DDL");
        let result = conn.execute(stmt);
        self.suspension.exit(conn);
        result
    }

    /// Executes `stmt`, reloads, and absorbs the error when `exists` holds
    /// for the reloaded schema.
    fn apply<F>(
        &self,
        conn: &mut dyn SqlConnection,
        stmt: &DdlStatement,
        exists: F,
    ) -> DynxResult<Arc<TableSchema>>
    where
        F: Fn(&TableSchema) -> bool,
    {
        let table = stmt.table().unwrap_or_default();
        let result = self.execute(conn, stmt);
        let schema = self.cache.reload(conn, table)?;
        match result {
            Ok(()) => Ok(schema),
            Err(err) if exists(&schema) => {
                warn!(%stmt, error = %err, "DDL raced with a concurrent change");
                Ok(schema)
            }
            Err(err) => Err(err),
        }
    }

    /// Writes the digest of `column` into `hash_<column>` for every row whose
    /// digest is NULL and whose `column` is not. Returns the rows written.
    fn backfill(&self, data: &mut dyn DataConnection, table: &str, column: &str) -> DynxResult<usize> {
        let hash_column = hash_column_name(column);
        let scan = ScanPlan::full_scan(Some(ColumnType::Int));
        let rows = data.get(&GetRequest {
            table: table.to_string(),
            index: IDENTITY_COLUMN.to_string(),
            fields: vec![
                IDENTITY_COLUMN.to_string(),
                column.to_string(),
                hash_column.clone(),
            ],
            key: scan.key,
            op: scan.op,
            offset: 0,
            limit: 0,
            filters: Vec::new(),
        })?;

        let mut missing = Vec::new();
        for row in rows {
            match row.as_slice() {
                [Some(serial), Some(value), None] => missing.push((
                    String::from_utf8_lossy(serial).into_owned(),
                    hash::digest(&String::from_utf8_lossy(value)),
                )),
                [Some(_), _, _] => {}
                _ => {
                    return Err(DynxError::Engine {
                        status: 0,
                        code: 0,
                        message: format!("backfill of '{table}' expected 3 fields per row"),
                    });
                }
            }
        }

        let mut batch = BatchPipeline::new();
        for chunk in missing.chunks(BACKFILL_CHUNK) {
            for (serial, digest) in chunk {
                batch.push(Operation::Update(UpdateRequest {
                    table: table.to_string(),
                    index: IDENTITY_COLUMN.to_string(),
                    fields: vec![hash_column.clone()],
                    key: vec![serial.clone()],
                    op: CompareOp::Eq,
                    offset: 0,
                    limit: 1,
                    filters: Vec::new(),
                    values: vec![digest.clone()],
                }));
            }
            if let Some(err) = batch
                .submit(data)?
                .into_iter()
                .find_map(|result| result.error)
            {
                return Err(err);
            }
        }
        if !missing.is_empty() {
            info!(table, column = %hash_column, rows = missing.len(), "hash column backfilled");
        }
        Ok(missing.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryEngine;
    use crate::storage::Connector;

    fn evolver(engine: &MemoryEngine) -> SchemaEvolver {
        let sql = ConnectionPool::build("sql", 2, || engine.connect_sql()).unwrap();
        SchemaEvolver::new(
            Arc::new(SchemaCache::new()),
            Arc::new(sql),
            "tdh_socket_cache_table_on",
        )
    }

    #[test]
    fn test_ensure_table_once() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        ev.ensure_table("thread").unwrap();
        let ddl = engine.ddl_count();
        let schema = ev.ensure_table("thread").unwrap();
        assert_eq!(engine.ddl_count(), ddl);
        assert!(schema.has_column(IDENTITY_COLUMN));
    }

    #[test]
    fn test_ensure_column_reports_creation() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        assert!(ev.ensure_column("t", "tid", ColumnType::Int).unwrap());
        assert!(!ev.ensure_column("t", "tid", ColumnType::Int).unwrap());
        assert!(!ev.ensure_column("t", IDENTITY_COLUMN, ColumnType::Int).unwrap());
        assert_eq!(ev.cache().describe("t").column_type("tid"), Some(ColumnType::Int));
    }

    #[test]
    fn test_ddl_is_wrapped_in_one_suspension_pair() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        ev.ensure_column("t", "a", ColumnType::Int).unwrap();

        let log = engine.ddl_log();
        assert!(log.first().unwrap().starts_with("SET GLOBAL tdh_socket_cache_table_on=0"));
        assert!(log.last().unwrap().starts_with("SET GLOBAL tdh_socket_cache_table_on=1"));
        assert_eq!(ev.ddl_in_flight(), 0);
    }

    #[test]
    #[should_panic(expected = "schema privilege error")]
    fn test_missing_privilege_is_fatal() {
        let engine = MemoryEngine::new();
        engine.deny_global_variables();
        let ev = evolver(&engine);
        let _ = ev.ensure_table("t");
    }

    #[test]
    fn test_column_created_elsewhere_is_absorbed() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        ev.ensure_table("t").unwrap();
        // another process adds the column behind this cache's back
        engine.create_table_with_columns("t", &[("c", ColumnType::Int)]);
        assert!(!ev.ensure_column("t", "c", ColumnType::Int).unwrap());
        assert!(ev.cache().describe("t").has_column("c"));
    }

    #[test]
    fn test_ensure_index_plain_and_hashed() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        let mut data = engine.connect_data().unwrap();
        ev.ensure_column("price", "itemid", ColumnType::Int).unwrap();
        ev.ensure_column("price", "subject", ColumnType::LongString).unwrap();

        let (id, hashed) = ev
            .ensure_index(data.as_mut(), "price", &["itemid".to_string(), "subject".to_string()])
            .unwrap();
        assert_eq!(id, "itemid$hash_subject");
        assert_eq!(hashed, vec![false, true]);

        let schema = ev.cache().describe("price");
        assert_eq!(schema.column_type("hash_subject"), Some(ColumnType::Hash));
        assert!(schema.has_index("itemid$hash_subject"));
    }

    #[test]
    fn test_ensure_index_requires_columns() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        let mut data = engine.connect_data().unwrap();
        let err = ev
            .ensure_index(data.as_mut(), "t", &["missing".to_string()])
            .unwrap_err();
        assert!(matches!(err, DynxError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_backfill_precedes_unique_index() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        let mut data = engine.connect_data().unwrap();
        ev.ensure_column("doc", "body", ColumnType::LongString).unwrap();
        for body in ["alpha", "beta", "gamma"] {
            engine.insert_row("doc", &[("body", body)]);
        }

        ev.ensure_index(data.as_mut(), "doc", &["body".to_string()]).unwrap();

        for row in engine.rows("doc") {
            let body = row.get("body").cloned().flatten().unwrap();
            let digest = row.get("hash_body").cloned().flatten().unwrap();
            assert_eq!(digest, hash::digest(&body));
        }
        let log = engine.ddl_log();
        let index_at = log.iter().position(|s| s.starts_with("CREATE UNIQUE INDEX")).unwrap();
        let column_at = log.iter().position(|s| s.contains("`hash_body` CHAR(32)")).unwrap();
        assert!(column_at < index_at);
        assert_eq!(engine.round_trips(), 2);
    }

    #[test]
    fn test_index_backfills_companion_created_elsewhere() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        let mut data = engine.connect_data().unwrap();
        ev.ensure_column("doc", "body", ColumnType::LongString).unwrap();
        engine.insert_row("doc", &[("body", "alpha")]);
        engine.insert_row("doc", &[]);
        engine.insert_row("doc", &[]);
        // a concurrent evolver added the companion but has not backfilled yet
        engine.create_table_with_columns("doc", &[("hash_body", ColumnType::Hash)]);

        assert!(!ev.ensure_hash_column(data.as_mut(), "doc", "body").unwrap());
        ev.ensure_index(data.as_mut(), "doc", &["body".to_string()]).unwrap();

        for row in engine.rows("doc") {
            let expected = row["body"].as_deref().map(hash::digest);
            assert_eq!(row["hash_body"], expected);
        }
        assert!(ev.cache().describe("doc").has_index("hash_body"));
    }

    #[test]
    fn test_backfill_only_writes_missing_digests() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        let mut data = engine.connect_data().unwrap();
        ev.ensure_column("doc", "body", ColumnType::LongString).unwrap();
        engine.insert_row("doc", &[("body", "alpha")]);
        engine.insert_row("doc", &[]);

        assert!(ev.ensure_hash_column(data.as_mut(), "doc", "body").unwrap());
        engine.insert_row("doc", &[("body", "beta")]);
        assert_eq!(ev.backfill(data.as_mut(), "doc", "body").unwrap(), 1);
        assert_eq!(ev.backfill(data.as_mut(), "doc", "body").unwrap(), 0);
    }

    #[test]
    fn test_require_reports_missing_structure() {
        let engine = MemoryEngine::new();
        let ev = evolver(&engine);
        assert!(matches!(
            ev.require("nope", &[]).unwrap_err(),
            DynxError::TableNotFound(_)
        ));
        ev.ensure_column("t", "a", ColumnType::Int).unwrap();
        assert!(ev.require("t", &["a".to_string()]).is_ok());
        assert!(matches!(
            ev.require("t", &["b".to_string()]).unwrap_err(),
            DynxError::ColumnNotFound { .. }
        ));
    }
}
