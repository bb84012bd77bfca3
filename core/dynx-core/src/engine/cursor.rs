//! Cursor — 풀 커넥션 하나에 묶인 세션
//!
//! 상태 머신:
//!
//! ```text
//! Single: Active ──(one read or mutation, success or failure)──▶ Closed
//! Batch:  Active ──update/insert (queued)──▶ Active ──commit()──▶ Closed
//! ```
//!
//! 닫힌 커서에 대한 호출, 배치 커서에서의 읽기/upsert는 프로그래밍 오류이므로
//! panic 합니다. The pooled connection goes back to the pool exactly once,
//! when the cursor closes or is dropped.

use crate::engine::Database;
use crate::engine::types::{CursorMode, CursorState, Key};
use crate::error::{DynxError, DynxResult};
use crate::query::{ReadSpec, parse_filters, parse_index_columns, plan_scan, split_columns};
use crate::schema::{TableSchema, hash, hash_column_name};
use crate::storage::batch::BatchPipeline;
use crate::storage::pool::PooledConnection;
use crate::storage::{
    CompareOp, DataConnection, GetRequest, InsertRequest, OpResult, Operation, UpdateCount,
    UpdateRequest,
};
use crate::value::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Bounds of a read: post filters, offset and limit (0 = unbounded).
///
/// ```rust
/// use dynx_core::Scan;
/// let scan = Scan::all().filter("tid>50").filter("collect=0").limit(10);
/// assert_eq!(scan.limit, 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub filters: Vec<String>,
    pub start: u32,
    pub limit: u32,
}

impl Scan {
    /// Every row, unfiltered.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, expr: impl Into<String>) -> Self {
        self.filters.push(expr.into());
        self
    }

    pub fn filters<I, S>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.extend(exprs.into_iter().map(Into::into));
        self
    }

    /// Rows to skip.
    pub fn start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Resolved write: wire key and columns for update and insert.
struct WritePlan {
    table: String,
    index: String,
    key: Vec<String>,
    /// fields written by an update
    fields: Vec<String>,
    values: Vec<String>,
    /// key columns (and their digests) written in addition by an insert
    key_fields: Vec<String>,
    key_values: Vec<String>,
}

impl WritePlan {
    fn update_request(&self) -> UpdateRequest {
        UpdateRequest {
            table: self.table.clone(),
            index: self.index.clone(),
            fields: self.fields.clone(),
            key: self.key.clone(),
            op: CompareOp::Eq,
            offset: 0,
            limit: 1,
            filters: Vec::new(),
            values: self.values.clone(),
        }
    }

    fn insert_request(&self) -> InsertRequest {
        InsertRequest {
            table: self.table.clone(),
            index: self.index.clone(),
            fields: self.key_fields.iter().chain(&self.fields).cloned().collect(),
            values: self.key_values.iter().chain(&self.values).cloned().collect(),
        }
    }
}

/// 커서
pub struct Cursor<'db> {
    db: &'db Database,
    mode: CursorMode,
    conn: Option<PooledConnection<'db, Box<dyn DataConnection>>>,
    batch: BatchPipeline,
}

impl<'db> Cursor<'db> {
    /// Checks out a data connection, blocking until one is idle.
    pub(crate) fn open(db: &'db Database, mode: CursorMode) -> Self {
        let conn = db.data.checkout();
        debug!(?mode, "cursor opened");
        Self {
            db,
            mode,
            conn: Some(conn),
            batch: BatchPipeline::new(),
        }
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    pub fn state(&self) -> CursorState {
        if self.conn.is_some() {
            CursorState::Active
        } else {
            CursorState::Closed
        }
    }

    /// Mutations queued on a batch cursor.
    pub fn pending_ops(&self) -> usize {
        self.batch.pending_ops()
    }

    // ════════════════════════════════════════════
    // Mutations
    // ════════════════════════════════════════════

    /// 키가 일치하는 행의 필드를 갱신하고 `(matched, changed)`를 반환합니다.
    ///
    /// On a batch cursor the update is queued and the returned counts are
    /// zero; the real counts arrive with [`Cursor::commit`].
    pub fn update(
        &mut self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<UpdateCount> {
        self.ensure_active("update");
        let key = key.into();
        self.run_once(|cursor| {
            let plan = cursor.plan_write(table, index, &key, fields, values)?;
            match cursor.mode {
                CursorMode::Batch => {
                    cursor.batch.push(Operation::Update(plan.update_request()));
                    Ok(UpdateCount::default())
                }
                CursorMode::Single => cursor.connection().update(&plan.update_request()),
            }
        })
    }

    /// 행을 삽입합니다. 유니크 인덱스 위반 시 [`DynxError::DuplicateKey`].
    ///
    /// The key columns are written along with `fields`. On a batch cursor the
    /// insert is queued.
    pub fn insert(
        &mut self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<()> {
        self.ensure_active("insert");
        let key = key.into();
        self.run_once(|cursor| {
            let plan = cursor.plan_write(table, index, &key, fields, values)?;
            match cursor.mode {
                CursorMode::Batch => {
                    cursor.batch.push(Operation::Insert(plan.insert_request()));
                    Ok(())
                }
                CursorMode::Single => cursor.connection().insert(&plan.insert_request()),
            }
        })
    }

    /// Update, or insert when no row matched.
    ///
    /// A duplicate key on the fallback insert means a concurrent writer
    /// created the row first; that writer's values stand and no error is
    /// returned.
    pub fn update_insert(
        &mut self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<()> {
        self.ensure_active("update_insert");
        self.ensure_single("update_insert");
        let key = key.into();
        self.run_once(|cursor| {
            let plan = cursor.plan_write(table, index, &key, fields, values)?;
            let conn = cursor.connection();
            let count = conn.update(&plan.update_request())?;
            if count.matched > 0 {
                return Ok(());
            }
            match conn.insert(&plan.insert_request()) {
                Err(err) if err.is_duplicate_key() => {
                    debug!(table, "concurrent insert won, duplicate key absorbed");
                    Ok(())
                }
                other => other,
            }
        })
    }

    /// Insert, or update when the key already exists.
    pub fn insert_update(
        &mut self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<()> {
        self.ensure_active("insert_update");
        self.ensure_single("insert_update");
        let key = key.into();
        self.run_once(|cursor| {
            let plan = cursor.plan_write(table, index, &key, fields, values)?;
            let conn = cursor.connection();
            match conn.insert(&plan.insert_request()) {
                Err(err) if err.is_duplicate_key() => {
                    conn.update(&plan.update_request()).map(|_| ())
                }
                other => other,
            }
        })
    }

    /// 배치를 전송하고 연산별 결과를 제출 순서대로 반환한 뒤 커서를 닫습니다.
    ///
    /// Digests for `hash_` companions created after an operation was queued
    /// are filled in from the current schema before sending. On a single
    /// cursor this does nothing and returns no results.
    pub fn commit(&mut self) -> DynxResult<Vec<OpResult>> {
        self.ensure_active("commit");
        if self.mode == CursorMode::Single {
            return Ok(Vec::new());
        }

        let pending = self.batch.pending_ops();
        let db = self.db;
        for op in self.batch.ops_mut() {
            complete_digests(&db.cache.describe(op.table()), op);
        }
        let result = match self.conn.as_mut() {
            Some(conn) => self.batch.submit(&mut ***conn),
            None => unreachable!(),
        };
        debug!(ops = pending, ok = result.is_ok(), "batch committed");
        self.close();
        result
    }

    /// Returns the connection without running an operation.
    ///
    /// Batch cursors must be finalized with [`Cursor::commit`] instead.
    pub fn close(&mut self) {
        self.ensure_active("close");
        if self.mode == CursorMode::Batch && !self.batch.is_empty() {
            panic!(
                "invalid cursor use: close() on a batch cursor with {} queued operations; use commit()",
                self.batch.pending_ops()
            );
        }
        self.release();
    }

    // ════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════

    /// Projected rows, one `Vec` per row in index order.
    ///
    /// `spec` is `"c1, c2, ..."` (index on `c1`) or `"a$b, f1, ..."` (composite
    /// index `a$b`, projecting only the listed fields).
    pub fn get_rows(&mut self, table: &str, spec: &str, scan: &Scan) -> DynxResult<Vec<Vec<String>>> {
        self.ensure_active("get_rows");
        self.ensure_single("get_rows");
        self.run_once(|cursor| {
            let spec = ReadSpec::parse(spec)?;
            cursor.read(table, &spec, scan)
        })
    }

    /// Values of the first projected field.
    pub fn get_col(&mut self, table: &str, spec: &str, scan: &Scan) -> DynxResult<Vec<String>> {
        let rows = self.get_rows(table, spec, scan)?;
        Ok(rows.into_iter().filter_map(|row| row.into_iter().next()).collect())
    }

    /// Every projected field, row by row.
    pub fn get_multi_col(
        &mut self,
        table: &str,
        spec: &str,
        scan: &Scan,
    ) -> DynxResult<Vec<Vec<String>>> {
        self.get_rows(table, spec, scan)
    }

    /// 첫 번째 필드 → 두 번째 필드 맵
    pub fn get_map(&mut self, table: &str, spec: &str, scan: &Scan) -> DynxResult<HashMap<String, String>> {
        let rows = self.get_mapped_rows(table, spec, scan, "get_map")?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                let value = row.swap_remove(1);
                (row.swap_remove(0), value)
            })
            .collect())
    }

    /// 첫 번째 필드 → 나머지 필드 맵
    pub fn get_multi_map(
        &mut self,
        table: &str,
        spec: &str,
        scan: &Scan,
    ) -> DynxResult<HashMap<String, Vec<String>>> {
        let rows = self.get_mapped_rows(table, spec, scan, "get_multi_map")?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                let rest = row.split_off(1);
                (row.swap_remove(0), rest)
            })
            .collect())
    }

    fn get_mapped_rows(
        &mut self,
        table: &str,
        spec: &str,
        scan: &Scan,
        op: &str,
    ) -> DynxResult<Vec<Vec<String>>> {
        self.ensure_active(op);
        self.ensure_single(op);
        self.run_once(|cursor| {
            let spec = ReadSpec::parse(spec)?;
            if spec.fields.len() < 2 {
                return Err(DynxError::InvalidArguments(format!(
                    "{op} needs a key field and at least one value field, got {:?}",
                    spec.fields
                )));
            }
            cursor.read(table, &spec, scan)
        })
    }

    // ────────────────────────────────────────
    // internals
    // ────────────────────────────────────────

    fn ensure_active(&self, op: &str) {
        if self.conn.is_none() {
            panic!("invalid cursor use: {op}() on a closed cursor");
        }
    }

    fn ensure_single(&self, op: &str) {
        if self.mode == CursorMode::Batch {
            panic!("invalid cursor use: {op}() is not available on a batch cursor");
        }
    }

    fn connection(&mut self) -> &mut dyn DataConnection {
        match self.conn.as_mut() {
            Some(conn) => &mut ***conn,
            None => panic!("invalid cursor use: connection of a closed cursor"),
        }
    }

    fn release(&mut self) {
        if self.conn.take().is_some() {
            debug!(mode = ?self.mode, "cursor closed");
        }
    }

    /// Runs one operation; a single cursor closes afterwards on every path.
    fn run_once<T>(&mut self, op: impl FnOnce(&mut Self) -> DynxResult<T>) -> DynxResult<T> {
        let result = op(self);
        if self.mode == CursorMode::Single {
            self.release();
        }
        result
    }

    /// Ensures structure for a write and converts key and values to wire text.
    fn plan_write(
        &mut self,
        table: &str,
        index: &str,
        key: &Key,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<WritePlan> {
        let index_columns = parse_index_columns(index)?;
        let fields = split_columns(fields);
        if key.len() != index_columns.len() {
            return Err(DynxError::InvalidArguments(format!(
                "index '{index}' has {} columns but the key has {} values",
                index_columns.len(),
                key.len()
            )));
        }
        if fields.len() != values.len() {
            return Err(DynxError::InvalidArguments(format!(
                "{} fields but {} values",
                fields.len(),
                values.len()
            )));
        }
        if let Some(field) = fields.iter().find(|f| index_columns.contains(f)) {
            return Err(DynxError::InvalidArguments(format!(
                "field '{field}' is an index column; it is written from the key"
            )));
        }

        let db = self.db;
        let evolver = &db.evolver;
        evolver.ensure_table(table)?;
        for (column, value) in index_columns.iter().zip(key.values()) {
            evolver.ensure_column(table, column, value.kind())?;
        }
        for (field, value) in fields.iter().zip(values) {
            evolver.ensure_column(table, field, value.kind())?;
        }
        let (identifier, hashed) = evolver.ensure_index(self.connection(), table, &index_columns)?;
        let schema = db.cache.describe(table);

        let mut plan = WritePlan {
            table: table.to_string(),
            index: identifier,
            key: Vec::with_capacity(key.len()),
            fields: Vec::with_capacity(fields.len()),
            values: Vec::with_capacity(values.len()),
            key_fields: Vec::new(),
            key_values: Vec::new(),
        };
        for ((column, value), is_hashed) in index_columns.iter().zip(key.values()).zip(hashed) {
            let text = value.to_wire();
            if is_hashed {
                let digest = hash::digest(&text);
                plan.key.push(digest.clone());
                plan.key_fields.push(hash_column_name(column));
                plan.key_values.push(digest);
            } else {
                plan.key.push(text.clone());
            }
            plan.key_fields.push(column.clone());
            plan.key_values.push(text);
        }
        for (field, value) in fields.into_iter().zip(values) {
            push_field(&schema, &mut plan.fields, &mut plan.values, field, value.to_wire());
        }
        Ok(plan)
    }

    /// Resolves the index, plans the scan and reshapes the rows.
    fn read(&mut self, table: &str, spec: &ReadSpec, scan: &Scan) -> DynxResult<Vec<Vec<String>>> {
        let filters = parse_filters(&scan.filters)?;

        let mut needed: Vec<String> = spec.index.iter().chain(&spec.fields).cloned().collect();
        needed.extend(filters.iter().map(|f| f.field.clone()));
        let db = self.db;
        let evolver = &db.evolver;
        let schema = evolver.require(table, &needed)?;

        // rejected before any hash column gets created
        let hashed_filters = filters
            .iter()
            .map(|f| f.hashed_for(&schema))
            .collect::<DynxResult<Vec<_>>>()?;
        for filter in filters.iter().filter(|f| schema.is_hashed(&f.field)) {
            evolver.ensure_hash_column(self.connection(), table, &filter.field)?;
        }
        let (identifier, _) = evolver.ensure_index(self.connection(), table, &spec.index)?;
        let schema = db.cache.describe(table);

        let leading = schema.column_identifier(&spec.index[0]);
        let plan = plan_scan(&leading, schema.column_type(&leading), hashed_filters);
        debug!(
            table,
            index = %identifier,
            key = ?plan.key,
            op = %plan.op,
            folded = plan.is_folded(),
            residual = plan.filters.len(),
            "scan planned"
        );

        let rows = self.connection().get(&GetRequest {
            table: table.to_string(),
            index: identifier,
            fields: spec.fields.clone(),
            key: plan.key,
            op: plan.op,
            offset: scan.start,
            limit: scan.limit,
            filters: plan.filters,
        })?;
        Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.map(|c| String::from_utf8_lossy(&c).into_owned())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect())
    }
}

/// Adds `field = text`, plus the digest when the field has a `hash_` companion.
fn push_field(
    schema: &TableSchema,
    fields: &mut Vec<String>,
    values: &mut Vec<String>,
    field: String,
    text: String,
) {
    let companion = hash_column_name(&field);
    if schema.is_hashed(&field) && schema.has_column(&companion) {
        fields.push(companion);
        values.push(hash::digest(&text));
    }
    fields.push(field);
    values.push(text);
}

/// Adds the digest of every hashed field whose companion `op` does not
/// write yet.
fn complete_digests(schema: &TableSchema, op: &mut Operation) {
    let (fields, values) = match op {
        Operation::Insert(req) => (&mut req.fields, &mut req.values),
        Operation::Update(req) => (&mut req.fields, &mut req.values),
    };
    let missing: Vec<(String, String)> = fields
        .iter()
        .zip(values.iter())
        .filter(|(field, _)| schema.is_hashed(field))
        .map(|(field, text)| (hash_column_name(field), hash::digest(text)))
        .filter(|(companion, _)| schema.has_column(companion) && !fields.contains(companion))
        .collect();
    for (companion, digest) in missing {
        fields.push(companion);
        values.push(digest);
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if self.conn.is_some() && !self.batch.is_empty() {
            warn!(
                ops = self.batch.pending_ops(),
                "batch cursor dropped without commit, queued operations discarded"
            );
        }
    }
}
