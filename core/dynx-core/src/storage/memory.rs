//! In-memory engine implementing both collaborator paths
//!
//! 테스트와 벤치마크용 인메모리 스토어입니다. Tables keep typed columns,
//! unique indexes and rows; the data path follows the storage protocol's
//! contract (typed key comparison, post filters, offset/limit, duplicate-key
//! status) and the SQL path follows MySQL's DDL error codes.
//!
//! Every DDL statement is recorded, data-path round trips are counted, and
//! rows can be inspected directly.

use crate::error::{CLIENT_STATUS_DB_ERROR, DynxError, DynxResult, ENGINE_ERR_DUPLICATE_KEY};
use crate::query::Filter;
use crate::schema::{ColumnType, DdlStatement, IDENTITY_COLUMN};
use crate::storage::{
    ColumnDescription, CompareOp, Connector, DataConnection, GetRequest, IndexDescription,
    InsertRequest, NULL_KEY, OpResult, Operation, Row, SqlConnection, UpdateCount,
    UpdateRequest,
};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// MySQL error codes produced by the SQL path.
pub mod sql_codes {
    pub const DUPLICATE_COLUMN: u32 = 1060;
    pub const DUPLICATE_KEY_NAME: u32 = 1061;
    pub const DUPLICATE_ENTRY: u32 = 1062;
    pub const KEY_COLUMN_MISSING: u32 = 1072;
    pub const NO_SUCH_TABLE: u32 = 1146;
    pub const ACCESS_DENIED: u32 = 1227;
}

/// Client status for requests the engine rejects before execution.
const CLIENT_STATUS_BAD_REQUEST: u16 = 400;

/// 인메모리 행 (NULL = `None`)
pub type MemRow = HashMap<String, Option<String>>;

#[derive(Debug, Clone)]
struct MemColumn {
    name: String,
    kind: ColumnType,
    sql_type: String,
}

#[derive(Debug, Default)]
struct MemTable {
    columns: Vec<MemColumn>,
    /// unique index name → columns
    indexes: BTreeMap<String, Vec<String>>,
    rows: Vec<MemRow>,
    next_serial: i64,
}

impl MemTable {
    fn new() -> Self {
        Self {
            columns: vec![MemColumn {
                name: IDENTITY_COLUMN.to_string(),
                kind: ColumnType::Int,
                sql_type: "bigint(20) unsigned".to_string(),
            }],
            indexes: BTreeMap::from([(
                IDENTITY_COLUMN.to_string(),
                vec![IDENTITY_COLUMN.to_string()],
            )]),
            rows: Vec::new(),
            next_serial: 1,
        }
    }

    fn kind(&self, column: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == column).map(|c| c.kind)
    }

    fn add_column(&mut self, name: &str, kind: ColumnType) {
        self.columns.push(MemColumn {
            name: name.to_string(),
            kind,
            sql_type: kind.sql_type().to_string(),
        });
        let default = default_cell(kind);
        for row in &mut self.rows {
            row.insert(name.to_string(), default.clone());
        }
    }

    fn new_row(&mut self) -> MemRow {
        let mut row: MemRow = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), default_cell(c.kind)))
            .collect();
        row.insert(IDENTITY_COLUMN.to_string(), Some(self.next_serial.to_string()));
        self.next_serial += 1;
        row
    }

    /// Row positions matching a key scan plus filters, in index order.
    fn scan(
        &self,
        table: &str,
        index: &str,
        key: &[String],
        op: CompareOp,
        filters: &[Filter],
    ) -> DynxResult<Vec<usize>> {
        let columns = self
            .indexes
            .get(index)
            .ok_or_else(|| bad_request(format!("index '{index}' not found on '{table}'")))?;
        if key.is_empty() || key.len() > columns.len() {
            return Err(bad_request(format!(
                "key of {} values does not fit index '{index}'",
                key.len()
            )));
        }
        if op == CompareOp::Ne {
            return Err(bad_request("'!=' is not a scan operator".to_string()));
        }
        for filter in filters {
            if self.kind(&filter.field).is_none() {
                return Err(bad_request(format!(
                    "filter column '{}' not found on '{table}'",
                    filter.field
                )));
            }
        }

        let mut hits: Vec<usize> = (0..self.rows.len())
            .filter(|&i| {
                let row = &self.rows[i];
                let ordering = columns
                    .iter()
                    .zip(key)
                    .map(|(c, k)| compare_to_key(self.kind(c), cell(row, c), k))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal);
                op.matches(ordering)
                    && filters.iter().all(|f| {
                        f.op.matches(compare_to_key(self.kind(&f.field), cell(row, &f.field), &f.value))
                    })
            })
            .collect();

        hits.sort_by(|&a, &b| {
            let (ra, rb) = (&self.rows[a], &self.rows[b]);
            columns
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(IDENTITY_COLUMN))
                .map(|c| compare_cells(self.kind(c), cell(ra, c), cell(rb, c)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(hits)
    }

    /// First unique index `candidate` would violate, ignoring row `skip`.
    fn violated_index(&self, candidate: &MemRow, skip: Option<usize>) -> Option<&str> {
        self.indexes.iter().find_map(|(name, columns)| {
            if columns.iter().any(|c| cell(candidate, c).is_none()) {
                return None;
            }
            let clash = self.rows.iter().enumerate().any(|(i, row)| {
                Some(i) != skip
                    && columns.iter().all(|c| {
                        compare_cells(self.kind(c), cell(row, c), cell(candidate, c)) == Ordering::Equal
                    })
            });
            clash.then_some(name.as_str())
        })
    }

    fn check_fields(&self, table: &str, fields: &[String], values: usize) -> DynxResult<()> {
        if fields.len() != values {
            return Err(bad_request(format!(
                "{} fields but {values} values",
                fields.len()
            )));
        }
        match fields.iter().find(|f| self.kind(f).is_none()) {
            Some(f) => Err(bad_request(format!("column '{f}' not found on '{table}'"))),
            None => Ok(()),
        }
    }
}

fn cell<'a>(row: &'a MemRow, column: &str) -> Option<&'a str> {
    row.get(column).and_then(|v| v.as_deref())
}

fn default_cell(kind: ColumnType) -> Option<String> {
    match kind {
        ColumnType::LongString | ColumnType::Hash => None,
        ColumnType::ShortString => Some(String::new()),
        ColumnType::Bool | ColumnType::Int | ColumnType::Float => Some("0".to_string()),
    }
}

fn compare_text(kind: Option<ColumnType>, a: &str, b: &str) -> Ordering {
    match kind {
        Some(k) if k.is_numeric() => match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.as_bytes().cmp(b.as_bytes()),
        },
        _ => a.as_bytes().cmp(b.as_bytes()),
    }
}

/// NULL sorts before every value.
fn compare_cells(kind: Option<ColumnType>, a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_text(kind, a, b),
    }
}

fn compare_to_key(kind: Option<ColumnType>, value: Option<&str>, key: &str) -> Ordering {
    let key = (key != NULL_KEY).then_some(key);
    compare_cells(kind, value, key)
}

fn bad_request(message: String) -> DynxError {
    DynxError::Engine {
        status: CLIENT_STATUS_BAD_REQUEST,
        code: 0,
        message,
    }
}

fn sql_error(code: u32, message: String) -> DynxError {
    DynxError::Sql { code, message }
}

#[derive(Debug, Default)]
struct EngineState {
    tables: BTreeMap<String, MemTable>,
    globals: HashMap<String, bool>,
    deny_globals: bool,
    ddl_log: Vec<String>,
    ddl_count: usize,
    round_trips: u64,
}

impl EngineState {
    fn table(&self, table: &str) -> DynxResult<&MemTable> {
        self.tables
            .get(table)
            .ok_or_else(|| bad_request(format!("table '{table}' not found")))
    }

    fn table_mut(&mut self, table: &str) -> DynxResult<&mut MemTable> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| bad_request(format!("table '{table}' not found")))
    }

    fn get(&self, req: &GetRequest) -> DynxResult<Vec<Row>> {
        let t = self.table(&req.table)?;
        t.check_fields(&req.table, &req.fields, req.fields.len())?;
        let hits = t.scan(&req.table, &req.index, &req.key, req.op, &req.filters)?;
        Ok(window(hits, req.offset, req.limit)
            .map(|i| {
                req.fields
                    .iter()
                    .map(|f| cell(&t.rows[i], f).map(|v| v.as_bytes().to_vec()))
                    .collect()
            })
            .collect())
    }

    fn insert(&mut self, req: &InsertRequest) -> DynxResult<()> {
        let t = self.table_mut(&req.table)?;
        if !t.indexes.contains_key(&req.index) {
            return Err(bad_request(format!("index '{}' not found", req.index)));
        }
        t.check_fields(&req.table, &req.fields, req.values.len())?;

        let mut row = t.new_row();
        for (field, value) in req.fields.iter().zip(&req.values) {
            row.insert(field.clone(), Some(value.clone()));
        }
        if let Some(index) = t.violated_index(&row, None) {
            // the serial was consumed, as with a real auto-increment
            return Err(DynxError::from_engine(
                &req.table,
                CLIENT_STATUS_DB_ERROR,
                ENGINE_ERR_DUPLICATE_KEY,
                format!("duplicate entry for key '{index}'"),
            ));
        }
        t.rows.push(row);
        Ok(())
    }

    fn update(&mut self, req: &UpdateRequest) -> DynxResult<UpdateCount> {
        let t = self.table_mut(&req.table)?;
        t.check_fields(&req.table, &req.fields, req.values.len())?;
        let hits = t.scan(&req.table, &req.index, &req.key, req.op, &req.filters)?;

        let mut count = UpdateCount::default();
        for i in window(hits, req.offset, req.limit) {
            let mut updated = t.rows[i].clone();
            for (field, value) in req.fields.iter().zip(&req.values) {
                updated.insert(field.clone(), Some(value.clone()));
            }
            if let Some(index) = t.violated_index(&updated, Some(i)) {
                return Err(DynxError::from_engine(
                    &req.table,
                    CLIENT_STATUS_DB_ERROR,
                    ENGINE_ERR_DUPLICATE_KEY,
                    format!("duplicate entry for key '{index}'"),
                ));
            }
            count.matched += 1;
            if updated != t.rows[i] {
                count.changed += 1;
                t.rows[i] = updated;
            }
        }
        Ok(count)
    }

    fn execute(&mut self, stmt: &DdlStatement) -> DynxResult<()> {
        self.ddl_log.push(stmt.to_string());
        match stmt {
            DdlStatement::SetGlobal { variable, enabled } => {
                if self.deny_globals {
                    return Err(sql_error(
                        sql_codes::ACCESS_DENIED,
                        "Access denied; you need (at least one of) the SUPER privilege(s)"
                            .to_string(),
                    ));
                }
                self.globals.insert(variable.clone(), *enabled);
                Ok(())
            }
            DdlStatement::CreateTable { table } => {
                self.ddl_count += 1;
                self.tables.entry(table.clone()).or_insert_with(MemTable::new);
                Ok(())
            }
            DdlStatement::AddColumn {
                table,
                column,
                column_type,
            } => {
                self.ddl_count += 1;
                let t = self.tables.get_mut(table).ok_or_else(|| no_such_table(table))?;
                if t.kind(column).is_some() {
                    return Err(sql_error(
                        sql_codes::DUPLICATE_COLUMN,
                        format!("Duplicate column name '{column}'"),
                    ));
                }
                t.add_column(column, *column_type);
                Ok(())
            }
            DdlStatement::CreateUniqueIndex {
                table,
                name,
                columns,
            } => {
                self.ddl_count += 1;
                let t = self.tables.get_mut(table).ok_or_else(|| no_such_table(table))?;
                if t.indexes.contains_key(name) {
                    return Err(sql_error(
                        sql_codes::DUPLICATE_KEY_NAME,
                        format!("Duplicate key name '{name}'"),
                    ));
                }
                if let Some(c) = columns.iter().find(|c| t.kind(c).is_none()) {
                    return Err(sql_error(
                        sql_codes::KEY_COLUMN_MISSING,
                        format!("Key column '{c}' doesn't exist in table"),
                    ));
                }
                let mut seen: Vec<Vec<Option<&str>>> = Vec::new();
                for row in &t.rows {
                    let tuple: Vec<Option<&str>> = columns.iter().map(|c| cell(row, c)).collect();
                    if tuple.iter().all(Option::is_some) && seen.contains(&tuple) {
                        return Err(sql_error(
                            sql_codes::DUPLICATE_ENTRY,
                            format!("Duplicate entry for key '{name}'"),
                        ));
                    }
                    seen.push(tuple);
                }
                t.indexes.insert(name.clone(), columns.clone());
                Ok(())
            }
        }
    }
}

fn no_such_table(table: &str) -> DynxError {
    sql_error(sql_codes::NO_SUCH_TABLE, format!("Table '{table}' doesn't exist"))
}

/// Applies offset and limit (0 = unbounded).
fn window(hits: Vec<usize>, offset: u32, limit: u32) -> impl Iterator<Item = usize> {
    let limit = if limit == 0 { usize::MAX } else { limit as usize };
    hits.into_iter().skip(offset as usize).take(limit)
}

// ════════════════════════════════════════════
// Engine handle and connections
// ════════════════════════════════════════════

/// 인메모리 엔진 ([`Connector`] 구현)
///
/// Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<RwLock<EngineState>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every statement the SQL path received, rendered, in order.
    pub fn ddl_log(&self) -> Vec<String> {
        self.state.read().ddl_log.clone()
    }

    /// Structural statements received (global-variable toggles excluded).
    pub fn ddl_count(&self) -> usize {
        self.state.read().ddl_count
    }

    /// Data-path round trips served.
    pub fn round_trips(&self) -> u64 {
        self.state.read().round_trips
    }

    /// Makes `SET GLOBAL` fail with an access-denied error.
    pub fn deny_global_variables(&self) {
        self.state.write().deny_globals = true;
    }

    pub fn global_variable(&self, name: &str) -> Option<bool> {
        self.state.read().globals.get(name).copied()
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state.read().tables.contains_key(table)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state.read().tables.get(table).map_or(0, |t| t.rows.len())
    }

    /// Rows of `table` in insertion order.
    pub fn rows(&self, table: &str) -> Vec<MemRow> {
        self.state
            .read()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Creates `table` and any missing columns without going through the SQL path.
    pub fn create_table_with_columns(&self, table: &str, columns: &[(&str, ColumnType)]) {
        let mut state = self.state.write();
        let t = state
            .tables
            .entry(table.to_string())
            .or_insert_with(MemTable::new);
        for (name, kind) in columns {
            if t.kind(name).is_none() {
                t.add_column(name, *kind);
            }
        }
    }

    /// Appends a row directly, skipping unique checks. Columns must exist.
    pub fn insert_row(&self, table: &str, values: &[(&str, &str)]) {
        let mut state = self.state.write();
        if let Some(t) = state.tables.get_mut(table) {
            let mut row = t.new_row();
            for (column, value) in values {
                row.insert(column.to_string(), Some(value.to_string()));
            }
            t.rows.push(row);
        }
    }

    fn connection(&self) -> MemoryConnection {
        MemoryConnection {
            state: Arc::clone(&self.state),
        }
    }
}

impl Connector for MemoryEngine {
    fn connect_data(&self) -> DynxResult<Box<dyn DataConnection>> {
        Ok(Box::new(self.connection()))
    }

    fn connect_sql(&self) -> DynxResult<Box<dyn SqlConnection>> {
        Ok(Box::new(self.connection()))
    }
}

/// 인메모리 커넥션
struct MemoryConnection {
    state: Arc<RwLock<EngineState>>,
}

impl DataConnection for MemoryConnection {
    fn get(&mut self, req: &GetRequest) -> DynxResult<Vec<Row>> {
        let mut state = self.state.write();
        state.round_trips += 1;
        state.get(req)
    }

    fn insert(&mut self, req: &InsertRequest) -> DynxResult<()> {
        let mut state = self.state.write();
        state.round_trips += 1;
        state.insert(req)
    }

    fn update(&mut self, req: &UpdateRequest) -> DynxResult<UpdateCount> {
        let mut state = self.state.write();
        state.round_trips += 1;
        state.update(req)
    }

    fn submit_batch(&mut self, ops: &[Operation]) -> DynxResult<Vec<OpResult>> {
        let mut state = self.state.write();
        state.round_trips += 1;
        Ok(ops
            .iter()
            .map(|op| {
                let outcome = match op {
                    Operation::Insert(req) => state.insert(req).map(|()| UpdateCount::default()),
                    Operation::Update(req) => state.update(req),
                };
                match outcome {
                    Ok(count) => OpResult {
                        kind: op.kind(),
                        matched: count.matched,
                        changed: count.changed,
                        error: None,
                    },
                    Err(err) => OpResult {
                        kind: op.kind(),
                        matched: 0,
                        changed: 0,
                        error: Some(err),
                    },
                }
            })
            .collect())
    }
}

impl SqlConnection for MemoryConnection {
    fn show_tables(&mut self) -> DynxResult<Vec<String>> {
        Ok(self.state.read().tables.keys().cloned().collect())
    }

    fn describe(&mut self, table: &str) -> DynxResult<Vec<ColumnDescription>> {
        let state = self.state.read();
        let t = state.tables.get(table).ok_or_else(|| no_such_table(table))?;
        Ok(t.columns
            .iter()
            .map(|c| ColumnDescription {
                name: c.name.clone(),
                sql_type: c.sql_type.clone(),
                nullable: c.name != IDENTITY_COLUMN,
            })
            .collect())
    }

    fn show_indexes(&mut self, table: &str) -> DynxResult<Vec<IndexDescription>> {
        let state = self.state.read();
        let t = state.tables.get(table).ok_or_else(|| no_such_table(table))?;
        Ok(t.indexes
            .iter()
            .flat_map(|(name, columns)| {
                columns.iter().enumerate().map(move |(seq, column)| IndexDescription {
                    key_name: name.clone(),
                    column_name: column.clone(),
                    seq_in_index: seq as u32 + 1,
                    non_unique: false,
                })
            })
            .collect())
    }

    fn execute(&mut self, stmt: &DdlStatement) -> DynxResult<()> {
        self.state.write().execute(stmt)
    }
}
