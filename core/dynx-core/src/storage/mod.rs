//! Storage module — interfaces to the external collaborators.
//!
//! The core never talks to MySQL or to the storage protocol directly; it
//! depends only on the traits below (Dependency Inversion Principle).
//!
//! - [`DataConnection`] — point/range get, insert, update and pipelined batches
//! - [`SqlConnection`] — introspection and DDL
//! - [`Connector`] — opens both kinds of connection for the pools
//!
//! [`memory::MemoryEngine`] implements all three in-process.

pub mod batch;
pub mod memory;
pub mod pool;

use crate::error::{DynxError, DynxResult};
use crate::query::Filter;
use crate::schema::DdlStatement;
use std::fmt;

/// Key marker the engine sorts before every non-null value.
pub const NULL_KEY: &str = "(null)";

/// One raw row as returned by the engine, one cell per requested field.
///
/// NULL cells are `None`; an empty string is `Some(vec![])`.
pub type Row = Vec<Option<Vec<u8>>>;

/// 비교 연산자 (키 스캔과 필터 공용)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
    /// filter-only; never a scan operator
    Ne,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ne => "!=",
        }
    }

    /// Operators that order values, as opposed to testing equality.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    /// Whether a comparison result satisfies this operator.
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Ge => ordering != Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Lt => ordering == Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Range/filter read over one index.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    pub table: String,
    pub index: String,
    pub fields: Vec<String>,
    /// start key, a prefix of the index columns
    pub key: Vec<String>,
    pub op: CompareOp,
    pub offset: u32,
    /// 0 = unbounded
    pub limit: u32,
    pub filters: Vec<Filter>,
}

/// Point insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRequest {
    pub table: String,
    pub index: String,
    pub fields: Vec<String>,
    pub values: Vec<String>,
}

/// Keyed update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub table: String,
    pub index: String,
    pub fields: Vec<String>,
    pub key: Vec<String>,
    pub op: CompareOp,
    pub offset: u32,
    pub limit: u32,
    pub filters: Vec<Filter>,
    pub values: Vec<String>,
}

/// Mutation queued in a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Insert(InsertRequest),
    Update(UpdateRequest),
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Insert(_) => OpKind::Insert,
            Operation::Update(_) => OpKind::Update,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Operation::Insert(req) => &req.table,
            Operation::Update(req) => &req.table,
        }
    }
}

/// 배치 연산 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Insert,
    Update,
}

/// Rows matched and rows actually changed by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCount {
    pub matched: u64,
    pub changed: u64,
}

/// 배치 커밋 결과: 파이프라인된 연산 하나당 하나
#[derive(Debug)]
pub struct OpResult {
    pub kind: OpKind,
    pub matched: u64,
    pub changed: u64,
    pub error: Option<DynxError>,
}

impl OpResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// `DESCRIBE <table>` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
}

/// `SHOW INDEXES IN <table>` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescription {
    pub key_name: String,
    pub column_name: String,
    pub seq_in_index: u32,
    pub non_unique: bool,
}

/// Data-path connection (storage protocol).
///
/// # Contract
///
/// - `get`: rows in ascending index order, projected to `fields`; NULL stays
///   distinguishable from the empty string.
/// - `insert`: fails with [`DynxError::DuplicateKey`] on a unique violation.
/// - `update`: reports matched and changed row counts.
/// - `submit_batch`: one round trip, one [`OpResult`] per operation in order;
///   a failing operation does not stop the ones after it.
pub trait DataConnection: Send {
    fn get(&mut self, req: &GetRequest) -> DynxResult<Vec<Row>>;

    fn insert(&mut self, req: &InsertRequest) -> DynxResult<()>;

    fn update(&mut self, req: &UpdateRequest) -> DynxResult<UpdateCount>;

    fn submit_batch(&mut self, ops: &[Operation]) -> DynxResult<Vec<OpResult>>;
}

/// SQL-path connection, used only for introspection and DDL.
pub trait SqlConnection: Send {
    fn show_tables(&mut self) -> DynxResult<Vec<String>>;

    fn describe(&mut self, table: &str) -> DynxResult<Vec<ColumnDescription>>;

    fn show_indexes(&mut self, table: &str) -> DynxResult<Vec<IndexDescription>>;

    fn execute(&mut self, stmt: &DdlStatement) -> DynxResult<()>;
}

/// Opens connections for the two pools of a [`crate::Database`].
pub trait Connector: Send + Sync {
    fn connect_data(&self) -> DynxResult<Box<dyn DataConnection>>;

    fn connect_sql(&self) -> DynxResult<Box<dyn SqlConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_compare_op_matches() {
        assert!(CompareOp::Ge.matches(Ordering::Equal));
        assert!(CompareOp::Ge.matches(Ordering::Greater));
        assert!(!CompareOp::Gt.matches(Ordering::Equal));
        assert!(CompareOp::Le.matches(Ordering::Less));
        assert!(!CompareOp::Lt.matches(Ordering::Equal));
        assert!(CompareOp::Ne.matches(Ordering::Less));
        assert!(!CompareOp::Eq.matches(Ordering::Greater));
    }

    #[test]
    fn test_compare_op_ordering() {
        assert!(!CompareOp::Eq.is_ordering());
        assert!(!CompareOp::Ne.is_ordering());
        assert!(CompareOp::Lt.is_ordering());
        assert_eq!(CompareOp::Ne.to_string(), "!=");
    }
}
