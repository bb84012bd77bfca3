//! Database facade — 호출마다 짧은 커서를 여는 편의 메서드
//!
//! 각 메서드는 단일 커서를 열고 연산 하나를 실행한 뒤 커서를 닫습니다.
//! [`Database::batch`] returns a long-lived cursor for pipelined writes.

use crate::engine::Database;
use crate::engine::cursor::{Cursor, Scan};
use crate::engine::types::{CursorMode, Key};
use crate::error::DynxResult;
use crate::storage::UpdateCount;
use crate::value::Value;
use std::collections::HashMap;

impl Database {
    /// 단일 커서를 엽니다. 데이터 커넥션이 빌 때까지 블록됩니다.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::open(self, CursorMode::Single)
    }

    /// 배치 커서를 엽니다.
    ///
    /// ```rust
    /// use dynx_core::{Database, values};
    ///
    /// # fn main() -> dynx_core::DynxResult<()> {
    /// let db = Database::open_in_memory()?;
    /// let mut batch = db.batch();
    /// batch.insert("price", "itemid, time", (1, 1000), "price", &values![9.5])?;
    /// batch.update("price", "itemid, time", (1, 1000), "price", &values![9.75])?;
    /// let results = batch.commit()?;
    /// assert_eq!(results.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn batch(&self) -> Cursor<'_> {
        Cursor::open(self, CursorMode::Batch)
    }

    // ════════════════════════════════════════════
    // Mutations
    // ════════════════════════════════════════════

    pub fn update(
        &self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<UpdateCount> {
        self.cursor().update(table, index, key, fields, values)
    }

    pub fn insert(
        &self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<()> {
        self.cursor().insert(table, index, key, fields, values)
    }

    pub fn update_insert(
        &self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<()> {
        self.cursor().update_insert(table, index, key, fields, values)
    }

    pub fn insert_update(
        &self,
        table: &str,
        index: &str,
        key: impl Into<Key>,
        fields: &str,
        values: &[Value],
    ) -> DynxResult<()> {
        self.cursor().insert_update(table, index, key, fields, values)
    }

    // ════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════

    pub fn get_rows(&self, table: &str, spec: &str, scan: &Scan) -> DynxResult<Vec<Vec<String>>> {
        self.cursor().get_rows(table, spec, scan)
    }

    pub fn get_col(&self, table: &str, spec: &str, scan: &Scan) -> DynxResult<Vec<String>> {
        self.cursor().get_col(table, spec, scan)
    }

    pub fn get_multi_col(
        &self,
        table: &str,
        spec: &str,
        scan: &Scan,
    ) -> DynxResult<Vec<Vec<String>>> {
        self.cursor().get_multi_col(table, spec, scan)
    }

    pub fn get_map(&self, table: &str, spec: &str, scan: &Scan) -> DynxResult<HashMap<String, String>> {
        self.cursor().get_map(table, spec, scan)
    }

    pub fn get_multi_map(
        &self,
        table: &str,
        spec: &str,
        scan: &Scan,
    ) -> DynxResult<HashMap<String, Vec<String>>> {
        self.cursor().get_multi_map(table, spec, scan)
    }
}
