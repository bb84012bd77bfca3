//! Pipelined mutations
//!
//! 쓰기 연산을 로컬 로그에 축적했다가 `submit` 시 한 번의 왕복으로 전송합니다.
//! Results come back one per operation, in submission order.

use crate::error::DynxResult;
use crate::storage::{DataConnection, OpResult, Operation};

/// 파이프라인 연산 로그
#[derive(Debug, Default)]
pub struct BatchPipeline {
    ops: Vec<Operation>,
}

impl BatchPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    /// Queued operations not yet submitted.
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations, for rewriting before they are sent.
    pub fn ops_mut(&mut self) -> std::slice::IterMut<'_, Operation> {
        self.ops.iter_mut()
    }

    /// Sends every queued operation in one round trip and empties the log.
    ///
    /// An empty pipeline never touches the connection.
    pub fn submit(&mut self, conn: &mut dyn DataConnection) -> DynxResult<Vec<OpResult>> {
        if self.ops.is_empty() {
            return Ok(Vec::new());
        }
        let ops = std::mem::take(&mut self.ops);
        conn.submit_batch(&ops)
    }
}
