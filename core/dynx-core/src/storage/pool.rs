//! Connection pool — fixed capacity, blocking, FIFO-fair checkout
//!
//! Checkout blocks until a connection is idle; there is no timeout. Waiters
//! take a ticket and are served strictly in ticket order.

use crate::error::{DynxError, DynxResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total checkouts.
    pub checkouts: u64,
    /// Total check-ins.
    pub checkins: u64,
    /// Checkouts that had to wait for a connection.
    pub waits: u64,
}

struct PoolState<C> {
    idle: VecDeque<C>,
    next_ticket: u64,
    now_serving: u64,
    stats: PoolStats,
}

/// 고정 크기 커넥션 풀
pub struct ConnectionPool<C> {
    name: &'static str,
    capacity: usize,
    state: Mutex<PoolState<C>>,
    available: Condvar,
}

impl<C> ConnectionPool<C> {
    /// Creates a pool owning `connections`.
    pub fn new(name: &'static str, connections: Vec<C>) -> DynxResult<Self> {
        if connections.is_empty() {
            return Err(DynxError::Config(format!(
                "pool '{name}' needs at least one connection"
            )));
        }
        Ok(Self {
            name,
            capacity: connections.len(),
            state: Mutex::new(PoolState {
                idle: connections.into(),
                next_ticket: 0,
                now_serving: 0,
                stats: PoolStats::default(),
            }),
            available: Condvar::new(),
        })
    }

    /// Opens `size` connections with `connect` and pools them.
    pub fn build<F>(name: &'static str, size: usize, mut connect: F) -> DynxResult<Self>
    where
        F: FnMut() -> DynxResult<C>,
    {
        let connections = (0..size)
            .map(|_| connect())
            .collect::<DynxResult<Vec<_>>>()?;
        Self::new(name, connections)
    }

    /// 커넥션을 대여합니다. 사용 가능한 커넥션이 생길 때까지 블록됩니다.
    pub fn checkout(&self) -> PooledConnection<'_, C> {
        let mut state = self.state.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        if ticket != state.now_serving || state.idle.is_empty() {
            state.stats.waits += 1;
            debug!(pool = self.name, ticket, "waiting for connection");
        }
        while ticket != state.now_serving || state.idle.is_empty() {
            self.available.wait(&mut state);
        }

        let conn = state.idle.pop_front();
        state.now_serving += 1;
        state.stats.checkouts += 1;
        drop(state);
        // the next ticket holder may already be satisfiable
        self.available.notify_all();

        PooledConnection { pool: self, conn }
    }

    fn checkin(&self, conn: C) {
        let mut state = self.state.lock();
        state.idle.push_back(conn);
        state.stats.checkins += 1;
        drop(state);
        self.available.notify_all();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Connections currently checked in.
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }
}

/// 대여된 커넥션. drop 시 풀에 반환됩니다.
pub struct PooledConnection<'a, C> {
    pool: &'a ConnectionPool<C>,
    conn: Option<C>,
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        // only None while dropping
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn);
        }
    }
}
