//! Logging utilities for DYNX
//!
//! Helpers for installing a tracing subscriber. What the crate emits:
//!
//! - `info`: every DDL statement (`executing DDL`) and each backfill
//!   (`hash column backfilled`, with table, column and row count)
//! - `warn`: DDL errors absorbed after a concurrent change, batch cursors
//!   dropped with queued operations, a failed metadata-cache resume
//! - `debug`: metadata-cache toggles, scan plans, cursor open/close and
//!   batch commits
//!
//! `ensure_table`, `ensure_column`, `ensure_hash_column` and `ensure_index`
//! run inside spans named after themselves, so a backfill shows up under the
//! index or filter that triggered it. `RUST_LOG=dynx_core=info` is usually
//! enough to audit what the layer did to a database.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Installs an `info` subscriber; `RUST_LOG` overrides the level.
///
/// # Example
/// ```rust
/// dynx_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("info")
}

/// Installs a subscriber filtered at `level` unless `RUST_LOG` is set.
///
/// A second call is a no-op; the first subscriber stays installed.
///
/// # Example
/// ```rust
/// dynx_core::logging::init_with_level("debug");
/// ```
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .try_init();
}

/// Debug-level subscriber writing through the test harness capture.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// without the `logging` feature the subscriber helpers do nothing
#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}
