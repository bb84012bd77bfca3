//! Query translation — filters, scan plans and index specs
//!
//! ```text
//! "tid>50", "collect=0" → parse → hash rewrite → plan_scan → GetRequest
//! ```

pub mod filter;
pub mod plan;
pub mod spec;

pub use filter::{Filter, parse_filters};
pub use plan::{ScanPlan, plan_scan};
pub use spec::{ReadSpec, parse_index_columns, split_columns};
