//! # DYNX — Dynamic-Schema Data-Access Layer
//!
//! DYNX는 컬럼과 인덱스를 미리 선언하지 않고 관계형 테이블 스토어에 타입이 있는
//! 레코드를 저장하고 조회하는 데이터 접근 계층입니다. 테이블, 컬럼, 인덱스는
//! 처음 사용될 때 만들어지며, 스키마는 메모리에 캐시되고 DDL 이후 다시 읽힙니다.
//!
//! ## 주요 특징
//!
//! - **Schema on first use**: ensure table / column / unique index
//! - **Long-string indexing**: `hash_` 컴패니언 컬럼과 backfill
//! - **Filter folding**: 선행 인덱스 컬럼 필터를 스캔 시작 키로 흡수
//! - **Batch cursor**: 여러 쓰기를 한 번의 왕복으로 전송
//!
//! ## 빠른 시작
//!
//! ```rust
//! use dynx_core::{Database, Scan, values};
//!
//! # fn main() -> dynx_core::DynxResult<()> {
//! let db = Database::open_in_memory()?;
//!
//! // 없으면 삽입, 있으면 갱신
//! db.update_insert("thread", "tid", 1, "subject, collect", &values!["hello", 0])?;
//! db.update_insert("thread", "tid", 2, "subject, collect", &values!["world", 1])?;
//!
//! // 필터와 함께 조회
//! let subjects = db.get_map("thread", "tid, subject", &Scan::all().filter("collect=1"))?;
//! assert_eq!(subjects["2"], "world");
//! # Ok(())
//! # }
//! ```
//!
//! ## 아키텍처
//!
//! ```text
//! Facade / Cursor → Schema Evolver → Schema Cache ─▶ SqlConnection (DDL)
//!                 → Filter Translator → ScanPlan  ─▶ DataConnection (get/insert/update)
//! ```
//!
//! ## 모듈 구조
//!
//! - [`engine`] — [`Database`], [`Cursor`], facade
//! - [`schema`] — 스키마 캐시, 진화기, DDL
//! - [`query`] — 필터 파싱, 스캔 계획, 인덱스 스펙
//! - [`storage`] — 외부 커넥션 트레이트, 커넥션 풀, 인메모리 엔진
//! - [`value`] — 타입 변환

pub mod config;
pub mod engine;
pub mod error;
pub mod query;
pub mod schema;
pub mod storage;
pub mod value;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use config::DatabaseConfig;
pub use engine::{Cursor, CursorMode, CursorState, Database, Key, Scan};
pub use error::{DynxError, DynxResult};
pub use schema::{ColumnType, TableSchema};
pub use storage::memory::MemoryEngine;
pub use storage::{Connector, OpKind, OpResult, UpdateCount};
pub use value::Value;
