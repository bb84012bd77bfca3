//! Database Engine Module

pub mod constructors;
pub mod cursor;
pub mod database;
pub mod facade;
pub mod types;

pub use cursor::{Cursor, Scan};
pub use database::{DataPool, Database};
pub use types::{CursorMode, CursorState, Key};
