//! Index and field specifications as callers write them
//!
//! - write index: `"tid"` or `"itemid, time"` (composite)
//! - read spec: `"c1, c2, c3"` indexes on `c1` and projects all three;
//!   `"id$time, time"` selects the composite index `id$time` and projects
//!   only `time`

use crate::error::{DynxError, DynxResult};
use crate::schema::INDEX_SEPARATOR;

/// Splits a comma-separated column list, trimming entries and dropping empty ones.
pub fn split_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Index columns of a write, e.g. `"itemid, time"`.
pub fn parse_index_columns(spec: &str) -> DynxResult<Vec<String>> {
    let columns = split_columns(spec);
    if columns.is_empty() {
        return Err(DynxError::InvalidArguments(format!(
            "index spec '{spec}' names no column"
        )));
    }
    if let Some(c) = columns.iter().find(|c| c.contains(INDEX_SEPARATOR)) {
        return Err(DynxError::InvalidArguments(format!(
            "write index column '{c}' must not contain '{INDEX_SEPARATOR}'"
        )));
    }
    Ok(columns)
}

/// 읽기 스펙: 스캔할 인덱스 컬럼과 반환할 필드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSpec {
    /// index columns by source name
    pub index: Vec<String>,
    /// projected fields, in output order
    pub fields: Vec<String>,
}

impl ReadSpec {
    pub fn parse(spec: &str) -> DynxResult<Self> {
        let mut tokens = split_columns(spec).into_iter();
        let first = tokens.next().ok_or_else(|| {
            DynxError::InvalidArguments(format!("read spec '{spec}' is empty"))
        })?;

        if first.contains(INDEX_SEPARATOR) {
            let index: Vec<String> = first
                .split(INDEX_SEPARATOR)
                .map(str::trim)
                .map(str::to_string)
                .collect();
            if index.iter().any(String::is_empty) {
                return Err(DynxError::InvalidArguments(format!(
                    "malformed composite index selector '{first}'"
                )));
            }
            let fields: Vec<String> = tokens.collect();
            if fields.is_empty() {
                return Err(DynxError::InvalidArguments(format!(
                    "composite index selector '{first}' needs at least one field"
                )));
            }
            Ok(Self { index, fields })
        } else {
            let mut fields = vec![first.clone()];
            fields.extend(tokens);
            Ok(Self {
                index: vec![first],
                fields,
            })
        }
    }

    /// Leading field; map reads key on it.
    pub fn key_field(&self) -> &str {
        &self.fields[0]
    }
}
