//! Filter expressions — `field op value`
//!
//! 문법: `<field>(=|>=|<=|>|<|!=)<value>`. 이스케이프는 없습니다. The field
//! ends at the first operator character, everything after the operator is
//! the value (it may itself contain operator characters).

use crate::error::{DynxError, DynxResult};
use crate::schema::{TableSchema, hash, hash_column_name};
use crate::storage::CompareOp;
use std::fmt;

const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!'];

/// 구조화된 필터 조건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: CompareOp,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Parses one textual filter expression.
    pub fn parse(expr: &str) -> DynxResult<Self> {
        let invalid = |reason: &str| DynxError::InvalidFilter {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let pos = expr
            .find(OPERATOR_CHARS)
            .ok_or_else(|| invalid("missing comparison operator"))?;
        let field = expr[..pos].trim();
        if field.is_empty() {
            return Err(invalid("missing field name"));
        }

        let rest = &expr[pos..];
        // two-character operators first
        let op = [
            (">=", CompareOp::Ge),
            ("<=", CompareOp::Le),
            ("!=", CompareOp::Ne),
            ("=", CompareOp::Eq),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
        ]
        .into_iter()
        .find(|(symbol, _)| rest.starts_with(symbol));
        let (symbol, op) = op.ok_or_else(|| invalid("unknown comparison operator"))?;

        Ok(Self::new(field, op, rest[symbol.len()..].trim()))
    }

    /// Rewrites a filter on a long-string column to its `hash_` companion.
    ///
    /// Digests have no meaningful order, so ordering operators on such a
    /// column are rejected.
    pub fn hashed_for(&self, schema: &TableSchema) -> DynxResult<Self> {
        if !schema.is_hashed(&self.field) {
            return Ok(self.clone());
        }
        if self.op.is_ordering() {
            return Err(DynxError::InvalidFilter {
                expr: self.to_string(),
                reason: format!(
                    "'{}' is a long-string column; only = and != are supported",
                    self.field
                ),
            });
        }
        Ok(Self::new(
            hash_column_name(&self.field),
            self.op,
            hash::digest(&self.value),
        ))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op, self.value)
    }
}

/// 여러 필터 식을 파싱합니다.
pub fn parse_filters<S: AsRef<str>>(exprs: &[S]) -> DynxResult<Vec<Filter>> {
    exprs.iter().map(|e| Filter::parse(e.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use proptest::prelude::*;

    #[test]
    fn test_parse_each_operator() {
        let cases = [
            ("tid=5", CompareOp::Eq),
            ("tid>=5", CompareOp::Ge),
            ("tid<=5", CompareOp::Le),
            ("tid>5", CompareOp::Gt),
            ("tid<5", CompareOp::Lt),
            ("tid!=5", CompareOp::Ne),
        ];
        for (expr, op) in cases {
            let f = Filter::parse(expr).unwrap();
            assert_eq!(f, Filter::new("tid", op, "5"), "{expr}");
        }
    }

    #[test]
    fn test_value_may_contain_operators() {
        let f = Filter::parse("expr=a>=b").unwrap();
        assert_eq!(f.field, "expr");
        assert_eq!(f.op, CompareOp::Eq);
        assert_eq!(f.value, "a>=b");
    }

    #[test]
    fn test_empty_value_allowed() {
        let f = Filter::parse("subject=").unwrap();
        assert_eq!(f.value, "");
    }

    #[test]
    fn test_malformed_filters() {
        for expr in ["tid", "", "=5", "tid!5", " >3"] {
            let err = Filter::parse(expr).unwrap_err();
            assert!(matches!(err, DynxError::InvalidFilter { .. }), "{expr}");
        }
    }

    #[test]
    fn test_parse_filters_stops_at_first_error() {
        assert_eq!(parse_filters(&["a=1", "b>2"]).unwrap().len(), 2);
        assert!(parse_filters(&["a=1", "nonsense"]).is_err());
    }

    fn schema() -> TableSchema {
        let mut s = TableSchema::minimal("t");
        s.columns.insert("c1".to_string(), ColumnType::Int);
        s.columns.insert("c2".to_string(), ColumnType::LongString);
        s
    }

    #[test]
    fn test_hash_rewrite_equality() {
        let f = Filter::parse("c2=foo").unwrap().hashed_for(&schema()).unwrap();
        assert_eq!(f.field, "hash_c2");
        assert_eq!(f.op, CompareOp::Eq);
        assert_eq!(f.value, hash::digest("foo"));

        let f = Filter::parse("c2!=foo").unwrap().hashed_for(&schema()).unwrap();
        assert_eq!(f.op, CompareOp::Ne);
    }

    #[test]
    fn test_hash_rewrite_rejects_ordering() {
        let err = Filter::parse("c2>foo").unwrap().hashed_for(&schema()).unwrap_err();
        assert!(matches!(err, DynxError::InvalidFilter { .. }));
    }

    #[test]
    fn test_non_hashed_field_unchanged() {
        let f = Filter::parse("c1>3").unwrap();
        assert_eq!(f.hashed_for(&schema()).unwrap(), f);
    }

    proptest! {
        #[test]
        fn prop_display_parse_round_trip(
            field in "[a-z_][a-z0-9_]{0,12}",
            op in prop::sample::select(vec![
                CompareOp::Eq, CompareOp::Ge, CompareOp::Le,
                CompareOp::Gt, CompareOp::Lt, CompareOp::Ne,
            ]),
            value in "[A-Za-z0-9 =<>!]{0,16}",
        ) {
            let value = value.trim().to_string();
            // a value starting with '=' would merge into the operator
            prop_assume!(!value.starts_with('='));
            let filter = Filter::new(field, op, value);
            prop_assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
        }
    }
}
