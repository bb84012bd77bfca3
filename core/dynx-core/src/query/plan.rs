//! Scan planning — filter folding onto the leading index column
//!
//! 읽기는 항상 하나의 인덱스를 스캔합니다. 선행 컬럼에 대한 필터 하나를
//! 스캔 시작 키로 흡수하고, 나머지는 엔진이 행마다 평가하는 후처리 필터로
//! 남깁니다. Greedy: at most one filter is folded and filters are never
//! intersected or reordered.

use crate::query::Filter;
use crate::schema::ColumnType;
use crate::storage::{CompareOp, NULL_KEY};

/// 스캔 계획
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    /// start key (single value on the leading column)
    pub key: Vec<String>,
    pub op: CompareOp,
    /// post-scan predicates
    pub filters: Vec<Filter>,
    /// filter absorbed into `key`/`op`
    pub folded: Option<Filter>,
}

impl ScanPlan {
    /// Default "from the minimum" start for a leading column of `leading_type`.
    ///
    /// Text-like and unknown columns start after the null key, numeric ones at
    /// `i64::MIN` inclusive.
    pub fn full_scan(leading_type: Option<ColumnType>) -> Self {
        match leading_type {
            Some(t) if t.is_numeric() => Self {
                key: vec![i64::MIN.to_string()],
                op: CompareOp::Ge,
                filters: Vec::new(),
                folded: None,
            },
            _ => Self {
                key: vec![NULL_KEY.to_string()],
                op: CompareOp::Gt,
                filters: Vec::new(),
                folded: None,
            },
        }
    }

    /// Whether a filter was folded into the start key.
    pub fn is_folded(&self) -> bool {
        self.folded.is_some()
    }
}

/// Builds the plan for a scan whose leading index identifier is `leading`.
///
/// `filters` must already be hash-rewritten, so a filter on a long-string
/// column names its `hash_` identifier and can match a hashed leading column.
pub fn plan_scan(leading: &str, leading_type: Option<ColumnType>, filters: Vec<Filter>) -> ScanPlan {
    let mut plan = ScanPlan::full_scan(leading_type);

    let folded = filters
        .iter()
        .position(|f| f.field == leading && f.op != CompareOp::Ne);

    let mut residual = filters;
    if let Some(pos) = folded {
        let filter = residual.remove(pos);
        plan.key = vec![filter.value.clone()];
        plan.op = filter.op;
        plan.folded = Some(filter);
    }
    plan.filters = residual;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(expr: &str) -> Filter {
        Filter::parse(expr).unwrap()
    }

    #[test]
    fn test_full_scan_sentinels() {
        let numeric = ScanPlan::full_scan(Some(ColumnType::Int));
        assert_eq!(numeric.key, vec![i64::MIN.to_string()]);
        assert_eq!(numeric.op, CompareOp::Ge);
        assert!(!numeric.is_folded());

        let hashed = ScanPlan::full_scan(Some(ColumnType::Hash));
        assert_eq!(hashed.key, vec![NULL_KEY.to_string()]);
        assert_eq!(hashed.op, CompareOp::Gt);

        assert_eq!(ScanPlan::full_scan(None).op, CompareOp::Gt);
    }

    #[test]
    fn test_folds_leading_filter() {
        let plan = plan_scan("tid", Some(ColumnType::Int), vec![f("collect=0"), f("tid>50")]);
        assert_eq!(plan.key, vec!["50".to_string()]);
        assert_eq!(plan.op, CompareOp::Gt);
        assert_eq!(plan.filters, vec![f("collect=0")]);
        assert!(plan.is_folded());
    }

    #[test]
    fn test_not_equal_is_never_folded() {
        let plan = plan_scan("tid", Some(ColumnType::Int), vec![f("tid!=3")]);
        assert!(!plan.is_folded());
        assert_eq!(plan.filters.len(), 1);
    }

    #[test]
    fn test_only_first_candidate_folded() {
        let plan = plan_scan("n", Some(ColumnType::Int), vec![f("n>=2"), f("n<8")]);
        assert_eq!(plan.key, vec!["2".to_string()]);
        assert_eq!(plan.op, CompareOp::Ge);
        assert_eq!(plan.filters, vec![f("n<8")]);
    }

    #[test]
    fn test_non_leading_filters_stay_residual() {
        let plan = plan_scan("id", Some(ColumnType::Int), vec![f("time=1000")]);
        assert!(!plan.is_folded());
        assert_eq!(plan.filters, vec![f("time=1000")]);
    }

    #[test]
    fn test_folds_hashed_leading_column() {
        let filter = Filter::new("hash_key2", CompareOp::Eq, "abc");
        let plan = plan_scan("hash_key2", Some(ColumnType::Hash), vec![filter]);
        assert_eq!(plan.key, vec!["abc".to_string()]);
        assert_eq!(plan.op, CompareOp::Eq);
        assert!(plan.filters.is_empty());
    }
}
