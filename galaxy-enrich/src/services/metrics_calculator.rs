//! Citation metrics
//!
//! h-index: largest h such that h works have at least h citations each.
//! i10-index: works with at least 10 citations.

use crate::types::{CitationMetrics, WorkRecord};
use serde_json::Value;

/// Threshold for the i10-index
const I10_THRESHOLD: i64 = 10;

/// Citation count from loosely-typed JSON
///
/// Accepts integers, floats (truncated), and strings with thousands
/// separators. Missing, negative, or unparseable values count as 0.
pub fn coerce_citation_count(value: &Value) -> i64 {
    let count = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    };
    count.max(0)
}

/// Metrics over raw citation counts (negative counts as 0)
pub fn compute_metrics<I>(counts: I) -> CitationMetrics
where
    I: IntoIterator<Item = i64>,
{
    let mut counts: Vec<i64> = counts.into_iter().map(|c| c.max(0)).collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));

    let total_citations = counts.iter().map(|&c| c as u64).sum();
    let h_index = counts
        .iter()
        .enumerate()
        .take_while(|&(i, &c)| c >= (i as i64) + 1)
        .count() as u32;
    let i10_index = counts.iter().filter(|&&c| c >= I10_THRESHOLD).count() as u32;

    CitationMetrics {
        total_citations,
        h_index,
        i10_index,
    }
}

/// Metrics for a publication list
pub fn metrics_for_works<'a, I>(works: I) -> CitationMetrics
where
    I: IntoIterator<Item = &'a WorkRecord>,
{
    compute_metrics(works.into_iter().map(|w| w.citation_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_h_index_examples() {
        assert_eq!(compute_metrics([10, 8, 5, 4, 3]).h_index, 4);
        assert_eq!(compute_metrics([25, 8, 5, 3, 3]).h_index, 3);
        assert_eq!(compute_metrics([0, 0, 0]).h_index, 0);
        assert_eq!(compute_metrics(Vec::<i64>::new()).h_index, 0);
    }

    #[test]
    fn test_totals_and_i10() {
        let metrics = compute_metrics([10, 8, 5, 4, 3, 12]);
        assert_eq!(metrics.total_citations, 42);
        assert_eq!(metrics.i10_index, 2);
        assert_eq!(metrics.h_index, 4);
    }

    #[test]
    fn test_negative_counts_treated_as_zero() {
        let metrics = compute_metrics([-5, 1]);
        assert_eq!(metrics.total_citations, 1);
        assert_eq!(metrics.h_index, 1);
    }

    #[test]
    fn test_h_index_ignores_input_order() {
        let a = compute_metrics([3, 25, 5, 3, 8]);
        let b = compute_metrics([25, 8, 5, 3, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coerce_citation_count() {
        assert_eq!(coerce_citation_count(&json!(42)), 42);
        assert_eq!(coerce_citation_count(&json!(42.9)), 42);
        assert_eq!(coerce_citation_count(&json!("1,204")), 1204);
        assert_eq!(coerce_citation_count(&json!(" 7 ")), 7);
        assert_eq!(coerce_citation_count(&json!(-3)), 0);
        assert_eq!(coerce_citation_count(&json!("n/a")), 0);
        assert_eq!(coerce_citation_count(&json!(null)), 0);
    }

    #[test]
    fn test_metrics_for_works() {
        let works: Vec<WorkRecord> = [4, 4, 1]
            .iter()
            .map(|&c| WorkRecord {
                citation_count: c,
                ..Default::default()
            })
            .collect();
        let metrics = metrics_for_works(&works);
        assert_eq!(metrics.h_index, 2);
        assert_eq!(metrics.total_citations, 9);
    }
}
