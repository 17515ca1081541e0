//! Bounded string similarity (0-100)
//!
//! Primary signal is a token-set comparison: order-insensitive, 100 only for
//! identical token sets, 0 when no token is shared. Order-sensitive and
//! substring variants are available for callers that take the maximum.
//! All scores are symmetric and deterministic.

use crate::services::text_normalizer::fold_text;
use std::collections::BTreeSet;

/// All variants for one pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityReport {
    pub token_set: u8,
    pub ordered: u8,
    pub partial: u8,
}

impl SimilarityReport {
    pub fn best(&self) -> u8 {
        self.token_set.max(self.ordered).max(self.partial)
    }
}

/// Token-set similarity of two strings
///
/// Sorted intersection `t0`, plus `t1 = t0 + (a − b)` and `t2 = t0 + (b − a)`;
/// the score is the best pairwise edit similarity among them. A strict
/// subset scores 99, not 100.
pub fn similarity(a: &str, b: &str) -> u8 {
    let a = fold_text(a);
    let b = fold_text(b);
    token_set_folded(&a, &b)
}

/// Whole-string edit similarity (token order matters)
pub fn ordered_similarity(a: &str, b: &str) -> u8 {
    let a = fold_text(a);
    let b = fold_text(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(strsim::normalized_levenshtein(&a, &b))
}

/// Best alignment of the shorter string inside the longer one
pub fn partial_similarity(a: &str, b: &str) -> u8 {
    let a = fold_text(a);
    let b = fold_text(b);
    partial_folded(&a, &b)
}

/// Maximum across all variants
pub fn best_similarity(a: &str, b: &str) -> u8 {
    report(a, b).best()
}

/// Every variant at once (folds each input only once)
pub fn report(a: &str, b: &str) -> SimilarityReport {
    let a = fold_text(a);
    let b = fold_text(b);
    let ordered = if a.is_empty() || b.is_empty() {
        0
    } else {
        to_score(strsim::normalized_levenshtein(&a, &b))
    };
    SimilarityReport {
        token_set: token_set_folded(&a, &b),
        ordered,
        partial: partial_folded(&a, &b),
    }
}

fn token_set_folded(a: &str, b: &str) -> u8 {
    let tokens_a: BTreeSet<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let tokens_b: BTreeSet<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    if common.is_empty() {
        return 0;
    }
    if tokens_a == tokens_b {
        return 100;
    }

    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let t0 = common.join(" ");
    let t1 = join_non_empty(&t0, &only_a.join(" "));
    let t2 = join_non_empty(&t0, &only_b.join(" "));

    let best = strsim::normalized_levenshtein(&t0, &t1)
        .max(strsim::normalized_levenshtein(&t0, &t2))
        .max(strsim::normalized_levenshtein(&t1, &t2));
    to_score(best).min(99)
}

fn partial_folded(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if long.contains(short) {
        return 100;
    }

    let short_len = short.chars().count();
    let bounds: Vec<usize> = long
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(long.len()))
        .collect();

    let mut best = 0.0_f64;
    for start in 0..bounds.len().saturating_sub(short_len) {
        let window = &long[bounds[start]..bounds[start + short_len]];
        let score = strsim::normalized_levenshtein(short, window);
        if score > best {
            best = score;
        }
    }
    to_score(best)
}

fn join_non_empty(head: &str, tail: &str) -> String {
    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{} {}", head, tail)
    }
}

fn to_score(ratio: f64) -> u8 {
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_token_sets_score_100() {
        assert_eq!(similarity("protein folding deep", "Deep Protein Folding"), 100);
    }

    #[test]
    fn test_no_shared_tokens_score_0() {
        assert_eq!(similarity("graph neural networks", "protein folding"), 0);
        assert_eq!(similarity("", "anything"), 0);
        assert_eq!(similarity("", ""), 0);
    }

    #[test]
    fn test_subset_scores_high_but_not_100() {
        let score = similarity("deep learning", "deep learning for protein folding");
        assert!(score >= 90 && score < 100, "score was {}", score);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ("Attention is all you need", "attention is what you need"),
            ("A B C", "C D"),
            ("MIT CSAIL", "Massachusetts Institute of Technology"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
            assert_eq!(ordered_similarity(a, b), ordered_similarity(b, a));
            assert_eq!(partial_similarity(a, b), partial_similarity(b, a));
        }
    }

    #[test]
    fn test_ordered_variant_sensitive_to_order() {
        let a = "learning deep";
        let b = "deep learning";
        assert_eq!(similarity(a, b), 100);
        assert!(ordered_similarity(a, b) < 100);
    }

    #[test]
    fn test_partial_finds_substring() {
        assert_eq!(
            partial_similarity("Stanford University", "Dept. of CS, Stanford University, CA"),
            100
        );
        assert!(partial_similarity("Stanford Univ", "Stanford University") >= 90);
    }

    #[test]
    fn test_best_is_max_of_variants() {
        let r = report("University of Toronto", "Department of Physics, University of Toronto");
        assert_eq!(r.best(), r.token_set.max(r.ordered).max(r.partial));
        assert_eq!(best_similarity("University of Toronto", "Department of Physics, University of Toronto"), 100);
    }
}
