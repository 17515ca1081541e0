//! Record Merging
//!
//! Merges partial records from several sources:
//! - Scalars: primary wins unless empty or a placeholder, then secondary
//! - Lists: primary order, then unseen secondary items in secondary order
//! - Maps/objects: key-by-key with the same rules
//!
//! Merge strategy per field is expressed through the [`Merge`] trait so nested
//! structures compose without per-field special cases.

use crate::services::record_deduplicator::{dedupe_publications, patent_key};
use crate::services::text_normalizer::{normalize_doi, normalize_title};
use crate::types::{NormalizedTitle, Profile, WorkRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;

/// Values treated as "unset" besides the empty string
#[derive(Debug, Clone)]
pub struct MergePolicy {
    placeholders: Vec<String>,
}

impl MergePolicy {
    pub fn new(placeholders: impl IntoIterator<Item = String>) -> Self {
        Self {
            placeholders: placeholders
                .into_iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Empty, whitespace-only, or a placeholder (case-insensitive)
    pub fn is_unset(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || self
                .placeholders
                .iter()
                .any(|p| p.eq_ignore_ascii_case(trimmed))
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::new(["pending input".to_string()])
    }
}

/// Field-wise "non-empty wins" merge
pub trait Merge: Sized {
    fn merge(self, secondary: Self, policy: &MergePolicy) -> Self;
}

impl Merge for String {
    fn merge(self, secondary: Self, policy: &MergePolicy) -> Self {
        if !policy.is_unset(&self) || policy.is_unset(&secondary) {
            self
        } else {
            secondary
        }
    }
}

impl Merge for i64 {
    fn merge(self, secondary: Self, _policy: &MergePolicy) -> Self {
        if self != 0 {
            self
        } else {
            secondary
        }
    }
}

impl<T: Merge> Merge for Option<T> {
    fn merge(self, secondary: Self, policy: &MergePolicy) -> Self {
        match (self, secondary) {
            (Some(a), Some(b)) => Some(a.merge(b, policy)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }
}

impl Merge for i32 {
    fn merge(self, secondary: Self, _policy: &MergePolicy) -> Self {
        if self != 0 {
            self
        } else {
            secondary
        }
    }
}

impl Merge for Vec<String> {
    fn merge(self, secondary: Self, policy: &MergePolicy) -> Self {
        let secondary = secondary
            .into_iter()
            .filter(|s| !policy.is_unset(s))
            .collect();
        merge_list(self, secondary, |s: &String| s.trim().to_string())
    }
}

impl<V: Merge> Merge for BTreeMap<String, V> {
    fn merge(mut self, secondary: Self, policy: &MergePolicy) -> Self {
        for (key, value) in secondary {
            let merged = match self.remove(&key) {
                Some(existing) => existing.merge(value, policy),
                None => value,
            };
            self.insert(key, merged);
        }
        self
    }
}

impl Merge for serde_json::Value {
    fn merge(self, secondary: Self, policy: &MergePolicy) -> Self {
        use serde_json::Value;

        match (self, secondary) {
            (Value::Object(primary), Value::Object(secondary)) => {
                let mut merged = primary;
                for (key, value) in secondary {
                    let next = match merged.remove(&key) {
                        Some(existing) => existing.merge(value, policy),
                        None => value,
                    };
                    merged.insert(key, next);
                }
                Value::Object(merged)
            }
            (Value::Array(primary), Value::Array(secondary)) => {
                Value::Array(merge_list(primary, secondary, |v: &Value| v.to_string()))
            }
            (primary, secondary) => {
                if is_unset_value(&primary, policy) && !is_unset_value(&secondary, policy) {
                    secondary
                } else {
                    primary
                }
            }
        }
    }
}

fn is_unset_value(value: &serde_json::Value, policy: &MergePolicy) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => true,
        Value::String(s) => policy.is_unset(s),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Primary items in order, then secondary items whose key is not yet present
pub fn merge_list<T, K, F>(primary: Vec<T>, secondary: Vec<T>, dedupe_key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = primary.iter().map(&dedupe_key).collect();
    let mut merged = primary;
    for item in secondary {
        if seen.insert(dedupe_key(&item)) {
            merged.push(item);
        }
    }
    merged
}

/// Merge two profiles with the default placeholder policy
pub fn merge_profile(primary: Profile, secondary: Profile) -> Profile {
    merge_profile_with(primary, secondary, &MergePolicy::default())
}

/// Merge two profiles field-by-field
pub fn merge_profile_with(primary: Profile, secondary: Profile, policy: &MergePolicy) -> Profile {
    Profile {
        name: primary.name.merge(secondary.name, policy),
        photo_url: primary.photo_url.merge(secondary.photo_url, policy),
        affiliations: primary.affiliations.merge(secondary.affiliations, policy),
        research_areas: primary.research_areas.merge(secondary.research_areas, policy),
        positions: primary.positions.merge(secondary.positions, policy),
        education: primary.education.merge(secondary.education, policy),
        memberships: primary.memberships.merge(secondary.memberships, policy),
        keywords: primary.keywords.merge(secondary.keywords, policy),
        social_media: primary.social_media.merge(secondary.social_media, policy),
        patents: merge_list(primary.patents, secondary.patents, patent_key),
        extra: primary.extra.merge(secondary.extra, policy),
    }
}

/// Fill the empty fields of `primary` from `secondary`
///
/// Citation counts take the larger value (directories lag each other).
pub fn merge_work(primary: WorkRecord, secondary: WorkRecord, policy: &MergePolicy) -> WorkRecord {
    let authors = if primary.authors.is_empty() {
        secondary.authors
    } else {
        primary.authors
    };
    WorkRecord {
        title: primary.title.merge(secondary.title, policy),
        authors,
        venue: primary.venue.merge(secondary.venue, policy),
        year: primary.year.merge(secondary.year, policy),
        doi: primary.doi.merge(secondary.doi, policy),
        citation_count: primary.citation_count.max(secondary.citation_count).max(0),
        url: primary.url.merge(secondary.url, policy),
        volume: primary.volume.merge(secondary.volume, policy),
        issue: primary.issue.merge(secondary.issue, policy),
        pages: primary.pages.merge(secondary.pages, policy),
        source: primary.source,
    }
}

/// Reconcile two publication lists
///
/// The primary list is deduplicated first. A secondary work is folded into a
/// primary one with [`merge_work`] when their DOIs agree, or when their titles
/// and years agree and at least one of them has no DOI; two works carrying
/// different DOIs are never merged. The rest are appended in secondary order.
pub fn merge_publications(
    primary: Vec<WorkRecord>,
    secondary: Vec<WorkRecord>,
    policy: &MergePolicy,
) -> Vec<WorkRecord> {
    let mut merged = dedupe_publications(primary);
    let mut index = PublicationIndex::default();
    for (i, work) in merged.iter().enumerate() {
        index.insert(work, i);
    }

    for work in secondary {
        match index.find(&work, &merged) {
            Some(i) => {
                let current = std::mem::take(&mut merged[i]);
                merged[i] = merge_work(current, work, policy);
                index.insert(&merged[i], i);
            }
            None => {
                index.insert(&work, merged.len());
                merged.push(work);
            }
        }
    }
    dedupe_publications(merged)
}

/// Positions of merged works by DOI and by title+year
#[derive(Default)]
struct PublicationIndex {
    by_doi: HashMap<String, usize>,
    by_title: HashMap<(NormalizedTitle, Option<i32>), Vec<usize>>,
}

impl PublicationIndex {
    fn insert(&mut self, work: &WorkRecord, i: usize) {
        if let Some(doi) = work.doi.as_deref().and_then(normalize_doi) {
            self.by_doi.entry(doi).or_insert(i);
        }
        if let Some(key) = title_year(work) {
            let slots = self.by_title.entry(key).or_default();
            if !slots.contains(&i) {
                slots.push(i);
            }
        }
    }

    /// DOI match first, then the earliest title+year match that does not
    /// contradict the work's DOI
    fn find(&self, work: &WorkRecord, merged: &[WorkRecord]) -> Option<usize> {
        let doi = work.doi.as_deref().and_then(normalize_doi);
        if let Some(&i) = doi.as_ref().and_then(|d| self.by_doi.get(d)) {
            return Some(i);
        }
        let slots = self.by_title.get(&title_year(work)?)?;
        slots.iter().copied().find(|&i| {
            doi.is_none() || merged[i].doi.as_deref().and_then(normalize_doi).is_none()
        })
    }
}

fn title_year(work: &WorkRecord) -> Option<(NormalizedTitle, Option<i32>)> {
    let title = normalize_title(&work.title);
    (!title.is_empty()).then_some((title, work.year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatentRecord, RecordSource};
    use serde_json::json;

    fn named(name: &str) -> Profile {
        Profile {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_placeholder_name_replaced() {
        let merged = merge_profile(named("pending input"), named("Ada Lovelace"));
        assert_eq!(merged.name, "Ada Lovelace");
    }

    #[test]
    fn test_non_empty_primary_wins() {
        let merged = merge_profile(named("Ada"), named("Grace"));
        assert_eq!(merged.name, "Ada");
    }

    #[test]
    fn test_placeholder_kept_when_secondary_empty() {
        let merged = merge_profile(named("Pending Input"), named(""));
        assert_eq!(merged.name, "Pending Input");
    }

    #[test]
    fn test_list_merge_preserves_order_and_dedupes() {
        let mut primary = named("Ada");
        primary.affiliations = vec!["Univ A".into(), "Univ B".into()];
        let mut secondary = named("");
        secondary.affiliations = vec!["Univ C".into(), "Univ A".into(), "".into(), "Univ D".into(), "Univ C".into()];

        let merged = merge_profile(primary, secondary);
        assert_eq!(merged.affiliations, vec!["Univ A", "Univ B", "Univ C", "Univ D"]);
    }

    #[test]
    fn test_nested_maps_merge_key_by_key() {
        let mut primary = named("Ada");
        primary.social_media.insert("LinkedIn".into(), "pending input".into());
        primary.social_media.insert("X".into(), "@ada".into());
        let mut secondary = named("");
        secondary.social_media.insert("LinkedIn".into(), "in/ada".into());
        secondary.social_media.insert("X".into(), "@other".into());
        secondary.social_media.insert("Google Scholar".into(), "scholar/ada".into());

        let merged = merge_profile(primary, secondary);
        assert_eq!(merged.social_media["LinkedIn"], "in/ada");
        assert_eq!(merged.social_media["X"], "@ada");
        assert_eq!(merged.social_media["Google Scholar"], "scholar/ada");
    }

    #[test]
    fn test_json_value_merge_recurses() {
        let policy = MergePolicy::default();
        let primary = json!({"a": {"b": "", "c": "keep"}, "list": [1, 2], "n": null});
        let secondary = json!({"a": {"b": "fill", "c": "drop", "d": 4}, "list": [2, 3], "n": 5});
        let merged = primary.merge(secondary, &policy);
        assert_eq!(
            merged,
            json!({"a": {"b": "fill", "c": "keep", "d": 4}, "list": [1, 2, 3], "n": 5})
        );
    }

    #[test]
    fn test_profile_patents_merge_by_key() {
        let patent = |t: &str, n: &str| PatentRecord {
            title: t.into(),
            number: n.into(),
            ..Default::default()
        };
        let mut primary = named("Ada");
        primary.patents = vec![patent("Engine", "US1 B1")];
        let mut secondary = named("");
        secondary.patents = vec![patent("Engine v2", "us1b1"), patent("Loom", "US2 A1")];
        let merged = merge_profile(primary, secondary);
        assert_eq!(merged.patents.len(), 2);
        assert_eq!(merged.patents[0].title, "Engine");
        assert_eq!(merged.patents[1].title, "Loom");
    }

    #[test]
    fn test_merge_publications_folds_matching_records() {
        let policy = MergePolicy::default();
        let evidence = WorkRecord {
            title: "Analytical Engines".into(),
            year: Some(1843),
            citation_count: 3,
            ..Default::default()
        };
        let fetched = WorkRecord {
            title: "Analytical engines: notes".into(),
            year: Some(1843),
            doi: Some("10.1/ae".into()),
            venue: "Taylor's Scientific Memoirs".into(),
            citation_count: 120,
            source: RecordSource::OpenAlex,
            ..Default::default()
        };
        let other = WorkRecord {
            title: "Bernoulli Numbers".into(),
            year: Some(1843),
            source: RecordSource::OpenAlex,
            ..Default::default()
        };

        let merged = merge_publications(vec![evidence], vec![fetched, other], &policy);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "Analytical Engines");
        assert_eq!(merged[0].doi.as_deref(), Some("10.1/ae"));
        assert_eq!(merged[0].venue, "Taylor's Scientific Memoirs");
        assert_eq!(merged[0].citation_count, 120);
        assert_eq!(merged[0].source, RecordSource::Evidence);
        assert_eq!(merged[1].title, "Bernoulli Numbers");
    }

    fn titled(title: &str, year: Option<i32>, doi: Option<&str>) -> WorkRecord {
        WorkRecord {
            title: title.into(),
            year,
            doi: doi.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_publications_dedupes_primary_dois() {
        let policy = MergePolicy::default();
        let merged = merge_publications(
            vec![
                titled("Deep nets", Some(2020), Some("10.1/x")),
                titled("Deep nets (preprint)", Some(2019), Some("https://doi.org/10.1/X")),
            ],
            vec![titled("Other paper here", Some(2021), None)],
            &policy,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "Deep nets");
        assert_eq!(merged[1].title, "Other paper here");
    }

    #[test]
    fn test_same_title_with_different_dois_kept_apart() {
        let policy = MergePolicy::default();
        let merged = merge_publications(
            vec![titled("Introduction", Some(2020), Some("10.1/a"))],
            vec![
                titled("Introduction", Some(2020), Some("10.1/b")),
                titled("Introduction", Some(2020), None),
            ],
            &policy,
        );
        let dois: Vec<Option<&str>> = merged.iter().map(|w| w.doi.as_deref()).collect();
        assert_eq!(dois, vec![Some("10.1/a"), Some("10.1/b")]);
    }

    #[test]
    fn test_title_match_fills_missing_doi() {
        let policy = MergePolicy::default();
        let merged = merge_publications(
            vec![titled("Notes on engines", Some(1843), None), titled("Notes on engines", Some(1843), Some("10.1/n"))],
            vec![titled("Notes on Engines", Some(1843), Some("10.1/m"))],
            &policy,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].doi.as_deref(), Some("10.1/m"));
        assert_eq!(merged[1].doi.as_deref(), Some("10.1/n"));
    }

    #[test]
    fn test_merge_publications_is_idempotent() {
        let policy = MergePolicy::default();
        let once = merge_publications(
            vec![
                titled("Deep nets", Some(2020), Some("10.1/x")),
                titled("Deep nets", Some(2020), Some("10.1/X")),
                titled("Introduction", Some(2020), Some("10.1/a")),
            ],
            vec![
                titled("Introduction", Some(2020), Some("10.1/b")),
                titled("Survey", None, None),
                titled("survey!", None, None),
            ],
            &policy,
        );
        assert_eq!(once.len(), 4);
        assert_eq!(merge_publications(once.clone(), once.clone(), &policy), once);
        assert_eq!(merge_publications(once.clone(), Vec::new(), &policy), once);
    }

    #[test]
    fn test_merge_list_generic() {
        let merged = merge_list(vec![1, 2, 3], vec![3, 4, 1, 5], |x: &i32| *x);
        assert_eq!(merged, vec![1, 2, 3, 4, 5]);
    }
}
