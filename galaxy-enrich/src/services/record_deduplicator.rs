//! Record Deduplication
//!
//! Collapses records describing the same real-world item. First-seen order is
//! preserved and later collisions are dropped, so output depends only on input
//! order.

use crate::services::text_normalizer::{normalize_doi, normalize_title};
use crate::types::{NormalizedTitle, PatentRecord, WorkRecord};
use std::collections::HashSet;
use std::hash::Hash;

/// Identity key for publications
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PublicationKey {
    /// Normalized DOI
    Doi(String),
    /// Normalized title plus year (empty when unknown)
    TitleYear(NormalizedTitle, String),
}

/// Identity key for patents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatentKey {
    /// Normalized patent/publication number
    Number(String),
    /// Normalized title plus filing date
    TitleFiled(NormalizedTitle, String),
}

/// DOI if present, else `(normalized_title, year-or-empty)`
pub fn publication_key(work: &WorkRecord) -> PublicationKey {
    if let Some(doi) = work.doi.as_deref().and_then(normalize_doi) {
        return PublicationKey::Doi(doi);
    }
    PublicationKey::TitleYear(
        normalize_title(&work.title),
        work.year.map(|y| y.to_string()).unwrap_or_default(),
    )
}

/// Patent number if present, else `(normalized_title, filed_date)`
pub fn patent_key(patent: &PatentRecord) -> PatentKey {
    let number = normalize_patent_number(&patent.number);
    if !number.is_empty() {
        return PatentKey::Number(number);
    }
    PatentKey::TitleFiled(normalize_title(&patent.title), patent.filed.trim().to_string())
}

/// Lowercased with whitespace removed (`"US 10,123,456 B2"` → `"us10,123,456b2"`)
pub fn normalize_patent_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Keep the first record for each key, in input order
pub fn dedupe<T, K, F>(records: Vec<T>, key_fn: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(records.len());
    let before = records.len();
    let kept: Vec<T> = records
        .into_iter()
        .filter(|record| seen.insert(key_fn(record)))
        .collect();

    if kept.len() < before {
        tracing::debug!(
            before,
            after = kept.len(),
            "Dropped duplicate records"
        );
    }
    kept
}

pub fn dedupe_publications(works: Vec<WorkRecord>) -> Vec<WorkRecord> {
    dedupe(works, publication_key)
}

pub fn dedupe_patents(patents: Vec<PatentRecord>) -> Vec<PatentRecord> {
    dedupe(patents, patent_key)
}
