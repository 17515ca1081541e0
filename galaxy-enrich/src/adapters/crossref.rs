//! Crossref per-DOI lookup
//!
//! Used only to fill empty bibliographic fields of works that already have a DOI.

use super::http::{or_empty, HttpFetcher};
use super::{array_at, text_at, WorkEnricher};
use crate::services::text_normalizer::normalize_doi;
use crate::types::{RecordSource, WorkRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct CrossrefClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl CrossrefClient {
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WorkEnricher for CrossrefClient {
    async fn enrich(&self, doi: &str) -> Option<WorkRecord> {
        let doi = normalize_doi(doi)?;
        let url = format!("{}/works/{}", self.base_url, doi);
        let body = or_empty(self.fetcher.get_json(&url, &[]).await, "crossref", "work");
        body.get("message").and_then(|message| work_from_crossref(message, &doi))
    }
}

pub(crate) fn work_from_crossref(message: &Value, doi: &str) -> Option<WorkRecord> {
    if !message.is_object() {
        return None;
    }
    let first = |pointer: &str| {
        array_at(message, pointer)
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    };
    let year = ["/issued/date-parts", "/published/date-parts", "/created/date-parts"]
        .iter()
        .find_map(|pointer| {
            message
                .pointer(&format!("{}/0/0", pointer))
                .and_then(Value::as_i64)
                .filter(|y| (1..=9999).contains(y))
        })
        .map(|y| y as i32);
    let authors = array_at(message, "/author")
        .iter()
        .map(|a| {
            [text_at(a, "/given"), text_at(a, "/family")]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|n| !n.is_empty())
        .collect();

    Some(WorkRecord {
        title: first("/title"),
        authors,
        venue: first("/container-title"),
        year,
        doi: Some(doi.to_string()),
        citation_count: message
            .get("is-referenced-by-count")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .max(0),
        url: text_at(message, "/URL"),
        volume: text_at(message, "/volume"),
        issue: text_at(message, "/issue"),
        pages: text_at(message, "/page"),
        source: RecordSource::Crossref,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_crossref_message_mapping() {
        let message = json!({
            "title": ["Sketch of the Analytical Engine"],
            "container-title": ["", "Scientific Memoirs"],
            "issued": {"date-parts": [[1843, 10]]},
            "URL": "https://doi.org/10.1000/ae",
            "volume": "3",
            "issue": "29",
            "page": "666-731",
            "is-referenced-by-count": 17,
            "author": [{"given": "Ada", "family": "Lovelace"}, {"family": "Menabrea"}]
        });
        let work = work_from_crossref(&message, "10.1000/ae").unwrap();
        assert_eq!(work.venue, "Scientific Memoirs");
        assert_eq!(work.year, Some(1843));
        assert_eq!(work.pages, "666-731");
        assert_eq!(work.authors, vec!["Ada Lovelace", "Menabrea"]);
        assert_eq!(work.citation_count, 17);
        assert_eq!(work.source, RecordSource::Crossref);
    }

    #[test]
    fn test_missing_date_parts() {
        let work = work_from_crossref(&json!({"issued": {"date-parts": [[null]]}}), "10.1/x").unwrap();
        assert_eq!(work.year, None);
        assert!(work_from_crossref(&json!(null), "10.1/x").is_none());
    }
}
