//! Patent sources: PatentsView and Google Patents (through SerpAPI)

use super::http::{or_empty, HttpFetcher};
use super::{array_at, text_at, PatentSource};
use crate::services::patent_mapper::infer_status;
use crate::services::text_normalizer::normalize_name;
use crate::types::{string_list_from_value, PatentRecord};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const PATENTSVIEW_FIELDS: [&str; 5] = [
    "patent_number",
    "patent_title",
    "patent_date",
    "inventor_first_name",
    "inventor_last_name",
];
const GOOGLE_PATENTS_RESULTS: &str = "50";

pub struct PatentsViewClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl PatentsViewClient {
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn query(&self, query: &Value) -> Vec<Value> {
        let url = format!("{}/patents/query", self.base_url);
        let q = query.to_string();
        let f = json!(PATENTSVIEW_FIELDS).to_string();
        let o = json!({"per_page": 100}).to_string();
        let result = self
            .fetcher
            .get_json(&url, &[("q", q.as_str()), ("f", f.as_str()), ("o", o.as_str())])
            .await;
        array_at(&or_empty(result, "patentsview", "query"), "/patents").to_vec()
    }
}

#[async_trait]
impl PatentSource for PatentsViewClient {
    fn name(&self) -> &'static str {
        "patentsview"
    }

    async fn search_patents(&self, inventor: &str) -> Vec<PatentRecord> {
        let inventor = inventor.trim();
        if inventor.is_empty() {
            return Vec::new();
        }
        let full_text = json!({"_text_any": {"inventor_full_name": inventor}});
        let parsed = normalize_name(inventor);

        let mut items = if parsed.given.is_empty() {
            Vec::new()
        } else {
            self.query(&json!({"_and": [
                {"inventor_first_name": parsed.given},
                {"inventor_last_name": parsed.family}
            ]}))
            .await
        };
        if items.is_empty() {
            items = self.query(&full_text).await;
        }
        items.iter().filter_map(patent_from_patentsview).collect()
    }
}

pub(crate) fn patent_from_patentsview(item: &Value) -> Option<PatentRecord> {
    let number = text_at(item, "/patent_number");
    let title = text_at(item, "/patent_title");
    if number.is_empty() && title.is_empty() {
        return None;
    }
    let inventors = array_at(item, "/inventors")
        .iter()
        .map(|i| {
            [text_at(i, "/inventor_first_name"), text_at(i, "/inventor_last_name")]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|n| !n.is_empty())
        .collect();
    Some(PatentRecord {
        status: infer_status(&number),
        title,
        number,
        inventors,
        filed: text_at(item, "/patent_date"),
    })
}

pub struct GooglePatentsClient {
    fetcher: Arc<HttpFetcher>,
    search_url: String,
    api_key: String,
}

impl GooglePatentsClient {
    pub fn new(fetcher: Arc<HttpFetcher>, search_url: &str, api_key: String) -> Self {
        Self {
            fetcher,
            search_url: search_url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl PatentSource for GooglePatentsClient {
    fn name(&self) -> &'static str {
        "google_patents"
    }

    async fn search_patents(&self, inventor: &str) -> Vec<PatentRecord> {
        let inventor = inventor.trim();
        if inventor.is_empty() {
            return Vec::new();
        }
        let q = format!("inventor:\"{}\"", inventor.replace('"', ""));
        let result = self
            .fetcher
            .get_json(
                &self.search_url,
                &[
                    ("engine", "google_patents"),
                    ("q", q.as_str()),
                    ("num", GOOGLE_PATENTS_RESULTS),
                    ("api_key", self.api_key.as_str()),
                ],
            )
            .await;
        let body = or_empty(result, "google_patents", "search");
        let items = array_at(&body, "/organic_results");
        tracing::debug!(results = items.len(), "Google Patents search");
        items.iter().filter_map(patent_from_google).collect()
    }
}

pub(crate) fn patent_from_google(item: &Value) -> Option<PatentRecord> {
    let title = text_at(item, "/title");
    let mut number = text_at(item, "/publication_number");
    if number.is_empty() {
        number = text_at(item, "/patent_number");
    }
    if number.is_empty() && title.is_empty() {
        return None;
    }
    let mut filed = text_at(item, "/filing_date");
    if filed.is_empty() {
        filed = text_at(item, "/publication_date");
    }
    let inventors = item
        .get("inventors")
        .or_else(|| item.get("inventor"))
        .map(string_list_from_value)
        .unwrap_or_default();
    Some(PatentRecord {
        status: infer_status(&number),
        title,
        number,
        inventors,
        filed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatentStatus;

    #[test]
    fn test_patentsview_mapping() {
        let item = json!({
            "patent_number": "10123456",
            "patent_title": "Loom controller",
            "patent_date": "2018-11-13",
            "inventors": [{"inventor_first_name": "Ada", "inventor_last_name": "Lovelace"}]
        });
        let patent = patent_from_patentsview(&item).unwrap();
        assert_eq!(patent.status, PatentStatus::Granted);
        assert_eq!(patent.inventors, vec!["Ada Lovelace"]);
        assert_eq!(patent.filed, "2018-11-13");
        assert!(patent_from_patentsview(&json!({})).is_none());
    }

    #[test]
    fn test_google_patents_mapping() {
        let item = json!({
            "title": "Engine punch cards",
            "publication_number": "US20200123456A1",
            "inventor": "Ada Lovelace",
            "publication_date": "2020-04-23"
        });
        let patent = patent_from_google(&item).unwrap();
        assert_eq!(patent.status, PatentStatus::Application);
        assert_eq!(patent.inventors, vec!["Ada Lovelace"]);
        assert_eq!(patent.filed, "2020-04-23");
    }
}
