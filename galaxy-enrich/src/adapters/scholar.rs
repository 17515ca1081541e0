//! Google Scholar citation totals (through SerpAPI)
//!
//! A profile URL carrying `user=<id>` is looked up directly with the
//! `google_scholar_author` engine; otherwise the name goes through
//! `google_scholar_profiles` and the first profile is taken.

use super::http::{or_empty, HttpFetcher};
use super::{array_at, CitationMetricsSource};
use crate::services::metrics_calculator::coerce_citation_count;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

static SCHOLAR_USER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]user=([^&#]+)").expect("valid regex"));

const PROFILE_RESULTS: &str = "10";

pub struct ScholarMetricsClient {
    fetcher: Arc<HttpFetcher>,
    search_url: String,
    api_key: String,
}

impl ScholarMetricsClient {
    pub fn new(fetcher: Arc<HttpFetcher>, search_url: &str, api_key: String) -> Self {
        Self {
            fetcher,
            search_url: search_url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CitationMetricsSource for ScholarMetricsClient {
    fn name(&self) -> &'static str {
        "google_scholar"
    }

    async fn total_citations(&self, profile_url: Option<&str>, name: &str) -> Option<u64> {
        let author_id = profile_url.and_then(scholar_user_id);
        let name = name.trim();
        let mut query: Vec<(&str, &str)> = match author_id.as_deref() {
            Some(id) => vec![("engine", "google_scholar_author"), ("author_id", id)],
            None if !name.is_empty() => vec![("engine", "google_scholar_profiles"), ("mauthors", name)],
            None => return None,
        };
        query.push(("num", PROFILE_RESULTS));
        query.push(("api_key", self.api_key.as_str()));

        let result = self.fetcher.get_json(&self.search_url, &query).await;
        let total = citations_from_response(&or_empty(result, "google_scholar", "author_metrics"));
        tracing::debug!(by_profile = author_id.is_some(), ?total, "Google Scholar citation total");
        total
    }
}

/// `user` parameter of a Scholar profile URL
pub(crate) fn scholar_user_id(url: &str) -> Option<String> {
    SCHOLAR_USER
        .captures(url)
        .map(|c| c[1].trim().to_string())
        .filter(|id| !id.is_empty())
}

/// All-time citations from an author page, else from the first listed profile
pub(crate) fn citations_from_response(body: &Value) -> Option<u64> {
    let total = match body.pointer("/cited_by/table/0/citations/all") {
        Some(all) => Some(all),
        None => array_at(body, "/profiles").first().and_then(|p| p.get("cited_by")),
    }?;
    if total.is_null() {
        return None;
    }
    u64::try_from(coerce_citation_count(total)).ok()
}

#[cfg(test)]
mod tests {
    use super::super::http::testing::serve;
    use super::*;
    use galaxy_common::config::HttpSettings;
    use serde_json::json;

    #[test]
    fn test_scholar_user_id() {
        assert_eq!(
            scholar_user_id("https://scholar.google.com/citations?hl=en&user=qc6CJjYAAAAJ").as_deref(),
            Some("qc6CJjYAAAAJ")
        );
        assert_eq!(
            scholar_user_id("https://scholar.google.com/citations?user=abc&hl=en").as_deref(),
            Some("abc")
        );
        assert_eq!(scholar_user_id("https://scholar.google.com/citations?hl=en"), None);
    }

    #[test]
    fn test_citations_from_author_page() {
        let body = json!({
            "cited_by": {"table": [{"citations": {"all": 4210, "since_2019": 1900}}]}
        });
        assert_eq!(citations_from_response(&body), Some(4210));
    }

    #[test]
    fn test_citations_from_profile_list() {
        let body = json!({"profiles": [{"name": "Ada Lovelace", "cited_by": "1,204"}, {"cited_by": 9}]});
        assert_eq!(citations_from_response(&body), Some(1204));
        assert_eq!(citations_from_response(&json!({"profiles": []})), None);
        assert_eq!(citations_from_response(&Value::Null), None);
    }

    fn client(search_url: &str) -> ScholarMetricsClient {
        let settings = HttpSettings {
            max_retries: 0,
            requests_per_second: 100,
            ..Default::default()
        };
        let fetcher = Arc::new(HttpFetcher::new(&settings, "test@example.org").unwrap());
        ScholarMetricsClient::new(fetcher, search_url, "key".to_string())
    }

    #[tokio::test]
    async fn test_profile_url_uses_author_engine() {
        let (url, requests) = serve(vec![(
            200,
            r#"{"cited_by": {"table": [{"citations": {"all": 77}}]}}"#,
        )])
        .await;

        let total = client(&format!("{}/search.json", url))
            .total_citations(Some("https://scholar.google.com/citations?user=XYZ"), "Ada Lovelace")
            .await;

        assert_eq!(total, Some(77));
        let requests = requests.lock().unwrap();
        assert!(requests[0].contains("engine=google_scholar_author"));
        assert!(requests[0].contains("author_id=XYZ"));
    }

    #[tokio::test]
    async fn test_name_search_and_failure_degrade() {
        let (url, requests) = serve(vec![(500, "{}")]).await;
        let total = client(&url).total_citations(None, "Ada Lovelace").await;
        assert_eq!(total, None);
        assert!(requests.lock().unwrap()[0].contains("engine=google_scholar_profiles"));

        assert_eq!(client(&url).total_citations(None, "  ").await, None);
    }
}
