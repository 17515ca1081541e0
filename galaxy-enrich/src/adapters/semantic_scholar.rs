//! Semantic Scholar Graph API

use super::http::{or_empty, HttpFetcher};
use super::{array_at, text_at, SourceAdapter};
use crate::services::metrics_calculator::coerce_citation_count;
use crate::services::text_normalizer::normalize_doi;
use crate::types::{year_from_value, Candidate, Directory, Profile, RecordSource, WorkRecord};
use async_trait::async_trait;
use galaxy_common::config::MAX_PAGE_SIZE;
use serde_json::Value;
use std::sync::Arc;

const PAPER_FIELDS: &str = "title,year,venue,externalIds,citationCount,url,authors";

pub struct SemanticScholarClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    api_key: Option<String>,
    page_size: usize,
}

impl SemanticScholarClient {
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        base_url: &str,
        api_key: Option<String>,
        page_size: usize,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)], operation: &str) -> Value {
        let result = match &self.api_key {
            Some(key) => {
                self.fetcher
                    .get_json_with_headers(url, query, &[("x-api-key", key.as_str())])
                    .await
            }
            None => self.fetcher.get_json(url, query).await,
        };
        or_empty(result, "semantic_scholar", operation)
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarClient {
    fn directory(&self) -> Directory {
        Directory::SemanticScholar
    }

    async fn search_candidates(&self, name: &str, _affiliation_hint: Option<&str>, limit: usize) -> Vec<Candidate> {
        if name.trim().is_empty() || limit == 0 {
            return Vec::new();
        }
        let url = format!("{}/author/search", self.base_url);
        let limit_param = limit.to_string();
        let body = self
            .get(
                &url,
                &[
                    ("query", name.trim()),
                    ("limit", limit_param.as_str()),
                    ("fields", "name,affiliations"),
                ],
                "search_candidates",
            )
            .await;

        array_at(&body, "/data")
            .iter()
            .filter_map(candidate_from_author)
            .take(limit)
            .collect()
    }

    async fn fetch_works(&self, source_id: &str, max_pages: usize) -> Vec<WorkRecord> {
        let url = format!("{}/author/{}/papers", self.base_url, source_id.trim());
        let limit = self.page_size.to_string();
        let mut offset = 0usize;
        let mut works = Vec::new();

        for _ in 0..max_pages {
            let offset_param = offset.to_string();
            let body = self
                .get(
                    &url,
                    &[
                        ("fields", PAPER_FIELDS),
                        ("limit", limit.as_str()),
                        ("offset", offset_param.as_str()),
                    ],
                    "fetch_works",
                )
                .await;
            let papers = array_at(&body, "/data");
            works.extend(papers.iter().filter_map(work_from_paper));

            match body.get("next").and_then(Value::as_u64) {
                Some(next) if !papers.is_empty() && next as usize > offset => offset = next as usize,
                _ => break,
            }
        }
        works
    }

    async fn fetch_affiliation_text(&self, source_id: &str) -> String {
        let url = format!("{}/author/{}", self.base_url, source_id.trim());
        let body = self
            .get(&url, &[("fields", "affiliations")], "affiliation")
            .await;
        affiliations_of(&body).join("; ")
    }

    async fn fetch_profile(&self, source_id: &str) -> Profile {
        let url = format!("{}/author/{}", self.base_url, source_id.trim());
        let body = self
            .get(&url, &[("fields", "name,affiliations,homepage")], "profile")
            .await;
        Profile {
            name: text_at(&body, "/name"),
            affiliations: affiliations_of(&body),
            ..Default::default()
        }
    }
}

fn affiliations_of(author: &Value) -> Vec<String> {
    array_at(author, "/affiliations")
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn candidate_from_author(author: &Value) -> Option<Candidate> {
    let id = match author.get("authorId") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }
    Some(Candidate {
        source_id: id,
        directory: Directory::SemanticScholar,
        display_name: text_at(author, "/name"),
        affiliation_text: affiliations_of(author).join("; "),
        raw: author.clone(),
    })
}

pub(crate) fn work_from_paper(paper: &Value) -> Option<WorkRecord> {
    let title = text_at(paper, "/title");
    if title.is_empty() {
        return None;
    }
    Some(WorkRecord {
        title,
        authors: array_at(paper, "/authors")
            .iter()
            .map(|a| text_at(a, "/name"))
            .filter(|n| !n.is_empty())
            .collect(),
        venue: text_at(paper, "/venue"),
        year: paper.get("year").and_then(year_from_value),
        doi: normalize_doi(&text_at(paper, "/externalIds/DOI")),
        citation_count: paper.get("citationCount").map(coerce_citation_count).unwrap_or(0),
        url: text_at(paper, "/url"),
        source: RecordSource::SemanticScholar,
        ..Default::default()
    })
}
