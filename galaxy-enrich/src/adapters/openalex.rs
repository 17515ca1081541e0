//! OpenAlex author directory
//!
//! Candidates from `/authors?search=`, works from
//! `/works?filter=authorships.author.id:` with cursor paging. Every request
//! carries the `mailto` parameter for the polite pool.

use super::http::{or_empty, HttpFetcher};
use super::{array_at, text_at, SourceAdapter};
use crate::services::text_normalizer::normalize_doi;
use crate::types::{year_from_value, Candidate, Directory, Profile, RecordSource, WorkRecord};
use async_trait::async_trait;
use galaxy_common::config::MAX_PAGE_SIZE;
use serde_json::Value;
use std::sync::Arc;

const ID_PREFIX: &str = "https://openalex.org/";
const KEYWORD_LIMIT: usize = 10;

pub struct OpenAlexClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    mailto: String,
    page_size: usize,
}

impl OpenAlexClient {
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: &str, mailto: &str, page_size: usize) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            mailto: mailto.to_string(),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Best-ranked institution id for free-text affiliation
    async fn find_institution_id(&self, affiliation_hint: Option<&str>) -> Option<String> {
        let hint = affiliation_hint.map(str::trim).filter(|h| !h.is_empty())?;
        let url = format!("{}/institutions", self.base_url);
        let result = self
            .fetcher
            .get_json(&url, &[("search", hint), ("per_page", "1"), ("mailto", self.mailto.as_str())])
            .await;
        let body = or_empty(result, "openalex", "find_institution");
        array_at(&body, "/results")
            .first()
            .map(|inst| short_id(&text_at(inst, "/id")).to_string())
            .filter(|id| !id.is_empty())
    }

    async fn search_authors(&self, name: &str, limit: usize, filter: Option<&str>) -> Vec<Candidate> {
        let url = format!("{}/authors", self.base_url);
        let per_page = limit.to_string();
        let mut query = vec![
            ("search", name.trim()),
            ("per_page", per_page.as_str()),
            ("mailto", self.mailto.as_str()),
        ];
        if let Some(filter) = filter {
            query.push(("filter", filter));
        }
        let result = self.fetcher.get_json(&url, &query).await;
        let body = or_empty(result, "openalex", "search_candidates");

        array_at(&body, "/results")
            .iter()
            .filter_map(candidate_from_author)
            .take(limit)
            .collect()
    }

    async fn author(&self, source_id: &str) -> Option<Value> {
        let url = format!("{}/authors/{}", self.base_url, short_id(source_id));
        let result = self.fetcher.get_json(&url, &[("mailto", self.mailto.as_str())]).await;
        or_empty(result.map(Some), "openalex", "author")
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexClient {
    fn directory(&self) -> Directory {
        Directory::OpenAlex
    }

    async fn search_candidates(&self, name: &str, affiliation_hint: Option<&str>, limit: usize) -> Vec<Candidate> {
        if name.trim().is_empty() || limit == 0 {
            return Vec::new();
        }
        if let Some(institution) = self.find_institution_id(affiliation_hint).await {
            let filter = format!("last_known_institution.id:{}", institution);
            let narrowed = self.search_authors(name, limit, Some(&filter)).await;
            if !narrowed.is_empty() {
                return narrowed;
            }
            tracing::debug!(name, institution = %institution, "No authors at institution, searching by name only");
        }
        self.search_authors(name, limit, None).await
    }

    async fn fetch_works(&self, source_id: &str, max_pages: usize) -> Vec<WorkRecord> {
        let url = format!("{}/works", self.base_url);
        let filter = format!("authorships.author.id:{}", short_id(source_id));
        let per_page = self.page_size.to_string();
        let mut cursor = "*".to_string();
        let mut works = Vec::new();

        for page in 0..max_pages {
            let result = self
                .fetcher
                .get_json(
                    &url,
                    &[
                        ("filter", filter.as_str()),
                        ("per_page", per_page.as_str()),
                        ("sort", "publication_date:desc"),
                        ("cursor", cursor.as_str()),
                        ("mailto", self.mailto.as_str()),
                    ],
                )
                .await;
            let body = or_empty(result, "openalex", "fetch_works");
            let results = array_at(&body, "/results");
            works.extend(results.iter().filter_map(work_from_openalex));

            match body.pointer("/meta/next_cursor").and_then(Value::as_str) {
                Some(next) if !next.is_empty() && !results.is_empty() => cursor = next.to_string(),
                _ => break,
            }
            tracing::debug!(source_id, page, fetched = works.len(), "OpenAlex works page");
        }
        works
    }

    async fn fetch_affiliation_text(&self, source_id: &str) -> String {
        self.author(source_id)
            .await
            .map(|author| institution_of(&author))
            .unwrap_or_default()
    }

    async fn fetch_profile(&self, source_id: &str) -> Profile {
        self.author(source_id)
            .await
            .map(|author| profile_from_author(&author))
            .unwrap_or_default()
    }
}

/// `https://openalex.org/A123` → `A123`
fn short_id(id: &str) -> &str {
    id.trim().trim_start_matches(ID_PREFIX)
}

/// Current institution name (new list form first, then the legacy object)
fn institution_of(author: &Value) -> String {
    let listed = array_at(author, "/last_known_institutions")
        .iter()
        .map(|inst| text_at(inst, "/display_name"))
        .find(|name| !name.is_empty());
    listed.unwrap_or_else(|| text_at(author, "/last_known_institution/display_name"))
}

pub(crate) fn candidate_from_author(author: &Value) -> Option<Candidate> {
    let id = text_at(author, "/id");
    if id.is_empty() {
        return None;
    }
    Some(Candidate {
        source_id: short_id(&id).to_string(),
        directory: Directory::OpenAlex,
        display_name: text_at(author, "/display_name"),
        affiliation_text: institution_of(author),
        raw: author.clone(),
    })
}

pub(crate) fn work_from_openalex(work: &Value) -> Option<WorkRecord> {
    let mut title = text_at(work, "/title");
    if title.is_empty() {
        title = text_at(work, "/display_name");
    }
    if title.is_empty() {
        return None;
    }

    let authors = array_at(work, "/authorships")
        .iter()
        .map(|a| text_at(a, "/author/display_name"))
        .filter(|n| !n.is_empty())
        .collect();

    let mut venue = text_at(work, "/primary_location/source/display_name");
    if venue.is_empty() {
        venue = text_at(work, "/host_venue/display_name");
    }

    let doi_text = {
        let doi = text_at(work, "/doi");
        if doi.is_empty() {
            text_at(work, "/ids/doi")
        } else {
            doi
        }
    };

    let mut url = text_at(work, "/open_access/oa_url");
    if url.is_empty() {
        url = text_at(work, "/primary_location/landing_page_url");
    }

    Some(WorkRecord {
        title,
        authors,
        venue,
        year: work.get("publication_year").and_then(year_from_value),
        doi: normalize_doi(&doi_text),
        citation_count: work
            .get("cited_by_count")
            .map(crate::services::metrics_calculator::coerce_citation_count)
            .unwrap_or(0),
        url,
        volume: text_at(work, "/biblio/volume"),
        issue: text_at(work, "/biblio/issue"),
        pages: pages_of(work),
        source: RecordSource::OpenAlex,
    })
}

fn pages_of(work: &Value) -> String {
    let first = text_at(work, "/biblio/first_page");
    let last = text_at(work, "/biblio/last_page");
    match (first.is_empty(), last.is_empty()) {
        (false, false) if first != last => format!("{}-{}", first, last),
        (false, _) => first,
        _ => String::new(),
    }
}

pub(crate) fn profile_from_author(author: &Value) -> Profile {
    let mut affiliations: Vec<String> = Vec::new();
    let current = institution_of(author);
    if !current.is_empty() {
        affiliations.push(current);
    }
    for entry in array_at(author, "/affiliations") {
        let name = text_at(entry, "/institution/display_name");
        if !name.is_empty() && !affiliations.contains(&name) {
            affiliations.push(name);
        }
    }

    let topics = {
        let topics = array_at(author, "/topics");
        if topics.is_empty() {
            array_at(author, "/x_concepts")
        } else {
            topics
        }
    };
    let keywords = topics
        .iter()
        .map(|t| text_at(t, "/display_name"))
        .filter(|k| !k.is_empty())
        .take(KEYWORD_LIMIT)
        .collect();

    Profile {
        name: text_at(author, "/display_name"),
        affiliations,
        keywords,
        ..Default::default()
    }
}
