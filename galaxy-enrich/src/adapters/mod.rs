//! Directory adapters
//!
//! The resolver and orchestrator only see these traits. Adapters never return
//! errors across the boundary: an unavailable directory logs a warning and
//! yields nothing for this run.

pub mod crossref;
pub mod http;
pub mod openalex;
pub mod orcid;
pub mod patents;
pub mod scholar;
pub mod semantic_scholar;

pub use crossref::CrossrefClient;
pub use http::{ClientError, HttpFetcher};
pub use openalex::OpenAlexClient;
pub use orcid::OrcidClient;
pub use patents::{GooglePatentsClient, PatentsViewClient};
pub use scholar::ScholarMetricsClient;
pub use semantic_scholar::SemanticScholarClient;

use crate::types::{Candidate, Directory, FundingRecord, PatentRecord, Profile, WorkRecord};
use async_trait::async_trait;
use galaxy_common::config::TomlConfig;
use std::sync::Arc;

/// Author directory queried during resolution
///
/// Directories lacking a capability keep the default (empty) implementation.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn directory(&self) -> Directory;

    /// Candidates for a name search, in the directory's rank order
    ///
    /// Directories that can narrow by institution use `affiliation_hint` and
    /// fall back to the plain name search when the narrowed one finds nobody.
    async fn search_candidates(&self, name: &str, affiliation_hint: Option<&str>, limit: usize) -> Vec<Candidate>;

    /// Works of one author, at most `max_pages` pages
    async fn fetch_works(&self, source_id: &str, max_pages: usize) -> Vec<WorkRecord>;

    async fn fetch_funding_summaries(&self, _source_id: &str) -> Vec<FundingRecord> {
        Vec::new()
    }

    /// Full funding record for a summary's `put_code`
    async fn fetch_funding_detail(&self, _source_id: &str, _record_id: &str) -> Option<FundingRecord> {
        None
    }

    /// Affiliation text for candidates whose search hit carried none
    async fn fetch_affiliation_text(&self, _source_id: &str) -> String {
        String::new()
    }

    /// Profile fragments (affiliations, keywords) of a resolved author
    async fn fetch_profile(&self, _source_id: &str) -> Profile {
        Profile::default()
    }
}

/// Inventor-name patent search
#[async_trait]
pub trait PatentSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_patents(&self, inventor: &str) -> Vec<PatentRecord>;
}

/// Author-level citation total from a citation index
#[async_trait]
pub trait CitationMetricsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Total citations of the author at `profile_url`, else of the best name match
    async fn total_citations(&self, profile_url: Option<&str>, name: &str) -> Option<u64>;
}

/// Per-DOI bibliographic lookup used to fill missing work fields
#[async_trait]
pub trait WorkEnricher: Send + Sync {
    async fn enrich(&self, doi: &str) -> Option<WorkRecord>;
}

/// Trimmed string at a JSON pointer, empty when absent or not a string
pub(crate) fn text_at(value: &serde_json::Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Array at a JSON pointer, empty when absent
pub(crate) fn array_at<'a>(value: &'a serde_json::Value, pointer: &str) -> &'a [serde_json::Value] {
    value
        .pointer(pointer)
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Every collaborator the orchestrator needs
pub struct AdapterSet {
    pub sources: Vec<Arc<dyn SourceAdapter>>,
    pub patent_sources: Vec<Arc<dyn PatentSource>>,
    pub enricher: Option<Arc<dyn WorkEnricher>>,
    pub citation_metrics: Option<Arc<dyn CitationMetricsSource>>,
}

/// Production adapters sharing one rate-limited HTTP client
pub fn default_adapters(config: &TomlConfig) -> Result<AdapterSet, ClientError> {
    let fetcher = Arc::new(HttpFetcher::new(&config.http, &config.contact.email)?);
    let endpoints = &config.endpoints;

    let sources: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(OrcidClient::new(Arc::clone(&fetcher), &endpoints.orcid)),
        Arc::new(OpenAlexClient::new(
            Arc::clone(&fetcher),
            &endpoints.openalex,
            &config.contact.email,
            config.resolver.page_size,
        )),
        Arc::new(SemanticScholarClient::new(
            Arc::clone(&fetcher),
            &endpoints.semantic_scholar,
            config.semantic_scholar_key().map(str::to_string),
            config.resolver.page_size,
        )),
    ];

    let mut patent_sources: Vec<Arc<dyn PatentSource>> = vec![Arc::new(PatentsViewClient::new(
        Arc::clone(&fetcher),
        &endpoints.patentsview,
    ))];
    let mut citation_metrics: Option<Arc<dyn CitationMetricsSource>> = None;
    match config.serpapi_key() {
        Some(key) => {
            patent_sources.push(Arc::new(GooglePatentsClient::new(
                Arc::clone(&fetcher),
                &endpoints.serpapi,
                key.to_string(),
            )));
            citation_metrics = Some(Arc::new(ScholarMetricsClient::new(
                Arc::clone(&fetcher),
                &endpoints.serpapi,
                key.to_string(),
            )));
        }
        None => tracing::info!("No SerpAPI key configured, Google Patents and Scholar metrics disabled"),
    }

    let enricher: Arc<dyn WorkEnricher> = Arc::new(CrossrefClient::new(fetcher, &endpoints.crossref));

    Ok(AdapterSet {
        sources,
        patent_sources,
        enricher: Some(enricher),
        citation_metrics,
    })
}
