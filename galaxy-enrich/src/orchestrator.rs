//! Reconciliation run orchestration
//!
//! One run turns a [`ReconcileRequest`] into a [`MergedProfile`]:
//! 1. Build the evidence set from the request
//! 2. Resolve every registered directory (cached in the [`ReconcileContext`])
//! 3. Fetch works, fundings and profile fragments from resolved directories
//! 4. Merge with the request data, hydrate, verify and aggregate
//!
//! Directories are queried concurrently but always combined in registration
//! order, so the output does not depend on scheduling.

use crate::adapters::{AdapterSet, CitationMetricsSource, PatentSource, SourceAdapter, WorkEnricher};
use crate::services::candidate_resolver::{CandidateResolver, ResolverThresholds};
use crate::services::evidence_extractor::build_evidence;
use crate::services::funding_reconciler::{funding_key, hydrate_fundings, FundingReconciler};
use crate::services::patent_mapper::normalize_patents;
use crate::services::publication_verifier::publications_bundle;
use crate::services::record_deduplicator::{dedupe, dedupe_publications};
use crate::services::record_merger::{merge_profile_with, merge_publications, merge_work, Merge, MergePolicy};
use crate::services::text_normalizer::{fold_text, normalize_doi};
use crate::types::{
    Directory, EvidenceSet, FundingRecord, MergedProfile, PatentRecord, Profile, ReconcileRequest,
    ResolvedIdentity, WorkRecord,
};
use futures::future::join_all;
use galaxy_common::config::TomlConfig;
use galaxy_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-run state passed into [`Orchestrator::reconcile`]
///
/// Resolutions are cached per directory and person (folded name); reusing a
/// context for the same person skips the directory searches, while another
/// person in the same context is resolved afresh.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    run_id: Uuid,
    resolutions: BTreeMap<(Directory, String), ResolvedIdentity>,
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            resolutions: BTreeMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn resolution(&self, directory: Directory, name: &str) -> Option<&ResolvedIdentity> {
        self.resolutions.get(&(directory, fold_text(name)))
    }

    /// Record a known identity for `name` (e.g. from an earlier run)
    pub fn insert_resolution(&mut self, name: &str, identity: ResolvedIdentity) {
        self.resolutions.insert((identity.directory, fold_text(name)), identity);
    }

    /// Forget cached resolutions; the run id is kept
    pub fn clear(&mut self) {
        self.resolutions.clear();
    }
}

/// Everything fetched from one resolved directory
struct DirectoryHarvest {
    directory: Directory,
    works: Vec<WorkRecord>,
    fundings: Vec<FundingRecord>,
    profile: Profile,
}

/// Reconciliation engine over a fixed set of adapters
pub struct Orchestrator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    patent_sources: Vec<Arc<dyn PatentSource>>,
    enricher: Option<Arc<dyn WorkEnricher>>,
    citation_metrics: Option<Arc<dyn CitationMetricsSource>>,
    resolver: CandidateResolver,
    funding: FundingReconciler,
    policy: MergePolicy,
    verify_threshold: u8,
}

impl Orchestrator {
    pub fn new(config: &TomlConfig, adapters: AdapterSet) -> Self {
        Self {
            sources: adapters.sources,
            patent_sources: adapters.patent_sources,
            enricher: adapters.enricher,
            citation_metrics: adapters.citation_metrics,
            resolver: CandidateResolver::new(ResolverThresholds::from(&config.resolver)),
            funding: FundingReconciler::new(&config.display),
            policy: MergePolicy::new(config.display.placeholders.iter().cloned()),
            verify_threshold: config.resolver.verify_thresh,
        }
    }

    /// Run one reconciliation
    ///
    /// # Errors
    /// Returns [`Error::Config`] when no directory adapter is registered and
    /// [`Error::InvalidInput`] when neither the request nor its profile names
    /// the person. Directory failures never surface here; they degrade to
    /// empty data.
    pub async fn reconcile(&self, request: &ReconcileRequest, ctx: &mut ReconcileContext) -> Result<MergedProfile> {
        if self.sources.is_empty() {
            return Err(Error::Config("No directory adapters registered".to_string()));
        }

        let run_id = ctx.run_id();
        let name = request
            .profile
            .name
            .clone()
            .merge(request.name.clone(), &self.policy)
            .trim()
            .to_string();
        if self.policy.is_unset(&name) {
            return Err(Error::InvalidInput("Request names no person".to_string()));
        }
        tracing::info!(%run_id, name = %name, "Starting reconciliation");

        let evidence = build_evidence(request);
        let resolutions = self.resolve_all(&name, &evidence, ctx).await;

        let harvests = self.harvest(&resolutions).await;
        let evidence_text = request.evidence_text.as_deref().unwrap_or_default();

        // Publications
        let fetched: Vec<WorkRecord> = harvests.iter().flat_map(|h| h.works.iter().cloned()).collect();
        let evidence_only = fetched.is_empty();
        let works = if evidence_only {
            tracing::info!(%run_id, "No directory works, using request publications only");
            dedupe_publications(request.publications.clone())
        } else {
            merge_publications(request.publications.clone(), fetched, &self.policy)
        };
        let scholar_url = scholar_profile_url(&request.profile);
        let (works, scholar_total) = tokio::join!(
            self.enrich_works(works),
            self.scholar_citations(scholar_url, &name),
        );
        let mut publications = publications_bundle(&name, works, evidence_text, self.verify_threshold, evidence_only);
        publications.scholar_total_citations = scholar_total;

        // Profile
        let mut profile = harvests
            .iter()
            .fold(request.profile.clone(), |acc, h| {
                merge_profile_with(acc, h.profile.clone(), &self.policy)
            });
        profile.name = name.clone();

        // Grants
        let funding_sources: Vec<Directory> = harvests
            .iter()
            .filter(|h| !h.fundings.is_empty())
            .map(|h| h.directory)
            .collect();
        let fundings = dedupe_fundings(harvests.into_iter().flat_map(|h| h.fundings).collect());
        let grants = self
            .funding
            .build_bundle(&name, fundings, &profile.keywords, &funding_sources, &request.grants);

        // Patents
        let mut patents = normalize_patents(self.search_patents(&name).await);
        if patents.is_empty() {
            patents = normalize_patents(profile.patents.clone());
        }
        profile.patents = patents.clone();

        tracing::info!(
            %run_id,
            publications = publications.publications.len(),
            fundings = grants.fundings.len(),
            patents = patents.len(),
            evidence_only,
            "Reconciliation complete"
        );

        Ok(MergedProfile {
            profile,
            publications,
            grants,
            patents,
            resolutions,
        })
    }

    /// Resolve uncached directories concurrently; returns identities in registration order
    async fn resolve_all(&self, name: &str, evidence: &EvidenceSet, ctx: &mut ReconcileContext) -> Vec<ResolvedIdentity> {
        let pending: Vec<&Arc<dyn SourceAdapter>> = self
            .sources
            .iter()
            .filter(|s| ctx.resolution(s.directory(), name).is_none())
            .collect();

        let reports = join_all(
            pending
                .iter()
                .map(|source| self.resolver.resolve(name, evidence, source.as_ref())),
        )
        .await;
        for report in reports {
            ctx.insert_resolution(name, report.identity);
        }

        self.sources
            .iter()
            .map(|s| {
                ctx.resolution(s.directory(), name)
                    .cloned()
                    .unwrap_or_else(|| ResolvedIdentity::none(s.directory()))
            })
            .collect()
    }

    /// Works, hydrated fundings and profile fragments of each resolved directory
    async fn harvest(&self, resolutions: &[ResolvedIdentity]) -> Vec<DirectoryHarvest> {
        let max_pages = self.resolver.thresholds().max_pages;
        let jobs = self.sources.iter().zip(resolutions).filter_map(|(source, identity)| {
            let source_id = identity.source_id.as_deref()?;
            Some(async move {
                let source: &dyn SourceAdapter = source.as_ref();
                let (works, summaries, profile) = tokio::join!(
                    source.fetch_works(source_id, max_pages),
                    source.fetch_funding_summaries(source_id),
                    source.fetch_profile(source_id),
                );
                let fundings = hydrate_fundings(source, source_id, summaries).await;
                tracing::debug!(
                    directory = %source.directory(),
                    source_id,
                    works = works.len(),
                    fundings = fundings.len(),
                    "Harvested resolved directory"
                );
                DirectoryHarvest {
                    directory: source.directory(),
                    works,
                    fundings,
                    profile,
                }
            })
        });
        join_all(jobs).await
    }

    /// Fill missing bibliographic fields of works that carry a DOI
    async fn enrich_works(&self, works: Vec<WorkRecord>) -> Vec<WorkRecord> {
        let Some(enricher) = self.enricher.as_deref() else {
            return works;
        };
        let policy = &self.policy;
        join_all(works.into_iter().map(|work| async move {
            let Some(doi) = work
                .doi
                .as_deref()
                .and_then(normalize_doi)
                .filter(|_| needs_enrichment(&work))
            else {
                return work;
            };
            match enricher.enrich(&doi).await {
                Some(found) => merge_work(work, found, policy),
                None => work,
            }
        }))
        .await
    }

    async fn scholar_citations(&self, profile_url: Option<&str>, name: &str) -> Option<u64> {
        let source = self.citation_metrics.as_deref()?;
        let total = source.total_citations(profile_url, name).await;
        if total.is_none() {
            tracing::debug!(source = source.name(), "No author citation total");
        }
        total
    }

    /// Patents from every patent source, in registration order
    async fn search_patents(&self, name: &str) -> Vec<PatentRecord> {
        if name.is_empty() || self.policy.is_unset(name) {
            return Vec::new();
        }
        join_all(self.patent_sources.iter().map(|s| s.search_patents(name)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

fn needs_enrichment(work: &WorkRecord) -> bool {
    work.venue.trim().is_empty() || work.year.is_none() || work.url.trim().is_empty()
}

/// Same title and agency from two directories is one funding
fn dedupe_fundings(fundings: Vec<FundingRecord>) -> Vec<FundingRecord> {
    dedupe(fundings, funding_key)
}

/// Google Scholar link from the request profile's social media entries
fn scholar_profile_url(profile: &Profile) -> Option<&str> {
    profile
        .social_media
        .iter()
        .find(|(label, url)| {
            matches!(label.trim().to_lowercase().as_str(), "google scholar" | "scholar") && !url.trim().is_empty()
        })
        .map(|(_, url)| url.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_enrichment() {
        let complete = WorkRecord {
            venue: "Nature".into(),
            year: Some(2020),
            url: "https://x".into(),
            ..Default::default()
        };
        assert!(!needs_enrichment(&complete));
        assert!(needs_enrichment(&WorkRecord {
            year: None,
            ..complete
        }));
    }

    #[test]
    fn test_fundings_deduped_by_title_and_agency() {
        let grant = |title: &str, agency: &str| FundingRecord {
            title: title.into(),
            agency: agency.into(),
            ..Default::default()
        };
        let out = dedupe_fundings(vec![
            grant("Engines", "Royal Society"),
            grant("ENGINES", "royal society"),
            grant("Engines", "NSF"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].agency, "NSF");
    }

    #[test]
    fn test_context_caches_per_person_and_clears() {
        let mut ctx = ReconcileContext::new();
        let run_id = ctx.run_id();
        ctx.insert_resolution("Ada Lovelace", ResolvedIdentity::accepted(Directory::Orcid, "0000-0001"));
        assert!(ctx.resolution(Directory::Orcid, "  ada  LOVELACE ").is_some());
        assert!(ctx.resolution(Directory::Orcid, "Grace Hopper").is_none());
        assert!(ctx.resolution(Directory::OpenAlex, "Ada Lovelace").is_none());
        ctx.clear();
        assert!(ctx.resolution(Directory::Orcid, "Ada Lovelace").is_none());
        assert_eq!(ctx.run_id(), run_id);
    }

    #[test]
    fn test_scholar_profile_url() {
        let mut profile = Profile::default();
        assert_eq!(scholar_profile_url(&profile), None);
        profile.social_media.insert("LinkedIn".into(), "in/ada".into());
        profile.social_media.insert("Google Scholar".into(), " https://scholar.google.com/citations?user=A ".into());
        assert_eq!(
            scholar_profile_url(&profile),
            Some("https://scholar.google.com/citations?user=A")
        );
    }

    #[tokio::test]
    async fn test_no_adapters_is_config_error() {
        let orchestrator = Orchestrator::new(
            &TomlConfig::default(),
            AdapterSet {
                sources: Vec::new(),
                patent_sources: Vec::new(),
                enricher: None,
                citation_metrics: None,
            },
        );
        let err = orchestrator
            .reconcile(&ReconcileRequest::default(), &mut ReconcileContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
