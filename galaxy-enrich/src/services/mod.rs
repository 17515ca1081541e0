//! Resolution and reconciliation services
//!
//! Leaves first: normalization and similarity feed the candidate resolver;
//! dedupe and merge feed the metrics, funding and patent stages.

pub mod candidate_resolver;
pub mod evidence_extractor;
pub mod funding_reconciler;
pub mod metrics_calculator;
pub mod patent_mapper;
pub mod publication_verifier;
pub mod record_deduplicator;
pub mod record_merger;
pub mod similarity;
pub mod text_normalizer;

pub use candidate_resolver::{AcceptRule, CandidateResolver, Decision, ResolutionReport, ResolverThresholds};
pub use evidence_extractor::build_evidence;
pub use funding_reconciler::{hydrate_fundings, FundingReconciler};
pub use metrics_calculator::{compute_metrics, metrics_for_works};
pub use patent_mapper::{infer_status, normalize_patents};
pub use publication_verifier::{publications_bundle, verify_publications};
pub use record_deduplicator::{dedupe, dedupe_patents, dedupe_publications, patent_key, publication_key};
pub use record_merger::{merge_list, merge_profile, merge_profile_with, merge_publications, Merge, MergePolicy};
pub use similarity::{best_similarity, similarity};
pub use text_normalizer::{normalize_doi, normalize_name, normalize_title};
