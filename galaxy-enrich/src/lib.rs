//! galaxy-enrich library interface
//!
//! Identity resolution against author directories and reconciliation of the
//! resulting publications, grants and patents into one profile.

pub mod adapters;
pub mod orchestrator;
pub mod services;
pub mod types;

pub use adapters::{
    default_adapters, AdapterSet, CitationMetricsSource, PatentSource, SourceAdapter, WorkEnricher,
};
pub use orchestrator::{Orchestrator, ReconcileContext};
pub use types::{MergedProfile, ReconcileRequest};
