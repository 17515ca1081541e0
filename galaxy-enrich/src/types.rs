//! Core Types for Galaxy Enrich
//!
//! Tagged entities passed between the resolution and reconciliation stages:
//! - **Resolution:** Candidate, EvidenceSet, MatchScore, ResolvedIdentity
//! - **Records:** WorkRecord, FundingRecord, PatentRecord
//! - **Output:** Profile, PublicationsBundle, GrantsBundle, MergedProfile
//!
//! Records deserialize leniently from upstream JSON (camelCase aliases,
//! numbers-as-strings) so evidence-only data can be fed in as-is.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Sources
// ============================================================================

/// External author directory queried for candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directory {
    OpenAlex,
    Orcid,
    SemanticScholar,
}

impl Directory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directory::OpenAlex => "openalex",
            Directory::Orcid => "orcid",
            Directory::SemanticScholar => "semantic_scholar",
        }
    }

    /// Human-readable name for notes shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Directory::OpenAlex => "OpenAlex",
            Directory::Orcid => "ORCID",
            Directory::SemanticScholar => "Semantic Scholar",
        }
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a work record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Supplied with the request (document-derived)
    #[default]
    Evidence,
    OpenAlex,
    Orcid,
    SemanticScholar,
    Crossref,
}

impl From<Directory> for RecordSource {
    fn from(directory: Directory) -> Self {
        match directory {
            Directory::OpenAlex => RecordSource::OpenAlex,
            Directory::Orcid => RecordSource::Orcid,
            Directory::SemanticScholar => RecordSource::SemanticScholar,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Tentative identity returned by a directory name search
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    /// Directory-local identifier (OpenAlex `A…`, ORCID iD, S2 author id)
    pub source_id: String,
    pub directory: Directory,
    pub display_name: String,
    /// Affiliation text exposed by the search result (may be empty)
    pub affiliation_text: String,
    /// Untouched search hit for debugging
    #[serde(skip)]
    pub raw: serde_json::Value,
}

/// Canonical comparable form of a title
///
/// Only produced by [`crate::services::text_normalizer::normalize_title`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedTitle(String);

impl NormalizedTitle {
    pub(crate) fn from_normalized(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Known-true facts about the person being resolved
///
/// Built once per request; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    titles: BTreeSet<NormalizedTitle>,
    dois: BTreeSet<String>,
    affiliation_hint: Option<String>,
}

impl EvidenceSet {
    /// Build from already-normalized parts; empty titles are dropped
    pub fn new(
        titles: impl IntoIterator<Item = NormalizedTitle>,
        dois: impl IntoIterator<Item = String>,
        affiliation_hint: Option<String>,
    ) -> Self {
        Self {
            titles: titles.into_iter().filter(|t| !t.is_empty()).collect(),
            dois: dois.into_iter().filter(|d| !d.is_empty()).collect(),
            affiliation_hint: affiliation_hint
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
        }
    }

    pub fn titles(&self) -> &BTreeSet<NormalizedTitle> {
        &self.titles
    }

    pub fn dois(&self) -> &BTreeSet<String> {
        &self.dois
    }

    pub fn affiliation_hint(&self) -> Option<&str> {
        self.affiliation_hint.as_deref()
    }

    /// Nothing to verify a candidate against
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty() && self.dois.is_empty()
    }
}

/// Evidence computed for one candidate; never mutated after creation
#[derive(Debug, Clone, Serialize)]
pub struct MatchScore {
    pub candidate: Candidate,
    /// Best title similarity over all (evidence, work) pairs, 0-100
    pub max_title_similarity: u8,
    /// Evidence titles whose best match reached `mid_thresh`
    pub mid_confidence_hits: usize,
    /// Affiliation similarity, 0 when either side is unknown
    pub affiliation_similarity: u8,
    /// A fetched work carries an evidence DOI
    pub doi_hit: bool,
    /// Works actually fetched for this candidate
    pub works_examined: usize,
}

/// Outcome of resolving one directory
///
/// `source_id == None` means "insufficient evidence, do not guess".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentity {
    pub directory: Directory,
    pub source_id: Option<String>,
}

impl ResolvedIdentity {
    pub fn none(directory: Directory) -> Self {
        Self {
            directory,
            source_id: None,
        }
    }

    pub fn accepted(directory: Directory, source_id: impl Into<String>) -> Self {
        Self {
            directory,
            source_id: Some(source_id.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.source_id.is_some()
    }
}

// ============================================================================
// Records
// ============================================================================

/// One publication
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkRecord {
    pub title: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub authors: Vec<String>,
    pub venue: String,
    #[serde(deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(
        alias = "citationCount",
        alias = "citations",
        deserialize_with = "lenient_citation_count"
    )]
    pub citation_count: i64,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub volume: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issue: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pages: String,
    pub source: RecordSource,
}

/// Partial date as reported by funding directories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl FundingDate {
    pub fn new(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    pub fn year(year: i32) -> Self {
        Self::new(Some(year), None, None)
    }

    pub fn has_year(&self) -> bool {
        self.year.is_some()
    }
}

/// One funding/grant record in the target schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingRecord {
    pub title: String,
    pub agency: String,
    #[serde(rename = "type")]
    pub funding_type: String,
    pub start_date: FundingDate,
    pub end_date: FundingDate,
    /// ISO currency code, empty when unknown
    pub currency: String,
    /// Awarded amount, 0 when unknown
    pub amount: f64,
    pub grant_external_id: String,
    /// Directory record id used for detail hydration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_code: Option<String>,
}

/// Patent status inferred from the kind code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatentStatus {
    Granted,
    Application,
    #[default]
    Filed,
}

/// One patent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatentRecord {
    pub title: String,
    pub number: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub inventors: Vec<String>,
    pub filed: String,
    pub status: PatentStatus,
}

// ============================================================================
// Output
// ============================================================================

/// Person profile fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub photo_url: String,
    #[serde(deserialize_with = "lenient_string_list")]
    pub affiliations: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub research_areas: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub positions: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub education: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub memberships: Vec<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub keywords: Vec<String>,
    #[serde(alias = "socials")]
    pub social_media: BTreeMap<String, String>,
    pub patents: Vec<PatentRecord>,
    /// Fields this crate does not model, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Aggregate citation metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationMetrics {
    pub total_citations: u64,
    pub h_index: u32,
    pub i10_index: u32,
}

/// Publication with its corroboration against the evidence text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicationEntry {
    #[serde(flatten)]
    pub record: WorkRecord,
    /// Title independently found in the evidence text
    pub verified: bool,
    /// Best token-set score against any evidence line, 0-100
    pub score: u8,
}

/// Reconciled publication list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublicationsBundle {
    pub name: String,
    pub publications: Vec<PublicationEntry>,
    pub metrics: CitationMetrics,
    /// Author-level total reported by Google Scholar, when looked up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scholar_total_citations: Option<u64>,
    /// True when no directory resolved and only request data was used
    pub evidence_only: bool,
}

/// The single grant shown as "last awarded"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastAwardedGrant {
    pub title: String,
    pub grant_id: String,
    pub agency: String,
    pub agency_short: String,
    #[serde(rename = "type")]
    pub funding_type: String,
    pub start: String,
    pub end: String,
    /// `start–end` years when both are known
    pub duration: String,
    /// `"USD 250000"`, empty when no amount is known
    pub amount_awarded: String,
    pub tags: Vec<String>,
}

/// Summed amount for the largest currency bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateAmount {
    pub currency: String,
    pub amount: f64,
    pub display: String,
    pub note: String,
}

impl AggregateAmount {
    /// Read a request-supplied aggregate
    ///
    /// Accepts the structured form and the display form
    /// `{"amount": "USD 1000", "note": ...}`. `None` when no amount is present.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let note = value.get("note").and_then(|v| v.as_str()).unwrap_or_default().trim().to_string();
        let currency = value.get("currency").and_then(|v| v.as_str()).unwrap_or_default();
        let (currency, amount) = match value.get("amount")? {
            serde_json::Value::Number(n) => (currency.trim().to_uppercase(), n.as_f64()?),
            serde_json::Value::String(s) => parse_display_amount(s)?,
            _ => return None,
        };
        if !(amount.is_finite() && amount > 0.0) {
            return None;
        }
        let display = format!("{} {}", currency, amount.trunc() as i64).trim().to_string();
        Some(Self {
            currency,
            amount,
            display,
            note,
        })
    }
}

/// `"USD 1,000"` → `("USD", 1000.0)`; a bare number has no currency
fn parse_display_amount(text: &str) -> Option<(String, f64)> {
    let text = text.trim();
    let (currency, number) = match text.split_once(char::is_whitespace) {
        Some((code, rest)) if code.chars().all(|c| c.is_ascii_alphabetic()) => (code.to_uppercase(), rest),
        _ => (String::new(), text),
    };
    let cleaned: String = number.chars().filter(|c| !matches!(c, ',' | '_' | ' ')).collect();
    cleaned.parse::<f64>().ok().map(|amount| (currency, amount))
}

/// Grant id pointer used by the breakdown section
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrantBreakdown {
    pub grant_id: String,
}

/// Reporting schedule of the last awarded grant (dates are filled downstream)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrantReports {
    pub grant_id: String,
    pub next_due: String,
    pub last_submitted: String,
}

/// Keywords attached to the last awarded grant
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrantKeywords {
    pub grant_id: String,
    pub keywords: Vec<String>,
}

/// Reconciled grants bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrantsBundle {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_awarded_grant: Option<LastAwardedGrant>,
    /// Never summed across currencies
    pub totals_by_currency: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_grants_awarded: Option<AggregateAmount>,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<GrantBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports: Option<GrantReports>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_section: Option<GrantKeywords>,
    pub fundings: Vec<FundingRecord>,
    /// Request-supplied grant fields not recomputed here
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Externally-visible aggregate of one reconciliation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedProfile {
    pub profile: Profile,
    pub publications: PublicationsBundle,
    pub grants: GrantsBundle,
    pub patents: Vec<PatentRecord>,
    pub resolutions: Vec<ResolvedIdentity>,
}

impl MergedProfile {
    /// Pretty JSON followed by a newline
    pub fn write_json<W: std::io::Write>(&self, mut out: W) -> galaxy_common::Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

/// Upstream input to a reconciliation run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconcileRequest {
    pub name: String,
    pub affiliation_hint: Option<String>,
    /// Pre-structured evidence titles (preferred over `evidence_text`)
    pub evidence_titles: Vec<String>,
    /// Raw document text; titles and DOIs are extracted heuristically
    pub evidence_text: Option<String>,
    /// Document-derived profile (primary side of the profile merge)
    pub profile: Profile,
    /// Document-derived publications (evidence-only fallback)
    pub publications: Vec<WorkRecord>,
    /// Document-derived grants fields carried into the output
    pub grants: serde_json::Map<String, serde_json::Value>,
}

impl ReconcileRequest {
    /// Read a request from a JSON file
    pub fn from_file(path: &std::path::Path) -> galaxy_common::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(year_from_value(&value))
}

/// Year from a JSON number or leading digits of a string; 0 and junk are `None`
pub fn year_from_value(value: &serde_json::Value) -> Option<i32> {
    let year = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<i64>().ok()
        }
        _ => None,
    }?;
    if (1..=9999).contains(&year) {
        Some(year as i32)
    } else {
        None
    }
}

fn lenient_citation_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(crate::services::metrics_calculator::coerce_citation_count(&value))
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(string_list_from_value(&value))
}

/// Strings from an array (of strings or `{name: …}` objects) or a comma-separated string
pub fn string_list_from_value(value: &serde_json::Value) -> Vec<String> {
    let items: Vec<String> = match value {
        serde_json::Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Object(obj) => obj
                    .get("name")
                    .or_else(|| obj.get("display_name"))
                    .and_then(|n| n.as_str())
                    .map(|n| n.trim().to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}
