//! ORCID public API (v3.0)
//!
//! The only directory exposing funding records. Summaries come from
//! `/activities` (falling back to `/fundings` when that has no groups); a
//! summary without an amount is completed through `/funding/{put-code}`.

use super::http::{or_empty, HttpFetcher};
use super::{array_at, text_at, SourceAdapter};
use crate::services::text_normalizer::{normalize_doi, normalize_name};
use crate::types::{
    year_from_value, Candidate, Directory, FundingDate, FundingRecord, Profile, RecordSource,
    WorkRecord,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// External-id types that name the grant itself, in preference order
const GRANT_ID_TYPES: [&str; 5] = ["grant_number", "award", "proposal", "application", "other-id"];

pub struct OrcidClient {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl OrcidClient {
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: format!("{}/v3.0", base_url.trim_end_matches('/')),
        }
    }

    async fn expanded_search(&self, query: &str, limit: usize) -> Vec<Candidate> {
        let url = format!("{}/expanded-search", self.base_url);
        let rows = limit.to_string();
        let result = self
            .fetcher
            .get_json(&url, &[("q", query), ("rows", rows.as_str())])
            .await;
        let body = or_empty(result, "orcid", "search_candidates");

        array_at(&body, "/expanded-result")
            .iter()
            .filter_map(candidate_from_result)
            .take(limit)
            .collect()
    }

    async fn record(&self, orcid: &str, section: &str, operation: &str) -> Value {
        let url = format!("{}/{}/{}", self.base_url, orcid.trim(), section);
        or_empty(self.fetcher.get_json(&url, &[]).await, "orcid", operation)
    }
}

#[async_trait]
impl SourceAdapter for OrcidClient {
    fn directory(&self) -> Directory {
        Directory::Orcid
    }

    async fn search_candidates(&self, name: &str, affiliation_hint: Option<&str>, limit: usize) -> Vec<Candidate> {
        let Some(query) = search_query(name) else {
            return Vec::new();
        };
        if let Some(narrowed) = affiliation_hint.and_then(|hint| with_affiliation(&query, hint)) {
            let found = self.expanded_search(&narrowed, limit).await;
            if !found.is_empty() {
                return found;
            }
            tracing::debug!(name, "No ORCID records at hinted affiliation, searching by name only");
        }
        self.expanded_search(&query, limit).await
    }

    async fn fetch_works(&self, source_id: &str, _max_pages: usize) -> Vec<WorkRecord> {
        // ORCID returns every work summary in one response
        let body = self.record(source_id, "works", "fetch_works").await;
        array_at(&body, "/group")
            .iter()
            .filter_map(|group| array_at(group, "/work-summary").first())
            .filter_map(work_from_summary)
            .collect()
    }

    async fn fetch_funding_summaries(&self, source_id: &str) -> Vec<FundingRecord> {
        let activities = self.record(source_id, "activities", "activities").await;
        let mut groups = array_at(&activities, "/fundings/group").to_vec();
        if groups.is_empty() {
            let fundings = self.record(source_id, "fundings", "fundings").await;
            groups = array_at(&fundings, "/group").to_vec();
        }

        groups
            .iter()
            .flat_map(|group| array_at(group, "/funding-summary").iter())
            .filter_map(funding_from_orcid)
            .collect()
    }

    async fn fetch_funding_detail(&self, source_id: &str, record_id: &str) -> Option<FundingRecord> {
        let section = format!("funding/{}", record_id.trim());
        let body = self.record(source_id, &section, "funding_detail").await;
        funding_from_orcid(&body)
    }

    async fn fetch_affiliation_text(&self, source_id: &str) -> String {
        let body = self.record(source_id, "employments", "employments").await;
        affiliation_names(&body, "employment-summary")
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    async fn fetch_profile(&self, source_id: &str) -> Profile {
        let person = self.record(source_id, "person", "person").await;
        let activities = self.record(source_id, "activities", "activities").await;
        profile_from_orcid(&person, &activities)
    }
}

/// `given-names:"…" AND family-name:"…"`, or `None` for an empty name
pub(crate) fn search_query(name: &str) -> Option<String> {
    let parsed = normalize_name(name);
    if parsed.family.is_empty() {
        return None;
    }
    let family = parsed.family.replace('"', "");
    if parsed.given.is_empty() {
        return Some(format!("family-name:\"{}\"", family));
    }
    Some(format!(
        "given-names:\"{}\" AND family-name:\"{}\"",
        parsed.given.replace('"', ""),
        family
    ))
}

/// Name query narrowed to an affiliation; `None` for a blank hint
pub(crate) fn with_affiliation(query: &str, hint: &str) -> Option<String> {
    let hint = hint.trim().replace('"', "");
    if hint.is_empty() {
        return None;
    }
    Some(format!("{} AND affiliation-org-name:\"{}\"", query, hint))
}

pub(crate) fn candidate_from_result(result: &Value) -> Option<Candidate> {
    let orcid = text_at(result, "/orcid-id");
    if orcid.is_empty() {
        return None;
    }
    let display_name = [text_at(result, "/given-names"), text_at(result, "/family-names")]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let affiliation_text = match result.get("institution-name") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Some(Value::String(name)) => name.trim().to_string(),
        _ => String::new(),
    };
    Some(Candidate {
        source_id: orcid,
        directory: Directory::Orcid,
        display_name,
        affiliation_text,
        raw: result.clone(),
    })
}

pub(crate) fn work_from_summary(summary: &Value) -> Option<WorkRecord> {
    let title = text_at(summary, "/title/title/value");
    if title.is_empty() {
        return None;
    }
    let doi = array_at(summary, "/external-ids/external-id")
        .iter()
        .filter(|id| text_at(id, "/external-id-type").eq_ignore_ascii_case("doi"))
        .find_map(|id| normalize_doi(&text_at(id, "/external-id-value")));

    Some(WorkRecord {
        title,
        venue: text_at(summary, "/journal-title/value"),
        year: summary
            .pointer("/publication-date/year/value")
            .and_then(year_from_value),
        doi,
        url: text_at(summary, "/url/value"),
        source: RecordSource::Orcid,
        ..Default::default()
    })
}

/// Map a funding summary or detail record; records without title or agency are dropped
pub(crate) fn funding_from_orcid(funding: &Value) -> Option<FundingRecord> {
    let title = text_at(funding, "/title/title/value");
    let agency = text_at(funding, "/organization/name");
    if title.is_empty() && agency.is_empty() {
        return None;
    }

    let (currency, amount) = amount_of(funding);
    let put_code = match funding.get("put-code") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };

    Some(FundingRecord {
        title,
        agency,
        funding_type: title_case(&text_at(funding, "/type")),
        start_date: date_of(funding.get("start-date")),
        end_date: date_of(funding.get("end-date")),
        currency,
        amount,
        grant_external_id: grant_id_of(funding),
        put_code,
    })
}

/// `(currency, value)`; unparseable values are 0
fn amount_of(funding: &Value) -> (String, f64) {
    let currency = text_at(funding, "/amount/currency-code").to_uppercase();
    let amount = match funding.pointer("/amount/value") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.replace(',', "").trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    let amount = if amount.is_finite() && amount > 0.0 { amount } else { 0.0 };
    (currency, amount)
}

fn date_of(date: Option<&Value>) -> FundingDate {
    let Some(date) = date.filter(|d| d.is_object()) else {
        return FundingDate::default();
    };
    let part = |key: &str| {
        date.pointer(&format!("/{}/value", key))
            .and_then(year_from_value)
    };
    FundingDate::new(
        part("year"),
        part("month").map(|m| m as u32),
        part("day").map(|d| d as u32),
    )
}

fn grant_id_of(funding: &Value) -> String {
    let ids = array_at(funding, "/external-ids/external-id");
    GRANT_ID_TYPES
        .iter()
        .find_map(|wanted| {
            ids.iter()
                .filter(|id| text_at(id, "/external-id-type").eq_ignore_ascii_case(wanted))
                .map(|id| text_at(id, "/external-id-value"))
                .find(|v| !v.is_empty())
        })
        .or_else(|| {
            ids.iter()
                .map(|id| text_at(id, "/external-id-value"))
                .find(|v| !v.is_empty())
        })
        .unwrap_or_default()
}

/// `SALARY_AWARD` → `Salary Award`
fn title_case(raw: &str) -> String {
    raw.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Organization names from an affiliation section (v3.0 grouped or flat form)
fn affiliation_names(section: &Value, summary_key: &str) -> Vec<String> {
    let grouped = array_at(section, "/affiliation-group")
        .iter()
        .flat_map(|group| array_at(group, "/summaries").iter())
        .filter_map(|summary| summary.get(summary_key));
    let flat = array_at(section, &format!("/{}", summary_key)).iter();

    let mut names: Vec<String> = Vec::new();
    for summary in grouped.chain(flat) {
        let name = text_at(summary, "/organization/name");
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub(crate) fn profile_from_orcid(person: &Value, activities: &Value) -> Profile {
    let mut affiliations = affiliation_names(
        activities.get("employments").unwrap_or(&Value::Null),
        "employment-summary",
    );
    for name in affiliation_names(
        activities.get("educations").unwrap_or(&Value::Null),
        "education-summary",
    ) {
        if !affiliations.contains(&name) {
            affiliations.push(name);
        }
    }

    let keywords = array_at(person, "/keywords/keyword")
        .iter()
        .map(|k| text_at(k, "/content"))
        .filter(|k| !k.is_empty())
        .collect();

    let name = [
        text_at(person, "/name/given-names/value"),
        text_at(person, "/name/family-name/value"),
    ]
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    Profile {
        name,
        affiliations,
        keywords,
        ..Default::default()
    }
}
