//! Funding Reconciliation
//!
//! Turns directory funding records into a grants bundle:
//! 1. Hydrate summaries lacking an amount with one detail call each
//! 2. Pick the "last awarded" record by most recent end (or start) date
//! 3. Total amounts per currency; the displayed aggregate is the largest bucket
//!
//! Amounts in different currencies are never added together.

use crate::adapters::SourceAdapter;
use crate::services::record_merger::{merge_list, Merge, MergePolicy};
use crate::services::text_normalizer::fold_text;
use crate::types::{
    string_list_from_value, AggregateAmount, Directory, FundingDate, FundingRecord, GrantBreakdown,
    GrantKeywords, GrantReports, GrantsBundle, LastAwardedGrant,
};
use chrono::NaiveDate;
use futures::future::join_all;
use galaxy_common::config::DisplaySettings;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Aggregate note when every funding came from the request
const REPORTED_NOTE: &str = "From reported fundings";

/// Summary lacks an amount and has a record id to look it up by
pub fn needs_hydration(record: &FundingRecord) -> bool {
    record.amount <= 0.0 && record.put_code.is_some()
}

/// Complete `summary` from its detail record
///
/// Amount and currency come from the detail when it has a positive amount;
/// other fields only fill gaps.
pub fn apply_detail(mut summary: FundingRecord, detail: FundingRecord) -> FundingRecord {
    if detail.amount > 0.0 {
        summary.amount = detail.amount;
        summary.currency = detail.currency;
    }
    if summary.title.trim().is_empty() {
        summary.title = detail.title;
    }
    if summary.agency.trim().is_empty() {
        summary.agency = detail.agency;
    }
    if summary.funding_type.trim().is_empty() {
        summary.funding_type = detail.funding_type;
    }
    if !summary.start_date.has_year() {
        summary.start_date = detail.start_date;
    }
    if !summary.end_date.has_year() {
        summary.end_date = detail.end_date;
    }
    if summary.grant_external_id.trim().is_empty() {
        summary.grant_external_id = detail.grant_external_id;
    }
    summary
}

/// Zero amount and empty currency for anything without a usable amount
fn settle_amount(mut record: FundingRecord) -> FundingRecord {
    if !(record.amount.is_finite() && record.amount > 0.0) {
        record.amount = 0.0;
        record.currency.clear();
    }
    record.currency = record.currency.trim().to_uppercase();
    record
}

/// Hydrate every amount-less summary with one detail call
///
/// Calls run concurrently; output keeps input order. A failed or empty detail
/// leaves the summary with amount 0 and no currency.
pub async fn hydrate_fundings(
    adapter: &dyn SourceAdapter,
    source_id: &str,
    summaries: Vec<FundingRecord>,
) -> Vec<FundingRecord> {
    let pending = summaries.iter().filter(|r| needs_hydration(r)).count();
    if pending > 0 {
        tracing::debug!(directory = %adapter.directory(), pending, "Hydrating funding summaries");
    }

    let hydrated = summaries.into_iter().map(|summary| async move {
        if !needs_hydration(&summary) {
            return settle_amount(summary);
        }
        let record_id = summary.put_code.clone().unwrap_or_default();
        match adapter.fetch_funding_detail(source_id, &record_id).await {
            Some(detail) => settle_amount(apply_detail(summary, detail)),
            None => settle_amount(summary),
        }
    });
    join_all(hydrated).await
}

/// Render at the granularity present; empty without a year
///
/// An impossible month drops to `YYYY`, an impossible day to `YYYY-MM`.
pub fn render_date(date: &FundingDate) -> String {
    let Some(year) = date.year else {
        return String::new();
    };
    let Some(month) = date.month.filter(|m| (1..=12).contains(m)) else {
        return format!("{:04}", year);
    };
    match date.day {
        Some(day) if NaiveDate::from_ymd_opt(year, month, day).is_some() => {
            format!("{:04}-{:02}-{:02}", year, month, day)
        }
        _ => format!("{:04}-{:02}", year, month),
    }
}

/// Chronological key; missing month/day sort before any known one
fn date_key(date: &FundingDate) -> Option<(i32, u32, u32)> {
    let year = date.year?;
    Some((year, date.month.unwrap_or(0), date.day.unwrap_or(0)))
}

/// End date when known, else start date
fn award_key(record: &FundingRecord) -> Option<(i32, u32, u32)> {
    date_key(&record.end_date).or_else(|| date_key(&record.start_date))
}

/// Most recent record by `(end or start, title)`; undated input → first record
pub fn last_awarded(records: &[FundingRecord]) -> Option<&FundingRecord> {
    let mut dated: Vec<(&FundingRecord, (i32, u32, u32))> = records
        .iter()
        .filter_map(|r| award_key(r).map(|k| (r, k)))
        .collect();
    if dated.is_empty() {
        return records.first();
    }
    // Stable sort: equal keys keep input order
    dated.sort_by(|(a, ka), (b, kb)| kb.cmp(ka).then_with(|| b.title.cmp(&a.title)));
    dated.first().map(|(r, _)| *r)
}

/// Sum of positive amounts per (uppercased) currency
pub fn totals_by_currency(records: &[FundingRecord]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        let currency = record.currency.trim().to_uppercase();
        if currency.is_empty() || !(record.amount.is_finite() && record.amount > 0.0) {
            continue;
        }
        *totals.entry(currency).or_insert(0.0) += record.amount;
    }
    totals
}

/// Largest bucket; ties go to the alphabetically first currency
pub fn largest_bucket(totals: &BTreeMap<String, f64>) -> Option<(&str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for (currency, &amount) in totals {
        if best.map_or(true, |(_, top)| amount > top) {
            best = Some((currency.as_str(), amount));
        }
    }
    best
}

/// `"USD 250000"`; empty for a non-positive amount
pub fn format_amount(currency: &str, amount: f64) -> String {
    if !(amount.is_finite() && amount > 0.0) {
        return String::new();
    }
    format!("{} {}", currency.trim(), amount.trunc() as i64)
        .trim()
        .to_string()
}

/// First `max_chars` characters plus `…` when longer
pub fn agency_short(agency: &str, max_chars: usize) -> String {
    let agency = agency.trim();
    if agency.chars().count() <= max_chars {
        return agency.to_string();
    }
    let mut short: String = agency.chars().take(max_chars).collect();
    short.push('…');
    short
}

/// Bundle builder configured from the display settings
#[derive(Debug, Clone)]
pub struct FundingReconciler {
    agency_short_len: usize,
    tag_limit: usize,
    keyword_limit: usize,
    policy: MergePolicy,
}

impl FundingReconciler {
    pub fn new(settings: &DisplaySettings) -> Self {
        Self {
            agency_short_len: settings.agency_short_len,
            tag_limit: settings.grant_tag_limit,
            keyword_limit: settings.keyword_limit,
            policy: MergePolicy::new(settings.placeholders.iter().cloned()),
        }
    }

    /// Grants bundle from reconciled funding records
    ///
    /// `sources` names the directories the records came from (used in the
    /// aggregate note); `existing` is request-supplied grants data. Request
    /// fundings join the directory ones before anything is computed.
    pub fn build_bundle(
        &self,
        name: &str,
        fundings: Vec<FundingRecord>,
        keywords: &[String],
        sources: &[Directory],
        existing: &Map<String, Value>,
    ) -> GrantsBundle {
        let fetched = fundings.len();
        let fundings = merge_list(fundings, requested_fundings(existing), funding_key);
        let note = if fetched == 0 && !fundings.is_empty() {
            REPORTED_NOTE.to_string()
        } else {
            aggregate_note(sources)
        };

        let last = last_awarded(&fundings);
        let last_awarded_grant = last.map(|r| self.last_awarded_grant(r, keywords));
        let totals = totals_by_currency(&fundings);
        let total_grants_awarded = largest_bucket(&totals).map(|(currency, amount)| AggregateAmount {
            currency: currency.to_string(),
            amount,
            display: format_amount(currency, amount),
            note,
        });

        let keywords = self.limit_keywords(keywords);
        let (breakdown, reports, keywords_section) = match last {
            Some(record) => {
                let grant_id = record.grant_external_id.trim().to_string();
                (
                    Some(GrantBreakdown {
                        grant_id: grant_id.clone(),
                    }),
                    Some(GrantReports {
                        grant_id: grant_id.clone(),
                        ..Default::default()
                    }),
                    Some(GrantKeywords {
                        grant_id,
                        keywords: keywords.clone(),
                    }),
                )
            }
            None => (None, None, None),
        };

        let mut extra = BTreeMap::new();
        if !fundings.is_empty() {
            extra.insert("available_budget".to_string(), json!({"amount": "", "change": "", "note": ""}));
            extra.insert("partners".to_string(), json!({"Academic Partners": 0, "Industry Partners": 0}));
        }

        let bundle = GrantsBundle {
            name: name.trim().to_string(),
            last_awarded_grant,
            totals_by_currency: totals,
            total_grants_awarded,
            keywords,
            breakdown,
            reports,
            keywords_section,
            fundings,
            extra,
        };
        self.absorb_existing(bundle, existing)
    }

    fn limit_keywords(&self, keywords: &[String]) -> Vec<String> {
        keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .take(self.keyword_limit)
            .map(str::to_string)
            .collect()
    }

    fn last_awarded_grant(&self, record: &FundingRecord, keywords: &[String]) -> LastAwardedGrant {
        let duration = match (record.start_date.year, record.end_date.year) {
            (Some(start), Some(end)) => format!("{}–{}", start, end),
            _ => String::new(),
        };
        LastAwardedGrant {
            title: record.title.clone(),
            grant_id: record.grant_external_id.clone(),
            agency: record.agency.clone(),
            agency_short: agency_short(&record.agency, self.agency_short_len),
            funding_type: record.funding_type.clone(),
            start: render_date(&record.start_date),
            end: render_date(&record.end_date),
            duration,
            amount_awarded: format_amount(&record.currency, record.amount),
            tags: keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .take(self.tag_limit)
                .map(str::to_string)
                .collect(),
        }
    }

    /// Carry request-supplied grants data into the bundle
    ///
    /// Computed fields win when present. Otherwise the request's values fill
    /// the typed fields, and keys the bundle does not model pass through in
    /// `extra` (request values replace the empty defaults there).
    pub fn absorb_existing(&self, mut bundle: GrantsBundle, existing: &Map<String, Value>) -> GrantsBundle {
        for (key, value) in existing {
            match key.as_str() {
                "name" => {
                    let requested = value.as_str().unwrap_or_default().to_string();
                    bundle.name = std::mem::take(&mut bundle.name).merge(requested, &self.policy);
                }
                "keywords" => {
                    if bundle.keywords.is_empty() {
                        bundle.keywords = string_list_from_value(value)
                            .into_iter()
                            .take(self.keyword_limit)
                            .collect();
                    }
                }
                // Already merged into the computed list
                "fundings" => {}
                "totals_by_currency" => {
                    if bundle.totals_by_currency.is_empty() {
                        if let Ok(totals) = serde_json::from_value(value.clone()) {
                            bundle.totals_by_currency = totals;
                        }
                    }
                }
                "last_awarded_grant" => {
                    if bundle.last_awarded_grant.is_none() {
                        match serde_json::from_value::<LastAwardedGrant>(value.clone()) {
                            Ok(grant) => bundle.last_awarded_grant = Some(grant),
                            Err(e) => tracing::debug!(error = %e, "Ignoring malformed request last_awarded_grant"),
                        }
                    }
                }
                "total_grants_awarded" => {
                    if bundle.total_grants_awarded.is_none() {
                        bundle.total_grants_awarded = AggregateAmount::from_value(value);
                    }
                }
                "breakdown" if bundle.breakdown.is_some() => {}
                "reports" if bundle.reports.is_some() => {}
                "keywords_section" if bundle.keywords_section.is_some() => {}
                _ => {
                    bundle.extra.insert(key.clone(), value.clone());
                }
            }
        }
        bundle
    }
}

/// Same title and agency from two sources is one funding
pub fn funding_key(record: &FundingRecord) -> (String, String) {
    (fold_text(&record.title), fold_text(&record.agency))
}

/// Funding records listed in request grants data; malformed entries are skipped
fn requested_fundings(existing: &Map<String, Value>) -> Vec<FundingRecord> {
    let Some(items) = existing.get("fundings").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<FundingRecord>(item.clone()) {
            Ok(record) => Some(settle_amount(record)),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed request funding");
                None
            }
        })
        .collect()
}

fn aggregate_note(sources: &[Directory]) -> String {
    if sources.is_empty() {
        return "From directory fundings".to_string();
    }
    let labels: Vec<&str> = sources.iter().map(Directory::label).collect();
    format!("From {} fundings", labels.join(", "))
}
