//! Patent status inference and normalization
//!
//! Status comes from the kind code at the end of the publication number:
//! `B`/`C` (and US `E` reissues, `S` designs, `P` plants) are grants, `A` is a
//! published application. Without a kind code a bare number counts as
//! granted and a missing number as merely filed.

use crate::services::record_deduplicator::dedupe_patents;
use crate::types::{PatentRecord, PatentStatus};
use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing kind code, separated from the serial by a digit, space, or dash
static KIND_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[0-9\s\-/])([A-Z])([0-9]?)$").expect("valid regex"));

/// Kind code of a publication number (`"US 10,123,456 B2"` → `"B2"`)
pub fn kind_code(number: &str) -> Option<String> {
    let upper = number.trim().to_uppercase();
    let caps = KIND_CODE.captures(&upper)?;
    // A lone country code ("US") is not a kind code
    if caps.get(0).map(|m| m.start()) == Some(0) {
        return None;
    }
    Some(format!("{}{}", &caps[1], &caps[2]))
}

pub fn infer_status(number: &str) -> PatentStatus {
    match kind_code(number).as_deref().and_then(|k| k.chars().next()) {
        Some('B' | 'C' | 'E' | 'S' | 'P') => PatentStatus::Granted,
        Some('A') => PatentStatus::Application,
        _ if !number.trim().is_empty() => PatentStatus::Granted,
        _ => PatentStatus::Filed,
    }
}

/// Trim fields, infer status, drop untitled and numberless records, dedupe
pub fn normalize_patents(patents: Vec<PatentRecord>) -> Vec<PatentRecord> {
    let cleaned = patents
        .into_iter()
        .filter_map(|mut patent| {
            patent.title = patent.title.trim().to_string();
            patent.number = patent.number.trim().to_string();
            patent.filed = patent.filed.trim().to_string();
            patent.inventors.retain(|i| !i.trim().is_empty());
            if patent.title.is_empty() && patent.number.is_empty() {
                return None;
            }
            patent.status = infer_status(&patent.number);
            Some(patent)
        })
        .collect();
    dedupe_patents(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        assert_eq!(kind_code("US10123456B2").as_deref(), Some("B2"));
        assert_eq!(kind_code("US 2020/0123456 A1").as_deref(), Some("A1"));
        assert_eq!(kind_code("JP2020123456A").as_deref(), Some("A"));
        assert_eq!(kind_code("10123456"), None);
        assert_eq!(kind_code("US"), None);
        assert_eq!(kind_code(""), None);
    }

    #[test]
    fn test_infer_status() {
        assert_eq!(infer_status("US10123456B1"), PatentStatus::Granted);
        assert_eq!(infer_status("US 10,123,456 B2"), PatentStatus::Granted);
        assert_eq!(infer_status("EP1234567C0"), PatentStatus::Granted);
        assert_eq!(infer_status("US20200123456A1"), PatentStatus::Application);
        assert_eq!(infer_status("WO2019123456A2"), PatentStatus::Application);
        assert_eq!(infer_status("10123456"), PatentStatus::Granted);
        assert_eq!(infer_status(""), PatentStatus::Filed);
    }

    #[test]
    fn test_normalize_patents() {
        let patents = vec![
            PatentRecord {
                title: " Loom controller ".into(),
                number: "US1A1".into(),
                inventors: vec!["Ada".into(), " ".into()],
                ..Default::default()
            },
            PatentRecord::default(),
            PatentRecord {
                title: "Loom controller (dup)".into(),
                number: "us1a1".into(),
                ..Default::default()
            },
            PatentRecord {
                title: "Pending idea".into(),
                filed: "2021-03-04".into(),
                ..Default::default()
            },
        ];
        let out = normalize_patents(patents);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Loom controller");
        assert_eq!(out[0].status, PatentStatus::Application);
        assert_eq!(out[0].inventors, vec!["Ada"]);
        assert_eq!(out[1].status, PatentStatus::Filed);
    }
}
