//! Publication verification against the evidence text
//!
//! A work is verified when its title reaches the threshold against any single
//! line of the document. The best score is kept even when unverified.

use crate::services::metrics_calculator::metrics_for_works;
use crate::services::similarity::similarity;
use crate::types::{PublicationEntry, PublicationsBundle, WorkRecord};

/// Non-empty, whitespace-collapsed lines
fn evidence_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// `(verified, best score)` of one title; stops at the first line reaching the threshold
fn match_title(title: &str, lines: &[String], threshold: u8) -> (bool, u8) {
    if title.trim().is_empty() {
        return (false, 0);
    }
    let mut best = 0;
    for line in lines {
        let score = similarity(title, line);
        if score > best {
            best = score;
            if best >= threshold {
                break;
            }
        }
    }
    (best >= threshold, best)
}

pub fn verify_publications(works: Vec<WorkRecord>, evidence_text: &str, threshold: u8) -> Vec<PublicationEntry> {
    let lines = evidence_lines(evidence_text);
    works
        .into_iter()
        .map(|record| {
            let (verified, score) = match_title(&record.title, &lines, threshold);
            PublicationEntry {
                record,
                verified,
                score,
            }
        })
        .collect()
}

/// Verified list plus metrics over the same works
pub fn publications_bundle(
    name: &str,
    works: Vec<WorkRecord>,
    evidence_text: &str,
    threshold: u8,
    evidence_only: bool,
) -> PublicationsBundle {
    let metrics = metrics_for_works(&works);
    let publications = verify_publications(works, evidence_text, threshold);
    let verified = publications.iter().filter(|p| p.verified).count();
    tracing::debug!(
        total = publications.len(),
        verified,
        evidence_only,
        "Verified publications against evidence text"
    );
    PublicationsBundle {
        name: name.to_string(),
        publications,
        metrics,
        scholar_total_citations: None,
        evidence_only,
    }
}
