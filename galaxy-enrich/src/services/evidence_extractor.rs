//! Evidence extraction from a reconciliation request
//!
//! Structured inputs are preferred. When only raw document text is available,
//! titles are taken from lines under a publications heading and DOIs are
//! matched anywhere in the text.

use crate::services::text_normalizer::{fold_text, normalize_doi, normalize_title};
use crate::types::{EvidenceSet, ReconcileRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Minimum tokens for a line to count as a title
const MIN_TITLE_TOKENS: usize = 3;
/// Only the head of the document is scanned for affiliation lines
const AFFILIATION_SCAN_CHARS: usize = 2000;
const MAX_AFFILIATION_LINES: usize = 20;
/// All-caps lines up to this many tokens are read as headings
const MAX_HEADING_TOKENS: usize = 6;

const AFFILIATION_HINT_WORDS: [&str; 11] = [
    "university",
    "institute",
    "laboratory",
    "lab",
    "college",
    "department",
    "centre",
    "center",
    "school",
    "faculty",
    "hospital",
];

const PUBLICATION_HEADINGS: [&str; 5] = ["publication", "papers", "articles", "bibliography", "preprints"];

const SECTION_HEADINGS: [&str; 16] = [
    "education",
    "experience",
    "employment",
    "awards",
    "honors",
    "grants",
    "funding",
    "patents",
    "teaching",
    "skills",
    "references",
    "service",
    "presentations",
    "talks",
    "memberships",
    "research interests",
];

static DOI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)10\.\d{4,9}/[^\s"<>]+"#).expect("valid regex"));

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•·▪◦‣]+|\[\d+\]|\(\d+\)|\d+[.)\]])\s*").expect("valid regex")
});

/// Normalized DOIs found anywhere in `text`, first-seen order, no repeats
pub fn extract_dois(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    DOI_PATTERN
        .find_iter(text)
        .filter_map(|m| normalize_doi(m.as_str()))
        .filter(|doi| seen.insert(doi.clone()))
        .collect()
}

/// A line that starts a new document section
fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.ends_with(':') && trimmed.split_whitespace().count() <= MAX_HEADING_TOKENS {
        return true;
    }
    let tokens = trimmed.split_whitespace().count();
    let has_letters = trimmed.chars().any(char::is_alphabetic);
    let all_caps = has_letters && !trimmed.chars().any(char::is_lowercase);
    if all_caps && tokens <= MAX_HEADING_TOKENS {
        return true;
    }
    let folded = fold_text(trimmed);
    SECTION_HEADINGS.contains(&folded.as_str()) || is_publication_heading_text(&folded)
}

fn is_publication_heading_text(folded: &str) -> bool {
    folded.split(' ').count() <= MAX_HEADING_TOKENS
        && PUBLICATION_HEADINGS.iter().any(|h| folded.contains(h))
}

fn is_publication_heading(line: &str) -> bool {
    is_heading(line) && is_publication_heading_text(&fold_text(line))
}

/// Candidate titles: lines of at least three tokens under a publications heading
///
/// A section ends at the next heading-like line that is not itself a
/// publications heading. List markers (`-`, `•`, `[3]`, `12.`) are stripped.
pub fn extract_titles(text: &str) -> Vec<String> {
    let mut titles = Vec::new();
    let mut seen = HashSet::new();
    let mut in_section = false;

    for line in text.lines() {
        if is_publication_heading(line) {
            in_section = true;
            continue;
        }
        if is_heading(line) {
            in_section = false;
            continue;
        }
        if !in_section {
            continue;
        }
        let stripped = LIST_MARKER.replace(line, "");
        let candidate = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        if candidate.split(' ').count() < MIN_TITLE_TOKENS {
            continue;
        }
        if seen.insert(candidate.to_lowercase()) {
            titles.push(candidate);
        }
    }
    titles
}

/// Lines near the top of the document that mention an institution
pub fn extract_affiliation_lines(text: &str) -> Vec<String> {
    let head: String = text.chars().take(AFFILIATION_SCAN_CHARS).collect();
    let mut seen = HashSet::new();
    head.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            AFFILIATION_HINT_WORDS.iter().any(|w| lower.contains(w))
        })
        .filter(|line| seen.insert(line.clone()))
        .take(MAX_AFFILIATION_LINES)
        .collect()
}

/// Evidence for one request
///
/// Titles: explicit evidence titles, else request publication titles, else
/// titles extracted from the text. DOIs: request publications plus the text.
/// Affiliation hint: explicit hint, else first profile affiliation, else the
/// first affiliation-looking line of the text.
pub fn build_evidence(request: &ReconcileRequest) -> EvidenceSet {
    let text = request.evidence_text.as_deref().unwrap_or_default();

    let raw_titles: Vec<String> = if !request.evidence_titles.is_empty() {
        request.evidence_titles.clone()
    } else if request.publications.iter().any(|p| !p.title.trim().is_empty()) {
        request.publications.iter().map(|p| p.title.clone()).collect()
    } else {
        extract_titles(text)
    };

    let mut dois: Vec<String> = request
        .publications
        .iter()
        .filter_map(|p| p.doi.as_deref().and_then(normalize_doi))
        .collect();
    dois.extend(extract_dois(text));

    let hint = request
        .affiliation_hint
        .clone()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            request
                .profile
                .affiliations
                .iter()
                .find(|a| !a.trim().is_empty())
                .cloned()
        })
        .or_else(|| extract_affiliation_lines(text).into_iter().next());

    let evidence = EvidenceSet::new(raw_titles.iter().map(|t| normalize_title(t)), dois, hint);
    tracing::debug!(
        titles = evidence.titles().len(),
        dois = evidence.dois().len(),
        has_affiliation = evidence.affiliation_hint().is_some(),
        "Built evidence set"
    );
    evidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkRecord;

    const CV: &str = "\
Ada Lovelace
Department of Mathematics, University of London
ada@example.org

EDUCATION
Home schooling under Augustus De Morgan

Selected Publications:
1. Sketch of the Analytical Engine invented by Charles Babbage (1843)
- Notes on Bernoulli numbers, doi:10.1000/BERN.1843.
[3] Short note
• On the calculus of the nervous system

Awards
Royal Society honorary mention for analytical engines
";

    #[test]
    fn test_titles_only_from_publications_section() {
        let titles = extract_titles(CV);
        assert_eq!(
            titles,
            vec![
                "Sketch of the Analytical Engine invented by Charles Babbage (1843)",
                "Notes on Bernoulli numbers, doi:10.1000/BERN.1843.",
                "On the calculus of the nervous system",
            ]
        );
    }

    #[test]
    fn test_dois_found_anywhere() {
        let text = "see https://doi.org/10.1000/ABC.1, and 10.1000/abc.1; also 10.55555/x-y.z)";
        assert_eq!(extract_dois(text), vec!["10.1000/abc.1", "10.55555/x-y.z"]);
        assert_eq!(extract_dois(CV), vec!["10.1000/bern.1843"]);
    }

    #[test]
    fn test_affiliation_lines() {
        let lines = extract_affiliation_lines(CV);
        assert_eq!(lines[0], "Department of Mathematics, University of London");
    }

    #[test]
    fn test_structured_titles_preferred() {
        let request = ReconcileRequest {
            evidence_titles: vec!["Deep Learning for Protein Folding: a survey".to_string()],
            evidence_text: Some(CV.to_string()),
            ..Default::default()
        };
        let evidence = build_evidence(&request);
        assert_eq!(evidence.titles().len(), 1);
        assert_eq!(
            evidence.titles().iter().next().unwrap().as_str(),
            "deep learning for protein folding"
        );
        assert!(evidence.dois().contains("10.1000/bern.1843"));
        assert_eq!(
            evidence.affiliation_hint(),
            Some("Department of Mathematics, University of London")
        );
    }

    #[test]
    fn test_request_publications_feed_titles_and_dois() {
        let request = ReconcileRequest {
            affiliation_hint: Some("  ".to_string()),
            publications: vec![WorkRecord {
                title: "Analytical engines".to_string(),
                doi: Some("https://doi.org/10.1/AE".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let evidence = build_evidence(&request);
        assert_eq!(evidence.titles().len(), 1);
        assert!(evidence.dois().contains("10.1/ae"));
        assert_eq!(evidence.affiliation_hint(), None);
    }

    #[test]
    fn test_empty_request_has_no_evidence() {
        assert!(build_evidence(&ReconcileRequest::default()).is_empty());
    }
}
