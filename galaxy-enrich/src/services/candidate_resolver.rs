//! Candidate Resolution
//!
//! Decides which directory candidate, if any, is the person described by the
//! evidence. Workflow per directory:
//! 1. No evidence titles and no DOIs → no decision (never guess on a name alone)
//! 2. Search candidates by name (at most `max_candidates`)
//! 3. Fetch each candidate's works concurrently (at most `max_pages` pages)
//! 4. Score candidates in rank order; a work carrying an evidence DOI accepts
//!    that candidate immediately
//! 5. Otherwise accept by title/affiliation rules and pick the best accepted
//!    candidate, ties going to the earlier rank
//!
//! Scheduling never changes the outcome: results are always combined in the
//! directory's rank order.

use crate::adapters::SourceAdapter;
use crate::services::similarity::{best_similarity, similarity};
use crate::services::text_normalizer::{normalize_doi, normalize_title};
use crate::types::{Candidate, EvidenceSet, MatchScore, NormalizedTitle, ResolvedIdentity, WorkRecord};
use futures::future::join_all;
use galaxy_common::config::ResolverSettings;
use serde::Serialize;

/// Hard caps regardless of configuration
const MAX_CANDIDATES_CAP: usize = 10;
const MAX_PAGES_CAP: usize = 2;

/// Acceptance thresholds (similarities on the 0-100 scale)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverThresholds {
    pub high: u8,
    pub mid: u8,
    pub affiliation: u8,
    /// Title similarity may fall this far below `mid` when affiliation agrees
    pub affiliation_slack: u8,
    pub max_candidates: usize,
    pub max_pages: usize,
}

impl Default for ResolverThresholds {
    fn default() -> Self {
        Self {
            high: 88,
            mid: 75,
            affiliation: 80,
            affiliation_slack: 2,
            max_candidates: MAX_CANDIDATES_CAP,
            max_pages: MAX_PAGES_CAP,
        }
    }
}

impl From<&ResolverSettings> for ResolverThresholds {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            high: settings.high_thresh,
            mid: settings.mid_thresh,
            affiliation: settings.affiliation_thresh,
            affiliation_slack: settings.affiliation_slack,
            max_candidates: settings.max_candidates.clamp(1, MAX_CANDIDATES_CAP),
            max_pages: settings.max_pages.clamp(1, MAX_PAGES_CAP),
        }
    }
}

/// Which rule accepted a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptRule {
    /// A fetched work carries an evidence DOI
    DoiMatch,
    /// Best title similarity reached `high`
    HighTitle,
    /// Two or more evidence titles reached `mid`
    MultipleMidHits,
    /// Affiliation agrees and titles are close to `mid`
    AffiliationCorroborated,
}

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    InsufficientEvidence,
    NoCandidates,
    Accepted { rank: usize, rule: AcceptRule },
    NoneAccepted,
}

/// Decision plus every score computed on the way
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub identity: ResolvedIdentity,
    pub decision: Decision,
    /// Scores in candidate rank order (cut short by a DOI match)
    pub scores: Vec<MatchScore>,
}

/// Normalized titles of the fetched works, computed once per candidate
fn work_titles(works: &[WorkRecord]) -> Vec<NormalizedTitle> {
    works
        .iter()
        .map(|w| normalize_title(&w.title))
        .filter(|t| !t.is_empty())
        .collect()
}

fn has_doi_hit(works: &[WorkRecord], evidence: &EvidenceSet) -> bool {
    !evidence.dois().is_empty()
        && works
            .iter()
            .filter_map(|w| w.doi.as_deref().and_then(normalize_doi))
            .any(|doi| evidence.dois().contains(&doi))
}

/// Title evidence for one candidate: `(max similarity, mid-confidence hits)`
pub fn title_evidence(evidence: &EvidenceSet, works: &[WorkRecord], mid: u8) -> (u8, usize) {
    let titles = work_titles(works);
    let mut max_similarity = 0;
    let mut hits = 0;
    for evidence_title in evidence.titles() {
        let best = titles
            .iter()
            .map(|t| {
                if t == evidence_title {
                    100
                } else {
                    similarity(evidence_title.as_str(), t.as_str())
                }
            })
            .max()
            .unwrap_or(0);
        if best >= mid {
            hits += 1;
        }
        max_similarity = max_similarity.max(best);
    }
    (max_similarity, hits)
}

/// Affiliation similarity; 0 when either side is unknown
pub fn affiliation_evidence(hint: Option<&str>, affiliation_text: &str) -> u8 {
    match hint {
        Some(hint) if !hint.trim().is_empty() && !affiliation_text.trim().is_empty() => {
            best_similarity(hint, affiliation_text)
        }
        _ => 0,
    }
}

/// Score one candidate from its works and (possibly fetched) affiliation text
pub fn score_candidate(
    candidate: Candidate,
    works: &[WorkRecord],
    affiliation_text: &str,
    evidence: &EvidenceSet,
    thresholds: &ResolverThresholds,
) -> MatchScore {
    let doi_hit = has_doi_hit(works, evidence);
    let (max_title_similarity, mid_confidence_hits) = title_evidence(evidence, works, thresholds.mid);
    MatchScore {
        affiliation_similarity: affiliation_evidence(evidence.affiliation_hint(), affiliation_text),
        candidate,
        max_title_similarity,
        mid_confidence_hits,
        doi_hit,
        works_examined: works.len(),
    }
}

/// Rule accepting `score`, if any (DOI first, then title, then affiliation)
pub fn accept_rule(score: &MatchScore, thresholds: &ResolverThresholds) -> Option<AcceptRule> {
    if score.doi_hit {
        Some(AcceptRule::DoiMatch)
    } else if score.max_title_similarity >= thresholds.high {
        Some(AcceptRule::HighTitle)
    } else if score.mid_confidence_hits >= 2 {
        Some(AcceptRule::MultipleMidHits)
    } else if score.affiliation_similarity >= thresholds.affiliation
        && score.max_title_similarity >= thresholds.mid.saturating_sub(thresholds.affiliation_slack)
    {
        Some(AcceptRule::AffiliationCorroborated)
    } else {
        None
    }
}

/// Best accepted candidate: maximize `title + affiliation/100`, earliest rank on ties
pub fn choose(scores: &[MatchScore], thresholds: &ResolverThresholds) -> Option<(usize, AcceptRule)> {
    let mut best: Option<(usize, AcceptRule, u32)> = None;
    for (rank, score) in scores.iter().enumerate() {
        let Some(rule) = accept_rule(score, thresholds) else {
            continue;
        };
        // Integer form of `max + aff/100` keeps the comparison exact
        let key = u32::from(score.max_title_similarity) * 100 + u32::from(score.affiliation_similarity);
        if best.map_or(true, |(_, _, top)| key > top) {
            best = Some((rank, rule, key));
        }
    }
    best.map(|(rank, rule, _)| (rank, rule))
}

/// Resolver for any directory behind [`SourceAdapter`]
#[derive(Debug, Clone, Default)]
pub struct CandidateResolver {
    thresholds: ResolverThresholds,
}

impl CandidateResolver {
    pub fn new(thresholds: ResolverThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ResolverThresholds {
        &self.thresholds
    }

    /// Resolve `name` in one directory
    pub async fn resolve(
        &self,
        name: &str,
        evidence: &EvidenceSet,
        source: &dyn SourceAdapter,
    ) -> ResolutionReport {
        let directory = source.directory();
        let report = |decision: Decision, scores: Vec<MatchScore>| {
            let identity = match &decision {
                Decision::Accepted { rank, .. } => scores
                    .get(*rank)
                    .map(|s| ResolvedIdentity::accepted(directory, s.candidate.source_id.clone()))
                    .unwrap_or_else(|| ResolvedIdentity::none(directory)),
                _ => ResolvedIdentity::none(directory),
            };
            ResolutionReport {
                identity,
                decision,
                scores,
            }
        };

        if evidence.is_empty() {
            tracing::info!(%directory, "No evidence titles or DOIs, not resolving by name alone");
            return report(Decision::InsufficientEvidence, Vec::new());
        }

        let mut candidates = source
            .search_candidates(name, evidence.affiliation_hint(), self.thresholds.max_candidates)
            .await;
        candidates.truncate(self.thresholds.max_candidates);
        if candidates.is_empty() {
            tracing::info!(%directory, name, "No candidates returned");
            return report(Decision::NoCandidates, Vec::new());
        }

        let max_pages = self.thresholds.max_pages;
        let works: Vec<Vec<WorkRecord>> = join_all(
            candidates
                .iter()
                .map(|c| source.fetch_works(&c.source_id, max_pages)),
        )
        .await;

        // DOI shortcut, earliest rank first
        if let Some(rank) = works.iter().position(|w| has_doi_hit(w, evidence)) {
            let scores: Vec<MatchScore> = candidates
                .into_iter()
                .zip(works.iter())
                .take(rank + 1)
                .map(|(candidate, w)| {
                    let affiliation = candidate.affiliation_text.clone();
                    score_candidate(candidate, w, &affiliation, evidence, &self.thresholds)
                })
                .collect();
            tracing::info!(
                %directory,
                source_id = %scores[rank].candidate.source_id,
                rank,
                "Accepted candidate by DOI match"
            );
            return report(
                Decision::Accepted {
                    rank,
                    rule: AcceptRule::DoiMatch,
                },
                scores,
            );
        }

        // Affiliation text is fetched only where it can still matter
        let hint_present = evidence.affiliation_hint().is_some();
        let affiliations: Vec<String> = join_all(candidates.iter().map(|c| async move {
            if hint_present && c.affiliation_text.trim().is_empty() {
                source.fetch_affiliation_text(&c.source_id).await
            } else {
                c.affiliation_text.clone()
            }
        }))
        .await;

        let scores: Vec<MatchScore> = candidates
            .into_iter()
            .zip(works.iter())
            .zip(affiliations.iter())
            .map(|((candidate, w), affiliation)| {
                score_candidate(candidate, w, affiliation, evidence, &self.thresholds)
            })
            .collect();

        for (rank, score) in scores.iter().enumerate() {
            tracing::debug!(
                %directory,
                rank,
                source_id = %score.candidate.source_id,
                max_title = score.max_title_similarity,
                mid_hits = score.mid_confidence_hits,
                affiliation = score.affiliation_similarity,
                works = score.works_examined,
                "Scored candidate"
            );
        }

        match choose(&scores, &self.thresholds) {
            Some((rank, rule)) => {
                tracing::info!(
                    %directory,
                    source_id = %scores[rank].candidate.source_id,
                    rank,
                    ?rule,
                    "Accepted candidate"
                );
                report(Decision::Accepted { rank, rule }, scores)
            }
            None => {
                tracing::info!(%directory, candidates = scores.len(), "No candidate met acceptance rules");
                report(Decision::NoneAccepted, scores)
            }
        }
    }
}
