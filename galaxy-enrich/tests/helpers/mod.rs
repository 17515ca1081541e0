//! In-memory directories for integration tests (no network)

#![allow(dead_code)]

use async_trait::async_trait;
use galaxy_enrich::adapters::{CitationMetricsSource, PatentSource, SourceAdapter, WorkEnricher};
use galaxy_enrich::types::{
    Candidate, Directory, FundingRecord, PatentRecord, Profile, RecordSource, WorkRecord,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Directory answering from fixed maps keyed by source id
pub struct FakeDirectory {
    directory: Directory,
    candidates: Vec<Candidate>,
    works: HashMap<String, Vec<WorkRecord>>,
    fundings: HashMap<String, Vec<FundingRecord>>,
    details: HashMap<(String, String), FundingRecord>,
    profiles: HashMap<String, Profile>,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(directory: Directory) -> Self {
        Self {
            directory,
            candidates: Vec::new(),
            works: HashMap::new(),
            fundings: HashMap::new(),
            details: HashMap::new(),
            profiles: HashMap::new(),
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }

    pub fn candidate(mut self, id: &str, affiliation: &str, works: Vec<WorkRecord>) -> Self {
        self.candidates.push(Candidate {
            source_id: id.to_string(),
            directory: self.directory,
            display_name: "Ada Lovelace".to_string(),
            affiliation_text: affiliation.to_string(),
            raw: serde_json::Value::Null,
        });
        let source = RecordSource::from(self.directory);
        self.works.insert(
            id.to_string(),
            works
                .into_iter()
                .map(|w| WorkRecord { source, ..w })
                .collect(),
        );
        self
    }

    pub fn fundings(mut self, id: &str, fundings: Vec<FundingRecord>) -> Self {
        self.fundings.insert(id.to_string(), fundings);
        self
    }

    pub fn detail(mut self, id: &str, put_code: &str, detail: FundingRecord) -> Self {
        self.details.insert((id.to_string(), put_code.to_string()), detail);
        self
    }

    pub fn profile(mut self, id: &str, profile: Profile) -> Self {
        self.profiles.insert(id.to_string(), profile);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FakeDirectory {
    fn directory(&self) -> Directory {
        self.directory
    }

    async fn search_candidates(&self, _name: &str, _hint: Option<&str>, limit: usize) -> Vec<Candidate> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.candidates.iter().take(limit).cloned().collect()
    }

    async fn fetch_works(&self, source_id: &str, _max_pages: usize) -> Vec<WorkRecord> {
        self.works.get(source_id).cloned().unwrap_or_default()
    }

    async fn fetch_funding_summaries(&self, source_id: &str) -> Vec<FundingRecord> {
        self.fundings.get(source_id).cloned().unwrap_or_default()
    }

    async fn fetch_funding_detail(&self, source_id: &str, record_id: &str) -> Option<FundingRecord> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .get(&(source_id.to_string(), record_id.to_string()))
            .cloned()
    }

    async fn fetch_profile(&self, source_id: &str) -> Profile {
        self.profiles.get(source_id).cloned().unwrap_or_default()
    }
}

/// Patent search returning a fixed list
pub struct FakePatents(pub Vec<PatentRecord>);

#[async_trait]
impl PatentSource for FakePatents {
    fn name(&self) -> &'static str {
        "fake_patents"
    }

    async fn search_patents(&self, _inventor: &str) -> Vec<PatentRecord> {
        self.0.clone()
    }
}

/// DOI lookup from a fixed map
pub struct FakeCrossref(pub HashMap<String, WorkRecord>);

#[async_trait]
impl WorkEnricher for FakeCrossref {
    async fn enrich(&self, doi: &str) -> Option<WorkRecord> {
        self.0.get(doi).cloned()
    }
}

/// Citation index answering one total, recording the profile URLs it was given
pub struct FakeScholar {
    pub total: Option<u64>,
    pub seen_urls: std::sync::Mutex<Vec<Option<String>>>,
}

impl FakeScholar {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total,
            seen_urls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CitationMetricsSource for FakeScholar {
    fn name(&self) -> &'static str {
        "fake_scholar"
    }

    async fn total_citations(&self, profile_url: Option<&str>, _name: &str) -> Option<u64> {
        self.seen_urls.lock().unwrap().push(profile_url.map(str::to_string));
        self.total
    }
}

pub fn work(title: &str, doi: Option<&str>, citations: i64) -> WorkRecord {
    WorkRecord {
        title: title.to_string(),
        doi: doi.map(str::to_string),
        citation_count: citations,
        ..Default::default()
    }
}

pub fn patent(title: &str, number: &str) -> PatentRecord {
    PatentRecord {
        title: title.to_string(),
        number: number.to_string(),
        ..Default::default()
    }
}
