//! In-memory `PullRequestHost` used by the collector and sync tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use super::types::{
    ChangedFile, Identity, IssueDetails, PullSnapshot, RepoRef, ReviewComment, SearchHit,
};
use super::{PrError, PullRequestHost};

/// Which remote call a fake should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Diff,
    Files,
    Comments,
}

fn failure(endpoint: &str) -> PrError {
    PrError::Status {
        endpoint: endpoint.to_string(),
        status: 500,
    }
}

pub fn snapshot(owner: &str, repo: &str, number: u64, merged_at: Option<&str>) -> PullSnapshot {
    PullSnapshot {
        repo: RepoRef::new(owner, repo),
        number,
        title: format!("PR {number}"),
        body: None,
        html_url: format!("https://github.com/{owner}/{repo}/pull/{number}"),
        created_at: "2024-03-01T09:00:00Z".parse().unwrap(),
        merged_at: merged_at.map(|m| m.parse().unwrap()),
        base_repo: Some(format!("{owner}/{repo}")),
    }
}

#[derive(Default)]
pub struct FakeHost {
    pub reject_token: bool,
    /// Search results in page order; served in slices of `per_page`.
    pub hits: Vec<SearchHit>,
    pub pulls: HashMap<(String, u64), PullSnapshot>,
    pub diffs: HashMap<u64, String>,
    pub files: HashMap<u64, Vec<ChangedFile>>,
    pub comments: HashMap<u64, Vec<ReviewComment>>,
    pub issues: HashMap<u64, IssueDetails>,
    pub failing: HashSet<(u64, Facet)>,
    pub failing_pages: HashSet<u32>,
    pub search_calls: AtomicUsize,
    pub issue_calls: AtomicUsize,
    pub enrich_calls: AtomicUsize,
    pub pages_requested: Mutex<Vec<u32>>,
    /// When set, every facet fetch waits here before answering.
    pub facet_barrier: Option<Arc<Barrier>>,
}

impl FakeHost {
    /// Register a PR both as a search hit and as a full record.
    pub fn with_pull(mut self, snapshot: PullSnapshot) -> Self {
        self.hits.push(SearchHit {
            repo: snapshot.repo.clone(),
            number: snapshot.number,
        });
        self.pulls
            .insert((snapshot.repo.full_name(), snapshot.number), snapshot);
        self
    }

    async fn facet<T: Clone + Default>(
        &self,
        number: u64,
        facet: Facet,
        source: &HashMap<u64, T>,
    ) -> Result<T, PrError> {
        self.enrich_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.facet_barrier {
            barrier.wait().await;
        }
        if self.failing.contains(&(number, facet)) {
            return Err(failure(&format!("{facet:?}")));
        }
        Ok(source.get(&number).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PullRequestHost for FakeHost {
    async fn authenticate(&self) -> Result<Identity, PrError> {
        if self.reject_token {
            return Err(PrError::Unauthorized(401));
        }
        Ok(Identity {
            login: "octo".to_string(),
        })
    }

    async fn search_merged(
        &self,
        _identity: &Identity,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SearchHit>, PrError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.pages_requested.lock().unwrap().push(page);
        if self.failing_pages.contains(&page) {
            return Err(failure("/search/issues"));
        }
        let per_page = per_page as usize;
        let start = (page as usize - 1) * per_page;
        Ok(self.hits.iter().skip(start).take(per_page).cloned().collect())
    }

    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullSnapshot, PrError> {
        self.pulls
            .get(&(repo.full_name(), number))
            .cloned()
            .ok_or_else(|| failure("pull"))
    }

    async fn diff(&self, _repo: &RepoRef, number: u64) -> Result<String, PrError> {
        self.facet(number, Facet::Diff, &self.diffs).await
    }

    async fn changed_files(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ChangedFile>, PrError> {
        self.facet(number, Facet::Files, &self.files).await
    }

    async fn review_comments(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ReviewComment>, PrError> {
        self.facet(number, Facet::Comments, &self.comments).await
    }

    async fn issue(&self, _repo: &RepoRef, number: u64) -> Result<IssueDetails, PrError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        self.issues
            .get(&number)
            .cloned()
            .ok_or_else(|| PrError::Status {
                endpoint: format!("/issues/{number}"),
                status: 404,
            })
    }
}
