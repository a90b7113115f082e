pub mod collector;
pub mod github;
pub mod issues;
pub mod refs;
pub mod types;

pub use collector::Collector;
pub use github::GitHubClient;
pub use types::{
    ChangedFile, EnrichedPullRequest, Identity, IssueDetails, PullRequestRecord, PullSnapshot,
    RepoRef, ReviewComment, SearchHit,
};
#[cfg(test)]
pub use types::LinkedIssueStub;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("GitHub rejected the token ({0}); check github.token or GITHUB_TOKEN")]
    Unauthorized(u16),

    #[error("GitHub token not found in configuration or environment")]
    MissingToken,
}

/// Read access to a pull-request host. Every call can fail on its own;
/// callers decide whether a failure is fatal.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Resolve the token to the user it belongs to.
    async fn authenticate(&self) -> Result<Identity, PrError>;

    /// One page of merged PRs authored by `identity`, most recently updated
    /// first. `page` is 1-based.
    async fn search_merged(
        &self,
        identity: &Identity,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SearchHit>, PrError>;

    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullSnapshot, PrError>;

    /// Unified diff text for the PR.
    async fn diff(&self, repo: &RepoRef, number: u64) -> Result<String, PrError>;

    async fn changed_files(&self, repo: &RepoRef, number: u64)
        -> Result<Vec<ChangedFile>, PrError>;

    async fn review_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ReviewComment>, PrError>;

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<IssueDetails, PrError>;
}

#[cfg(test)]
pub(crate) mod test_support;
