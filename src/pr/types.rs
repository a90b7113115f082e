use chrono::{DateTime, Utc};

/// The authenticated GitHub user whose PRs are collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub login: String,
}

/// Owner/name pair for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse the `repository_url` carried by search hits,
    /// e.g. `https://api.github.com/repos/{owner}/{repo}`.
    pub fn from_api_url(url: &str) -> Option<Self> {
        let mut segments = url.trim_end_matches('/').rsplit('/');
        let name = segments.next().filter(|s| !s.is_empty())?;
        let owner = segments.next().filter(|s| !s.is_empty())?;
        Some(Self::new(owner, name))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A lightweight issue-shaped search result that still needs resolving
/// to a full pull request.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub repo: RepoRef,
    pub number: u64,
}

/// A full pull request as the host reports it, merged or not.
#[derive(Debug, Clone)]
pub struct PullSnapshot {
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    /// `base.repo.full_name`
    pub base_repo: Option<String>,
}

impl PullSnapshot {
    /// Keep the snapshot only if the host reports a merge timestamp.
    pub fn into_merged(self) -> Option<PullRequestRecord> {
        let merged_at = self.merged_at?;
        Some(PullRequestRecord {
            repo: self.repo,
            number: self.number,
            title: self.title,
            body: self.body,
            html_url: self.html_url,
            created_at: self.created_at,
            merged_at,
            base_repo: self.base_repo,
        })
    }
}

/// A merged pull request. Never constructed for unmerged PRs.
#[derive(Debug, Clone)]
pub struct PullRequestRecord {
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: DateTime<Utc>,
    pub base_repo: Option<String>,
}

/// One entry of the PR's changed-file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub filename: String,
    /// added, modified, removed, renamed, ...
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
    /// Absent for binary or very large files.
    pub patch: Option<String>,
}

/// An inline review comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewComment {
    pub path: String,
    pub body: String,
    /// The diff context the comment is anchored to.
    pub diff_hunk: Option<String>,
}

/// Title and body of an issue as returned by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetails {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// An issue referenced from the PR body. Title and body are None when the
/// issue could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedIssueStub {
    pub number: u64,
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A merged PR plus its independently fetched facets.
#[derive(Debug, Clone)]
pub struct EnrichedPullRequest {
    pub record: PullRequestRecord,
    /// Unified diff; None when the diff fetch failed.
    pub diff: Option<String>,
    pub files: Vec<ChangedFile>,
    pub comments: Vec<ReviewComment>,
    pub linked_issues: Vec<LinkedIssueStub>,
}
