use chrono::{DateTime, Utc};
use std::fmt;

use crate::pr::PullRequestRecord;

const UNKNOWN: &str = "unknown";

/// Stable identity string for a PR: `{owner}_{repo}_PR{number}_{YYYY-MM-DD}`.
///
/// Used as cache key, artifact filename and the basis of the display title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StemKey(String);

impl StemKey {
    /// Derive the stem from a repo full name (`owner/repo`), PR number and
    /// merge time. Missing parts become `unknown`.
    pub fn derive(repo_full_name: Option<&str>, number: u64, merged_at: Option<DateTime<Utc>>) -> Self {
        let repo = repo_full_name
            .filter(|name| !name.is_empty())
            .map(|name| name.replace('/', "_"))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let date = merged_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        StemKey(format!("{repo}_PR{number}_{date}"))
    }

    /// Stem for a merged record, keyed on the base repository.
    pub fn for_record(record: &PullRequestRecord) -> Self {
        let full_name = record
            .base_repo
            .clone()
            .unwrap_or_else(|| record.repo.full_name());
        Self::derive(Some(full_name.as_str()), record.number, Some(record.merged_at))
    }

    /// Human-readable title: underscores become ` / `, then hyphens become
    /// spaces.
    pub fn display_title(&self) -> String {
        self.0.replace('_', " / ").replace('-', " ")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
