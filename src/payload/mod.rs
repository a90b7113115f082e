pub mod types;

pub use types::{CommentEntry, DiffHunkTable, FileEntry, IssueEntry, LlmPayload, PayloadMetadata};

use chrono::SecondsFormat;
use tracing::debug;

use crate::pr::EnrichedPullRequest;

/// Build the summarizer document for one enriched PR.
///
/// Review comments keep only a `hunk_ref` into a per-PR table of unique diff
/// contexts, so each context appears once however many comments share it.
/// Per-file patches carry the change; the raw unified diff is only included
/// when the changed-file list came back empty.
pub fn assemble(pr: &EnrichedPullRequest) -> LlmPayload {
    let linked_issues = pr
        .linked_issues
        .iter()
        .map(|issue| IssueEntry {
            number: issue.number,
            title: issue.title.clone(),
            body: issue.body.clone(),
        })
        .collect();

    let files: Vec<FileEntry> = pr
        .files
        .iter()
        .map(|file| FileEntry {
            filename: file.filename.clone(),
            status: file.status.clone(),
            additions: file.additions,
            deletions: file.deletions,
            patch: file.patch.clone(),
        })
        .collect();

    let mut hunks = DiffHunkTable::default();
    let comments: Vec<CommentEntry> = pr
        .comments
        .iter()
        .map(|comment| CommentEntry {
            path: comment.path.clone(),
            body: comment.body.clone(),
            hunk_ref: comment
                .diff_hunk
                .as_deref()
                .filter(|context| !context.is_empty())
                .map(|context| hunks.intern(context)),
        })
        .collect();
    let diff = if files.is_empty() { pr.diff.clone() } else { None };
    debug!(
        comments = comments.len(),
        unique_hunks = hunks.len(),
        raw_diff = diff.is_some(),
        "assembled payload"
    );

    let record = &pr.record;
    LlmPayload {
        linked_issues,
        metadata: PayloadMetadata {
            title: record.title.clone(),
            body: record.body.clone(),
            created_at: record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            merged_at: record.merged_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            number: record.number,
            url: record.html_url.clone(),
        },
        files,
        comments,
        diff_hunks: (!hunks.is_empty()).then_some(hunks),
        diff,
    }
}
