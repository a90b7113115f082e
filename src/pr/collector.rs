use std::future::Future;
use tracing::{debug, info, instrument, warn};

use super::issues::resolve_linked_issues;
use super::refs::extract_issue_refs;
use super::types::{EnrichedPullRequest, Identity, PullRequestRecord};
use super::{PrError, PullRequestHost};

/// Fixed search page size.
pub const SEARCH_PAGE_SIZE: u32 = 30;

/// Gathers merged PRs and their enrichment facets from a host.
pub struct Collector<'a> {
    host: &'a dyn PullRequestHost,
}

impl<'a> Collector<'a> {
    pub fn new(host: &'a dyn PullRequestHost) -> Self {
        Self { host }
    }

    /// Resolve the configured credential. Fails the run on rejection.
    pub async fn authenticate(&self) -> Result<Identity, PrError> {
        self.host.authenticate().await
    }

    /// All merged PRs authored by `identity`, in search order (most recently
    /// updated first).
    ///
    /// Each hit is re-read as a full PR; hits without a merge timestamp are
    /// dropped. A hit that cannot be resolved is skipped, and a failing search
    /// page ends pagination with what was gathered so far.
    #[instrument(skip(self), fields(login = %identity.login))]
    pub async fn fetch_merged(&self, identity: &Identity) -> Vec<PullRequestRecord> {
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let hits = match self
                .host
                .search_merged(identity, page, SEARCH_PAGE_SIZE)
                .await
            {
                Ok(hits) => hits,
                Err(err) => {
                    warn!(page, error = %err, "search page failed; stopping pagination");
                    break;
                }
            };
            let page_len = hits.len();
            debug!(page, hits = page_len, "search page");

            for hit in hits {
                match self.host.pull_request(&hit.repo, hit.number).await {
                    Ok(snapshot) => match snapshot.into_merged() {
                        Some(record) => records.push(record),
                        None => debug!(
                            repo = %hit.repo.full_name(),
                            pr = hit.number,
                            "search hit is not merged; skipping"
                        ),
                    },
                    Err(err) => warn!(
                        repo = %hit.repo.full_name(),
                        pr = hit.number,
                        error = %err,
                        "could not resolve search hit"
                    ),
                }
            }

            if page_len < SEARCH_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        info!(merged = records.len(), "collected merged pull requests");
        records
    }

    /// Fetch the diff, changed files and review comments concurrently, then
    /// resolve issues linked from the PR body.
    ///
    /// Each facet degrades to its empty value on failure without affecting
    /// the others.
    #[instrument(skip(self, record), fields(repo = %record.repo.full_name(), pr = record.number))]
    pub async fn enrich(&self, record: PullRequestRecord) -> EnrichedPullRequest {
        let repo = &record.repo;
        let number = record.number;

        let (diff, files, comments) = tokio::join!(
            facet_or_default("diff", self.host.diff(repo, number)),
            facet_or_default("files", self.host.changed_files(repo, number)),
            facet_or_default("comments", self.host.review_comments(repo, number)),
        );
        let diff = Some(diff).filter(|d| !d.is_empty());

        let refs = extract_issue_refs(record.body.as_deref());
        let linked_issues = resolve_linked_issues(self.host, repo, &refs).await;
        debug!(
            files = files.len(),
            comments = comments.len(),
            linked_issues = linked_issues.len(),
            "enriched pull request"
        );

        EnrichedPullRequest {
            record,
            diff,
            files,
            comments,
            linked_issues,
        }
    }
}

/// Await one facet, substituting its empty value on failure.
async fn facet_or_default<T, F>(facet: &'static str, fetch: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, PrError>>,
{
    match fetch.await {
        Ok(value) => value,
        Err(err) => {
            warn!(facet, error = %err, "facet fetch failed; using empty value");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::test_support::{snapshot, Facet, FakeHost};
    use crate::pr::types::{ChangedFile, IssueDetails, ReviewComment, SearchHit};
    use crate::pr::RepoRef;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    const MERGED: Option<&str> = Some("2024-03-05T10:00:00Z");

    fn identity() -> Identity {
        Identity {
            login: "octo".to_string(),
        }
    }

    fn enrich_host() -> FakeHost {
        let mut pr = snapshot("acme", "widgets", 42, MERGED);
        pr.body = Some("Fixes #12".to_string());
        let mut host = FakeHost::default().with_pull(pr);
        host.diffs.insert(42, "diff --git a/x b/x\n".to_string());
        host.files.insert(
            42,
            vec![ChangedFile {
                filename: "x".to_string(),
                status: "modified".to_string(),
                additions: 1,
                deletions: 1,
                patch: Some("@@ -1 +1 @@".to_string()),
            }],
        );
        host.comments.insert(
            42,
            vec![ReviewComment {
                path: "x".to_string(),
                body: "nit".to_string(),
                diff_hunk: None,
            }],
        );
        host.issues.insert(
            12,
            IssueDetails {
                title: Some("Bug".to_string()),
                body: None,
            },
        );
        host
    }

    async fn merged_record(host: &FakeHost) -> PullRequestRecord {
        Collector::new(host)
            .fetch_merged(&identity())
            .await
            .into_iter()
            .next()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_merged_drops_unmerged_hits() {
        let host = FakeHost::default()
            .with_pull(snapshot("acme", "widgets", 1, MERGED))
            .with_pull(snapshot("acme", "widgets", 2, None));

        let records = Collector::new(&host).fetch_merged(&identity()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 1);
    }

    #[tokio::test]
    async fn test_fetch_merged_stops_on_short_page() {
        let mut host = FakeHost::default();
        for n in 0..(SEARCH_PAGE_SIZE as u64 + 5) {
            host = host.with_pull(snapshot("acme", "widgets", n + 1, MERGED));
        }

        let records = Collector::new(&host).fetch_merged(&identity()).await;
        assert_eq!(records.len(), SEARCH_PAGE_SIZE as usize + 5);
        assert_eq!(*host.pages_requested.lock().unwrap(), vec![1, 2]);
        // search order is kept
        assert_eq!(records[0].number, 1);
        assert_eq!(records.last().unwrap().number, SEARCH_PAGE_SIZE as u64 + 5);
    }

    #[tokio::test]
    async fn test_fetch_merged_stops_on_empty_page() {
        let mut host = FakeHost::default();
        for n in 0..SEARCH_PAGE_SIZE as u64 {
            host = host.with_pull(snapshot("acme", "widgets", n + 1, MERGED));
        }

        let records = Collector::new(&host).fetch_merged(&identity()).await;
        assert_eq!(records.len(), SEARCH_PAGE_SIZE as usize);
        assert_eq!(host.search_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_merged_skips_unresolvable_hit() {
        let mut host = FakeHost::default().with_pull(snapshot("acme", "widgets", 1, MERGED));
        host.hits.push(SearchHit {
            repo: RepoRef::new("acme", "gone"),
            number: 9,
        });

        let records = Collector::new(&host).fetch_merged(&identity()).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_merged_keeps_records_before_failed_page() {
        let mut host = FakeHost::default();
        for n in 0..SEARCH_PAGE_SIZE as u64 {
            host = host.with_pull(snapshot("acme", "widgets", n + 1, MERGED));
        }
        host.failing_pages.insert(2);

        let records = Collector::new(&host).fetch_merged(&identity()).await;
        assert_eq!(records.len(), SEARCH_PAGE_SIZE as usize);
    }

    #[tokio::test]
    async fn test_authenticate_rejection_is_error() {
        let host = FakeHost {
            reject_token: true,
            ..FakeHost::default()
        };
        let result = Collector::new(&host).authenticate().await;
        assert!(matches!(result, Err(PrError::Unauthorized(401))));
    }

    #[tokio::test]
    async fn test_enrich_collects_all_facets_and_issues() {
        let host = enrich_host();
        let record = merged_record(&host).await;

        let enriched = Collector::new(&host).enrich(record).await;
        assert!(enriched.diff.is_some());
        assert_eq!(enriched.files.len(), 1);
        assert_eq!(enriched.comments.len(), 1);
        assert_eq!(enriched.linked_issues.len(), 1);
        assert_eq!(enriched.linked_issues[0].title.as_deref(), Some("Bug"));
        assert_eq!(host.enrich_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_enrich_comment_failure_is_facet_local() {
        let mut host = enrich_host();
        host.failing.insert((42, Facet::Comments));
        let record = merged_record(&host).await;

        let enriched = Collector::new(&host).enrich(record).await;
        assert!(enriched.comments.is_empty());
        assert!(enriched.diff.is_some());
        assert_eq!(enriched.files.len(), 1);
        assert_eq!(enriched.linked_issues.len(), 1);
    }

    #[tokio::test]
    async fn test_enrich_all_facets_failing() {
        let mut host = enrich_host();
        host.failing.insert((42, Facet::Diff));
        host.failing.insert((42, Facet::Files));
        host.failing.insert((42, Facet::Comments));
        let record = merged_record(&host).await;

        let enriched = Collector::new(&host).enrich(record).await;
        assert!(enriched.diff.is_none());
        assert!(enriched.files.is_empty());
        assert!(enriched.comments.is_empty());
        assert_eq!(enriched.record.number, 42);
    }

    #[tokio::test]
    async fn test_enrich_fetches_facets_concurrently() {
        let mut host = enrich_host();
        host.facet_barrier = Some(Arc::new(Barrier::new(3)));
        let record = merged_record(&host).await;

        // Each facet waits for the other two; fetching one at a time never finishes.
        let enriched = tokio::time::timeout(
            Duration::from_secs(5),
            Collector::new(&host).enrich(record),
        )
        .await
        .expect("facet fetches did not overlap");
        assert_eq!(enriched.files.len(), 1);
        assert_eq!(host.enrich_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_enrich_keeps_diff_when_files_fail() {
        let mut host = enrich_host();
        host.diffs.insert(42, "+UNIQUE_DIFF_LINE\n".to_string());
        host.failing.insert((42, Facet::Files));
        let record = merged_record(&host).await;

        let enriched = Collector::new(&host).enrich(record).await;
        let payload = crate::payload::assemble(&enriched);
        let json = serde_json::to_string(&payload).unwrap();
        assert!(payload.files.is_empty());
        assert!(json.contains("UNIQUE_DIFF_LINE"));
    }
}
