use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::types::{IssueDetails, LinkedIssueStub, RepoRef};
use super::PullRequestHost;

/// Resolve each referenced issue's title and body.
///
/// Each distinct number is fetched once, concurrently. The result has one
/// stub per entry of `refs`, in the same order; an issue that cannot be
/// fetched resolves to a stub with no title or body.
pub async fn resolve_linked_issues(
    host: &dyn PullRequestHost,
    repo: &RepoRef,
    refs: &[u64],
) -> Vec<LinkedIssueStub> {
    let mut unique = Vec::new();
    for number in refs {
        if !unique.contains(number) {
            unique.push(*number);
        }
    }

    let fetches = unique.iter().map(|&number| async move {
        match host.issue(repo, number).await {
            Ok(details) => (number, Some(details)),
            Err(err) => {
                warn!(repo = %repo.full_name(), issue = number, error = %err, "linked issue unavailable");
                (number, None)
            }
        }
    });
    let resolved: HashMap<u64, Option<IssueDetails>> = join_all(fetches).await.into_iter().collect();
    debug!(refs = refs.len(), fetched = resolved.len(), "resolved linked issues");

    refs.iter()
        .map(|&number| {
            let details = resolved.get(&number).cloned().flatten();
            LinkedIssueStub {
                number,
                title: details.as_ref().and_then(|d| d.title.clone()),
                body: details.and_then(|d| d.body),
            }
        })
        .collect()
}
