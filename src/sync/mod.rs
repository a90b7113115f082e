pub mod cache;

pub use cache::{CacheError, CacheMarker, SyncCache};

use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, ConfigError, DestinationMode};
use crate::notes::{markdown_to_blocks, summary_section, NoteError, NoteStore};
use crate::output::{print_pr_status, write_artifacts, OutputError, PrOutcome};
use crate::payload::assemble;
use crate::pr::{Collector, PrError, PullRequestHost, PullRequestRecord};
use crate::stem::StemKey;
use crate::summarize::{SummarizeError, Summarizer};

/// Run-level failures. Anything that goes wrong for a single PR is reported
/// in `RunSummary::failures` instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(#[source] PrError),

    #[error("Failed to persist cache: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
enum ProcessError {
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error(transparent)]
    Notes(#[from] NoteError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Settings for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Ignore the existing cache and process every selected PR.
    pub force: bool,
    pub target_page: String,
    pub mode: DestinationMode,
    pub cache_path: PathBuf,
    pub output_dir: Option<PathBuf>,
}

impl SyncOptions {
    pub fn from_config(config: &Config, force: bool) -> Result<Self, ConfigError> {
        let target_page = config
            .notion
            .page_id
            .clone()
            .ok_or(ConfigError::Missing("notion.page_id (or NOTION_PAGE_ID)"))?;
        Ok(Self {
            force,
            target_page,
            mode: config.notion.mode,
            cache_path: config.sync.cache_path.clone(),
            output_dir: config.output.dir.clone(),
        })
    }
}

/// One PR that could not be journaled this run.
#[derive(Debug, Clone)]
pub struct PrFailure {
    pub stem: StemKey,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    /// Merged PRs found on the host.
    pub collected: usize,
    /// PRs considered after applying the limit.
    pub selected: usize,
    pub processed: usize,
    /// Skipped because the cache already had them.
    pub cached: usize,
    pub failures: Vec<PrFailure>,
}

/// Drives collect → enrich → assemble → summarize → append for each PR,
/// recording completions in the sync cache.
///
/// PRs are handled one at a time, most recently updated first. The cache
/// entry for a PR is written as soon as its append succeeds.
pub struct Coordinator<'a> {
    collector: Collector<'a>,
    summarizer: &'a dyn Summarizer,
    store: &'a dyn NoteStore,
    options: SyncOptions,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        host: &'a dyn PullRequestHost,
        summarizer: &'a dyn Summarizer,
        store: &'a dyn NoteStore,
        options: SyncOptions,
    ) -> Self {
        Self {
            collector: Collector::new(host),
            summarizer,
            store,
            options,
        }
    }

    /// Run one sync. `choose_limit` receives the number of merged PRs found
    /// and returns how many of the most recent ones to process.
    pub async fn run<F>(&self, choose_limit: F) -> Result<RunSummary, SyncError>
    where
        F: FnOnce(usize) -> usize,
    {
        let identity = self.collector.authenticate().await.map_err(SyncError::Auth)?;
        info!(login = %identity.login, "authenticated");

        let cache_path = &self.options.cache_path;
        let mut cache = if self.options.force {
            info!("force mode: ignoring existing cache");
            SyncCache::default()
        } else {
            SyncCache::load(cache_path)
        };
        debug!(entries = cache.len(), "loaded cache");

        let records = self.collector.fetch_merged(&identity).await;
        let limit = choose_limit(records.len()).min(records.len());
        let mut summary = RunSummary {
            collected: records.len(),
            selected: limit,
            ..RunSummary::default()
        };

        for record in records.into_iter().take(limit) {
            let stem = StemKey::for_record(&record);
            if cache.contains(&stem) {
                debug!(stem = %stem, "already journaled; skipping");
                print_pr_status(&stem, PrOutcome::Cached);
                summary.cached += 1;
                continue;
            }

            let span = info_span!("journal_pr", stem = %stem);
            match self.process(record, &stem).instrument(span).await {
                Ok(marker) => {
                    cache.insert(&stem, marker);
                    if let Err(err) = cache.save(cache_path) {
                        warn!(stem = %stem, error = %err, "could not persist cache entry");
                    }
                    info!(stem = %stem, "journaled pull request");
                    print_pr_status(&stem, PrOutcome::Journaled);
                    summary.processed += 1;
                }
                Err(err) => {
                    warn!(stem = %stem, error = %err, "pull request failed; it will be retried next run");
                    let message = err.to_string();
                    print_pr_status(&stem, PrOutcome::Failed(&message));
                    summary.failures.push(PrFailure { stem, message });
                }
            }
        }

        cache.save(cache_path)?;
        info!(
            processed = summary.processed,
            cached = summary.cached,
            failed = summary.failures.len(),
            "sync complete"
        );
        Ok(summary)
    }

    async fn process(
        &self,
        record: PullRequestRecord,
        stem: &StemKey,
    ) -> Result<CacheMarker, ProcessError> {
        let enriched = self.collector.enrich(record).await;
        let payload = assemble(&enriched);
        let document = serde_json::to_string_pretty(&payload)?;

        let summary = self.summarizer.summarize(&document).await?;
        if let Some(dir) = &self.options.output_dir {
            write_artifacts(dir, stem, &document, &summary)?;
        }

        let title = stem.display_title();
        let target = &self.options.target_page;
        match self.options.mode {
            DestinationMode::Append => {
                let blocks = summary_section(&title, &summary);
                self.store.append_blocks(target, &blocks).await?;
                Ok(CacheMarker::Appended(true))
            }
            DestinationMode::Page => {
                let blocks = markdown_to_blocks(&summary);
                let page_id = self.store.create_page(target, &title, &blocks).await?;
                Ok(CacheMarker::Page(page_id))
            }
        }
    }
}
