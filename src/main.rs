mod config;
mod notes;
mod output;
mod payload;
mod pr;
mod stem;
mod summarize;
mod sync;

use clap::Parser;
use colored::Colorize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

/// PR Journal — summarizes your merged GitHub Pull Requests with an LLM and
/// appends each summary to a Notion page, skipping PRs already journaled.
#[derive(Parser, Debug)]
#[command(name = "pr-journal", version, about)]
struct Cli {
    /// Ignore the sync cache and journal every selected PR again
    #[arg(long)]
    force: bool,

    /// Number of most recently updated merged PRs to process
    #[arg(short, long, env = "PR_JOURNAL_LIMIT")]
    limit: Option<usize>,

    /// Config file path (defaults to .pr-journal.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("pr_journal", force = cli.force).entered();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;
    config.validate()?;
    debug!(cache = %config.sync.cache_path.display(), mode = ?config.notion.mode, "configuration loaded");

    let host = pr::GitHubClient::new(&config.github)?;
    let summarizer = summarize::ChatSummarizer::new(&config.summarizer)?;
    let store = notes::NotionClient::new(&config.notion)?;
    let options = sync::SyncOptions::from_config(&config, cli.force)?;
    let default_limit = config.sync.default_limit;

    let coordinator = sync::Coordinator::new(&host, &summarizer, &store, options);
    let summary = coordinator
        .run(|found| resolve_limit(cli.limit, default_limit, found))
        .await?;

    output::print_run_summary(&summary);
    info!(processed = summary.processed, failed = summary.failures.len(), "done");
    Ok(())
}

/// `--limit` wins; otherwise ask on a terminal, or fall back to the
/// configured default (all PRs when unset).
fn resolve_limit(flag: Option<usize>, default_limit: Option<usize>, found: usize) -> usize {
    if let Some(limit) = flag {
        return limit;
    }
    if std::io::stdin().is_terminal() {
        return prompt_limit(found);
    }
    default_limit.unwrap_or(found)
}

fn prompt_limit(found: usize) -> usize {
    print!(
        "Found {} merged PRs. How many of the most recent should be journaled? [all]: ",
        found.to_string().bold()
    );
    if std::io::stdout().flush().is_err() {
        return found;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return found;
    }
    parse_limit_answer(&answer, found).unwrap_or_else(|| {
        println!("{}", "Not a number; journaling all PRs.".yellow());
        found
    })
}

/// Blank or `all` means every PR; numbers are capped at `found`.
fn parse_limit_answer(answer: &str, found: usize) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() || answer.eq_ignore_ascii_case("all") {
        return Some(found);
    }
    answer.parse::<usize>().ok().map(|n| n.min(found))
}
