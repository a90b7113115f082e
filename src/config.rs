use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}

const DEFAULT_CONFIG_FILE: &str = ".pr-journal.toml";

/// Top-level configuration loaded from .pr-journal.toml.
///
/// All fields are optional in the file; `validate` decides what the
/// run actually needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub notion: NotionConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN.
    pub token: Option<String>,
    #[serde(default = "default_github_api")]
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_github_api(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    /// Chat-completions API key. If None, falls back to OPENAI_API_KEY.
    pub api_key: Option<String>,
    #[serde(default = "default_summarizer_api")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_summarizer_api(),
            model: default_model(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// Where summaries land in the note store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationMode {
    /// Append every summary to the target page.
    #[default]
    Append,
    /// Create one child page per PR under the target page.
    Page,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotionConfig {
    /// Integration token. If None, falls back to NOTION_API_KEY.
    pub api_key: Option<String>,
    /// Target page. If None, falls back to NOTION_PAGE_ID.
    pub page_id: Option<String>,
    #[serde(default = "default_notion_api")]
    pub api_base: String,
    #[serde(default = "default_notion_version")]
    pub version: String,
    #[serde(default)]
    pub mode: DestinationMode,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            page_id: None,
            api_base: default_notion_api(),
            version: default_notion_version(),
            mode: DestinationMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// PR count used when no --limit is given and stdin is not a terminal.
    pub default_limit: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            default_limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-PR payload and summary files.
    pub dir: Option<PathBuf>,
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_summarizer_api() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You are writing a developer journal entry for a merged pull request. \
     The user message is a JSON document with the PR metadata, linked issues, \
     changed files with patches, and review comments. Review comments that \
     refer to diff context carry a hunk_ref key into the diff_hunks table. \
     Reply in markdown using **Problem**, **Solution** and **Review notes** \
     headings, each followed by short bullet points starting with '*'."
        .to_string()
}

fn default_notion_api() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".pr-journal-cache.json")
}

impl Config {
    /// Load configuration from `path`, or .pr-journal.toml in the current
    /// directory, then apply environment overrides.
    /// A missing default file yields the default config.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset values from the environment. Values from the config file
    /// take precedence.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.github.token, lookup("GITHUB_TOKEN"));
        fill(&mut self.summarizer.api_key, lookup("OPENAI_API_KEY"));
        fill(&mut self.notion.api_key, lookup("NOTION_API_KEY"));
        fill(&mut self.notion.page_id, lookup("NOTION_PAGE_ID"));
        fill(
            &mut self.output.dir,
            lookup("PR_JOURNAL_OUTPUT_DIR").map(PathBuf::from),
        );
        if let Some(cache_path) = lookup("PR_JOURNAL_CACHE").filter(|v| !v.is_empty()) {
            self.sync.cache_path = PathBuf::from(cache_path);
        }
    }

    /// Check that every credential and destination setting a run needs is
    /// present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.token.is_none() {
            return Err(ConfigError::Missing("github.token (or GITHUB_TOKEN)"));
        }
        if self.summarizer.api_key.is_none() {
            return Err(ConfigError::Missing("summarizer.api_key (or OPENAI_API_KEY)"));
        }
        if self.notion.api_key.is_none() {
            return Err(ConfigError::Missing("notion.api_key (or NOTION_API_KEY)"));
        }
        if self.notion.page_id.is_none() {
            return Err(ConfigError::Missing("notion.page_id (or NOTION_PAGE_ID)"));
        }
        Ok(())
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}
