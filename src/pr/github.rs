use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::types::{
    ChangedFile, Identity, IssueDetails, PullSnapshot, RepoRef, ReviewComment, SearchHit,
};
use super::{PrError, PullRequestHost};
use crate::config::GitHubConfig;

const USER_AGENT: &str = "pr-journal";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.diff";
const LIST_PAGE_SIZE: usize = 100;

/// GitHub REST v3 client.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Deserialize)]
struct ApiSearchPage {
    #[serde(default)]
    items: Vec<ApiSearchItem>,
}

#[derive(Deserialize)]
struct ApiSearchItem {
    number: u64,
    repository_url: String,
}

#[derive(Deserialize)]
struct ApiRepo {
    full_name: String,
}

#[derive(Deserialize)]
struct ApiBase {
    repo: Option<ApiRepo>,
}

#[derive(Deserialize)]
struct ApiPull {
    number: u64,
    title: String,
    body: Option<String>,
    html_url: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    base: Option<ApiBase>,
}

#[derive(Deserialize)]
struct ApiFile {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    patch: Option<String>,
}

#[derive(Deserialize)]
struct ApiReviewComment {
    path: String,
    #[serde(default)]
    body: String,
    diff_hunk: Option<String>,
}

#[derive(Deserialize)]
struct ApiIssue {
    title: Option<String>,
    body: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, PrError> {
        let token = config.token.clone().ok_or(PrError::MissingToken)?;
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.get_as(path, JSON_MEDIA_TYPE)
    }

    fn get_as(&self, path: &str, media_type: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token)
            .header(ACCEPT, media_type)
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, PrError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PrError> {
        let response = self.send(self.get(path), path).await?;
        Ok(response.json::<T>().await?)
    }

    /// Follow `page=N` until a page comes back shorter than the page size.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, PrError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let request = self
                .get(path)
                .query(&[("per_page", LIST_PAGE_SIZE.to_string()), ("page", page.to_string())]);
            let batch = self.send(request, path).await?.json::<Vec<T>>().await?;
            let short = batch.len() < LIST_PAGE_SIZE;
            items.extend(batch);
            if short {
                return Ok(items);
            }
            page += 1;
        }
    }
}

fn pull_path(repo: &RepoRef, number: u64) -> String {
    format!("/repos/{}/{}/pulls/{}", repo.owner, repo.name, number)
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    #[instrument(skip(self))]
    async fn authenticate(&self) -> Result<Identity, PrError> {
        let response = self.get("/user").send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PrError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            return Err(PrError::Status {
                endpoint: "/user".to_string(),
                status: status.as_u16(),
            });
        }
        let user = response.json::<ApiUser>().await?;
        debug!(login = %user.login, "authenticated");
        Ok(Identity { login: user.login })
    }

    #[instrument(skip(self), fields(login = %identity.login))]
    async fn search_merged(
        &self,
        identity: &Identity,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<SearchHit>, PrError> {
        let query = format!("author:{} is:pr is:merged", identity.login);
        let request = self.get("/search/issues").query(&[
            ("q", query),
            ("sort", "updated".to_string()),
            ("order", "desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", page.to_string()),
        ]);
        let result = self
            .send(request, "/search/issues")
            .await?
            .json::<ApiSearchPage>()
            .await?;
        debug!(hits = result.items.len(), "received search page");

        Ok(result
            .items
            .into_iter()
            .filter_map(|item| {
                let repo = RepoRef::from_api_url(&item.repository_url);
                if repo.is_none() {
                    debug!(url = %item.repository_url, "skipping hit with unparseable repository");
                }
                repo.map(|repo| SearchHit {
                    repo,
                    number: item.number,
                })
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = %repo.full_name()))]
    async fn pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullSnapshot, PrError> {
        let pull: ApiPull = self.get_json(&pull_path(repo, number)).await?;
        Ok(PullSnapshot {
            repo: repo.clone(),
            number: pull.number,
            title: pull.title,
            body: pull.body,
            html_url: pull.html_url,
            created_at: pull.created_at,
            merged_at: pull.merged_at,
            base_repo: pull.base.and_then(|b| b.repo).map(|r| r.full_name),
        })
    }

    #[instrument(skip(self), fields(repo = %repo.full_name()))]
    async fn diff(&self, repo: &RepoRef, number: u64) -> Result<String, PrError> {
        let path = pull_path(repo, number);
        let request = self.get_as(&path, DIFF_MEDIA_TYPE);
        let text = self.send(request, &path).await?.text().await?;
        debug!(diff_bytes = text.len(), "received PR diff");
        Ok(text)
    }

    #[instrument(skip(self), fields(repo = %repo.full_name()))]
    async fn changed_files(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ChangedFile>, PrError> {
        let files: Vec<ApiFile> = self
            .get_all(&format!("{}/files", pull_path(repo, number)))
            .await?;
        Ok(files
            .into_iter()
            .map(|f| ChangedFile {
                filename: f.filename,
                status: f.status,
                additions: f.additions,
                deletions: f.deletions,
                patch: f.patch,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = %repo.full_name()))]
    async fn review_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<ReviewComment>, PrError> {
        let comments: Vec<ApiReviewComment> = self
            .get_all(&format!("{}/comments", pull_path(repo, number)))
            .await?;
        Ok(comments
            .into_iter()
            .map(|c| ReviewComment {
                path: c.path,
                body: c.body,
                diff_hunk: c.diff_hunk,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = %repo.full_name()))]
    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<IssueDetails, PrError> {
        let issue: ApiIssue = self
            .get_json(&format!("/repos/{}/{}/issues/{}", repo.owner, repo.name, number))
            .await?;
        Ok(IssueDetails {
            title: issue.title,
            body: issue.body,
        })
    }
}
