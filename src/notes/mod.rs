pub mod blocks;

pub use blocks::{markdown_to_blocks, summary_section, Block};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::NotionConfig;

/// Notion accepts at most this many children per request.
const MAX_CHILDREN_PER_REQUEST: usize = 100;

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Notion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notion API key not found in configuration or environment")]
    MissingApiKey,
}

/// Destination for journal entries.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Append `blocks` to the end of `page_id`, preserving order.
    async fn append_blocks(&self, page_id: &str, blocks: &[Block]) -> Result<(), NoteError>;

    /// Create a child page of `parent_id` and return its id.
    async fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        blocks: &[Block],
    ) -> Result<String, NoteError>;
}

pub struct NotionClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    version: String,
}

#[derive(Deserialize)]
struct CreatedPage {
    id: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig) -> Result<Self, NoteError> {
        let api_key = config.api_key.clone().ok_or(NoteError::MissingApiKey)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            version: config.version.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.version)
    }
}

fn children(blocks: &[Block]) -> Vec<Value> {
    blocks.iter().map(Block::to_notion).collect()
}

#[async_trait]
impl NoteStore for NotionClient {
    #[instrument(skip(self, blocks), fields(blocks = blocks.len()))]
    async fn append_blocks(&self, page_id: &str, blocks: &[Block]) -> Result<(), NoteError> {
        let path = format!("/blocks/{page_id}/children");
        for batch in blocks.chunks(MAX_CHILDREN_PER_REQUEST) {
            self.request(reqwest::Method::PATCH, &path)
                .json(&json!({ "children": children(batch) }))
                .send()
                .await?
                .error_for_status()?;
            debug!(appended = batch.len(), "appended blocks");
        }
        Ok(())
    }

    #[instrument(skip(self, blocks), fields(blocks = blocks.len()))]
    async fn create_page(
        &self,
        parent_id: &str,
        title: &str,
        blocks: &[Block],
    ) -> Result<String, NoteError> {
        let split = blocks.len().min(MAX_CHILDREN_PER_REQUEST);
        let (first, rest) = blocks.split_at(split);
        let body = json!({
            "parent": { "page_id": parent_id },
            "properties": {
                "title": { "title": [{ "type": "text", "text": { "content": title } }] }
            },
            "children": children(first)
        });

        let page = self
            .request(reqwest::Method::POST, "/pages")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<CreatedPage>()
            .await?;
        debug!(page_id = %page.id, "created page");

        if !rest.is_empty() {
            self.append_blocks(&page.id, rest).await?;
        }
        Ok(page.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NotionClient {
        NotionClient::new(&NotionConfig {
            api_key: Some("secret".to_string()),
            page_id: Some("target".to_string()),
            api_base: format!("{}/v1", server.uri()),
            ..NotionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = NotionClient::new(&NotionConfig::default());
        assert!(matches!(result, Err(NoteError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_append_sends_blocks_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/blocks/target/children"))
            .and(header("authorization", "Bearer secret"))
            .and(header("notion-version", "2022-06-28"))
            .and(body_partial_json(json!({
                "children": [
                    { "type": "heading_2" },
                    { "type": "paragraph" },
                    { "type": "divider" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let blocks = summary_section("acme / widgets / PR42", "did things");
        client_for(&server)
            .append_blocks("target", &blocks)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_append_batches_large_block_lists() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/blocks/target/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(3)
            .mount(&server)
            .await;

        let blocks = vec![Block::Divider; MAX_CHILDREN_PER_REQUEST * 2 + 1];
        client_for(&server)
            .append_blocks("target", &blocks)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_append_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/blocks/target/children"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .append_blocks("target", &[Block::Divider])
            .await;
        assert!(matches!(result, Err(NoteError::Request(_))));
    }

    #[tokio::test]
    async fn test_create_page_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .and(body_partial_json(json!({
                "parent": { "page_id": "target" },
                "properties": { "title": { "title": [{ "text": { "content": "PR42" } }] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "page",
                "id": "new-page-id"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .create_page("target", "PR42", &[Block::Paragraph("hi".to_string())])
            .await
            .unwrap();
        assert_eq!(id, "new-page-id");
    }
}
