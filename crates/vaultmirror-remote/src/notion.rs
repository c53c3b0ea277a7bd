//! HTTPS client for the Notion block API.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::instrument;
use vaultmirror_core::{
    ChildPage, ContentBlock, Error, MirrorConfig, NodeId, RemoteErrorKind, Result, SyncMetadata,
};

use crate::blocks::{
    blocks_to_json, create_page_body, error_message, is_live_page, object_id, parse_child_page,
    properties_to_json,
};
use crate::client::RemoteClient;

const NOTION_VERSION: &str = "notion-version";

/// Largest page size the children listing accepts
const LIST_PAGE_SIZE: &str = "100";

/// Notion API client
pub struct NotionClient {
    client: Client,
    base_url: String,
}

impl NotionClient {
    /// Client using the API settings of a mirror configuration
    pub fn new(config: &MirrorConfig) -> Result<Self> {
        Self::with_settings(
            &config.api_base_url,
            config.api_token.expose(),
            &config.api_version,
            config.request_timeout(),
        )
    }

    pub fn with_settings(
        base_url: &str,
        token: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| Error::config_error("API token contains invalid characters"))?;
        auth.set_sensitive(true);

        let version = HeaderValue::from_str(api_version)
            .map_err(|_| Error::config_error(format!("Invalid API version: {}", api_version)))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(HeaderName::from_static(NOTION_VERSION), version);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, path))
    }

    /// Send a request and return the status with the raw body
    async fn execute(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        Ok((status, body))
    }

    /// Send a request and decode a successful JSON response
    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let (status, body) = self.execute(request).await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        decode_body(&body)
    }
}

/// Error for a non-success HTTP status
pub fn status_error(status: StatusCode, body: &str) -> Error {
    let code = status.as_u16();
    Error::remote(RemoteErrorKind::from_status(code), Some(code), error_message(body))
}

fn transport_error(err: reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    Error::remote(RemoteErrorKind::Network, None, message)
}

fn decode_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        Error::remote(
            RemoteErrorKind::Network,
            None,
            format!("Invalid JSON response: {}", e),
        )
    })
}

#[async_trait]
impl RemoteClient for NotionClient {
    async fn get_node(&self, id: &str) -> Result<bool> {
        let (status, body) = self
            .execute(self.request(Method::GET, &format!("pages/{}", id)))
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(is_live_page(&decode_body(&body)?))
    }

    #[instrument(skip(self, properties, blocks), fields(blocks = blocks.len()), level = "debug")]
    async fn create_node(
        &self,
        parent_id: &str,
        title: &str,
        properties: &SyncMetadata,
        blocks: &[ContentBlock],
    ) -> Result<NodeId> {
        let body = create_page_body(parent_id, title, properties, blocks);
        let response = self
            .send(self.request(Method::POST, "pages").json(&body))
            .await?;
        let id = object_id(&response)?;
        log::debug!("Created page '{}' ({}) under {}", title, id, parent_id);
        Ok(id)
    }

    async fn update_properties(
        &self,
        id: &str,
        title: &str,
        properties: &SyncMetadata,
    ) -> Result<()> {
        let body = json!({ "properties": properties_to_json(title, properties) });
        self.send(self.request(Method::PATCH, &format!("pages/{}", id)).json(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, blocks), fields(blocks = blocks.len()), level = "debug")]
    async fn append_blocks(&self, id: &str, blocks: &[ContentBlock]) -> Result<()> {
        let body = json!({ "children": blocks_to_json(blocks) });
        self.send(
            self.request(Method::PATCH, &format!("blocks/{}/children", id))
                .json(&body),
        )
        .await?;
        log::debug!("Appended {} blocks to {}", blocks.len(), id);
        Ok(())
    }

    async fn list_children(&self, id: &str, cursor: Option<&str>) -> Result<ChildPage> {
        let mut request = self
            .request(Method::GET, &format!("blocks/{}/children", id))
            .query(&[("page_size", LIST_PAGE_SIZE)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("start_cursor", cursor)]);
        }
        let response = self.send(request).await?;
        parse_child_page(&response)
    }

    #[instrument(skip(self), level = "debug")]
    async fn archive_node(&self, id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("blocks/{}", id)))
            .await?;
        Ok(())
    }
}
