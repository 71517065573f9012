//! Notion API delivery.
//!
//! Thin client over the public REST API: one page-create call carrying the
//! first block batch, then sequential block-children appends. A failed
//! append aborts the remaining batches; the page stays partially filled
//! rather than silently losing middle batches.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::application::render::notion::{AppendRequest, NotionBlock, PageCreateRequest, paginate};
use crate::domain::{AppError, Result};

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Accepts a bare 32-hex page id, a dashed UUID, or a full page URL and
/// produces the dashed lowercase UUID the API expects.
pub fn normalize_notion_page_id(input: &str) -> Result<String> {
    let candidate = input.trim().trim_end_matches('/');
    // take the trailing path/query segment for URLs
    let tail = candidate
        .rsplit(['/', '-', '=', '?'])
        .next()
        .unwrap_or(candidate);

    let hex: String = if tail.len() == 32 && tail.chars().all(|c| c.is_ascii_hexdigit()) {
        tail.to_ascii_lowercase()
    } else {
        let compact: String = candidate
            .chars()
            .filter(char::is_ascii_hexdigit)
            .collect::<String>()
            .to_ascii_lowercase();
        let stripped = candidate.replace('-', "");
        if stripped.len() == 32 && stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            stripped.to_ascii_lowercase()
        } else if compact.len() >= 32 {
            compact[compact.len() - 32..].to_owned()
        } else {
            return Err(AppError::Config {
                message: format!("'{input}' does not contain a Notion page id"),
            });
        }
    };

    Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

/// Authenticated Notion REST client.
pub struct NotionClient {
    http: reqwest::Client,
    token: String,
}

impl NotionClient {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
        }
    }

    /// Create the page and append every remaining batch. Returns the page
    /// URL when the API reports one, otherwise the page id.
    pub async fn publish(
        &self,
        title: &str,
        parent_page_id: &str,
        blocks: Vec<NotionBlock>,
    ) -> Result<String> {
        let (create, appends) = paginate(title, parent_page_id, blocks);
        let page = self.create_page(&create).await?;
        info!(page_id = %page.id, batches = appends.len(), "Notion page created");

        for (i, append) in appends.iter().enumerate() {
            debug!(batch = i + 1, blocks = append.children.len(), "Appending block batch");
            self.append_blocks(&page.id, append).await?;
        }

        Ok(page.url.unwrap_or(page.id))
    }

    async fn create_page(&self, request: &PageCreateRequest) -> Result<CreatedPage> {
        let response = self
            .http
            .post(format!("{API_BASE}/pages"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::remote(format!("page create request failed: {e}")))?;
        let response = check_status(response).await?;
        response
            .json::<CreatedPage>()
            .await
            .map_err(|e| AppError::remote(format!("unreadable page create response: {e}")))
    }

    async fn append_blocks(&self, page_id: &str, request: &AppendRequest) -> Result<()> {
        let response = self
            .http
            .patch(format!("{API_BASE}/blocks/{page_id}/children"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::remote(format!("block append request failed: {e}")))?;
        check_status(response).await.map(|_| ())
    }
}

/// Surface the provider's own error message verbatim on non-success.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map_or(body, |e| e.message);
    let prefix = match status {
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::NOT_FOUND => "parent page not found or not shared with the integration",
        _ => "request rejected",
    };
    Err(AppError::remote(format!("{prefix} ({status}): {message}")))
}
