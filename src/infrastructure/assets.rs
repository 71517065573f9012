//! Image inlining for self-contained HTML-based exports.
//!
//! Remote image links are fetched and rewritten to `data:` URLs so the
//! exported file renders offline. Responses are cached by URL with bounded
//! capacity; a failed fetch leaves the original link untouched.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::application::render::{is_image_link, PreparedDocument};
use crate::domain::{BoundedCache, ContentBlock, RichTextRun};

const CACHE_CAPACITY: usize = 100;

/// Rewrites remote image links in prepared documents to data URLs.
pub struct ImageInliner {
    http: reqwest::Client,
    cache: BoundedCache<String, String>,
}

impl Default for ImageInliner {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageInliner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: BoundedCache::new(CACHE_CAPACITY),
        }
    }

    /// Inline every remote image link in the document, best effort.
    pub async fn inline_document(&mut self, document: &mut PreparedDocument) {
        let mut urls = Vec::new();
        for message in &document.messages {
            for block in &message.blocks {
                collect_image_urls(block, &mut urls);
            }
        }
        urls.dedup();

        let mut resolved = HashMap::new();
        for url in urls {
            if let Some(data_url) = self.fetch_data_url(&url).await {
                resolved.insert(url, data_url);
            }
        }

        for message in &mut document.messages {
            for block in &mut message.blocks {
                rewrite_links(block, &resolved);
            }
        }
    }

    async fn fetch_data_url(&mut self, url: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(&url.to_owned()) {
            return Some(cached.clone());
        }

        let response = match self.http.get(url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(url = %url, status = %r.status(), "Image fetch rejected, keeping link");
                return None;
            }
            Err(err) => {
                debug!(url = %url, error = %err, "Image fetch failed, keeping link");
                return None;
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_owned();
        let bytes = response.bytes().await.ok()?;

        let data_url = format!("data:{content_type};base64,{}", STANDARD.encode(&bytes));
        self.cache.insert(url.to_owned(), data_url.clone());
        Some(data_url)
    }
}

fn is_remote_image(run: &RichTextRun) -> bool {
    run.link
        .as_deref()
        .is_some_and(|url| url.starts_with("http") && is_image_link(url))
}

fn collect_image_urls(block: &ContentBlock, out: &mut Vec<String>) {
    if let Some(runs) = block.runs() {
        for run in runs {
            if is_remote_image(run) {
                if let Some(url) = &run.link {
                    out.push(url.clone());
                }
            }
        }
    }
    if let ContentBlock::BulletItem { children, .. } | ContentBlock::NumberedItem { children, .. } =
        block
    {
        for child in children {
            collect_image_urls(child, out);
        }
    }
}

fn rewrite_links(block: &mut ContentBlock, resolved: &HashMap<String, String>) {
    match block {
        ContentBlock::BulletItem { runs, children } | ContentBlock::NumberedItem { runs, children } => {
            for run in runs.iter_mut() {
                rewrite_run(run, resolved);
            }
            for child in children.iter_mut() {
                rewrite_links(child, resolved);
            }
        }
        ContentBlock::Paragraph { runs }
        | ContentBlock::Heading { runs, .. }
        | ContentBlock::Quote { runs } => {
            for run in runs.iter_mut() {
                rewrite_run(run, resolved);
            }
        }
        ContentBlock::CodeBlock { .. } | ContentBlock::Equation { .. } | ContentBlock::Divider => {}
    }
}

fn rewrite_run(run: &mut RichTextRun, resolved: &HashMap<String, String>) {
    let Some(url) = run.link.as_deref() else { return };
    if let Some(data_url) = resolved.get(url) {
        run.link = Some(data_url.clone());
    }
}
