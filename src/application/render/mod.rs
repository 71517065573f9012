//! Rendering pipeline shared by every output target.
//!
//! A [`ConversationDocument`] is first lowered into a [`PreparedDocument`]
//! (role filter applied, HTML converted to semantic blocks, empty messages
//! dropped), then handed to a target-specific renderer that produces an
//! [`ExportBlob`].

pub mod html;
pub mod markdown;
pub mod notion;
pub mod text;

use std::fmt;
use std::str::FromStr;

use crate::domain::{
    AppError, ContentBlock, ConversationDocument, ExportOptions, Role,
};

/// Output targets understood by the export command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Text,
    Html,
    Word,
    Pdf,
    Notion,
}

impl ExportFormat {
    /// File extension for downloads of this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Text => "txt",
            Self::Html | Self::Pdf => "html",
            Self::Word => "doc",
            Self::Notion => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Html => "html",
            Self::Word => "word",
            Self::Pdf => "pdf",
            Self::Notion => "notion",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "txt" | "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "word" | "doc" => Ok(Self::Word),
            "pdf" => Ok(Self::Pdf),
            "notion" => Ok(Self::Notion),
            other => Err(AppError::Config {
                message: format!("unknown export format: {other}"),
            }),
        }
    }
}

/// A rendered export ready to be written to disk or printed.
#[derive(Debug, Clone)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub extension: &'static str,
}

impl ExportBlob {
    #[must_use]
    pub fn text(content: String, mime: &'static str, extension: &'static str) -> Self {
        Self {
            bytes: content.into_bytes(),
            mime,
            extension,
        }
    }
}

/// A message after HTML-to-block conversion.
#[derive(Debug, Clone)]
pub struct PreparedMessage {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
}

/// The block-level view of a conversation that renderers consume.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub title: String,
    pub messages: Vec<PreparedMessage>,
}

/// Lower a document into blocks, applying the role filter and dropping
/// messages that convert to nothing.
#[must_use]
pub fn prepare(document: &ConversationDocument, options: &ExportOptions) -> PreparedDocument {
    let messages = document
        .messages
        .iter()
        .filter(|m| options.message_filter.includes(m.role))
        .filter_map(|m| {
            let blocks = super::convert::html_to_blocks(&m.html);
            if blocks.is_empty() {
                None
            } else {
                Some(PreparedMessage {
                    role: m.role,
                    blocks,
                })
            }
        })
        .collect();

    PreparedDocument {
        title: document.title.clone(),
        messages,
    }
}

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp"];

/// Whether a run link points at an image rather than a navigable page.
/// Image links come from `<img>` elements, which the converter represents
/// as text runs carrying the source URL.
#[must_use]
pub fn is_image_link(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return true;
    }
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CanonicalMessage, MessageFilter};

    fn doc(messages: Vec<CanonicalMessage>) -> ConversationDocument {
        ConversationDocument {
            title: "Test".into(),
            messages,
            source_url: None,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("md".parse::<ExportFormat>().ok(), Some(ExportFormat::Markdown));
        assert_eq!("DOC".parse::<ExportFormat>().ok(), Some(ExportFormat::Word));
        assert!("docx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_prepare_drops_empty_and_filtered() {
        let document = doc(vec![
            CanonicalMessage::new(Role::User, "<p>hi</p>"),
            CanonicalMessage::new(Role::Assistant, "<script>x</script>"),
            CanonicalMessage::new(Role::Assistant, "<p>hello</p>"),
        ]);
        let mut options = ExportOptions::default();
        options.message_filter = MessageFilter::Assistant;
        let prepared = prepare(&document, &options);
        assert_eq!(prepared.messages.len(), 1);
        assert_eq!(prepared.messages[0].role, Role::Assistant);
    }

    #[test]
    fn test_image_link_detection() {
        assert!(is_image_link("data:image/png;base64,AAAA"));
        assert!(is_image_link("https://x.test/shot.PNG?w=200"));
        assert!(!is_image_link("https://x.test/page"));
        assert!(!is_image_link("https://x.test/archive.zip"));
    }
}
