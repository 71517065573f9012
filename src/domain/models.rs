//! Domain models for captured chat conversations.
//!
//! These models represent the canonical message contract produced by the
//! scraping collaborator. They are immutable after capture and ordered by
//! document position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the human.
    User,
    /// Message produced by the AI assistant.
    Assistant,
    /// Structural separator (e.g. a "Conversation N of M" heading).
    /// Always retained by filters, never labeled.
    Meta,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Meta => write!(f, "meta"),
        }
    }
}

/// One normalized scraped chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Who produced the message.
    pub role: Role,
    /// Raw HTML fragment captured from the chat page.
    pub html: String,
    /// Capture timestamp, when the page exposed one.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CanonicalMessage {
    /// Build a message without a timestamp.
    #[must_use]
    pub fn new(role: Role, html: impl Into<String>) -> Self {
        Self {
            role,
            html: html.into(),
            timestamp: None,
        }
    }
}

/// One captured conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDocument {
    /// Conversation title as scraped from the page.
    #[serde(default)]
    pub title: String,
    /// Messages in document order.
    #[serde(default)]
    pub messages: Vec<CanonicalMessage>,
    /// URL the conversation was captured from.
    #[serde(default)]
    pub source_url: Option<String>,
}

impl ConversationDocument {
    /// Get total message count.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Count messages with the given role.
    #[must_use]
    pub fn role_count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    /// Earliest message timestamp, if any message carries one.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().filter_map(|m| m.timestamp).min()
    }
}

/// Which messages an export includes. `Meta` messages always pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFilter {
    /// Keep every message.
    #[default]
    All,
    /// Keep only user messages (plus meta).
    User,
    /// Keep only assistant messages (plus meta).
    Assistant,
}

impl MessageFilter {
    /// Whether a message with this role passes the filter.
    #[must_use]
    pub fn includes(self, role: Role) -> bool {
        match role {
            Role::Meta => true,
            Role::User => matches!(self, Self::All | Self::User),
            Role::Assistant => matches!(self, Self::All | Self::Assistant),
        }
    }
}

impl std::str::FromStr for MessageFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(format!("Unknown message filter: {s}. Use: all, user, assistant")),
        }
    }
}

/// Language of the role labels rendered into exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelLanguage {
    /// Turkish labels (Kullanici / Asistan).
    #[default]
    Tr,
    /// English labels (User / Assistant).
    En,
}

impl std::str::FromStr for LabelLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tr" => Ok(Self::Tr),
            "en" => Ok(Self::En),
            _ => Err(format!("Unknown label language: {s}. Use: tr, en")),
        }
    }
}

/// Where the export date stamp appears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStampMode {
    /// No stamp anywhere.
    #[default]
    None,
    /// `YYYY-MM-DD_HH-MM` suffix on the file name.
    Filename,
    /// Human-readable stamp appended to the document title.
    Content,
    /// Both of the above.
    Both,
}

impl DateStampMode {
    /// Whether the file name gets a stamp suffix.
    #[must_use]
    pub const fn stamps_filename(self) -> bool {
        matches!(self, Self::Filename | Self::Both)
    }

    /// Whether the document title gets a stamp.
    #[must_use]
    pub const fn stamps_content(self) -> bool {
        matches!(self, Self::Content | Self::Both)
    }
}

impl std::str::FromStr for DateStampMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "filename" => Ok(Self::Filename),
            "content" => Ok(Self::Content),
            "both" => Ok(Self::Both),
            _ => Err(format!(
                "Unknown date stamp mode: {s}. Use: none, filename, content, both"
            )),
        }
    }
}

/// Recognized options for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Which roles to include.
    pub message_filter: MessageFilter,
    /// Language of rendered role labels.
    pub label_language: LabelLanguage,
    /// Where the export date stamp appears.
    pub date_stamp_mode: DateStampMode,
    /// Inclusive start of the message date-range filter (whole day).
    pub date_range_start: Option<chrono::NaiveDate>,
    /// Inclusive end of the message date-range filter (whole day).
    pub date_range_end: Option<chrono::NaiveDate>,
    /// Apply token-span highlighting to code in HTML-based exports.
    pub syntax_highlight: bool,
    /// Moment the export was requested; used for date stamps.
    pub exported_at: DateTime<Utc>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            message_filter: MessageFilter::All,
            label_language: LabelLanguage::Tr,
            date_stamp_mode: DateStampMode::None,
            date_range_start: None,
            date_range_end: None,
            syntax_highlight: true,
            exported_at: Utc::now(),
        }
    }
}

/// Role label shown before a message. Pure function of `(role, language)`.
///
/// `Meta` messages are never labeled, so they map to `None`.
#[must_use]
pub fn role_label(role: Role, language: LabelLanguage) -> Option<&'static str> {
    match (role, language) {
        (Role::User, LabelLanguage::En) => Some("User"),
        (Role::User, LabelLanguage::Tr) => Some("Kullanici"),
        (Role::Assistant, LabelLanguage::En) => Some("Assistant"),
        (Role::Assistant, LabelLanguage::Tr) => Some("Asistan"),
        (Role::Meta, _) => None,
    }
}
