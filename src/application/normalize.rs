//! Post-capture normalization passes.
//!
//! Everything here runs after collection and before rendering: the
//! best-effort role correction, extraction-quality scoring, the date-range
//! filter with its skip flag, and multi-conversation merging.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{CanonicalMessage, ConversationDocument, Role};

use super::dom;

/// Thresholds for the weak-extraction score. Empirically tuned in the
/// capture pipeline; configurable rather than load-bearing.
#[derive(Debug, Clone, Copy)]
pub struct ScoreThresholds {
    /// Minimum plain-text length for a single-message capture to count.
    pub min_solo_text_len: usize,
    /// Score bonus per message containing rich elements.
    pub rich_bonus: usize,
    /// Score bonus per message.
    pub per_message_bonus: usize,
    /// Minimum total score below which an extraction is weak.
    pub min_total: usize,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            min_solo_text_len: 40,
            rich_bonus: 80,
            per_message_bonus: 20,
            min_total: 90,
        }
    }
}

/// Extraction-quality score of a message list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionScore {
    pub count: usize,
    pub text_len: usize,
    pub rich_count: usize,
    pub total: usize,
}

/// Tags whose presence marks a message as rich content.
const RICH_TAGS: &[&str] = &[
    "img",
    "picture",
    "video",
    "canvas",
    "math",
    "table",
    "pre",
    "code",
    "ul",
    "ol",
    "li",
    "blockquote",
];

/// Score the messages of a capture.
#[must_use]
pub fn score_messages(messages: &[CanonicalMessage], thresholds: ScoreThresholds) -> ExtractionScore {
    let mut text_len = 0;
    let mut rich_count = 0;

    for msg in messages {
        let fragment = scraper::Html::parse_fragment(&msg.html);
        let root = fragment.root_element();
        let text = dom::collect_text(*root);
        text_len += text.split_whitespace().map(str::len).sum::<usize>();

        let has_rich = root.descendants().any(|n| {
            n.value()
                .as_element()
                .is_some_and(|el| RICH_TAGS.contains(&el.name()))
        });
        if has_rich {
            rich_count += 1;
        }
    }

    ExtractionScore {
        count: messages.len(),
        text_len,
        rich_count,
        total: text_len + rich_count * thresholds.rich_bonus
            + messages.len() * thresholds.per_message_bonus,
    }
}

/// Whether an extraction is too weak to trust. Used for warnings only;
/// weak captures are still exported.
#[must_use]
pub fn is_weak_extraction(messages: &[CanonicalMessage], thresholds: ScoreThresholds) -> bool {
    let s = score_messages(messages, thresholds);
    if s.count == 0 {
        return true;
    }
    if s.count == 1 && s.text_len < thresholds.min_solo_text_len && s.rich_count == 0 {
        return true;
    }
    s.total < thresholds.min_total
}

/// Best-effort role correction.
///
/// Some chat pages expose no usable role markers, so every captured message
/// collapses to one role. When at least two non-meta messages all share one
/// role, reassign them alternately starting with the user. This is a
/// heuristic, not a guaranteed-correct inference.
pub fn correct_collapsed_roles(messages: &mut [CanonicalMessage]) -> bool {
    let non_meta: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role != Role::Meta)
        .map(|(i, _)| i)
        .collect();
    if non_meta.len() < 2 {
        return false;
    }

    let first_role = messages[non_meta[0]].role;
    if non_meta.iter().any(|&i| messages[i].role != first_role) {
        return false;
    }

    for (turn, &i) in non_meta.iter().enumerate() {
        messages[i].role = if turn % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        };
    }
    true
}

/// Outcome of the date-range filter.
#[derive(Debug, Clone)]
pub struct DateFilterOutcome {
    pub document: ConversationDocument,
    /// True when the filter could not be applied and was skipped: either no
    /// message carried a timestamp, or the range excluded everything.
    pub skipped: bool,
}

/// Narrow a conversation to messages whose timestamp falls inside the
/// inclusive day range. Meta and untimestamped messages always pass. When
/// the filter cannot apply it is a no-op with `skipped` set; it never
/// silently empties a result.
#[must_use]
pub fn filter_by_date_range(
    document: ConversationDocument,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> DateFilterOutcome {
    if start.is_none() && end.is_none() {
        return DateFilterOutcome {
            document,
            skipped: false,
        };
    }

    let start_bound: Option<DateTime<Utc>> =
        start.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc());
    let end_bound: Option<DateTime<Utc>> = end
        .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
        .map(|dt| dt.and_utc());

    let has_timestamp = document
        .messages
        .iter()
        .any(|m| m.role != Role::Meta && m.timestamp.is_some());
    if !has_timestamp {
        tracing::warn!("Date range filter skipped: no message carries a timestamp");
        return DateFilterOutcome {
            document,
            skipped: true,
        };
    }

    let filtered: Vec<CanonicalMessage> = document
        .messages
        .iter()
        .filter(|m| {
            if m.role == Role::Meta {
                return true;
            }
            let Some(ts) = m.timestamp else {
                return true;
            };
            if start_bound.is_some_and(|s| ts < s) {
                return false;
            }
            if end_bound.is_some_and(|e| ts > e) {
                return false;
            }
            true
        })
        .cloned()
        .collect();

    if !filtered.iter().any(|m| m.role != Role::Meta) {
        tracing::warn!("Date range excluded every message; exporting unfiltered");
        return DateFilterOutcome {
            document,
            skipped: true,
        };
    }

    DateFilterOutcome {
        document: ConversationDocument {
            messages: filtered,
            ..document
        },
        skipped: false,
    }
}

/// Merge several conversations into one logical document, interleaving a
/// synthetic meta heading before each source conversation in source order.
#[must_use]
pub fn merge_documents(chats: &[ConversationDocument], app_name: &str) -> ConversationDocument {
    let mut messages = Vec::new();

    for (idx, chat) in chats.iter().enumerate() {
        let title = if chat.title.is_empty() {
            format!("Conversation {}", idx + 1)
        } else {
            chat.title.clone()
        };
        let mut heading = format!("<h2>{}. {}</h2>", idx + 1, escape_html(&title));
        if let Some(url) = chat.source_url.as_deref().filter(|u| !u.is_empty()) {
            heading.push_str(&format!("<p>{}</p>", escape_html(url)));
        }

        messages.push(CanonicalMessage::new(Role::Meta, heading));
        messages.extend(chat.messages.iter().cloned());
    }

    ConversationDocument {
        title: format!("{app_name} Conversations ({})", chats.len()),
        messages,
        source_url: None,
    }
}

/// Minimal HTML escaping for synthetic fragments.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(role: Role, html: &str) -> CanonicalMessage {
        CanonicalMessage::new(role, html)
    }

    fn stamped(role: Role, html: &str, ts: DateTime<Utc>) -> CanonicalMessage {
        CanonicalMessage {
            role,
            html: html.into(),
            timestamp: Some(ts),
        }
    }

    #[test]
    fn test_collapsed_roles_alternate_from_user() {
        let mut messages = vec![
            msg(Role::Assistant, "<p>a</p>"),
            msg(Role::Meta, "<h2>sep</h2>"),
            msg(Role::Assistant, "<p>b</p>"),
            msg(Role::Assistant, "<p>c</p>"),
        ];
        assert!(correct_collapsed_roles(&mut messages));
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Meta);
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].role, Role::User);
    }

    #[test]
    fn test_mixed_roles_left_alone() {
        let mut messages = vec![msg(Role::User, "<p>a</p>"), msg(Role::Assistant, "<p>b</p>")];
        assert!(!correct_collapsed_roles(&mut messages));
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn test_date_range_excludes_outside_messages() {
        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        let doc = ConversationDocument {
            title: "t".into(),
            messages: vec![
                stamped(Role::User, "<p>1</p>", t1),
                stamped(Role::Assistant, "<p>2</p>", t2),
                stamped(Role::User, "<p>3</p>", t3),
            ],
            source_url: None,
        };

        let outcome = filter_by_date_range(
            doc,
            NaiveDate::from_ymd_opt(2026, 3, 1),
            NaiveDate::from_ymd_opt(2026, 3, 2),
        );
        assert!(!outcome.skipped);
        assert_eq!(outcome.document.messages.len(), 2);
        assert_eq!(outcome.document.messages[1].html, "<p>2</p>");
    }

    #[test]
    fn test_date_range_skips_without_timestamps() {
        let doc = ConversationDocument {
            title: "t".into(),
            messages: vec![msg(Role::User, "<p>1</p>")],
            source_url: None,
        };
        let outcome =
            filter_by_date_range(doc, NaiveDate::from_ymd_opt(2026, 1, 1), None);
        assert!(outcome.skipped);
        assert_eq!(outcome.document.messages.len(), 1);
    }

    #[test]
    fn test_date_range_never_empties_result() {
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let doc = ConversationDocument {
            title: "t".into(),
            messages: vec![stamped(Role::User, "<p>old</p>", t)],
            source_url: None,
        };
        let outcome =
            filter_by_date_range(doc, NaiveDate::from_ymd_opt(2026, 1, 1), None);
        assert!(outcome.skipped);
        assert_eq!(outcome.document.messages.len(), 1);
    }

    #[test]
    fn test_weak_extraction_scoring() {
        let weak = vec![msg(Role::Assistant, "<p>hi</p>")];
        assert!(is_weak_extraction(&weak, ScoreThresholds::default()));

        let strong = vec![
            msg(Role::User, &format!("<p>{}</p>", "long text ".repeat(20))),
            msg(Role::Assistant, "<pre><code>fn main() {}</code></pre>"),
        ];
        assert!(!is_weak_extraction(&strong, ScoreThresholds::default()));
    }

    #[test]
    fn test_merge_interleaves_meta_headings() {
        let a = ConversationDocument {
            title: "First".into(),
            messages: vec![msg(Role::User, "<p>a</p>")],
            source_url: Some("https://chat/1".into()),
        };
        let b = ConversationDocument {
            title: "Second".into(),
            messages: vec![msg(Role::User, "<p>b</p>")],
            source_url: None,
        };

        let merged = merge_documents(&[a, b], "ChatGPT");
        assert_eq!(merged.messages.len(), 4);
        assert_eq!(merged.messages[0].role, Role::Meta);
        assert!(merged.messages[0].html.contains("1. First"));
        assert!(merged.messages[0].html.contains("https://chat/1"));
        assert_eq!(merged.messages[2].role, Role::Meta);
        assert!(merged.messages[2].html.contains("2. Second"));
        assert!(merged.title.contains("(2)"));
    }
}
