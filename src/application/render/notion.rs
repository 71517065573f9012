//! Notion block construction and request pagination.
//!
//! Block JSON follows the public block API shape exactly:
//! `{ "object": "block", "type": T, T: { "rich_text": [...], ... } }`.
//! The first [`BLOCK_BATCH_LIMIT`] blocks travel in the page-create call,
//! the rest in append calls of at most the same size.

use serde::Serialize;

use crate::application::render::{ExportBlob, PreparedDocument};
use crate::domain::{
    role_label, Annotations, ContentBlock, ExportOptions, HeadingLevel, RichTextRun, RunKind,
    BLOCK_BATCH_LIMIT,
};

#[derive(Debug, Clone, Serialize)]
pub struct NotionBlock {
    object: &'static str,
    #[serde(flatten)]
    body: BlockBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum BlockBody {
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: RichTextBody },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: RichTextBody },
    #[serde(rename = "heading_3")]
    Heading3 { heading_3: RichTextBody },
    #[serde(rename = "bulleted_list_item")]
    BulletedListItem { bulleted_list_item: ListItemBody },
    #[serde(rename = "numbered_list_item")]
    NumberedListItem { numbered_list_item: ListItemBody },
    #[serde(rename = "code")]
    Code { code: CodeBody },
    #[serde(rename = "quote")]
    Quote { quote: RichTextBody },
    #[serde(rename = "equation")]
    Equation { equation: EquationBody },
    #[serde(rename = "divider")]
    Divider { divider: EmptyObject },
}

#[derive(Debug, Clone, Serialize)]
struct RichTextBody {
    rich_text: Vec<NotionRichText>,
}

#[derive(Debug, Clone, Serialize)]
struct ListItemBody {
    rich_text: Vec<NotionRichText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<Vec<NotionBlock>>,
}

#[derive(Debug, Clone, Serialize)]
struct CodeBody {
    rich_text: Vec<NotionRichText>,
    language: String,
}

#[derive(Debug, Clone, Serialize)]
struct EquationBody {
    expression: String,
}

#[derive(Debug, Clone, Serialize)]
struct EmptyObject {}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum NotionRichText {
    #[serde(rename = "text")]
    Text {
        text: TextPayload,
        annotations: NotionAnnotations,
    },
    #[serde(rename = "equation")]
    Equation { equation: EquationBody },
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPayload {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<LinkPayload>,
}

#[derive(Debug, Clone, Serialize)]
struct LinkPayload {
    url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotionAnnotations {
    bold: bool,
    italic: bool,
    strikethrough: bool,
    underline: bool,
    code: bool,
    color: &'static str,
}

impl From<Annotations> for NotionAnnotations {
    fn from(a: Annotations) -> Self {
        Self {
            bold: a.bold,
            italic: a.italic,
            strikethrough: a.strikethrough,
            underline: a.underline,
            code: a.code,
            color: "default",
        }
    }
}

/// Page-create payload: parent, title property and the first block batch.
#[derive(Debug, Clone, Serialize)]
pub struct PageCreateRequest {
    pub parent: PageParent,
    pub properties: PageProperties,
    pub children: Vec<NotionBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageParent {
    pub page_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageProperties {
    pub title: TitleProperty,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleProperty {
    pub title: Vec<NotionRichText>,
}

/// Body of a block-children append call.
#[derive(Debug, Clone, Serialize)]
pub struct AppendRequest {
    pub children: Vec<NotionBlock>,
}

fn rich_text_from_runs(runs: &[RichTextRun]) -> Vec<NotionRichText> {
    runs.iter()
        .map(|run| match run.kind {
            RunKind::Equation => NotionRichText::Equation {
                equation: EquationBody {
                    expression: run.content.clone(),
                },
            },
            RunKind::Text => NotionRichText::Text {
                text: TextPayload {
                    content: run.content.clone(),
                    // data: URLs are rejected by the API, keep the alt text only
                    link: run
                        .link
                        .as_deref()
                        .filter(|url| url.starts_with("http"))
                        .map(|url| LinkPayload { url: url.into() }),
                },
                annotations: run.annotations.into(),
            },
        })
        .collect()
}

fn block_from_content(block: &ContentBlock) -> NotionBlock {
    let body = match block {
        ContentBlock::Paragraph { runs } => BlockBody::Paragraph {
            paragraph: RichTextBody {
                rich_text: rich_text_from_runs(runs),
            },
        },
        ContentBlock::Heading { level, runs } => {
            let body = RichTextBody {
                rich_text: rich_text_from_runs(runs),
            };
            match level {
                HeadingLevel::H2 => BlockBody::Heading2 { heading_2: body },
                HeadingLevel::H3 => BlockBody::Heading3 { heading_3: body },
            }
        }
        ContentBlock::BulletItem { runs, children } => BlockBody::BulletedListItem {
            bulleted_list_item: list_item_body(runs, children),
        },
        ContentBlock::NumberedItem { runs, children } => BlockBody::NumberedListItem {
            numbered_list_item: list_item_body(runs, children),
        },
        ContentBlock::CodeBlock { language, runs } => BlockBody::Code {
            code: CodeBody {
                rich_text: rich_text_from_runs(runs),
                language: language.clone(),
            },
        },
        ContentBlock::Quote { runs } => BlockBody::Quote {
            quote: RichTextBody {
                rich_text: rich_text_from_runs(runs),
            },
        },
        ContentBlock::Equation { expression } => BlockBody::Equation {
            equation: EquationBody {
                expression: expression.clone(),
            },
        },
        ContentBlock::Divider => BlockBody::Divider {
            divider: EmptyObject {},
        },
    };
    NotionBlock {
        object: "block",
        body,
    }
}

fn list_item_body(runs: &[RichTextRun], children: &[ContentBlock]) -> ListItemBody {
    ListItemBody {
        rich_text: rich_text_from_runs(runs),
        children: if children.is_empty() {
            None
        } else {
            Some(children.iter().map(block_from_content).collect())
        },
    }
}

/// Flatten a prepared document into the Notion block sequence: a role-label
/// heading before each non-meta message, a divider after every message.
#[must_use]
pub fn document_blocks(document: &PreparedDocument, options: &ExportOptions) -> Vec<NotionBlock> {
    let mut blocks = Vec::new();
    for message in &document.messages {
        if let Some(label) = role_label(message.role, options.label_language) {
            blocks.push(NotionBlock {
                object: "block",
                body: BlockBody::Heading3 {
                    heading_3: RichTextBody {
                        rich_text: rich_text_from_runs(&[RichTextRun::text(label)]),
                    },
                },
            });
        }
        blocks.extend(message.blocks.iter().map(block_from_content));
        blocks.push(NotionBlock {
            object: "block",
            body: BlockBody::Divider {
                divider: EmptyObject {},
            },
        });
    }
    blocks
}

/// Split a block sequence into a page-create request plus append requests,
/// each carrying at most [`BLOCK_BATCH_LIMIT`] blocks.
#[must_use]
pub fn paginate(
    title: &str,
    parent_page_id: &str,
    blocks: Vec<NotionBlock>,
) -> (PageCreateRequest, Vec<AppendRequest>) {
    let mut batches = blocks.chunks(BLOCK_BATCH_LIMIT);
    let first = batches.next().map(<[NotionBlock]>::to_vec).unwrap_or_default();
    let appends = batches
        .map(|chunk| AppendRequest {
            children: chunk.to_vec(),
        })
        .collect();
    let create = PageCreateRequest {
        parent: PageParent {
            page_id: parent_page_id.to_owned(),
        },
        properties: PageProperties {
            title: TitleProperty {
                title: rich_text_from_runs(&[RichTextRun::text(title)]),
            },
        },
        children: first,
    };
    (create, appends)
}

/// Offline rendering of the Notion payload, for `--format notion` downloads
/// and inspection. The live client posts the same structures.
#[must_use]
pub fn render(document: &PreparedDocument, options: &ExportOptions) -> ExportBlob {
    let blocks = document_blocks(document, options);
    let (create, appends) = paginate(&document.title, "", blocks);
    let payload = serde_json::json!({
        "page": create,
        "appends": appends,
    });
    let content =
        serde_json::to_string_pretty(&payload).unwrap_or_else(|_| String::from("{}"));
    ExportBlob::text(content, "application/json", "json")
}
