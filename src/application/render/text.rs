//! Plain-text renderer. Annotations and links are discarded; structure is
//! kept with simple ASCII markers.

use crate::application::render::{ExportBlob, PreparedDocument};
use crate::domain::{role_label, ContentBlock, ExportOptions, RichTextRun, RunKind};

/// Render a prepared document as plain text.
#[must_use]
pub fn render(document: &PreparedDocument, options: &ExportOptions) -> ExportBlob {
    let mut out = String::new();
    out.push_str(&document.title);
    out.push('\n');
    out.push_str(&"=".repeat(document.title.chars().count().max(1)));
    out.push_str("\n\n");

    for message in &document.messages {
        if let Some(label) = role_label(message.role, options.label_language) {
            out.push_str(&format!("{label}:\n"));
        }
        for block in &message.blocks {
            render_block(block, 0, &mut out);
        }
        out.push('\n');
    }

    let mut content = out.trim_end().to_owned();
    content.push('\n');
    ExportBlob::text(content, "text/plain", "txt")
}

fn render_block(block: &ContentBlock, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match block {
        ContentBlock::Paragraph { runs } | ContentBlock::Heading { runs, .. } => {
            out.push_str(&format!("{pad}{}\n", runs_text(runs)));
        }
        ContentBlock::BulletItem { runs, children } => {
            out.push_str(&format!("{pad}- {}\n", runs_text(runs)));
            for child in children {
                render_block(child, indent + 1, out);
            }
        }
        ContentBlock::NumberedItem { runs, children } => {
            out.push_str(&format!("{pad}1. {}\n", runs_text(runs)));
            for child in children {
                render_block(child, indent + 1, out);
            }
        }
        ContentBlock::CodeBlock { runs, .. } => {
            let code: String = runs.iter().map(|r| r.content.as_str()).collect();
            for line in code.trim_end_matches('\n').lines() {
                out.push_str(&format!("{pad}    {line}\n"));
            }
        }
        ContentBlock::Quote { runs } => {
            for line in runs_text(runs).lines() {
                out.push_str(&format!("{pad}> {line}\n"));
            }
        }
        ContentBlock::Equation { expression } => {
            out.push_str(&format!("{pad}{expression}\n"));
        }
        ContentBlock::Divider => out.push_str("----------\n"),
    }
}

fn runs_text(runs: &[RichTextRun]) -> String {
    runs.iter()
        .map(|run| match run.kind {
            RunKind::Text => run.content.clone(),
            RunKind::Equation => format!(" {} ", run.content),
        })
        .collect()
}
