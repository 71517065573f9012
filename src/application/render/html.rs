//! HTML renderer, plus the Word and PDF variants that are HTML underneath.
//!
//! Word files are HTML with Office `ProgId` metadata and a UTF-8 BOM so
//! desktop Word opens them directly. The PDF variant emits print-oriented
//! HTML with page-break rules for an external rasterizer.

use crate::application::highlight::highlight_code;
use crate::application::normalize::escape_html;
use crate::application::render::{is_image_link, ExportBlob, PreparedDocument};
use crate::domain::{
    role_label, ContentBlock, ExportOptions, HeadingLevel, RichTextRun, Role, RunKind,
};

const STYLE: &str = "\
body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; max-width: 820px; margin: 2rem auto; padding: 0 1rem; color: #1f2328; line-height: 1.6; }
h1 { border-bottom: 2px solid #d0d7de; padding-bottom: .4rem; }
.msg-block { margin: 1.2rem 0; padding: .8rem 1rem; border-radius: 8px; background: #f6f8fa; }
.msg-block.user { background: #eef4ff; }
.msg-block.meta { background: transparent; padding: 0; }
.msg-label { display: block; font-weight: 700; font-size: .85rem; text-transform: uppercase; letter-spacing: .04em; color: #57606a; margin-bottom: .4rem; }
.msg-content pre { background: #24292f; color: #e6edf3; padding: .8rem; border-radius: 6px; overflow-x: auto; }
.msg-content code { font-family: ui-monospace, 'SF Mono', Menlo, monospace; font-size: .9em; }
.msg-content p code, .msg-content li code { background: #eff1f3; color: #1f2328; padding: .1em .3em; border-radius: 4px; }
.msg-content blockquote { border-left: 3px solid #d0d7de; margin: .6rem 0; padding-left: .8rem; color: #57606a; }
.msg-content img { max-width: 100%; border-radius: 6px; }
.equation { font-family: ui-monospace, monospace; background: #f0f3f6; padding: .2em .4em; border-radius: 4px; }
hr { border: none; border-top: 1px solid #d0d7de; margin: 1.2rem 0; }
.tok-kw { color: #ff7b72; }
.tok-str { color: #a5d6ff; }
.tok-num { color: #79c0ff; }
.tok-com { color: #8b949e; font-style: italic; }";

const PDF_STYLE: &str = "\
@page { size: A4; margin: 18mm 15mm; }
body { font-family: Georgia, 'Times New Roman', serif; color: #111; line-height: 1.5; }
.msg-block { page-break-inside: avoid; margin: 0 0 10pt; padding: 6pt 8pt; border: 1pt solid #ddd; border-radius: 4pt; }
.msg-label { font-weight: bold; font-size: 9pt; text-transform: uppercase; color: #555; }
pre { page-break-inside: avoid; background: #f4f4f4; padding: 6pt; font-size: 9pt; white-space: pre-wrap; word-break: break-word; }
h1 { page-break-after: avoid; }
h2, h3 { page-break-after: avoid; }";

/// Render a prepared document as a standalone HTML page.
#[must_use]
pub fn render(document: &PreparedDocument, options: &ExportOptions) -> ExportBlob {
    let body = render_body(document, options);
    let page = shell(&document.title, STYLE, &body, "");
    ExportBlob::text(page, "text/html", "html")
}

/// Word export: the HTML page wrapped in Office metadata with a BOM.
#[must_use]
pub fn render_word(document: &PreparedDocument, options: &ExportOptions) -> ExportBlob {
    let body = render_body(document, options);
    let metas = "<meta name=\"ProgId\" content=\"Word.Document\">\n\
                 <meta name=\"Generator\" content=\"Microsoft Word 15\">\n\
                 <meta name=\"Originator\" content=\"Microsoft Word 15\">";
    let page = shell(&document.title, STYLE, &body, metas);
    let mut bytes = Vec::with_capacity(page.len() + 3);
    bytes.extend_from_slice("\u{feff}".as_bytes());
    bytes.extend_from_slice(page.as_bytes());
    ExportBlob {
        bytes,
        mime: "application/msword",
        extension: "doc",
    }
}

/// PDF export source: print-styled HTML handed to an external rasterizer.
#[must_use]
pub fn render_pdf_source(document: &PreparedDocument, options: &ExportOptions) -> ExportBlob {
    let body = render_body(document, options);
    let page = shell(&document.title, PDF_STYLE, &body, "");
    ExportBlob::text(page, "text/html", "html")
}

fn shell(title: &str, style: &str, body: &str, extra_head: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n{extra_head}\n<title>{}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title)
    )
}

fn render_body(document: &PreparedDocument, options: &ExportOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!("<h1>{}</h1>\n", escape_html(&document.title)));

    for message in &document.messages {
        let class = match message.role {
            Role::User => "msg-block user",
            Role::Assistant => "msg-block",
            Role::Meta => "msg-block meta",
        };
        out.push_str(&format!("<div class=\"{class}\">\n"));
        if let Some(label) = role_label(message.role, options.label_language) {
            out.push_str(&format!("<span class=\"msg-label\">{label}</span>\n"));
        }
        out.push_str("<div class=\"msg-content\">\n");
        render_blocks(&message.blocks, options, &mut out);
        out.push_str("</div>\n</div>\n");
    }
    out
}

/// Serialize blocks, grouping consecutive list items of the same kind into
/// one `<ul>`/`<ol>`.
fn render_blocks(blocks: &[ContentBlock], options: &ExportOptions, out: &mut String) {
    let mut i = 0;
    while i < blocks.len() {
        match &blocks[i] {
            ContentBlock::BulletItem { .. } => {
                i = render_list(blocks, i, false, options, out);
            }
            ContentBlock::NumberedItem { .. } => {
                i = render_list(blocks, i, true, options, out);
            }
            block => {
                render_leaf(block, options, out);
                i += 1;
            }
        }
    }
}

fn render_list(
    blocks: &[ContentBlock],
    start: usize,
    numbered: bool,
    options: &ExportOptions,
    out: &mut String,
) -> usize {
    let tag = if numbered { "ol" } else { "ul" };
    out.push_str(&format!("<{tag}>\n"));
    let mut i = start;
    while i < blocks.len() {
        let (runs, children) = match &blocks[i] {
            ContentBlock::BulletItem { runs, children } if !numbered => (runs, children),
            ContentBlock::NumberedItem { runs, children } if numbered => (runs, children),
            _ => break,
        };
        out.push_str("<li>");
        out.push_str(&render_runs(runs));
        if !children.is_empty() {
            out.push('\n');
            render_blocks(children, options, out);
        }
        out.push_str("</li>\n");
        i += 1;
    }
    out.push_str(&format!("</{tag}>\n"));
    i
}

fn render_leaf(block: &ContentBlock, options: &ExportOptions, out: &mut String) {
    match block {
        ContentBlock::Paragraph { runs } => {
            out.push_str(&format!("<p>{}</p>\n", render_runs(runs)));
        }
        ContentBlock::Heading { level, runs } => {
            let tag = match level {
                HeadingLevel::H2 => "h2",
                HeadingLevel::H3 => "h3",
            };
            out.push_str(&format!("<{tag}>{}</{tag}>\n", render_runs(runs)));
        }
        ContentBlock::CodeBlock { language, runs } => {
            let code: String = runs.iter().map(|r| r.content.as_str()).collect();
            let highlighted = highlight_code(
                code.trim_end_matches('\n'),
                language,
                options.syntax_highlight,
            );
            out.push_str(&format!(
                "<pre><code class=\"language-{}\">{highlighted}</code></pre>\n",
                escape_html(language)
            ));
        }
        ContentBlock::Quote { runs } => {
            out.push_str(&format!("<blockquote>{}</blockquote>\n", render_runs(runs)));
        }
        ContentBlock::Equation { expression } => {
            out.push_str(&format!(
                "<p><span class=\"equation\">{}</span></p>\n",
                escape_html(expression)
            ));
        }
        ContentBlock::Divider => out.push_str("<hr>\n"),
        ContentBlock::BulletItem { .. } | ContentBlock::NumberedItem { .. } => {
            // handled by render_blocks grouping
        }
    }
}

fn render_runs(runs: &[RichTextRun]) -> String {
    runs.iter().map(render_run).collect()
}

fn render_run(run: &RichTextRun) -> String {
    if run.kind == RunKind::Equation {
        return format!(
            "<span class=\"equation\">{}</span>",
            escape_html(&run.content)
        );
    }
    if let Some(link) = &run.link {
        if is_image_link(link) {
            return format!(
                "<img src=\"{}\" alt=\"{}\">",
                escape_html(link),
                escape_html(&run.content)
            );
        }
    }
    let mut text = escape_html(&run.content).replace('\n', "<br>");
    if run.annotations.code {
        text = format!("<code>{text}</code>");
    }
    if run.annotations.bold {
        text = format!("<strong>{text}</strong>");
    }
    if run.annotations.italic {
        text = format!("<em>{text}</em>");
    }
    if run.annotations.underline {
        text = format!("<u>{text}</u>");
    }
    if run.annotations.strikethrough {
        text = format!("<s>{text}</s>");
    }
    if let Some(link) = &run.link {
        text = format!("<a href=\"{}\">{text}</a>", escape_html(link));
    }
    text
}
