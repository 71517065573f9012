//! Markdown renderer.

use crate::application::render::{is_image_link, ExportBlob, PreparedDocument};
use crate::domain::{
    role_label, Annotations, ContentBlock, ExportOptions, HeadingLevel, RichTextRun, RunKind,
};

/// Render a prepared document as GitHub-flavored Markdown.
#[must_use]
pub fn render(document: &PreparedDocument, options: &ExportOptions) -> ExportBlob {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", document.title));

    for message in &document.messages {
        if let Some(label) = role_label(message.role, options.label_language) {
            out.push_str(&format!("## {label}\n\n"));
        }
        for block in &message.blocks {
            render_block(block, 0, &mut out);
        }
        out.push('\n');
    }

    let collapsed = collapse_blank_lines(&out);
    ExportBlob::text(collapsed, "text/markdown", "md")
}

fn render_block(block: &ContentBlock, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match block {
        ContentBlock::Paragraph { runs } => {
            out.push_str(&pad);
            out.push_str(&render_runs(runs));
            out.push_str("\n\n");
        }
        ContentBlock::Heading { level, runs } => {
            let marker = match level {
                HeadingLevel::H2 => "##",
                HeadingLevel::H3 => "###",
            };
            out.push_str(&format!("{marker} {}\n\n", render_runs(runs)));
        }
        ContentBlock::BulletItem { runs, children } => {
            out.push_str(&format!("{pad}- {}\n", render_runs(runs)));
            for child in children {
                render_block(child, indent + 1, out);
            }
            if indent == 0 && children.is_empty() {
                out.push('\n');
            }
        }
        ContentBlock::NumberedItem { runs, children } => {
            out.push_str(&format!("{pad}1. {}\n", render_runs(runs)));
            for child in children {
                render_block(child, indent + 1, out);
            }
            if indent == 0 && children.is_empty() {
                out.push('\n');
            }
        }
        ContentBlock::CodeBlock { language, runs } => {
            let code: String = runs.iter().map(|r| r.content.as_str()).collect();
            let tag = if language == "plain text" { "" } else { language };
            out.push_str(&format!("```{tag}\n{}\n```\n\n", code.trim_end_matches('\n')));
        }
        ContentBlock::Quote { runs } => {
            for line in render_runs(runs).lines() {
                out.push_str(&format!("{pad}> {line}\n"));
            }
            out.push('\n');
        }
        ContentBlock::Equation { expression } => {
            out.push_str(&format!("$$\n{expression}\n$$\n\n"));
        }
        ContentBlock::Divider => out.push_str("---\n\n"),
    }
}

fn render_runs(runs: &[RichTextRun]) -> String {
    runs.iter().map(render_run).collect()
}

fn render_run(run: &RichTextRun) -> String {
    if run.kind == RunKind::Equation {
        return format!("${}$", run.content);
    }
    if let Some(link) = &run.link {
        if is_image_link(link) {
            return format!("![{}]({link})", run.content);
        }
        return format!("[{}]({link})", wrap_annotations(&run.content, run.annotations));
    }
    wrap_annotations(&run.content, run.annotations)
}

fn wrap_annotations(content: &str, annotations: Annotations) -> String {
    if content.trim().is_empty() {
        return content.to_owned();
    }
    let mut text = content.to_owned();
    if annotations.code {
        text = format!("`{text}`");
    }
    if annotations.italic {
        text = format!("*{text}*");
    }
    if annotations.bold {
        text = format!("**{text}**");
    }
    if annotations.strikethrough {
        text = format!("~~{text}~~");
    }
    text
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    let trimmed = out.trim_end();
    let mut result = trimmed.to_owned();
    result.push('\n');
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::PreparedMessage;
    use crate::domain::{LabelLanguage, Role};

    fn doc(messages: Vec<PreparedMessage>) -> PreparedDocument {
        PreparedDocument {
            title: "Chat".into(),
            messages,
        }
    }

    fn options_en() -> ExportOptions {
        let mut options = ExportOptions::default();
        options.label_language = LabelLanguage::En;
        options
    }

    #[test]
    fn test_roles_and_code_fence() {
        let document = doc(vec![PreparedMessage {
            role: Role::Assistant,
            blocks: vec![ContentBlock::CodeBlock {
                language: "python".into(),
                runs: vec![RichTextRun::text("print(1)")],
            }],
        }]);
        let blob = render(&document, &options_en());
        let text = String::from_utf8(blob.bytes).unwrap();
        assert!(text.starts_with("# Chat\n"));
        assert!(text.contains("## Assistant\n"));
        assert!(text.contains("```python\nprint(1)\n```"));
    }

    #[test]
    fn test_nested_list_indent() {
        let document = doc(vec![PreparedMessage {
            role: Role::User,
            blocks: vec![ContentBlock::BulletItem {
                runs: vec![RichTextRun::text("A")],
                children: vec![ContentBlock::BulletItem {
                    runs: vec![RichTextRun::text("B")],
                    children: Vec::new(),
                }],
            }],
        }]);
        let blob = render(&document, &options_en());
        let text = String::from_utf8(blob.bytes).unwrap();
        assert!(text.contains("- A\n  - B\n"));
    }

    #[test]
    fn test_annotations_and_links() {
        let run = RichTextRun::styled(
            "hot",
            Annotations {
                bold: true,
                italic: true,
                ..Annotations::default()
            },
            None,
        );
        assert_eq!(render_run(&run), "***hot***");

        let img = RichTextRun::styled("pic", Annotations::default(), Some("https://x/a.png".into()));
        assert_eq!(render_run(&img), "![pic](https://x/a.png)");
    }

    #[test]
    fn test_meta_message_has_no_label() {
        let document = doc(vec![PreparedMessage {
            role: Role::Meta,
            blocks: vec![ContentBlock::Heading {
                level: HeadingLevel::H2,
                runs: vec![RichTextRun::text("1. First chat")],
            }],
        }]);
        let blob = render(&document, &options_en());
        let text = String::from_utf8(blob.bytes).unwrap();
        assert!(!text.contains("## Assistant"));
        assert!(text.contains("## 1. First chat"));
    }

    #[test]
    fn test_blank_line_collapse() {
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn test_block_boundaries_reparse() {
        let document = doc(vec![PreparedMessage {
            role: Role::Assistant,
            blocks: vec![
                ContentBlock::Heading {
                    level: HeadingLevel::H3,
                    runs: vec![RichTextRun::text("Setup")],
                },
                ContentBlock::Paragraph {
                    runs: vec![RichTextRun::text("Run these commands.")],
                },
                ContentBlock::BulletItem {
                    runs: vec![RichTextRun::text("first")],
                    children: Vec::new(),
                },
                ContentBlock::BulletItem {
                    runs: vec![RichTextRun::text("second")],
                    children: Vec::new(),
                },
                ContentBlock::CodeBlock {
                    language: "bash".into(),
                    runs: vec![RichTextRun::text("ls\npwd")],
                },
            ],
        }]);
        let blob = render(&document, &options_en());
        let text = String::from_utf8(blob.bytes).unwrap();

        // Scan the output back into block kinds. Fence state must win so
        // that code lines never register as list items or headings.
        let mut kinds = Vec::new();
        let mut in_fence = false;
        for line in text.lines() {
            if line.starts_with("```") {
                in_fence = !in_fence;
                if in_fence {
                    kinds.push("code");
                }
            } else if in_fence || line.is_empty() {
                continue;
            } else if line.starts_with("## ") {
                kinds.push("label");
            } else if line.starts_with("# ") {
                kinds.push("title");
            } else if line.starts_with("### ") {
                kinds.push("heading");
            } else if line.starts_with("- ") {
                kinds.push("bullet");
            } else {
                kinds.push("paragraph");
            }
        }
        assert_eq!(
            kinds,
            vec![
                "title",
                "label",
                "heading",
                "paragraph",
                "bullet",
                "bullet",
                "code"
            ]
        );
        assert!(!in_fence);
        assert!(text.contains("```bash\nls\npwd\n```"));
    }
}
