//! HTML-to-block converter.
//!
//! Walks a captured message fragment structurally and produces the ordered
//! [`ContentBlock`] sequence every render target consumes. Unclassifiable
//! content degrades to plain inline text; nothing is silently dropped except
//! blocks that end up with no runs at all.

use ego_tree::NodeRef;
use scraper::{Html, Node};

use crate::domain::{ContentBlock, HeadingLevel, RichTextRun};

use super::dom;
use super::richtext::{compact_runs, runs_from_children};

/// Recursion ceiling for pathological nesting; deeper content degrades to
/// inline text instead of growing the stack.
const MAX_DEPTH: usize = 64;

/// Languages the remote code-block API accepts.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "plain text",
    "abap",
    "arduino",
    "bash",
    "basic",
    "c",
    "c#",
    "c++",
    "clojure",
    "coffeescript",
    "css",
    "dart",
    "diff",
    "docker",
    "elixir",
    "elm",
    "erlang",
    "flow",
    "fortran",
    "f#",
    "gherkin",
    "glsl",
    "go",
    "graphql",
    "groovy",
    "haskell",
    "html",
    "java",
    "javascript",
    "json",
    "julia",
    "kotlin",
    "latex",
    "less",
    "lisp",
    "livescript",
    "lua",
    "makefile",
    "markdown",
    "markup",
    "matlab",
    "mermaid",
    "nix",
    "objective-c",
    "ocaml",
    "pascal",
    "perl",
    "php",
    "powershell",
    "prolog",
    "protobuf",
    "python",
    "r",
    "reason",
    "ruby",
    "rust",
    "sass",
    "scala",
    "scheme",
    "scss",
    "shell",
    "sql",
    "swift",
    "toml",
    "typescript",
    "vb.net",
    "verilog",
    "vhdl",
    "visual basic",
    "webassembly",
    "xml",
    "yaml",
];

/// Shorthand class tokens mapped to the supported language names.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("yml", "yaml"),
    ("cs", "c#"),
    ("csharp", "c#"),
    ("cpp", "c++"),
];

/// Fallback marker for unrecognized language tokens.
pub const PLAIN_TEXT_LANGUAGE: &str = "plain text";

/// Convert one HTML fragment into an ordered block sequence.
#[must_use]
pub fn html_to_blocks(html: &str) -> Vec<ContentBlock> {
    let fragment = Html::parse_fragment(html);
    let mut blocks = Vec::new();
    for child in fragment.root_element().children() {
        convert_node(child, 0, &mut blocks);
    }
    blocks
}

fn convert_node(node: NodeRef<'_, Node>, depth: usize, out: &mut Vec<ContentBlock>) {
    if let Some(text) = node.value().as_text() {
        if !text.trim().is_empty() {
            push_paragraph(compact_runs(vec![RichTextRun::text(text.to_string())]), out);
        }
        return;
    }

    let Some(el) = node.value().as_element() else {
        return;
    };
    if dom::is_stripped(el) {
        return;
    }
    if depth >= MAX_DEPTH {
        push_paragraph(runs_from_children(node), out);
        return;
    }

    if dom::is_display_math(el) {
        if let Some(latex) = dom::extract_latex(node) {
            out.push(ContentBlock::Equation { expression: latex });
            return;
        }
    }

    match el.name() {
        "hr" => out.push(ContentBlock::Divider),
        "h1" | "h2" => push_heading(HeadingLevel::H2, node, out),
        "h3" | "h4" | "h5" | "h6" => push_heading(HeadingLevel::H3, node, out),
        "ul" => convert_list(node, false, depth, out),
        "ol" => convert_list(node, true, depth, out),
        "pre" => push_code_block(node, out),
        "code" => {
            // A bare code element with a newline reads as a block, not inline.
            if dom::collect_text(node).contains('\n') {
                push_code_block(node, out);
            } else {
                push_paragraph(runs_from_inline_element(node), out);
            }
        }
        "blockquote" => {
            let runs = runs_from_children(node);
            if !runs.is_empty() {
                out.push(ContentBlock::Quote { runs });
            }
        }
        "p" => push_paragraph(runs_from_children(node), out),
        "div" | "section" | "article" => {
            if dom::has_block_child(node) {
                for child in node.children() {
                    convert_node(child, depth + 1, out);
                }
            } else {
                push_paragraph(runs_from_children(node), out);
            }
        }
        _ => {
            // Unrecognized tag: paragraph from inline content, else recurse
            // into children as a last resort.
            let runs = runs_from_inline_element(node);
            if runs.is_empty() {
                for child in node.children() {
                    convert_node(child, depth + 1, out);
                }
            } else {
                out.push(ContentBlock::Paragraph { runs });
            }
        }
    }
}

/// Inline runs of an element, including its own tag's annotation effect.
fn runs_from_inline_element(node: NodeRef<'_, Node>) -> Vec<RichTextRun> {
    super::richtext::runs_from_inline(node)
}

fn push_paragraph(runs: Vec<RichTextRun>, out: &mut Vec<ContentBlock>) {
    if !runs.is_empty() {
        out.push(ContentBlock::Paragraph { runs });
    }
}

fn push_heading(level: HeadingLevel, node: NodeRef<'_, Node>, out: &mut Vec<ContentBlock>) {
    let runs = runs_from_children(node);
    if !runs.is_empty() {
        out.push(ContentBlock::Heading { level, runs });
    }
}

/// Convert a `ul`/`ol` element. Each item's non-list children become its run
/// content; nested lists become the item's child block sequence, preserving
/// arbitrary depth.
fn convert_list(node: NodeRef<'_, Node>, ordered: bool, depth: usize, out: &mut Vec<ContentBlock>) {
    for item in node.children() {
        let Some(el) = item.value().as_element() else {
            continue;
        };
        if el.name() != "li" {
            continue;
        }

        let mut raw = Vec::new();
        let mut children = Vec::new();
        for part in item.children() {
            match part.value().as_element().map(scraper::node::Element::name) {
                Some("ul") => convert_list(part, false, depth + 1, &mut children),
                Some("ol") => convert_list(part, true, depth + 1, &mut children),
                _ => super::richtext::collect_inline(part, &mut raw),
            }
        }
        let runs = compact_runs(raw);
        if runs.is_empty() && children.is_empty() {
            continue;
        }

        out.push(if ordered {
            ContentBlock::NumberedItem { runs, children }
        } else {
            ContentBlock::BulletItem { runs, children }
        });
    }
}

fn push_code_block(node: NodeRef<'_, Node>, out: &mut Vec<ContentBlock>) {
    let code_text = dom::collect_text(node);
    if code_text.trim().is_empty() {
        return;
    }

    // Language class lives on the inner code element for `pre` wrappers.
    let code_node = node
        .descendants()
        .find(|d| d.value().as_element().is_some_and(|e| e.name() == "code"))
        .unwrap_or(node);
    let language = detect_code_language(code_node);

    let runs = compact_runs(vec![RichTextRun::text(code_text)]);
    if !runs.is_empty() {
        out.push(ContentBlock::CodeBlock { language, runs });
    }
}

/// Detect a code block's language from `language-*`/`lang-*` class tokens on
/// the element or its parent, normalize through the alias table and validate
/// against the supported set. Unrecognized tokens fall back to plain text.
#[must_use]
pub fn detect_code_language(node: NodeRef<'_, Node>) -> String {
    let mut class_text = String::new();
    if let Some(el) = node.value().as_element() {
        class_text.push_str(&dom::element_class(el));
    }
    if let Some(parent) = node.parent() {
        if let Some(el) = parent.value().as_element() {
            class_text.push(' ');
            class_text.push_str(&dom::element_class(el));
        }
    }

    let token = class_text.split_whitespace().find_map(|t| {
        t.strip_prefix("language-")
            .or_else(|| t.strip_prefix("lang-"))
    });
    let Some(token) = token else {
        return PLAIN_TEXT_LANGUAGE.to_string();
    };

    let normalized = LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map_or(token, |(_, target)| *target);

    if SUPPORTED_LANGUAGES.contains(&normalized) {
        normalized.to_string()
    } else {
        PLAIN_TEXT_LANGUAGE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunKind;

    #[test]
    fn test_headings_collapse_to_two_levels() {
        let blocks = html_to_blocks("<h1>a</h1><h2>b</h2><h3>c</h3><h6>d</h6>");
        assert_eq!(blocks.len(), 4);
        assert!(matches!(
            blocks[0],
            ContentBlock::Heading {
                level: HeadingLevel::H2,
                ..
            }
        ));
        assert!(matches!(
            blocks[1],
            ContentBlock::Heading {
                level: HeadingLevel::H2,
                ..
            }
        ));
        assert!(matches!(
            blocks[2],
            ContentBlock::Heading {
                level: HeadingLevel::H3,
                ..
            }
        ));
        assert!(matches!(
            blocks[3],
            ContentBlock::Heading {
                level: HeadingLevel::H3,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_list_two_levels() {
        let blocks = html_to_blocks("<ul><li>A<ul><li>B</li></ul></li></ul>");
        assert_eq!(blocks.len(), 1);
        let ContentBlock::BulletItem { runs, children } = &blocks[0] else {
            panic!("expected bullet item");
        };
        assert_eq!(runs[0].content, "A");
        assert_eq!(children.len(), 1);
        let ContentBlock::BulletItem { runs: inner, .. } = &children[0] else {
            panic!("expected nested bullet item");
        };
        assert_eq!(inner[0].content, "B");
    }

    #[test]
    fn test_script_only_fragment_is_empty() {
        let blocks = html_to_blocks("<script>alert('x')</script>");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_whitespace_only_blocks_omitted() {
        let blocks = html_to_blocks("<p>   </p><div>\n\t</div>");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_pre_code_language_detection() {
        let blocks = html_to_blocks(r#"<pre><code class="language-py">print(1)</code></pre>"#);
        let ContentBlock::CodeBlock { language, runs } = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(language, "python");
        assert_eq!(runs[0].content, "print(1)");
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let blocks = html_to_blocks(r#"<pre><code class="language-klingon">x</code></pre>"#);
        let ContentBlock::CodeBlock { language, .. } = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(language, PLAIN_TEXT_LANGUAGE);
    }

    #[test]
    fn test_bare_code_with_newline_is_block() {
        let blocks = html_to_blocks("<code>line1\nline2</code>");
        assert!(matches!(blocks[0], ContentBlock::CodeBlock { .. }));

        let inline = html_to_blocks("<code>inline</code>");
        let ContentBlock::Paragraph { runs } = &inline[0] else {
            panic!("expected paragraph");
        };
        assert!(runs[0].annotations.code);
    }

    #[test]
    fn test_display_equation_block() {
        let blocks = html_to_blocks(
            r#"<div class="katex-display" data-tex="\int_0^1 x\,dx"></div>"#,
        );
        assert_eq!(
            blocks[0],
            ContentBlock::Equation {
                expression: r"\int_0^1 x\,dx".to_string()
            }
        );
    }

    #[test]
    fn test_container_flattens_when_block_children() {
        let blocks = html_to_blocks("<div><p>a</p><p>b</p></div>");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], ContentBlock::Paragraph { .. }));
    }

    #[test]
    fn test_container_without_block_children_is_paragraph() {
        let blocks = html_to_blocks("<div>just <b>text</b></div>");
        assert_eq!(blocks.len(), 1);
        let ContentBlock::Paragraph { runs } = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(runs.len(), 2);
        assert!(runs[1].annotations.bold);
    }

    #[test]
    fn test_unrecognized_tag_degrades_to_paragraph() {
        let blocks = html_to_blocks("<aside>note text</aside>");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], ContentBlock::Paragraph { .. }));
    }

    #[test]
    fn test_blockquote_and_divider() {
        let blocks = html_to_blocks("<blockquote>quoted</blockquote><hr>");
        assert!(matches!(blocks[0], ContentBlock::Quote { .. }));
        assert_eq!(blocks[1], ContentBlock::Divider);
    }

    #[test]
    fn test_inline_math_inside_paragraph() {
        let blocks = html_to_blocks(r#"<p>x is <span class="katex" data-tex="x_0"></span></p>"#);
        let ContentBlock::Paragraph { runs } = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(runs.iter().any(|r| r.kind == RunKind::Equation));
    }
}
