//! Rich-text run builder.
//!
//! Turns inline HTML content into an ordered sequence of annotated runs,
//! then normalizes the sequence: empty runs dropped, adjacent equal runs
//! merged, oversized runs chunked, and the run count capped with an
//! overflow-collapse so every block fits a fixed-size API payload.

use ego_tree::NodeRef;
use scraper::Node;

use crate::domain::{
    Annotations, RichTextRun, RunKind, MAX_RUNS_PER_BLOCK, TEXT_CHUNK_LIMIT,
};

use super::dom;

/// Build the compacted run sequence for one inline-content node.
#[must_use]
pub fn runs_from_inline(node: NodeRef<'_, Node>) -> Vec<RichTextRun> {
    let mut raw = Vec::new();
    walk_inline(node, Annotations::default(), None, &mut raw);
    compact_runs(raw)
}

/// Build runs for all children of a node (the node itself contributes no
/// annotation). Used for elements whose own tag is the block marker.
#[must_use]
pub fn runs_from_children(node: NodeRef<'_, Node>) -> Vec<RichTextRun> {
    let mut raw = Vec::new();
    for child in node.children() {
        walk_inline(child, Annotations::default(), None, &mut raw);
    }
    compact_runs(raw)
}

/// Accumulate raw (uncompacted) runs for one node into `out`. Callers that
/// stitch runs from several siblings compact once at the end.
pub fn collect_inline(node: NodeRef<'_, Node>, out: &mut Vec<RichTextRun>) {
    walk_inline(node, Annotations::default(), None, out);
}

/// Descend accumulating annotation state. Annotations OR downward; an anchor
/// sets the link for its subtree unless a deeper anchor overrides it.
fn walk_inline(
    node: NodeRef<'_, Node>,
    annotations: Annotations,
    link: Option<&str>,
    out: &mut Vec<RichTextRun>,
) {
    if let Some(text) = node.value().as_text() {
        push_text(out, text, annotations, link);
        return;
    }

    let Some(el) = node.value().as_element() else {
        return;
    };
    if dom::is_stripped(el) {
        return;
    }

    // Inline math becomes an equation run in reading order; display math is
    // the converter's concern and is flattened here as a plain expression.
    if dom::is_math_element(el) {
        if let Some(latex) = dom::extract_latex(node) {
            out.push(RichTextRun::equation(latex));
            return;
        }
    }

    let tag = el.name();
    if tag == "br" {
        push_text(out, "\n", annotations, link);
        return;
    }
    if tag == "img" {
        // See DESIGN.md: images stay within the text|equation run model as a
        // text run whose link is the source URL and whose content is the alt.
        if let Some(src) = el.attr("src") {
            let alt = el.attr("alt").unwrap_or_default();
            out.push(RichTextRun::styled(alt, annotations, Some(src.to_string())));
        }
        return;
    }

    let patch = match tag {
        "strong" | "b" => Annotations {
            bold: true,
            ..Annotations::default()
        },
        "em" | "i" => Annotations {
            italic: true,
            ..Annotations::default()
        },
        "u" => Annotations {
            underline: true,
            ..Annotations::default()
        },
        "s" | "del" => Annotations {
            strikethrough: true,
            ..Annotations::default()
        },
        "code" => Annotations {
            code: true,
            ..Annotations::default()
        },
        _ => Annotations::default(),
    };
    let next_annotations = annotations.merged_with(patch);
    let next_link = if tag == "a" {
        el.attr("href").or(link)
    } else {
        link
    };

    for child in node.children() {
        walk_inline(child, next_annotations, next_link, out);
    }
}

/// Append text as one or more chunk-sized runs.
fn push_text(out: &mut Vec<RichTextRun>, text: &str, annotations: Annotations, link: Option<&str>) {
    if text.is_empty() {
        return;
    }
    for chunk in chunk_text(text) {
        out.push(RichTextRun::styled(
            chunk,
            annotations,
            link.map(str::to_string),
        ));
    }
}

/// Split text into ordered chunks of at most [`TEXT_CHUNK_LIMIT`] characters.
#[must_use]
pub fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in text.chars() {
        if count == TEXT_CHUNK_LIMIT {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Normalize a full run sequence: trim blank edges, drop contentless runs,
/// merge adjacent runs with identical `(kind, annotations, link)`, re-chunk
/// merges that cross the length limit, and cap the run count.
#[must_use]
pub fn compact_runs(runs: Vec<RichTextRun>) -> Vec<RichTextRun> {
    let mut merged: Vec<RichTextRun> = Vec::new();

    for run in runs {
        // alt-less image runs have empty content but a meaningful link
        if run.content.is_empty() && run.link.is_none() {
            continue;
        }

        if run.kind != RunKind::Text {
            merged.push(run);
            continue;
        }

        match merged.last_mut() {
            Some(prev) if prev.kind == RunKind::Text && prev.merge_key() == run.merge_key() => {
                let combined_len = prev.content.chars().count() + run.content.chars().count();
                if combined_len <= TEXT_CHUNK_LIMIT {
                    prev.content.push_str(&run.content);
                } else {
                    let mut combined = std::mem::take(&mut prev.content);
                    combined.push_str(&run.content);
                    let mut chunks = chunk_text(&combined).into_iter();
                    if let Some(first) = chunks.next() {
                        prev.content = first;
                    }
                    for chunk in chunks {
                        merged.push(RichTextRun {
                            kind: RunKind::Text,
                            content: chunk,
                            annotations: run.annotations,
                            link: run.link.clone(),
                        });
                    }
                }
            }
            _ => merged.push(run),
        }
    }

    // Trim leading/trailing runs that are whitespace-only, keeping links.
    while merged.first().is_some_and(|r| !r.has_content() && r.link.is_none()) {
        merged.remove(0);
    }
    while merged.last().is_some_and(|r| !r.has_content() && r.link.is_none()) {
        merged.pop();
    }

    if merged.len() <= MAX_RUNS_PER_BLOCK {
        return merged;
    }

    collapse_overflow(merged)
}

/// Keep the first `cap - 1` runs verbatim and fold everything beyond into one
/// trailing plain-text run, truncated with an ellipsis when oversized.
fn collapse_overflow(runs: Vec<RichTextRun>) -> Vec<RichTextRun> {
    let keep = MAX_RUNS_PER_BLOCK - 1;
    let mut head: Vec<RichTextRun> = runs.iter().take(keep).cloned().collect();

    let mut overflow = String::new();
    for run in &runs[keep..] {
        match run.kind {
            RunKind::Equation => {
                overflow.push(' ');
                overflow.push_str(&run.content);
                overflow.push(' ');
            }
            RunKind::Text => overflow.push_str(&run.content),
        }
    }

    let max_tail = TEXT_CHUNK_LIMIT - 3;
    let tail = if overflow.chars().count() > max_tail {
        let mut t: String = overflow.chars().take(max_tail).collect();
        t.push_str("...");
        t
    } else if overflow.is_empty() {
        "...".to_string()
    } else {
        overflow
    };

    head.push(RichTextRun::text(tail));
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn inline_runs(html: &str) -> Vec<RichTextRun> {
        let doc = Html::parse_fragment(html);
        runs_from_children(*doc.root_element())
    }

    #[test]
    fn test_adjacent_bold_runs_merge() {
        let runs = compact_runs(vec![
            RichTextRun::styled(
                "Hel",
                Annotations {
                    bold: true,
                    ..Annotations::default()
                },
                None,
            ),
            RichTextRun::styled(
                "lo",
                Annotations {
                    bold: true,
                    ..Annotations::default()
                },
                None,
            ),
        ]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "Hello");
        assert!(runs[0].annotations.bold);
    }

    #[test]
    fn test_merge_respects_chunk_limit() {
        let a = RichTextRun::text("a".repeat(1500));
        let b = RichTextRun::text("b".repeat(1500));
        let runs = compact_runs(vec![a, b]);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].content.chars().count(), TEXT_CHUNK_LIMIT);
        assert_eq!(runs[1].content.chars().count(), 1000);
        let joined: String = runs.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(joined.chars().count(), 3000);
    }

    #[test]
    fn test_overflow_collapses_to_cap() {
        // Distinct annotations prevent merging, forcing the overflow path.
        let runs: Vec<RichTextRun> = (0..250)
            .map(|i| {
                let ann = Annotations {
                    bold: i % 2 == 0,
                    ..Annotations::default()
                };
                RichTextRun::styled(format!("r{i} "), ann, None)
            })
            .collect();
        let original: String = runs.iter().map(|r| r.content.as_str()).collect();

        let compacted = compact_runs(runs);
        assert_eq!(compacted.len(), MAX_RUNS_PER_BLOCK);
        assert!(compacted
            .iter()
            .all(|r| r.content.chars().count() <= TEXT_CHUNK_LIMIT));

        // Concatenation reproduces a prefix of the original text.
        let joined: String = compacted.iter().map(|r| r.content.as_str()).collect();
        let joined = joined.trim_end_matches("...");
        assert!(original.starts_with(joined));
    }

    #[test]
    fn test_annotation_inheritance_and_links() {
        let runs = inline_runs(r#"<a href="https://x"><b>bold link</b></a>"#);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].annotations.bold);
        assert_eq!(runs[0].link.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_inline_math_keeps_reading_order() {
        let runs = inline_runs(r#"before <span class="katex" data-tex="E=mc^2"></span> after"#);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].kind, RunKind::Equation);
        assert_eq!(runs[1].content, "E=mc^2");
        assert_eq!(runs[0].content, "before ");
    }

    #[test]
    fn test_br_becomes_newline_run() {
        let runs = inline_runs("a<br>b");
        let joined: String = runs.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(joined, "a\nb");
    }

    #[test]
    fn test_chunk_text_boundaries() {
        let text = "x".repeat(TEXT_CHUNK_LIMIT * 2 + 5);
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), TEXT_CHUNK_LIMIT);
        assert_eq!(chunks[2].chars().count(), 5);
    }
}
