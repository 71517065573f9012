//! Shared predicates over the parsed HTML tree.
//!
//! The converter and the run builder both classify nodes by tag name and
//! class markers; the helpers here keep that classification in one place.

use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::Node;

/// Tags that make a container element recurse instead of collapsing into a
/// single paragraph.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "pre",
    "blockquote", "hr",
];

/// Class markers of scraped site chrome that must never reach an export.
const STRIPPED_CLASS_MARKERS: &[&str] = &[
    "skeleton",
    "loading",
    "spinner",
    "typing",
    "sticky",
    "fixed",
    "absolute",
    "min-h-screen",
    "h-screen",
];

/// Lowercased `class` attribute of an element, or empty.
#[must_use]
pub fn element_class(el: &Element) -> String {
    el.attr("class").unwrap_or_default().to_lowercase()
}

/// Whether an element must be skipped entirely (scripts, styles, SVG chrome,
/// hidden nodes, loading skeletons, sticky/fixed/overlay wrappers).
#[must_use]
pub fn is_stripped(el: &Element) -> bool {
    let tag = el.name();
    if matches!(tag, "script" | "style" | "svg" | "iframe" | "button" | "nav") {
        return true;
    }
    if el.attr("aria-hidden") == Some("true") || el.attr("hidden").is_some() {
        return true;
    }
    if el.attr("data-state") == Some("loading") {
        return true;
    }
    let class = element_class(el);
    STRIPPED_CLASS_MARKERS.iter().any(|m| class.contains(m))
}

/// Whether an element is rendered math (a math-library span or a `math` tag).
#[must_use]
pub fn is_math_element(el: &Element) -> bool {
    if el.name() == "math" {
        return true;
    }
    let class = element_class(el);
    class.contains("katex") || class.contains("mathjax") || class.contains("mjx")
}

/// Whether a math element is display math (standalone equation block) rather
/// than inline math.
#[must_use]
pub fn is_display_math(el: &Element) -> bool {
    if !is_math_element(el) {
        return false;
    }
    let class = element_class(el);
    if class.contains("katex-display") || class.contains("math-display") {
        return true;
    }
    el.attr("mode").is_some_and(|m| m.eq_ignore_ascii_case("display"))
}

/// Recover the LaTeX source of a math element.
///
/// Known encodings, in priority order: an explicit data attribute, an
/// `<annotation>` element (preferring `application/x-tex`), a
/// `<script type="math/tex">` element.
#[must_use]
pub fn extract_latex(node: NodeRef<'_, Node>) -> Option<String> {
    let el = node.value().as_element()?;

    for attr in ["data-tex", "data-latex", "data-math"] {
        if let Some(v) = el.attr(attr) {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    let mut plain_annotation = None;
    for desc in node.descendants() {
        if let Some(d) = desc.value().as_element() {
            if d.name() == "annotation" {
                let text = collect_text(desc);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if d.attr("encoding") == Some("application/x-tex") {
                    return Some(text.to_string());
                }
                if plain_annotation.is_none() {
                    plain_annotation = Some(text.to_string());
                }
            }
        }
    }
    if plain_annotation.is_some() {
        return plain_annotation;
    }

    for desc in node.descendants() {
        if let Some(d) = desc.value().as_element() {
            if d.name() == "script" && d.attr("type").is_some_and(|t| t.starts_with("math/tex")) {
                let text = collect_text(desc);
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

/// Whether any direct child is a block-level element.
#[must_use]
pub fn has_block_child(node: NodeRef<'_, Node>) -> bool {
    node.children().any(|c| {
        c.value()
            .as_element()
            .is_some_and(|el| BLOCK_TAGS.contains(&el.name()))
    })
}

/// Concatenated text of all descendant text nodes.
#[must_use]
pub fn collect_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    for desc in node.descendants() {
        if let Some(text) = desc.value().as_text() {
            out.push_str(text);
        }
    }
    out
}
