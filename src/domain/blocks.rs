//! Abstract content-block model shared by every render target.
//!
//! A message's HTML fragment is converted once into an ordered sequence of
//! [`ContentBlock`], and each renderer consumes that sequence independently.
//! Blocks are transient: produced during rendering, never mutated, discarded
//! after the renderer is done.

/// Maximum characters in a single rich-text run. Runs longer than this are
/// split into ordered sub-runs carrying the same annotations.
pub const TEXT_CHUNK_LIMIT: usize = 2000;

/// Maximum number of runs one block may own. Surplus runs are collapsed
/// into a single trailing plain-text run.
pub const MAX_RUNS_PER_BLOCK: usize = 100;

/// Maximum blocks per remote page-creation or append call.
pub const BLOCK_BATCH_LIMIT: usize = 100;

/// Inline annotation set carried by a rich-text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl Annotations {
    /// OR-combine with a deeper element's annotations.
    #[must_use]
    pub const fn merged_with(self, other: Self) -> Self {
        Self {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
        }
    }

    /// Whether no annotation is set.
    #[must_use]
    pub const fn is_plain(self) -> bool {
        !(self.bold || self.italic || self.underline || self.strikethrough || self.code)
    }
}

/// Kind of a rich-text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    /// Ordinary annotated text.
    Text,
    /// Inline LaTeX equation; `content` holds the expression.
    Equation,
}

/// One contiguous span of inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichTextRun {
    pub kind: RunKind,
    pub content: String,
    pub annotations: Annotations,
    pub link: Option<String>,
}

impl RichTextRun {
    /// Plain text run without annotations.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Text,
            content: content.into(),
            annotations: Annotations::default(),
            link: None,
        }
    }

    /// Annotated text run.
    #[must_use]
    pub fn styled(content: impl Into<String>, annotations: Annotations, link: Option<String>) -> Self {
        Self {
            kind: RunKind::Text,
            content: content.into(),
            annotations,
            link,
        }
    }

    /// Inline equation run.
    #[must_use]
    pub fn equation(expression: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Equation,
            content: expression.into(),
            annotations: Annotations::default(),
            link: None,
        }
    }

    /// Whether the run carries visible content. Empty-content runs violate
    /// the model invariant and are dropped during compaction.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Identity used by the adjacent-run merge rule.
    #[must_use]
    pub fn merge_key(&self) -> (RunKind, Annotations, Option<&str>) {
        (self.kind, self.annotations, self.link.as_deref())
    }
}

/// Heading depth supported by the block model. Six HTML heading levels
/// collapse into these two, matching what the remote block API offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H2,
    H3,
}

/// One structural unit of a converted message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Paragraph {
        runs: Vec<RichTextRun>,
    },
    Heading {
        level: HeadingLevel,
        runs: Vec<RichTextRun>,
    },
    BulletItem {
        runs: Vec<RichTextRun>,
        children: Vec<ContentBlock>,
    },
    NumberedItem {
        runs: Vec<RichTextRun>,
        children: Vec<ContentBlock>,
    },
    CodeBlock {
        language: String,
        runs: Vec<RichTextRun>,
    },
    Quote {
        runs: Vec<RichTextRun>,
    },
    /// Standalone display equation. Owns no runs.
    Equation {
        expression: String,
    },
    /// Horizontal rule. Owns no runs.
    Divider,
}

impl ContentBlock {
    /// The runs this block owns, if its variant carries any.
    #[must_use]
    pub fn runs(&self) -> Option<&[RichTextRun]> {
        match self {
            Self::Paragraph { runs }
            | Self::Heading { runs, .. }
            | Self::BulletItem { runs, .. }
            | Self::NumberedItem { runs, .. }
            | Self::CodeBlock { runs, .. }
            | Self::Quote { runs } => Some(runs),
            Self::Equation { .. } | Self::Divider => None,
        }
    }

    /// Concatenated plain text of the owned runs.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Equation { expression } => expression.clone(),
            Self::Divider => String::new(),
            _ => self
                .runs()
                .unwrap_or_default()
                .iter()
                .map(|r| r.content.as_str())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_or_downward() {
        let bold = Annotations {
            bold: true,
            ..Annotations::default()
        };
        let italic = Annotations {
            italic: true,
            ..Annotations::default()
        };
        let both = bold.merged_with(italic);
        assert!(both.bold && both.italic);
        assert!(!both.code);
        assert!(Annotations::default().is_plain());
    }

    #[test]
    fn test_merge_key_distinguishes_links() {
        let a = RichTextRun::styled("x", Annotations::default(), Some("https://a".into()));
        let b = RichTextRun::styled("y", Annotations::default(), Some("https://b".into()));
        assert_ne!(a.merge_key(), b.merge_key());
    }

    #[test]
    fn test_plain_text_of_equation_block() {
        let block = ContentBlock::Equation {
            expression: "x^2".into(),
        };
        assert_eq!(block.plain_text(), "x^2");
    }
}
