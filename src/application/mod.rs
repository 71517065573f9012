//! Application layer - conversion, normalization and export orchestration.
//!
//! This layer turns captured conversations into rendered exports: HTML to
//! semantic blocks, rich-text compaction, normalization passes and the
//! per-format renderers.

pub mod convert;
pub mod dom;
pub mod exporter;
pub mod filename;
pub mod highlight;
pub mod normalize;
pub mod render;
pub mod richtext;

pub use convert::html_to_blocks;
pub use exporter::{
    CollectOutcome, ConversationRef, ConversationSource, ExportArtifact, ExportService,
    FetchFailure, Scope,
};
pub use filename::{build_export_basename, safe_filename};
pub use normalize::{
    correct_collapsed_roles, filter_by_date_range, is_weak_extraction, merge_documents,
    ScoreThresholds,
};
pub use render::{ExportBlob, ExportFormat, PreparedDocument};
