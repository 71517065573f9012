//! Domain layer - core business logic and types.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (network, IO, etc.).

pub mod blocks;
pub mod cache;
pub mod error;
pub mod models;

pub use blocks::{
    Annotations, ContentBlock, HeadingLevel, RichTextRun, RunKind, BLOCK_BATCH_LIMIT,
    MAX_RUNS_PER_BLOCK, TEXT_CHUNK_LIMIT,
};
pub use cache::BoundedCache;
pub use error::{AppError, Result};
pub use models::{
    role_label, CanonicalMessage, ConversationDocument, DateStampMode, ExportOptions,
    LabelLanguage, MessageFilter, Role,
};
