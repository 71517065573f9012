//! Export orchestration.
//!
//! Collects conversations from a [`ConversationSource`], runs the
//! normalization passes, merges multi-conversation scopes and dispatches to
//! the renderer for the requested format. Collection is sequential with a
//! bounded per-conversation wait; a cancellation request takes effect
//! between conversations, never mid-fetch.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::filename::{build_export_basename, with_content_date_stamp};
use crate::application::normalize::{
    self, filter_by_date_range, is_weak_extraction, merge_documents, ScoreThresholds,
};
use crate::application::render::{self, ExportBlob, ExportFormat};
use crate::domain::{AppError, ConversationDocument, ExportOptions, Result};

/// Which conversations an export run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The first conversation the source lists.
    Single,
    /// Every conversation the source lists.
    All,
    /// Conversations at the given zero-based list positions.
    Selected(Vec<usize>),
}

/// A listed conversation, prior to fetching its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRef {
    pub id: String,
    pub title: String,
}

/// Supplier of captured conversations. Implemented by the capture-directory
/// reader; the trait keeps the orchestrator testable without a filesystem.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// List available conversations in stable order.
    async fn list(&self) -> Result<Vec<ConversationRef>>;

    /// Fetch the full document for one listed conversation.
    async fn fetch(&self, reference: &ConversationRef) -> Result<ConversationDocument>;

    /// Return the source to its pre-collection state after a multi
    /// conversation sweep. File-backed sources have nothing to restore.
    async fn restore(&self) -> Result<()> {
        Ok(())
    }
}

/// One conversation that could not be collected.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub reference: ConversationRef,
    pub reason: String,
}

/// Result of collecting a scope: the documents that arrived plus the
/// failures, so callers can report partial success.
#[derive(Debug)]
pub struct CollectOutcome {
    pub documents: Vec<ConversationDocument>,
    pub failures: Vec<FetchFailure>,
    /// How many conversations the scope asked for.
    pub total: usize,
}

impl CollectOutcome {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.documents.len()
    }
}

/// A finished export: the rendered blob and the file name to store it under.
#[derive(Debug)]
pub struct ExportArtifact {
    pub blob: ExportBlob,
    pub basename: String,
}

/// Orchestrates collection, normalization and rendering.
#[derive(Debug, Clone)]
pub struct ExportService {
    /// Bounded wait for a single conversation fetch.
    pub fetch_timeout: Duration,
    pub thresholds: ScoreThresholds,
    /// Product name used in merged-document titles.
    pub app_name: String,
}

impl Default for ExportService {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(20),
            thresholds: ScoreThresholds::default(),
            app_name: "Chat".to_owned(),
        }
    }
}

impl ExportService {
    /// Collect every conversation the scope names, sequentially.
    ///
    /// Individual failures are recorded and collection continues; only a
    /// fully failed scope is an error. Cancellation is honored between
    /// conversations.
    pub async fn collect(
        &self,
        source: &dyn ConversationSource,
        scope: &Scope,
        cancel: &CancellationToken,
    ) -> Result<CollectOutcome> {
        let listed = source.list().await?;
        let refs = select_refs(&listed, scope)?;
        let total = refs.len();

        let mut documents = Vec::new();
        let mut failures = Vec::new();

        for reference in refs {
            if cancel.is_cancelled() {
                info!(
                    collected = documents.len(),
                    total, "Collection cancelled, keeping what was gathered"
                );
                break;
            }

            match tokio::time::timeout(self.fetch_timeout, source.fetch(&reference)).await {
                Ok(Ok(document)) => documents.push(document),
                Ok(Err(err)) => {
                    warn!(id = %reference.id, error = %err, "Conversation fetch failed");
                    failures.push(FetchFailure {
                        reference,
                        reason: err.to_string(),
                    });
                }
                Err(_elapsed) => {
                    let err = AppError::timeout(
                        format!("fetching conversation '{}'", reference.id),
                        self.fetch_timeout.as_secs(),
                    );
                    warn!(id = %reference.id, error = %err, "Conversation fetch timed out");
                    failures.push(FetchFailure {
                        reference,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if let Err(err) = source.restore().await {
            warn!(error = %err, "Source restore failed after collection");
        }

        if documents.is_empty() {
            let first_reason = failures
                .first()
                .map_or_else(|| "cancelled before any conversation was fetched".to_owned(), |f| f.reason.clone());
            return Err(AppError::NoneProcessed {
                total,
                first_reason,
            });
        }

        Ok(CollectOutcome {
            documents,
            failures,
            total,
        })
    }

    /// Normalize collected documents and merge multi-conversation scopes
    /// into one logical document.
    ///
    /// Returns the document plus whether a requested date filter was
    /// skipped for any conversation.
    #[must_use]
    pub fn assemble(
        &self,
        documents: Vec<ConversationDocument>,
        options: &ExportOptions,
    ) -> (ConversationDocument, bool) {
        let mut any_skipped = false;
        let normalized: Vec<ConversationDocument> = documents
            .into_iter()
            .map(|mut document| {
                if normalize::correct_collapsed_roles(&mut document.messages) {
                    info!(title = %document.title, "Reassigned collapsed roles alternately");
                }
                if is_weak_extraction(&document.messages, self.thresholds) {
                    warn!(
                        title = %document.title,
                        "Extraction looks weak; export will proceed anyway"
                    );
                }
                let outcome = filter_by_date_range(
                    document,
                    options.date_range_start,
                    options.date_range_end,
                );
                any_skipped |= outcome.skipped;
                outcome.document
            })
            .collect();

        let mut document = if normalized.len() == 1 {
            normalized.into_iter().next().unwrap_or_else(|| unreachable!())
        } else {
            merge_documents(&normalized, &self.app_name)
        };

        document.title = with_content_date_stamp(&document.title, options);
        (document, any_skipped)
    }

    /// Render a document for the requested format.
    ///
    /// Errors with [`AppError::ExtractionEmpty`] when nothing survives the
    /// role filter and conversion.
    pub fn render(
        &self,
        document: &ConversationDocument,
        format: ExportFormat,
        options: &ExportOptions,
    ) -> Result<ExportArtifact> {
        let prepared = render::prepare(document, options);
        self.render_prepared(&prepared, format, options)
    }

    /// Render an already-prepared document, e.g. after image inlining.
    pub fn render_prepared(
        &self,
        prepared: &render::PreparedDocument,
        format: ExportFormat,
        options: &ExportOptions,
    ) -> Result<ExportArtifact> {
        if prepared.messages.is_empty() {
            return Err(AppError::ExtractionEmpty {
                message: "no message content survived filtering and conversion".to_owned(),
            });
        }

        let blob = match format {
            ExportFormat::Markdown => render::markdown::render(prepared, options),
            ExportFormat::Text => render::text::render(prepared, options),
            ExportFormat::Html => render::html::render(prepared, options),
            ExportFormat::Word => render::html::render_word(prepared, options),
            ExportFormat::Pdf => render::html::render_pdf_source(prepared, options),
            ExportFormat::Notion => render::notion::render(prepared, options),
        };

        Ok(ExportArtifact {
            blob,
            basename: build_export_basename(&prepared.title, options),
        })
    }
}

fn select_refs(listed: &[ConversationRef], scope: &Scope) -> Result<Vec<ConversationRef>> {
    let refs: Vec<ConversationRef> = match scope {
        Scope::Single => listed.first().cloned().into_iter().collect(),
        Scope::All => listed.to_vec(),
        Scope::Selected(indices) => {
            let mut picked = Vec::with_capacity(indices.len());
            for &i in indices {
                let Some(reference) = listed.get(i) else {
                    return Err(AppError::Config {
                        message: format!(
                            "selection {} is out of range, {} conversations available",
                            i + 1,
                            listed.len()
                        ),
                    });
                };
                picked.push(reference.clone());
            }
            picked
        }
    };

    if refs.is_empty() {
        return Err(AppError::ExtractionEmpty {
            message: "no conversations matched the requested scope".to_owned(),
        });
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CanonicalMessage, Role};

    struct StubSource {
        documents: Vec<(ConversationRef, Result<ConversationDocument>)>,
    }

    impl StubSource {
        fn conversation(id: &str, html: &str) -> (ConversationRef, Result<ConversationDocument>) {
            (
                ConversationRef {
                    id: id.to_owned(),
                    title: id.to_owned(),
                },
                Ok(ConversationDocument {
                    title: id.to_owned(),
                    messages: vec![
                        CanonicalMessage::new(Role::User, html),
                        CanonicalMessage::new(Role::Assistant, "<p>reply</p>"),
                    ],
                    source_url: None,
                }),
            )
        }

        fn failing(id: &str, reason: &str) -> (ConversationRef, Result<ConversationDocument>) {
            (
                ConversationRef {
                    id: id.to_owned(),
                    title: id.to_owned(),
                },
                Err(AppError::remote(reason)),
            )
        }
    }

    #[async_trait]
    impl ConversationSource for StubSource {
        async fn list(&self) -> Result<Vec<ConversationRef>> {
            Ok(self.documents.iter().map(|(r, _)| r.clone()).collect())
        }

        async fn fetch(&self, reference: &ConversationRef) -> Result<ConversationDocument> {
            let (_, result) = self
                .documents
                .iter()
                .find(|(r, _)| r.id == reference.id)
                .unwrap();
            match result {
                Ok(document) => Ok(document.clone()),
                Err(err) => Err(AppError::remote(err.to_string())),
            }
        }
    }

    fn service() -> ExportService {
        ExportService::default()
    }

    #[tokio::test]
    async fn test_partial_success_keeps_going() {
        let source = StubSource {
            documents: vec![
                StubSource::conversation("a", "<p>one</p>"),
                StubSource::failing("b", "boom"),
                StubSource::conversation("c", "<p>three</p>"),
            ],
        };
        let outcome = service()
            .collect(&source, &Scope::All, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("boom"));
    }

    #[tokio::test]
    async fn test_all_failed_is_none_processed() {
        let source = StubSource {
            documents: vec![StubSource::failing("a", "down"), StubSource::failing("b", "down")],
        };
        let err = service()
            .collect(&source, &Scope::All, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            AppError::NoneProcessed { total, first_reason } => {
                assert_eq!(total, 2);
                assert!(first_reason.contains("down"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_between_conversations() {
        let source = StubSource {
            documents: vec![
                StubSource::conversation("a", "<p>one</p>"),
                StubSource::conversation("b", "<p>two</p>"),
            ],
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = service()
            .collect(&source, &Scope::All, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoneProcessed { .. }));
    }

    #[tokio::test]
    async fn test_selected_scope_out_of_range() {
        let source = StubSource {
            documents: vec![StubSource::conversation("a", "<p>one</p>")],
        };
        let err = service()
            .collect(&source, &Scope::Selected(vec![0, 5]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
    }

    #[test]
    fn test_assemble_merges_multiple() {
        let documents = vec![
            ConversationDocument {
                title: "First".into(),
                messages: vec![CanonicalMessage::new(Role::User, "<p>a</p>")],
                source_url: None,
            },
            ConversationDocument {
                title: "Second".into(),
                messages: vec![CanonicalMessage::new(Role::User, "<p>b</p>")],
                source_url: None,
            },
        ];
        let (merged, skipped) = service().assemble(documents, &ExportOptions::default());
        assert!(!skipped);
        assert!(merged.title.contains("Conversations (2)"));
        assert_eq!(merged.messages.iter().filter(|m| m.role == Role::Meta).count(), 2);
    }

    #[test]
    fn test_assemble_reports_unusable_date_filter() {
        let documents = vec![ConversationDocument {
            title: "Undated".into(),
            messages: vec![CanonicalMessage::new(Role::User, "<p>a</p>")],
            source_url: None,
        }];
        let options = ExportOptions {
            date_range_start: chrono::NaiveDate::from_ymd_opt(2026, 1, 1),
            ..ExportOptions::default()
        };
        let (document, skipped) = service().assemble(documents, &options);
        assert!(skipped);
        assert_eq!(document.messages.len(), 1);
    }

    #[test]
    fn test_render_empty_is_extraction_empty() {
        let document = ConversationDocument {
            title: "Empty".into(),
            messages: vec![CanonicalMessage::new(Role::User, "<script>x</script>")],
            source_url: None,
        };
        let err = service()
            .render(&document, ExportFormat::Markdown, &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionEmpty { .. }));
    }

    #[test]
    fn test_render_markdown_artifact() {
        let document = ConversationDocument {
            title: "My Chat".into(),
            messages: vec![CanonicalMessage::new(Role::User, "<p>hello</p>")],
            source_url: None,
        };
        let artifact = service()
            .render(&document, ExportFormat::Markdown, &ExportOptions::default())
            .unwrap();
        assert_eq!(artifact.blob.extension, "md");
        assert_eq!(artifact.basename, "My_Chat");
    }
}
