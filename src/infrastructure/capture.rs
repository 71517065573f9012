//! Capture file reading.
//!
//! Captures are JSON files holding one [`ConversationDocument`] each,
//! produced by the browser-side scraping collaborator. A capture source is
//! either a directory of `*.json` captures or an explicit file list.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::application::{ConversationRef, ConversationSource};
use crate::domain::{AppError, ConversationDocument, Result};

/// Parse one capture file.
///
/// # Errors
/// Returns [`AppError::CaptureNotFound`] for a missing file and
/// [`AppError::InvalidCapture`] for unparseable content.
pub fn load_capture_file(path: &Path) -> Result<ConversationDocument> {
    if !path.exists() {
        return Err(AppError::CaptureNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read capture: {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(AppError::invalid_capture)
}

enum CaptureEntries {
    /// Scan a directory for `*.json` captures, sorted by file name.
    Dir(PathBuf),
    /// Explicit capture files in the given order.
    Files(Vec<PathBuf>),
}

/// Filesystem-backed conversation source.
pub struct CaptureSource {
    entries: CaptureEntries,
}

impl CaptureSource {
    /// Source over every `*.json` capture in a directory.
    #[must_use]
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: CaptureEntries::Dir(dir.into()),
        }
    }

    /// Source over an explicit list of capture files.
    #[must_use]
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self {
            entries: CaptureEntries::Files(files),
        }
    }

    fn listed_paths(&self) -> Result<Vec<PathBuf>> {
        match &self.entries {
            CaptureEntries::Files(files) => Ok(files.clone()),
            CaptureEntries::Dir(dir) => {
                let read = fs::read_dir(dir).map_err(|e| {
                    AppError::io(format!("Failed to read capture directory: {}", dir.display()), e)
                })?;
                let mut paths: Vec<PathBuf> = read
                    .filter_map(std::result::Result::ok)
                    .map(|entry| entry.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                    .collect();
                paths.sort();
                Ok(paths)
            }
        }
    }
}

fn reference_for(path: &Path) -> ConversationRef {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    ConversationRef {
        id: path.display().to_string(),
        title,
    }
}

#[async_trait]
impl ConversationSource for CaptureSource {
    async fn list(&self) -> Result<Vec<ConversationRef>> {
        Ok(self.listed_paths()?.iter().map(|p| reference_for(p)).collect())
    }

    async fn fetch(&self, reference: &ConversationRef) -> Result<ConversationDocument> {
        load_capture_file(Path::new(&reference.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use tempfile::tempdir;

    const CAPTURE: &str = r#"{
        "title": "Demo",
        "messages": [
            {"role": "user", "html": "<p>hi</p>"},
            {"role": "assistant", "html": "<p>hello</p>"}
        ],
        "source_url": "https://chat.example/c/1"
    }"#;

    #[test]
    fn test_load_capture_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.json");
        fs::write(&path, CAPTURE).unwrap();

        let document = load_capture_file(&path).unwrap();
        assert_eq!(document.title, "Demo");
        assert_eq!(document.message_count(), 2);
        assert_eq!(document.messages[0].role, Role::User);
    }

    #[test]
    fn test_missing_capture() {
        let err = load_capture_file(Path::new("/nonexistent/cap.json")).unwrap_err();
        assert!(matches!(err, AppError::CaptureNotFound { .. }));
    }

    #[test]
    fn test_invalid_capture() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_capture_file(&path).unwrap_err();
        assert!(matches!(err, AppError::InvalidCapture { .. }));
    }

    #[tokio::test]
    async fn test_dir_listing_sorted_json_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.json"), CAPTURE).unwrap();
        fs::write(dir.path().join("a.json"), CAPTURE).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let source = CaptureSource::from_dir(dir.path());
        let refs = source.list().await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "a");
        assert_eq!(refs[1].title, "b");

        let document = source.fetch(&refs[0]).await.unwrap();
        assert_eq!(document.title, "Demo");
    }
}
