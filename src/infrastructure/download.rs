//! Writing rendered exports to disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::application::ExportBlob;
use crate::domain::{AppError, Result};

/// Write a rendered blob as `<dir>/<basename>.<ext>`, creating the
/// directory if needed. An existing file is overwritten.
pub fn write_export(blob: &ExportBlob, dir: &Path, basename: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create output directory: {}", dir.display()), e))?;

    let path = dir.join(format!("{basename}.{}", blob.extension));
    fs::write(&path, &blob.bytes)
        .map_err(|e| AppError::io(format!("Failed to write export: {}", path.display()), e))?;

    info!(path = %path.display(), bytes = blob.bytes.len(), "Export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_export_creates_dir_and_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("exports");
        let blob = ExportBlob::text("# hi\n".to_owned(), "text/markdown", "md");

        let path = write_export(&blob, &out, "My_Chat").unwrap();
        assert_eq!(path, out.join("My_Chat.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# hi\n");
    }

    #[test]
    fn test_write_export_overwrites() {
        let dir = tempdir().unwrap();
        let blob_a = ExportBlob::text("a".to_owned(), "text/plain", "txt");
        let blob_b = ExportBlob::text("b".to_owned(), "text/plain", "txt");

        write_export(&blob_a, dir.path(), "x").unwrap();
        let path = write_export(&blob_b, dir.path(), "x").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "b");
    }
}
