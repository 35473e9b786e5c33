//! Product image storage on the local filesystem.
//!
//! Files are written as `<millis>-<random>-<sanitized original name>` inside
//! the upload directory, which is also served under `/uploads`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use thiserror::Error;

/// Longest sanitized original name kept in a stored file name.
const MAX_NAME_LEN: usize = 100;

/// Accepted image content types and the extension each implies.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
];

/// Errors that can occur while accepting an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file is not a JPEG, PNG, or GIF.
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    /// The multipart body could not be read.
    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    /// Writing the file failed.
    #[error("failed to store upload: {0}")]
    Io(#[from] io::Error),
}

impl UploadError {
    /// Whether the client caused this error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::Multipart(_))
    }
}

/// An image received with a request, not yet written to disk.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Name the client gave the file, if any.
    pub file_name: Option<String>,
    /// Declared content type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Writes and removes uploaded images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Create a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The upload directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Validate and write an upload, returning the stored file name.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType` for anything but JPEG, PNG, or GIF.
    /// Returns `UploadError::Io` if the file cannot be written.
    pub async fn save(&self, upload: &ImageUpload) -> Result<String, UploadError> {
        let extension = extension_for(&upload.content_type)?;
        let file_name = stored_file_name(upload.file_name.as_deref(), extension);

        tokio::fs::write(self.dir.join(&file_name), &upload.bytes).await?;
        tracing::debug!(file = %file_name, bytes = upload.bytes.len(), "Stored upload");

        Ok(file_name)
    }

    /// Remove a stored file. Failures are logged, never returned.
    pub async fn remove(&self, file_name: &str) {
        // Stored names never contain separators; refuse anything that does.
        if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            tracing::warn!(file = %file_name, "Refusing to remove suspicious upload path");
            return;
        }

        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => tracing::debug!(file = %file_name, "Removed upload"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(file = %file_name, error = %e, "Failed to remove upload"),
        }
    }
}

/// Extension for an accepted content type.
fn extension_for(content_type: &str) -> Result<&'static str, UploadError> {
    // Ignore parameters such as `; charset=binary`.
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| UploadError::UnsupportedType(content_type.to_string()))
}

fn stored_file_name(original: Option<&str>, extension: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random: u32 = rand::rng().random();
    let name = sanitize_file_name(original.unwrap_or_default(), extension);
    format!("{millis}-{random:08x}-{name}")
}

/// Reduce a client-supplied name to `[A-Za-z0-9._-]`, keeping only the final
/// path component and guaranteeing an extension.
fn sanitize_file_name(original: &str, extension: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return format!("image.{extension}");
    }
    if cleaned.contains('.') {
        cleaned.to_string()
    } else {
        format!("{cleaned}.{extension}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str) -> ImageUpload {
        ImageUpload {
            file_name: Some(name.to_string()),
            content_type: content_type.to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn test_allowed_types() {
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpg");
        assert_eq!(extension_for("IMAGE/PNG").unwrap(), "png");
        assert_eq!(extension_for("image/gif; charset=binary").unwrap(), "gif");
        assert!(matches!(
            extension_for("image/svg+xml"),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(extension_for("application/pdf").is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("mug.png", "png"), "mug.png");
        assert_eq!(sanitize_file_name("../../etc/passwd", "png"), "passwd.png");
        assert_eq!(sanitize_file_name("C:\\pics\\my mug.JPG", "jpg"), "my_mug.JPG");
        assert_eq!(sanitize_file_name(".hidden", "gif"), "hidden.gif");
        assert_eq!(sanitize_file_name("", "gif"), "image.gif");
    }

    #[test]
    fn test_stored_file_name_shape() {
        let name = stored_file_name(Some("mug.png"), "png");
        let parts: Vec<&str> = name.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], "mug.png");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let name = store.save(&upload("mug.png", "image/png")).await.unwrap();
        let path = dir.path().join(&name);
        assert_eq!(std::fs::read(&path).unwrap(), vec![0x89, b'P', b'N', b'G']);

        store.remove(&name).await;
        assert!(!path.exists());

        // Removing twice is harmless.
        store.remove(&name).await;
    }

    #[tokio::test]
    async fn test_save_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let err = store
            .save(&upload("notes.txt", "text/plain"))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
