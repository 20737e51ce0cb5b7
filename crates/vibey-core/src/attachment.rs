use std::path::Path;

use anyhow::{bail, Context, Result};

/// An image the user attached to a query, held in memory until upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        if !content_type.starts_with("image/") {
            bail!("{} is not an image ({})", path.display(), content_type);
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Attachment path has no file name")?
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Ok(Self::new(file_name, content_type, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_path_reads_bytes_and_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outfit.jpg");
        std::fs::write(&path, b"\xff\xd8\xff").unwrap();

        let image = ImageAttachment::from_path(&path).await.unwrap();
        assert_eq!(image.file_name, "outfit.jpg");
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.bytes, b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn test_non_image_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        assert!(ImageAttachment::from_path(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(ImageAttachment::from_path(&dir.path().join("gone.png")).await.is_err());
    }
}
