//! Per-ticket attachment storage on the local filesystem.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Storage for files attached to tickets.
#[async_trait]
pub trait AttachmentFiles: Send + Sync {
    /// Writes a text file for a ticket, replacing any previous content.
    async fn write_text(&self, ticket_id: u64, filename: &str, text: &str) -> io::Result<()>;

    /// Reads a ticket's file for upload.
    async fn read(&self, ticket_id: u64, filename: &str) -> io::Result<Vec<u8>>;
}

/// Attachments stored as `{root}/{ticket id}/{filename}`.
#[derive(Debug, Clone)]
pub struct LocalAttachmentFiles {
    root: PathBuf,
}

impl LocalAttachmentFiles {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn ticket_dir(&self, ticket_id: u64) -> PathBuf {
        self.root.join(ticket_id.to_string())
    }
}

#[async_trait]
impl AttachmentFiles for LocalAttachmentFiles {
    async fn write_text(&self, ticket_id: u64, filename: &str, text: &str) -> io::Result<()> {
        let dir = self.ticket_dir(ticket_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(filename);
        debug!(path = %path.display(), bytes = text.len(), "Writing attachment file");
        tokio::fs::write(path, text).await
    }

    async fn read(&self, ticket_id: u64, filename: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.ticket_dir(ticket_id).join(filename)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_into_ticket_directory() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());

        files.write_text(42, "ICU-42.txt", "hello").await.unwrap();

        let on_disk = std::fs::read_to_string(temp.path().join("42").join("ICU-42.txt")).unwrap();
        assert_eq!(on_disk, "hello");
        assert_eq!(files.read(42, "ICU-42.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn overwrites_existing_files() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());

        files.write_text(1, "a.txt", "first").await.unwrap();
        files.write_text(1, "a.txt", "second").await.unwrap();

        assert_eq!(files.read(1, "a.txt").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn reading_a_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let files = LocalAttachmentFiles::new(temp.path());

        let err = files.read(7, "absent.bin").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
