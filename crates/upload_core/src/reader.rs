//! File references and the content-reading seam.
//!
//! A [`FileRef`] is whatever the surface handed us: a filesystem path from a
//! picker or a native drop, or an in-memory byte payload when the host only
//! supplies bytes. Reading decodes lossily as UTF-8, so the only way a session
//! fails is an I/O error on the underlying payload.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// Extensions offered by the picker filter. Advisory only: any file the user
/// manages to drop is still ingested.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["log", "json", "txt", "csv", "xml"];

/// A single file supplied by the user.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub name: String,
    pub payload: FilePayload,
}

#[derive(Debug, Clone)]
pub enum FilePayload {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl FileRef {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("unnamed")
            .to_string();
        Self {
            name,
            payload: FilePayload::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Arc<[u8]>) -> Self {
        Self {
            name: name.into(),
            payload: FilePayload::Bytes(bytes),
        }
    }

    pub fn has_accepted_extension(&self) -> bool {
        let lower = self.name.to_ascii_lowercase();
        ACCEPTED_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
    }
}

/// The selected file could not be read. Terminal for the session.
#[derive(Debug, Error)]
#[error("failed to read '{name}': {source}")]
pub struct ReadFailure {
    pub name: String,
    #[source]
    pub source: std::io::Error,
}

/// Seam for the real read at the end of the progress sequence.
#[async_trait]
pub trait ContentReader: Send + Sync {
    async fn read_text(&self, file: &FileRef) -> Result<String, ReadFailure>;
}

/// Production reader: path payloads go through `tokio::fs`, byte payloads are
/// decoded directly.
pub struct FsContentReader;

#[async_trait]
impl ContentReader for FsContentReader {
    async fn read_text(&self, file: &FileRef) -> Result<String, ReadFailure> {
        let bytes = match &file.payload {
            FilePayload::Path(path) => {
                tokio::fs::read(path).await.map_err(|source| ReadFailure {
                    name: file.name.clone(),
                    source,
                })?
            }
            FilePayload::Bytes(bytes) => bytes.to_vec(),
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ref_from_path_uses_final_component_as_name() {
        let file = FileRef::from_path(PathBuf::from("/tmp/reports/summary.json"));
        assert_eq!(file.name, "summary.json");
    }

    #[test]
    fn accepted_extension_check_is_case_insensitive() {
        let accepted = FileRef::from_bytes("Server.LOG", Arc::from(&b"x"[..]));
        let rejected = FileRef::from_bytes("archive.tar.gz", Arc::from(&b"x"[..]));
        assert!(accepted.has_accepted_extension());
        assert!(!rejected.has_accepted_extension());
    }

    #[tokio::test]
    async fn byte_payloads_decode_lossily_instead_of_failing() {
        let payload: Arc<[u8]> = Arc::from(&[0x68, 0x69, 0xff, 0x21][..]);
        let file = FileRef::from_bytes("mixed.txt", payload);
        let content = FsContentReader
            .read_text(&file)
            .await
            .expect("lossy decode never fails");
        assert!(content.starts_with("hi"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn missing_path_surfaces_an_io_failure_naming_the_file() {
        let file = FileRef::from_path(PathBuf::from("/definitely/not/here/orders.csv"));
        let err = FsContentReader
            .read_text(&file)
            .await
            .expect_err("missing file must fail");
        assert_eq!(err.name, "orders.csv");
        assert!(err.to_string().contains("orders.csv"));
    }
}
