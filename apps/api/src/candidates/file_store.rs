use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::candidates::models::UploadedFile;
use crate::candidates::validation::{DOCX_MIME, DOC_MIME, PDF_MIME};
use crate::models::candidate::ResumeRef;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("could not prepare upload directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read file {path}: {source}")]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A résumé read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Local-disk storage for résumé binaries, rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    /// Creates the storage directory (and parents) if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), FileStoreError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| FileStoreError::Prepare {
                path: self.root.clone(),
                source,
            })
    }

    /// Writes `file` as `candidate-{owner_id}-{epoch_millis}{ext}`.
    ///
    /// The file is opened with `create_new`, so an existing artifact is never
    /// overwritten. If the name is already taken (clock rollback), a random
    /// suffix is appended and the write retried once.
    pub async fn save(
        &self,
        file: &UploadedFile,
        owner_id: i32,
    ) -> Result<ResumeRef, FileStoreError> {
        self.ensure_dir().await?;

        let extension = dotted_extension(&file.original_name);
        let stem = format!("candidate-{owner_id}-{}", Utc::now().timestamp_millis());

        let primary = format!("{stem}{extension}");
        let (file_name, handle) = match create_exclusive(&self.root.join(&primary)).await {
            Ok(handle) => (primary, handle),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!("Résumé name {primary} already taken, adding a random suffix");
                let fallback = format!("{stem}-{}{extension}", Uuid::new_v4().simple());
                let path = self.root.join(&fallback);
                let handle = create_exclusive(&path)
                    .await
                    .map_err(|source| FileStoreError::Write { path, source })?;
                (fallback, handle)
            }
            Err(source) => {
                return Err(FileStoreError::Write {
                    path: self.root.join(&primary),
                    source,
                })
            }
        };

        let path = self.root.join(&file_name);
        write_all(handle, &file.bytes)
            .await
            .map_err(|source| FileStoreError::Write {
                path: path.clone(),
                source,
            })?;

        info!("Stored résumé {} ({} bytes)", path.display(), file.size());

        Ok(ResumeRef {
            file_name,
            file_path: path.to_string_lossy().into_owned(),
            mime_type: file.mime_type.clone(),
        })
    }

    /// Best-effort removal. Failures (including a missing file) are logged
    /// and otherwise ignored.
    pub async fn delete(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match fs::remove_file(path).await {
            Ok(()) => debug!("Deleted stored file {}", path.display()),
            Err(e) => warn!("Could not delete stored file {}: {e}", path.display()),
        }
    }

    /// Reads a stored file. The MIME type is derived from the extension only.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<ResumeFile, FileStoreError> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .await
            .map_err(|source| FileStoreError::ReadFailure {
                path: path.to_path_buf(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ResumeFile {
            bytes,
            mime_type: mime_type_for(path).to_string(),
            file_name,
        })
    }
}

async fn create_exclusive(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

async fn write_all(mut handle: File, bytes: &[u8]) -> io::Result<()> {
    handle.write_all(bytes).await?;
    handle.flush().await
}

/// Original extension including the leading dot, case preserved; empty if
/// the name has none.
fn dotted_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("docx") => DOCX_MIME,
        Some("doc") => DOC_MIME,
        _ => OCTET_STREAM,
    }
}
