use crate::config::StorageConfig;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("empty or unusable filename")]
    InvalidFilename,
    #[error("no stored image named {0}")]
    NotFound(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Filesystem-backed upload and output areas. Uploads live under a
/// request-unique name and are removed when their [`TempUpload`] guard
/// drops; outputs are keyed by the sanitized client filename so
/// `/result-image/<filename>` stays stable.
#[derive(Debug, Clone)]
pub struct ImageStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Writes the uploaded bytes under a uuid-prefixed name and returns a
    /// guard that deletes the file when dropped.
    pub async fn save_upload(&self, filename: &str, data: &[u8]) -> Result<TempUpload, StorageError> {
        let name = sanitize_filename(filename).ok_or(StorageError::InvalidFilename)?;
        let path = self.upload_dir.join(format!("{}_{}", Uuid::new_v4(), name));
        tokio::fs::write(&path, data).await?;
        Ok(TempUpload { path, name })
    }

    /// Where the annotated image for `name` lives. Callers pass a name that
    /// already went through [`sanitize_filename`].
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub async fn read_output(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let name = sanitize_filename(filename).ok_or(StorageError::InvalidFilename)?;
        match tokio::fs::read(self.output_dir.join(&name)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(name)),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reduces a client-supplied filename to a single path component.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// A stored upload that only lives for the request handling it.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    name: String,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sanitized client filename, used as the output key.
    pub fn file_name(&self) -> &str {
        &self.name
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!("failed to remove temp upload {}: {}", self.path.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (ImageStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("crop_detect_store_{}", Uuid::new_v4()));
        let config = StorageConfig {
            upload_dir: root.join("uploads"),
            output_dir: root.join("outputs"),
        };
        let store = ImageStore::new(&config);
        store.ensure_dirs().unwrap();
        (store, root)
    }

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("leaf.jpg").as_deref(), Some("leaf.jpg"));
        assert_eq!(sanitize_filename("a b.png").as_deref(), Some("a b.png"));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\uploads\\leaf.jpg").as_deref(),
            Some("leaf.jpg")
        );
    }

    #[test]
    fn sanitize_rejects_names_without_a_component() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("   "), None);
        assert_eq!(sanitize_filename("uploads/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[tokio::test]
    async fn temp_upload_is_removed_on_drop() {
        let (store, root) = test_store();

        let upload = store.save_upload("leaf.jpg", b"not really a jpeg").await.unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(upload.file_name(), "leaf.jpg");

        drop(upload);
        assert!(!path.exists());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn read_output_reports_missing_files() {
        let (store, root) = test_store();

        let err = store.read_output("nothing.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(name) if name == "nothing.jpg"));

        std::fs::write(store.output_path("found.jpg"), b"bytes").unwrap();
        assert_eq!(store.read_output("found.jpg").await.unwrap(), b"bytes");

        std::fs::remove_dir_all(root).unwrap();
    }
}
