use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::domain::DocumentRef;
use crate::config::StorageConfig;

const INVOICE_DIR: &str = "invoices";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document storage failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("document {0} is missing from storage")]
    Missing(DocumentRef),
    #[error("invalid document reference: {0}")]
    InvalidReference(String),
}

/// Persistent home for generated invoice documents.
pub trait DocumentStorage: Debug + Send + Sync {
    /// Stores `bytes` under `name`, replacing any previous document of that name.
    fn save(&self, name: &str, bytes: &[u8]) -> Result<DocumentRef, StorageError>;
    fn load(&self, reference: &DocumentRef) -> Result<Vec<u8>, StorageError>;
}

/// Writes documents beneath `{root}/invoices/`.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.media_root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &DocumentRef) -> Result<PathBuf, StorageError> {
        let relative = Path::new(&reference.0);
        let confined = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if reference.0.is_empty() || !confined {
            return Err(StorageError::InvalidReference(reference.0.clone()));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentStorage for FileSystemStorage {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<DocumentRef, StorageError> {
        let file_name = sanitize_file_name(name);
        if file_name.is_empty() {
            return Err(StorageError::InvalidReference(name.to_string()));
        }

        let dir = self.root.join(INVOICE_DIR);
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(&file_name);
        fs::write(&path, bytes).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "document stored");
        Ok(DocumentRef(format!("{INVOICE_DIR}/{file_name}")))
    }

    fn load(&self, reference: &DocumentRef) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(reference)?;
        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StorageError::Missing(reference.clone()),
            _ => StorageError::Io { path, source },
        })
    }
}

/// Keeps `[A-Za-z0-9._-]`; everything else becomes `_`. Leading dots are
/// replaced so a name can never resolve to `.` or `..`.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(index, c)| match c {
            '.' if index == 0 => '_',
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            _ => '_',
        })
        .collect()
}
