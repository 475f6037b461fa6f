use std::fmt::Display;

use velvet::DocumentPath;

/// Errors that can occur during file storage operations.
#[derive(Debug)]
pub enum FileStoreError {
    /// An I/O error occurred while reading or writing files.
    Io(std::io::Error),
    /// A document file does not hold a JSON object.
    Serialization(serde_json::Error),
    /// An update targeted a document that does not exist.
    NotFound(DocumentPath),
    /// A create targeted an id that is already taken.
    AlreadyExists(DocumentPath),
    /// A written file did not read back as written.
    Verification(DocumentPath),
    /// A thread panicked while holding the store lock.
    Poisoned,
    InvalidToken,
}

impl Display for FileStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::NotFound(path) => write!(f, "Document not found: {path}"),
            Self::AlreadyExists(path) => write!(f, "Document already exists: {path}"),
            Self::Verification(path) => write!(f, "Verification failed for {path}"),
            Self::Poisoned => write!(f, "Store lock poisoned"),
            Self::InvalidToken => write!(f, "Invalid sign-in token"),
        }
    }
}

impl std::error::Error for FileStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FileStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<std::io::Error> for FileStoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
