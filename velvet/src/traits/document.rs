use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Name of the server-assigned write timestamp, in epoch milliseconds.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A record type that lives in a named collection of the card.
///
/// Usually derived with `#[derive(Document)]` and `#[collection("...")]`.
pub trait Document {
    /// Collection name, relative to the card namespace.
    const COLLECTION: &'static str;
}

/// Opaque identifier of a stored document, unique within its collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Slash separated path of a collection, e.g. `artifacts/app/public/data/photos`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the document `id` inside this collection.
    pub fn doc(&self, id: impl Into<DocumentId>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// Path segments, skipping empty ones.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentPath {
    pub collection: CollectionPath,
    pub id: DocumentId,
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_display() {
        let path = CollectionPath::new("artifacts/app/public/data/photos").doc("abc");
        assert_eq!(path.to_string(), "artifacts/app/public/data/photos/abc");
    }

    #[test]
    fn test_segments_skip_empty() {
        let path = CollectionPath::new("/artifacts//photos/");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["artifacts", "photos"]);
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }
}
