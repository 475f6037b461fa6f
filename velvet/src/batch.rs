use std::collections::BTreeSet;

use crate::{CollectionPath, DocumentId, DocumentPath, Fields};

/// A single pending operation of a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert a new document; fails the batch if the id is taken.
    Create { path: DocumentPath, fields: Fields },
    /// Merge fields into an existing document; fails the batch if it is missing.
    Update { path: DocumentPath, fields: Fields },
    /// Delete a document if present.
    Delete { path: DocumentPath },
}

impl BatchOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Create { path, .. } | Self::Update { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Buffer of writes committed together through
/// [`AtomicDocumentStore::commit_batch`](crate::AtomicDocumentStore::commit_batch).
///
/// Operations are applied in the order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the creation of a document and returns the id allocated for it.
    pub fn create(&mut self, collection: &CollectionPath, fields: Fields) -> DocumentId {
        let id = DocumentId::generate();
        self.ops.push(BatchOp::Create {
            path: collection.doc(id.clone()),
            fields,
        });
        id
    }

    pub fn update(&mut self, path: DocumentPath, fields: Fields) {
        self.ops.push(BatchOp::Update { path, fields });
    }

    pub fn delete(&mut self, path: DocumentPath) {
        self.ops.push(BatchOp::Delete { path });
    }

    pub fn push(&mut self, op: BatchOp) {
        self.ops.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }

    /// Collections written by at least one operation.
    pub fn touched_collections(&self) -> BTreeSet<CollectionPath> {
        self.ops
            .iter()
            .map(|op| op.path().collection.clone())
            .collect()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_batch_new() {
        let batch = WriteBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn test_operations_keep_insertion_order() {
        let photos = CollectionPath::new("photos");
        let mut batch = WriteBatch::new();
        batch.update(photos.doc("b"), fields(json!({"order": 0})));
        let created = batch.create(&photos, fields(json!({"caption": "Joy"})));
        batch.delete(photos.doc("a"));

        let paths: Vec<_> = batch.iter().map(|op| op.path().id.clone()).collect();
        assert_eq!(paths, vec![DocumentId::from("b"), created, DocumentId::from("a")]);
    }

    #[test]
    fn test_touched_collections_are_deduplicated() {
        let photos = CollectionPath::new("photos");
        let config = CollectionPath::new("config");
        let mut batch = WriteBatch::new();
        batch.delete(photos.doc("a"));
        batch.delete(photos.doc("b"));
        batch.delete(config.doc("main"));

        let touched = batch.touched_collections();
        assert_eq!(touched.len(), 2);
        assert!(touched.contains(&photos));
        assert!(touched.contains(&config));
    }
}
