use std::{
    collections::BTreeMap,
    error::Error,
    fmt::{self, Display},
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::debug;

use crate::{
    AtomicDocumentStore, Authenticator, BatchOp, CREATED_AT_FIELD, CollectionPath, DocumentId,
    DocumentPath, DocumentStore, Fields, UserId, WriteBatch,
    feed::{CollectionFeed, DocumentFeed, Feed, ServerClock, StoredDocument},
};

type Collections = BTreeMap<CollectionPath, BTreeMap<DocumentId, Fields>>;

/// Error type for [`MemoryStore`] operations.
#[derive(Debug, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// An update targeted a document that does not exist.
    NotFound(DocumentPath),
    /// A batch create targeted an id that is already taken.
    AlreadyExists(DocumentPath),
    /// A previous holder of the store lock panicked.
    Poisoned,
    /// Token sign-in was attempted with an empty token.
    InvalidToken,
}

impl Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "No document at {path}"),
            Self::AlreadyExists(path) => write!(f, "Document already exists at {path}"),
            Self::Poisoned => write!(f, "Memory store lock poisoned"),
            Self::InvalidToken => write!(f, "Invalid sign-in token"),
        }
    }
}

impl Error for MemoryStoreError {}

#[derive(Debug, Default)]
struct Inner {
    collections: Collections,
    feed: Feed,
    clock: ServerClock,
}

impl Inner {
    fn documents(&self, path: &CollectionPath) -> Vec<StoredDocument> {
        documents_of(&self.collections, path)
    }

    fn publish(&mut self, path: &CollectionPath) {
        let documents = self.documents(path);
        self.feed.publish(path, &documents);
    }
}

fn documents_of(collections: &Collections, path: &CollectionPath) -> Vec<StoredDocument> {
    collections
        .get(path)
        .map(|docs| {
            docs.iter()
                .map(|(id, fields)| StoredDocument {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn apply(
    collections: &mut Collections,
    op: BatchOp,
    created_at: i64,
) -> Result<(), MemoryStoreError> {
    match op {
        BatchOp::Create { path, mut fields } => {
            let docs = collections.entry(path.collection.clone()).or_default();
            if docs.contains_key(&path.id) {
                return Err(MemoryStoreError::AlreadyExists(path));
            }
            fields.insert(CREATED_AT_FIELD.into(), created_at.into());
            docs.insert(path.id, fields);
        }
        BatchOp::Update { path, fields } => {
            let Some(existing) = collections
                .get_mut(&path.collection)
                .and_then(|docs| docs.get_mut(&path.id))
            else {
                return Err(MemoryStoreError::NotFound(path));
            };
            existing.extend(fields);
        }
        BatchOp::Delete { path } => {
            if let Some(docs) = collections.get_mut(&path.collection) {
                docs.remove(&path.id);
            }
        }
    }
    Ok(())
}

/// An in-memory document store.
///
/// Clones are handles to the same data, the way two clients of one backend
/// see each other's writes. Every successful write publishes fresh snapshots
/// to the subscribers of the touched collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, MemoryStoreError> {
        self.inner.lock().map_err(|_| MemoryStoreError::Poisoned)
    }

    /// Reads a single document, outside of any subscription.
    pub fn get(&self, path: &DocumentPath) -> Result<Option<Fields>, MemoryStoreError> {
        let inner = self.lock()?;
        Ok(inner
            .collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .cloned())
    }

    /// Reads every document of a collection, in id order.
    pub fn list(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>, MemoryStoreError> {
        Ok(self.lock()?.documents(path))
    }

    fn write(&self, op: BatchOp) -> Result<(), MemoryStoreError> {
        let mut inner = self.lock()?;
        let collection = op.path().collection.clone();
        let created_at = inner.clock.now_millis();
        apply(&mut inner.collections, op, created_at)?;
        inner.publish(&collection);
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    type StoreError = MemoryStoreError;

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<CollectionFeed, Self::StoreError> {
        let mut inner = self.lock()?;
        let current = inner.documents(path);
        Ok(inner.feed.watch_collection(path.clone(), current))
    }

    fn subscribe_document(&self, path: &DocumentPath) -> Result<DocumentFeed, Self::StoreError> {
        let mut inner = self.lock()?;
        let current = inner
            .collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .cloned();
        Ok(inner.feed.watch_document(path.clone(), current))
    }

    async fn create_document(
        &self,
        path: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, Self::StoreError> {
        let id = DocumentId::generate();
        self.write(BatchOp::Create {
            path: path.doc(id.clone()),
            fields,
        })?;
        debug!(%path, %id, "created document");
        Ok(id)
    }

    async fn update_fields(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> Result<(), Self::StoreError> {
        self.write(BatchOp::Update {
            path: path.clone(),
            fields,
        })
    }

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), Self::StoreError> {
        self.write(BatchOp::Delete { path: path.clone() })
    }

    async fn upsert_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> Result<(), Self::StoreError> {
        let mut inner = self.lock()?;
        inner
            .collections
            .entry(path.collection.clone())
            .or_default()
            .insert(path.id.clone(), fields);
        inner.publish(&path.collection);
        Ok(())
    }
}

impl AtomicDocumentStore for MemoryStore {
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), Self::StoreError> {
        let mut inner = self.lock()?;
        let touched = batch.touched_collections();
        let created_at = inner.clock.now_millis();

        // Work on a copy and only swap it in once every operation has succeeded.
        let mut staged = inner.collections.clone();
        let len = batch.len();
        for op in batch {
            apply(&mut staged, op, created_at)?;
        }
        inner.collections = staged;

        for path in &touched {
            inner.publish(path);
        }
        debug!(operations = len, collections = touched.len(), "committed batch");
        Ok(())
    }
}

impl Authenticator for MemoryStore {
    type AuthError = MemoryStoreError;

    async fn sign_in_with_token(&self, token: &str) -> Result<UserId, Self::AuthError> {
        if token.trim().is_empty() {
            return Err(MemoryStoreError::InvalidToken);
        }
        Ok(UserId::new(format!("user-{}", DocumentId::generate())))
    }

    async fn sign_in_anonymously(&self) -> Result<UserId, Self::AuthError> {
        Ok(UserId::new(format!("anon-{}", DocumentId::generate())))
    }
}
