use chrono::Utc;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use serde::{Deserialize, Serialize};

use crate::{CollectionPath, DocumentId, DocumentPath, Fields};

/// Live feed of a collection. Every item is a complete snapshot.
pub type CollectionFeed = UnboundedReceiver<CollectionSnapshot>;

/// Live feed of a single document.
pub type DocumentFeed = UnboundedReceiver<DocumentSnapshot>;

/// A document as delivered by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub fields: Fields,
}

/// The complete set of documents under a collection at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub path: CollectionPath,
    pub documents: Vec<StoredDocument>,
}

impl CollectionSnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// The state of one document at one instant; `fields` is `None` if it does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub path: DocumentPath,
    pub fields: Option<Fields>,
}

/// Subscriber registry shared by the store backends.
///
/// Backends call [`Feed::publish`] after every committed write with the full
/// contents of the touched collection. Closed subscribers are pruned lazily.
#[derive(Debug, Default)]
pub struct Feed {
    collections: Vec<(CollectionPath, UnboundedSender<CollectionSnapshot>)>,
    documents: Vec<(DocumentPath, UnboundedSender<DocumentSnapshot>)>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collection subscriber and hands it the current contents.
    pub fn watch_collection(
        &mut self,
        path: CollectionPath,
        current: Vec<StoredDocument>,
    ) -> CollectionFeed {
        let (tx, rx) = mpsc::unbounded();
        // A fresh channel only fails to send if the receiver is gone, which it is not.
        let _ = tx.unbounded_send(CollectionSnapshot {
            path: path.clone(),
            documents: current,
        });
        self.collections.push((path, tx));
        rx
    }

    /// Registers a document subscriber and hands it the current state.
    pub fn watch_document(&mut self, path: DocumentPath, current: Option<Fields>) -> DocumentFeed {
        let (tx, rx) = mpsc::unbounded();
        let _ = tx.unbounded_send(DocumentSnapshot {
            path: path.clone(),
            fields: current,
        });
        self.documents.push((path, tx));
        rx
    }

    /// Pushes the new contents of `path` to everyone watching it or one of its documents.
    pub fn publish(&mut self, path: &CollectionPath, documents: &[StoredDocument]) {
        self.collections.retain(|(watched, tx)| {
            if watched != path {
                return !tx.is_closed();
            }
            tx.unbounded_send(CollectionSnapshot {
                path: path.clone(),
                documents: documents.to_vec(),
            })
            .is_ok()
        });

        self.documents.retain(|(watched, tx)| {
            if &watched.collection != path {
                return !tx.is_closed();
            }
            let fields = documents
                .iter()
                .find(|doc| doc.id == watched.id)
                .map(|doc| doc.fields.clone());
            tx.unbounded_send(DocumentSnapshot {
                path: watched.clone(),
                fields,
            })
            .is_ok()
        });
    }

    /// Number of live subscribers, collection and document feeds combined.
    pub fn subscriber_count(&self) -> usize {
        self.collections.iter().filter(|(_, tx)| !tx.is_closed()).count()
            + self.documents.iter().filter(|(_, tx)| !tx.is_closed()).count()
    }
}

/// Source of server write timestamps.
///
/// Timestamps are epoch milliseconds and strictly increasing, so documents
/// created within the same millisecond still have a defined newest-first order.
#[derive(Debug, Default)]
pub struct ServerClock {
    last: i64,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_millis(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }
}
