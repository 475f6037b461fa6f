use std::fmt::{Debug, Display};

use crate::feed::{CollectionFeed, DocumentFeed};

use super::{CollectionPath, DocumentId, DocumentPath, Fields};

/// A trait defining the document store backing a card.
///
/// The store is the single source of truth. Writes are asynchronous and report
/// success or failure through their returned future; subscribers receive full
/// snapshots of whatever they watch after every committed write.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Error type returned by store operations.
    type StoreError: Debug + Display;

    /// Should open a live feed of full snapshots of the collection at `path`.
    ///
    /// The current state is delivered as the first snapshot, even if the
    /// collection is empty.
    fn subscribe_collection(&self, path: &CollectionPath)
    -> Result<CollectionFeed, Self::StoreError>;

    /// Should open a live feed of a single document, delivered the same way.
    fn subscribe_document(&self, path: &DocumentPath) -> Result<DocumentFeed, Self::StoreError>;

    /// Should insert a new document and return its server-assigned id.
    ///
    /// The store stamps the document with a [`CREATED_AT_FIELD`](super::CREATED_AT_FIELD)
    /// write timestamp, overriding any client-supplied value.
    async fn create_document(
        &self,
        path: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, Self::StoreError>;

    /// Should merge `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Fails if the document does not exist.
    async fn update_fields(&self, path: &DocumentPath, fields: Fields)
    -> Result<(), Self::StoreError>;

    /// Should delete a document. Deleting a missing document is not an error.
    async fn delete_document(&self, path: &DocumentPath) -> Result<(), Self::StoreError>;

    /// Should replace the whole document at `path`, creating it if needed.
    async fn upsert_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> Result<(), Self::StoreError>;
}
