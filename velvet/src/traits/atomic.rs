use crate::batch::WriteBatch;

use super::DocumentStore;

/// A trait defining atomic batch writes for document stores.
///
/// This trait extends [`DocumentStore`] with a multi-document write that either
/// applies completely or not at all. Reordering the gallery relies on it: a
/// batch that fails must leave every document at its pre-commit value.
#[allow(async_fn_in_trait)]
pub trait AtomicDocumentStore: DocumentStore {
    /// Execute every operation of `batch` atomically.
    ///
    /// Subscribers observe either none of the operations or all of them, in a
    /// single snapshot per touched collection.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation would fail (for example an update of a
    /// missing document). In that case no change is persisted.
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), Self::StoreError>;
}
