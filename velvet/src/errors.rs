use thiserror::Error;

use crate::DocumentId;

/// Errors of the purely local edits made inside a reorder session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no photo with id {0} in the reorder session")]
    UnknownRecord(DocumentId),
}

/// Errors that can occur while synchronising with the store.
///
/// None of them is fatal: local state is left as it was before the failed
/// operation, so the user action can simply be retried.
#[derive(Debug, Error)]
pub enum SyncError<E> {
    /// The store rejected the write or could not be reached.
    #[error("remote store rejected the operation: {0}")]
    Remote(E),
    #[error("a reorder session is already open")]
    AlreadyEditing,
    #[error("no reorder session is open")]
    NotEditing,
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Neither token nor anonymous sign-in succeeded; writes are disabled.
    #[error("the card is read-only because no session could be established")]
    ReadOnly,
    #[error("message text is empty")]
    EmptyMessage,
}

impl<E> SyncError<E> {
    /// Whether retrying the same action later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
