use std::cmp::Ordering;

use futures::{FutureExt, StreamExt};
use tracing::{debug, warn};

use crate::{
    CollectionPath, DocumentId, DocumentStore, UserId,
    errors::SyncError,
    feed::{CollectionFeed, CollectionSnapshot},
    records::{MessageRecord, USER_FIELD},
};

/// Newest first. Messages the store has not stamped yet are the newest of all.
fn compare(a: &MessageRecord, b: &MessageRecord) -> Ordering {
    let by_time = match (a.created_at, b.created_at) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (a_at, b_at) => b_at.cmp(&a_at),
    };
    by_time.then_with(|| a.id.cmp(&b.id))
}

/// Append-only list of guestbook messages mirrored from the store.
pub struct Guestbook<S> {
    store: S,
    path: CollectionPath,
    messages: Vec<MessageRecord>,
    feed: Option<CollectionFeed>,
}

impl<S: DocumentStore> Guestbook<S> {
    pub fn new(store: S, path: CollectionPath) -> Self {
        Self {
            store,
            path,
            messages: Vec::new(),
            feed: None,
        }
    }

    pub fn messages(&self) -> &[MessageRecord] {
        &self.messages
    }

    pub fn subscribe(&mut self) -> Result<(), SyncError<S::StoreError>> {
        let feed = self
            .store
            .subscribe_collection(&self.path)
            .map_err(SyncError::Remote)?;
        self.feed = Some(feed);
        self.pump();
        Ok(())
    }

    /// Applies every snapshot that has already arrived.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(feed) = self.feed.as_mut() {
            match feed.next().now_or_never() {
                Some(Some(snapshot)) => {
                    self.apply_snapshot(snapshot);
                    applied += 1;
                }
                Some(None) => {
                    warn!(path = %self.path, "guestbook feed closed by the store");
                    self.feed = None;
                }
                None => break,
            }
        }
        applied
    }

    pub fn apply_snapshot(&mut self, snapshot: CollectionSnapshot) {
        let mut messages: Vec<MessageRecord> = snapshot
            .documents
            .iter()
            .map(MessageRecord::from_stored)
            .collect();
        messages.sort_by(compare);
        debug!(messages = messages.len(), "applying guestbook snapshot");
        self.messages = messages;
    }

    /// Signs the guestbook. Blank text is refused before reaching the store.
    pub async fn post(
        &self,
        text: &str,
        sender: Option<&str>,
        author: Option<&UserId>,
    ) -> Result<DocumentId, SyncError<S::StoreError>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        let mut fields = MessageRecord::new_fields(text, sender);
        if let Some(author) = author {
            fields.insert(USER_FIELD.into(), author.as_str().into());
        }
        self.store
            .create_document(&self.path, fields)
            .await
            .map_err(SyncError::Remote)
    }
}
