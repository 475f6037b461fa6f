use std::{collections::HashMap, mem};

use futures::{FutureExt, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    AtomicDocumentStore, CollectionPath, DocumentId, Fields, WriteBatch,
    errors::{SessionError, SyncError},
    feed::{CollectionFeed, CollectionSnapshot},
    ordering::{self, Position},
    records::{CAPTION_FIELD, NewPhoto, ORDER_FIELD, PhotoRecord},
};

type OnChange = Box<dyn FnMut(&[PhotoRecord])>;

/// A local, editable copy of the gallery.
///
/// Nothing done to a session reaches the store until it is committed through
/// [`OrderedCollectionSync::commit_reorder`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderSession {
    items: Vec<PhotoRecord>,
    original_captions: HashMap<DocumentId, String>,
}

impl ReorderSession {
    pub fn new(items: Vec<PhotoRecord>) -> Self {
        let original_captions = items
            .iter()
            .map(|photo| (photo.id.clone(), photo.caption.clone()))
            .collect();
        Self {
            items,
            original_captions,
        }
    }

    pub fn items(&self) -> &[PhotoRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Moves one photo; see [`ordering::move_item`].
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        ordering::move_item(&mut self.items, from, to)
    }

    /// Renames a photo in place without changing its position.
    pub fn edit_caption(
        &mut self,
        id: &DocumentId,
        caption: impl Into<String>,
    ) -> Result<(), SessionError> {
        let photo = self
            .items
            .iter_mut()
            .find(|photo| &photo.id == id)
            .ok_or_else(|| SessionError::UnknownRecord(id.clone()))?;
        photo.caption = caption.into();
        Ok(())
    }

    /// Drops a photo from the copy, e.g. after it was deleted remotely.
    pub fn remove(&mut self, id: &DocumentId) -> Option<PhotoRecord> {
        let index = self.items.iter().position(|photo| &photo.id == id)?;
        Some(self.items.remove(index))
    }

    /// Builds the batch that pins every photo to its current index.
    ///
    /// Captions are only written for photos renamed during the session.
    pub fn to_batch(&self, collection: &CollectionPath) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for (index, photo) in self.items.iter().enumerate() {
            let mut fields = Fields::new();
            fields.insert(ORDER_FIELD.into(), Value::from(index as i64));
            if self.original_captions.get(&photo.id) != Some(&photo.caption) {
                fields.insert(CAPTION_FIELD.into(), Value::from(photo.caption.clone()));
            }
            batch.update(collection.doc(photo.id.clone()), fields);
        }
        batch
    }

    fn into_committed(self) -> Vec<PhotoRecord> {
        self.items
            .into_iter()
            .enumerate()
            .map(|(index, mut photo)| {
                photo.order = Position::Ordered(index as i64);
                photo
            })
            .collect()
    }
}

/// Whether the live feed or a reorder session currently drives the gallery.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SyncMode {
    /// Every snapshot replaces the visible gallery.
    #[default]
    Live,
    /// Snapshots are held back until the session is committed or cancelled.
    Editing(ReorderSession),
}

/// The gallery as the client shows it, kept in sync with the store.
///
/// In [`SyncMode::Live`] each snapshot of the photo collection wholly replaces
/// the visible sequence. Opening a reorder session switches to
/// [`SyncMode::Editing`]: snapshots keep arriving but only the latest one is
/// kept aside, and it is shown as soon as the session is cancelled. A
/// successful commit shows the committed order right away.
pub struct OrderedCollectionSync<S> {
    store: S,
    path: CollectionPath,
    visible: Vec<PhotoRecord>,
    mode: SyncMode,
    held: Option<Vec<PhotoRecord>>,
    feed: Option<CollectionFeed>,
    on_change: Option<OnChange>,
}

impl<S: AtomicDocumentStore> OrderedCollectionSync<S> {
    pub fn new(store: S, path: CollectionPath) -> Self {
        Self {
            store,
            path,
            visible: Vec::new(),
            mode: SyncMode::Live,
            held: None,
            feed: None,
            on_change: None,
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Photos in display order.
    pub fn visible(&self) -> &[PhotoRecord] {
        &self.visible
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, SyncMode::Editing(_))
    }

    pub fn is_subscribed(&self) -> bool {
        self.feed.is_some()
    }

    pub fn session(&self) -> Option<&ReorderSession> {
        match &self.mode {
            SyncMode::Editing(session) => Some(session),
            SyncMode::Live => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut ReorderSession> {
        match &mut self.mode {
            SyncMode::Editing(session) => Some(session),
            SyncMode::Live => None,
        }
    }

    /// Opens the live feed of the collection and applies its current state.
    ///
    /// `on_change` runs with the new visible sequence every time it changes.
    pub fn subscribe(
        &mut self,
        on_change: impl FnMut(&[PhotoRecord]) + 'static,
    ) -> Result<(), SyncError<S::StoreError>> {
        let feed = self
            .store
            .subscribe_collection(&self.path)
            .map_err(SyncError::Remote)?;
        self.feed = Some(feed);
        self.on_change = Some(Box::new(on_change));
        self.pump();
        Ok(())
    }

    /// Applies every snapshot that has already arrived, in receipt order.
    ///
    /// Returns the number of snapshots consumed.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(feed) = self.feed.as_mut() {
            match feed.next().now_or_never() {
                Some(Some(snapshot)) => {
                    self.apply_snapshot(snapshot);
                    applied += 1;
                }
                Some(None) => {
                    warn!(path = %self.path, "photo feed closed by the store");
                    self.feed = None;
                }
                None => break,
            }
        }
        applied
    }

    /// Waits for the next snapshot and applies it.
    ///
    /// Returns `false` if there is no open feed.
    pub async fn next_snapshot(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        match feed.next().await {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => {
                self.feed = None;
                false
            }
        }
    }

    /// Replaces the visible gallery with `snapshot`, or holds it back while editing.
    pub fn apply_snapshot(&mut self, snapshot: CollectionSnapshot) {
        let mut records: Vec<PhotoRecord> = snapshot
            .documents
            .iter()
            .map(PhotoRecord::from_stored)
            .collect();
        ordering::sort(&mut records);

        match self.mode {
            SyncMode::Live => {
                debug!(photos = records.len(), "applying photo snapshot");
                self.visible = records;
                self.notify();
            }
            SyncMode::Editing(_) => {
                debug!(photos = records.len(), "holding photo snapshot during reorder");
                self.held = Some(records);
            }
        }
    }

    /// Opens a reorder session over a copy of the visible gallery.
    pub fn begin_reorder(&mut self) -> Result<&mut ReorderSession, SyncError<S::StoreError>> {
        if self.is_editing() {
            return Err(SyncError::AlreadyEditing);
        }
        info!(photos = self.visible.len(), "reorder session opened");
        self.mode = SyncMode::Editing(ReorderSession::new(self.visible.clone()));
        self.session_mut().ok_or(SyncError::NotEditing)
    }

    /// Moves a photo inside the open session.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), SyncError<S::StoreError>> {
        let session = self.session_mut().ok_or(SyncError::NotEditing)?;
        Ok(session.move_item(from, to)?)
    }

    /// Renames a photo inside the open session.
    pub fn edit_caption(
        &mut self,
        id: &DocumentId,
        caption: impl Into<String>,
    ) -> Result<(), SyncError<S::StoreError>> {
        let session = self.session_mut().ok_or(SyncError::NotEditing)?;
        Ok(session.edit_caption(id, caption)?)
    }

    /// Persists the session order, and any renamed captions, as one atomic batch.
    ///
    /// On success the session closes and the committed order becomes visible.
    /// On failure nothing is written and the session stays open for a retry.
    pub async fn commit_reorder(&mut self) -> Result<(), SyncError<S::StoreError>> {
        let SyncMode::Editing(session) = &self.mode else {
            return Err(SyncError::NotEditing);
        };
        let batch = session.to_batch(&self.path);
        let operations = batch.len();

        if !batch.is_empty()
            && let Err(e) = self.store.commit_batch(batch).await
        {
            warn!(error = %e, "failed to save photo order");
            return Err(SyncError::Remote(e));
        }

        if let SyncMode::Editing(session) = mem::take(&mut self.mode) {
            self.visible = session.into_committed();
        }
        // Whatever was held back predates the commit; the store sends a fresh snapshot.
        self.held = None;
        info!(operations, "reorder committed");
        self.notify();
        Ok(())
    }

    /// Discards the session. Always succeeds and never touches the store.
    ///
    /// Returns `false` if no session was open.
    pub fn cancel_reorder(&mut self) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.mode = SyncMode::Live;
        info!("reorder session cancelled");
        if let Some(held) = self.held.take() {
            self.visible = held;
            self.notify();
        }
        true
    }

    /// Uploads a new photo. It carries no order and shows among the unordered ones.
    pub async fn create_record(
        &self,
        photo: NewPhoto,
    ) -> Result<DocumentId, SyncError<S::StoreError>> {
        self.store
            .create_document(&self.path, photo.into_fields())
            .await
            .map_err(SyncError::Remote)
    }

    /// Deletes a photo. Remaining orders are left as they are; gaps are fine.
    pub async fn delete_record(&mut self, id: &DocumentId) -> Result<(), SyncError<S::StoreError>> {
        self.store
            .delete_document(&self.path.doc(id.clone()))
            .await
            .map_err(SyncError::Remote)?;

        if let Some(session) = self.session_mut() {
            session.remove(id);
        }
        let before = self.visible.len();
        self.visible.retain(|photo| &photo.id != id);
        if self.visible.len() != before {
            self.notify();
        }
        Ok(())
    }

    /// Renames a photo directly in the store, outside any session.
    ///
    /// Returns `false` without writing if the confirmed caption already matches.
    pub async fn update_caption(
        &mut self,
        id: &DocumentId,
        caption: &str,
    ) -> Result<bool, SyncError<S::StoreError>> {
        if self
            .visible
            .iter()
            .any(|photo| &photo.id == id && photo.caption == caption)
        {
            return Ok(false);
        }

        let mut fields = Fields::new();
        fields.insert(CAPTION_FIELD.into(), Value::from(caption));
        self.store
            .update_fields(&self.path.doc(id.clone()), fields)
            .await
            .map_err(SyncError::Remote)?;

        if let Some(photo) = self.visible.iter_mut().find(|photo| &photo.id == id) {
            photo.caption = caption.to_string();
            self.notify();
        }
        Ok(true)
    }

    fn notify(&mut self) {
        if let Some(on_change) = &mut self.on_change {
            on_change(&self.visible);
        }
    }
}
