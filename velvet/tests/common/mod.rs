#![allow(dead_code)]

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use serde_json::Value;
use velvet::{
    AtomicDocumentStore, Authenticator, CollectionFeed, CollectionPath, DocumentFeed, DocumentId,
    DocumentPath, DocumentStore, Fields, MemoryStore, MemoryStoreError, UserId, WriteBatch,
};

#[derive(Debug)]
pub enum FlakyError {
    Simulated,
    Memory(MemoryStoreError),
}

impl Display for FlakyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => write!(f, "FlakyError: simulated failure"),
            Self::Memory(e) => write!(f, "FlakyError: {e}"),
        }
    }
}

impl std::error::Error for FlakyError {}

#[derive(Debug, Default)]
struct Flaky {
    fail_next: bool,
    fail_token: bool,
    fail_anonymous: bool,
    writes: usize,
}

/// A [`MemoryStore`] that can be told to reject the next write or any sign-in.
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    memory: MemoryStore,
    state: Arc<Mutex<Flaky>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn set_fail_next(&self, fail: bool) {
        self.state.lock().unwrap().fail_next = fail;
    }

    pub fn set_fail_sign_in(&self, token: bool, anonymous: bool) {
        let mut state = self.state.lock().unwrap();
        state.fail_token = token;
        state.fail_anonymous = anonymous;
    }

    /// Writes that reached the store, batches counting once.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    fn begin_write(&self) -> Result<(), FlakyError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next {
            state.fail_next = false;
            return Err(FlakyError::Simulated);
        }
        state.writes += 1;
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    type StoreError = FlakyError;

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<CollectionFeed, Self::StoreError> {
        self.memory
            .subscribe_collection(path)
            .map_err(FlakyError::Memory)
    }

    fn subscribe_document(&self, path: &DocumentPath) -> Result<DocumentFeed, Self::StoreError> {
        self.memory
            .subscribe_document(path)
            .map_err(FlakyError::Memory)
    }

    async fn create_document(
        &self,
        path: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, Self::StoreError> {
        self.begin_write()?;
        self.memory
            .create_document(path, fields)
            .await
            .map_err(FlakyError::Memory)
    }

    async fn update_fields(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> Result<(), Self::StoreError> {
        self.begin_write()?;
        self.memory
            .update_fields(path, fields)
            .await
            .map_err(FlakyError::Memory)
    }

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), Self::StoreError> {
        self.begin_write()?;
        self.memory
            .delete_document(path)
            .await
            .map_err(FlakyError::Memory)
    }

    async fn upsert_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> Result<(), Self::StoreError> {
        self.begin_write()?;
        self.memory
            .upsert_document(path, fields)
            .await
            .map_err(FlakyError::Memory)
    }
}

impl AtomicDocumentStore for FlakyStore {
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), Self::StoreError> {
        self.begin_write()?;
        self.memory
            .commit_batch(batch)
            .await
            .map_err(FlakyError::Memory)
    }
}

impl Authenticator for FlakyStore {
    type AuthError = FlakyError;

    async fn sign_in_with_token(&self, token: &str) -> Result<UserId, Self::AuthError> {
        if self.state.lock().unwrap().fail_token {
            return Err(FlakyError::Simulated);
        }
        Ok(UserId::new(format!("token-{token}")))
    }

    async fn sign_in_anonymously(&self) -> Result<UserId, Self::AuthError> {
        if self.state.lock().unwrap().fail_anonymous {
            return Err(FlakyError::Simulated);
        }
        Ok(UserId::new("anonymous"))
    }
}

pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

/// Photo fields as an uploader would write them, with an optional order.
pub fn photo_fields(caption: &str, order: Option<i64>) -> Fields {
    let mut fields = fields(serde_json::json!({
        "url": format!("https://example.com/{caption}.jpg"),
        "caption": caption,
    }));
    if let Some(order) = order {
        fields.insert("order".into(), order.into());
    }
    fields
}
