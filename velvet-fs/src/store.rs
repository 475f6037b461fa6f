use std::{
    collections::BTreeMap,
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, error, warn};
use velvet::{
    AtomicDocumentStore, Authenticator, BatchOp, CREATED_AT_FIELD, CollectionFeed,
    CollectionPath, DocumentFeed, DocumentId, DocumentPath, DocumentStore, Feed, Fields,
    ServerClock, StoredDocument, UserId, WriteBatch,
};

use crate::error::FileStoreError;

/// The file extension used for all document files.
const FILE_EXTENSION: &str = ".json";

/// Percent-encodes a path segment so it is a single, safe file name.
///
/// Alphanumeric ASCII, hyphens and underscores are kept as they are. Every
/// other character is written as its UTF-8 bytes, two hex digits per byte.
fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => {
                encoded.push(char::from(byte));
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Reverses [`encode_segment`]. Returns `None` if the name is malformed.
fn decode_segment(encoded: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(encoded.len());
    let mut rest = encoded.bytes();

    while let Some(byte) = rest.next() {
        if byte == b'%' {
            let high = char::from(rest.next()?).to_digit(16)?;
            let low = char::from(rest.next()?).to_digit(16)?;
            bytes.push(u8::try_from(high * 16 + low).ok()?);
        } else {
            bytes.push(byte);
        }
    }
    String::from_utf8(bytes).ok()
}

/// A failure injected into the write phase of a commit.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
enum Fault {
    /// Fails right after the nth staged document is written.
    FailAfterWrite(usize),
    /// Overwrites the nth staged document with an empty object after writing it.
    CorruptWrite(usize),
}

struct Inner {
    data_dir: PathBuf,
    feed: Feed,
    clock: ServerClock,
    #[cfg(test)]
    fault: Option<Fault>,
}

impl Inner {
    fn collection_dir(&self, path: &CollectionPath) -> PathBuf {
        path.segments()
            .fold(self.data_dir.clone(), |dir, segment| {
                dir.join(encode_segment(segment))
            })
    }

    fn document_file(&self, path: &DocumentPath) -> PathBuf {
        self.collection_dir(&path.collection).join(format!(
            "{}{FILE_EXTENSION}",
            encode_segment(path.id.as_str())
        ))
    }

    fn read_raw(&self, path: &DocumentPath) -> Result<Option<String>, FileStoreError> {
        match fs::read_to_string(self.document_file(path)) {
            Ok(data) => Ok(Some(data)),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self, path: &DocumentPath) -> Result<Option<Fields>, FileStoreError> {
        self.read_raw(path)?
            .map(|data| serde_json::from_str(&data).map_err(FileStoreError::from))
            .transpose()
    }

    fn documents(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>, FileStoreError> {
        let entries = match fs::read_dir(self.collection_dir(path)) {
            Ok(entries) => entries,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            if let Some(filename) = entry.file_name().to_str()
                && let Some(encoded) = filename.strip_suffix(FILE_EXTENSION)
                && let Some(id) = decode_segment(encoded)
            {
                ids.push(DocumentId::new(id));
            }
        }
        ids.sort();

        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            let doc_path = path.doc(id.clone());
            match self.read(&doc_path) {
                Ok(Some(fields)) => documents.push(StoredDocument { id, fields }),
                Ok(None) => {}
                // Kept with no fields so the record decodes with defaults
                Err(FileStoreError::Serialization(e)) => {
                    warn!(path = %doc_path, error = %e, "document file is not a JSON object");
                    documents.push(StoredDocument {
                        id,
                        fields: Fields::new(),
                    });
                }
                Err(e) => warn!(path = %doc_path, error = %e, "skipping unreadable document"),
            }
        }
        Ok(documents)
    }

    fn publish(&mut self, path: &CollectionPath) {
        match self.documents(path) {
            Ok(documents) => self.feed.publish(path, &documents),
            Err(e) => warn!(%path, error = %e, "failed to list collection for subscribers"),
        }
    }

    /// Resolves every operation to the final content of its document, `None` meaning deleted.
    fn stage(
        &mut self,
        batch: WriteBatch,
    ) -> Result<BTreeMap<DocumentPath, Option<Fields>>, FileStoreError> {
        let created_at = self.clock.now_millis();
        let mut staged: BTreeMap<DocumentPath, Option<Fields>> = BTreeMap::new();

        for op in batch {
            let path = op.path().clone();
            let current = match staged.get(&path) {
                Some(content) => content.clone(),
                None => self.read(&path)?,
            };
            let next = match op {
                BatchOp::Create { mut fields, .. } => {
                    if current.is_some() {
                        return Err(FileStoreError::AlreadyExists(path));
                    }
                    fields.insert(CREATED_AT_FIELD.into(), created_at.into());
                    Some(fields)
                }
                BatchOp::Update { fields, .. } => {
                    let mut merged =
                        current.ok_or_else(|| FileStoreError::NotFound(path.clone()))?;
                    merged.extend(fields);
                    Some(merged)
                }
                BatchOp::Delete { .. } => None,
            };
            staged.insert(path, next);
        }
        Ok(staged)
    }

    fn write(&self, path: &DocumentPath, content: Option<&Fields>) -> Result<(), FileStoreError> {
        let file = self.document_file(path);
        match content {
            Some(fields) => {
                if let Some(dir) = file.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(file, serde_json::to_string_pretty(fields)?)?;
            }
            None => match fs::remove_file(file) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    fn restore(
        &self,
        path: &DocumentPath,
        original: Option<&String>,
    ) -> Result<(), FileStoreError> {
        let file = self.document_file(path);
        match original {
            Some(data) => fs::write(file, data)?,
            None => match fs::remove_file(file) {
                Ok(()) => {}
                Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    /// Writes every staged document, then reads them back.
    ///
    /// Stops at the first failure; the caller restores the backups.
    #[cfg_attr(not(test), allow(unused_variables))]
    fn write_and_verify(
        &self,
        staged: &BTreeMap<DocumentPath, Option<Fields>>,
    ) -> Result<(), FileStoreError> {
        for (index, (path, content)) in staged.iter().enumerate() {
            self.write(path, content.as_ref())?;
            #[cfg(test)]
            self.inject_fault(index, path)?;
        }
        for (path, content) in staged {
            if &self.read(path)? != content {
                return Err(FileStoreError::Verification(path.clone()));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn inject_fault(&self, index: usize, path: &DocumentPath) -> Result<(), FileStoreError> {
        match self.fault {
            Some(Fault::FailAfterWrite(n)) if n == index => {
                Err(io::Error::other("injected write failure").into())
            }
            Some(Fault::CorruptWrite(n)) if n == index => {
                fs::write(self.document_file(path), "{}")?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), FileStoreError> {
        let touched = batch.touched_collections();
        let staged = self.stage(batch)?;

        let mut backups = BTreeMap::new();
        for path in staged.keys() {
            backups.insert(path.clone(), self.read_raw(path)?);
        }

        if let Err(e) = self.write_and_verify(&staged) {
            warn!(error = %e, documents = backups.len(), "batch failed, restoring backups");
            for (path, original) in &backups {
                if let Err(restore_error) = self.restore(path, original.as_ref()) {
                    error!(%path, error = %restore_error, "failed to restore document");
                }
            }
            return Err(e);
        }

        for path in &touched {
            self.publish(path);
        }
        debug!(documents = staged.len(), collections = touched.len(), "committed batch");
        Ok(())
    }
}

/// A file-based document store.
///
/// Clones share one lock and one set of subscribers, so writes made through
/// any clone reach every subscriber of this process. Changes made to the
/// files by other processes are only picked up on the next write or
/// subscription.
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").finish_non_exhaustive()
    }
}

impl FileStore {
    /// Creates a new `FileStore` rooted at the specified directory.
    ///
    /// The directory will be created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                data_dir,
                feed: Feed::new(),
                clock: ServerClock::new(),
                #[cfg(test)]
                fault: None,
            })),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, FileStoreError> {
        self.inner.lock().map_err(|_| FileStoreError::Poisoned)
    }

    /// File holding the document at `path`.
    pub fn document_file(&self, path: &DocumentPath) -> Result<PathBuf, FileStoreError> {
        Ok(self.lock()?.document_file(path))
    }

    pub fn get(&self, path: &DocumentPath) -> Result<Option<Fields>, FileStoreError> {
        self.lock()?.read(path)
    }

    /// Reads every document of a collection, in id order.
    pub fn list(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>, FileStoreError> {
        self.lock()?.documents(path)
    }

    fn write_one(&self, op: BatchOp) -> Result<(), FileStoreError> {
        let mut batch = WriteBatch::new();
        batch.push(op);
        self.lock()?.commit(batch)
    }
}

impl DocumentStore for FileStore {
    type StoreError = FileStoreError;

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> Result<CollectionFeed, Self::StoreError> {
        let mut inner = self.lock()?;
        let current = inner.documents(path)?;
        Ok(inner.feed.watch_collection(path.clone(), current))
    }

    fn subscribe_document(&self, path: &DocumentPath) -> Result<DocumentFeed, Self::StoreError> {
        let mut inner = self.lock()?;
        let current = inner.read(path)?;
        Ok(inner.feed.watch_document(path.clone(), current))
    }

    async fn create_document(
        &self,
        path: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, Self::StoreError> {
        let id = DocumentId::generate();
        self.write_one(BatchOp::Create {
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
        self.write_one(BatchOp::Update {
            path: path.clone(),
            fields,
        })
    }

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), Self::StoreError> {
        self.write_one(BatchOp::Delete { path: path.clone() })
    }

    async fn upsert_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
    ) -> Result<(), Self::StoreError> {
        let mut inner = self.lock()?;
        inner.write(path, Some(&fields))?;
        inner.publish(&path.collection);
        Ok(())
    }
}

impl AtomicDocumentStore for FileStore {
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), Self::StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.lock()?.commit(batch)
    }
}

impl Authenticator for FileStore {
    type AuthError = FileStoreError;

    async fn sign_in_with_token(&self, token: &str) -> Result<UserId, Self::AuthError> {
        if token.trim().is_empty() {
            return Err(FileStoreError::InvalidToken);
        }
        Ok(UserId::new(format!("user-{}", DocumentId::generate())))
    }

    async fn sign_in_anonymously(&self) -> Result<UserId, Self::AuthError> {
        Ok(UserId::new(format!("anon-{}", DocumentId::generate())))
    }
}
