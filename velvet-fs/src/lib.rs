//! File-based document store for velvet.
//!
//! Every document is a pretty-printed JSON file at
//! `<root>/<collection path>/<id>.json`, so a card can be inspected and edited
//! by hand. Batches are applied with a stage, backup, write and verify cycle
//! and rolled back from the backups if any step fails.
//!
//! # Example
//!
//! ```no_run
//! use velvet::{Card, CardConfig};
//! use velvet_fs::FileStore;
//!
//! # futures::executor::block_on(async {
//! let store = FileStore::new("./card-data").expect("Failed to create storage");
//! let card = Card::open(store, CardConfig::default()).await.expect("Failed to open card");
//! # });
//! ```

mod error;
mod store;

pub use error::FileStoreError;
pub use store::FileStore;
