//! # Velvet
//!
//! State management for a live, collaboratively edited birthday card: a photo
//! gallery with manual ordering, a guestbook and a hero section, all mirrored
//! from a document store that pushes full snapshots on every change.
//!
//! ## Features
//!
//! - Generic document store contract with an atomic batch primitive
//! - Deterministic photo ordering mixing explicit positions with timestamps
//! - Reorder sessions that are isolated from the live feed until committed
//! - In-memory store backend (feature `memory-store`)

extern crate self as velvet;

mod batch;
mod card;
mod config;
mod errors;
mod feed;
mod guestbook;
mod hero;
#[cfg(feature = "memory-store")]
mod memory;
mod notice;
pub mod ordering;
mod records;
mod session;
mod sync;
mod traits;

pub use batch::{BatchOp, WriteBatch};
pub use card::Card;
pub use config::{CardConfig, ConfigError};
pub use errors::{SessionError, SyncError};
pub use feed::{
    CollectionFeed, CollectionSnapshot, DocumentFeed, DocumentSnapshot, Feed, ServerClock,
    StoredDocument,
};
pub use guestbook::Guestbook;
pub use hero::{HeroConfig, HeroSync, MusicSource};
#[cfg(feature = "memory-store")]
pub use memory::{MemoryStore, MemoryStoreError};
pub use notice::{Notice, NoticeLevel, Notices};
pub use ordering::Position;
pub use records::{MessageRecord, NewPhoto, PhotoRecord, DEFAULT_CAPTION, DEFAULT_SENDER};
pub use session::Session;
pub use sync::{OrderedCollectionSync, ReorderSession, SyncMode};
pub use traits::*;
pub use velvet_derive::Document;
