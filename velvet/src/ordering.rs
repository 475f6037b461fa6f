//! Total order of gallery photos.
//!
//! Photos a user has placed by hand carry an explicit [`Position::Ordered`]
//! index and always come first, ascending. Everything else is
//! [`Position::Unordered`] and shows newest upload first. Records that compare
//! equal on both keys (two equal explicit indexes left behind by racing
//! commits, or missing timestamps) fall back to their id, so the order never
//! depends on the order in which the store delivered them.

use std::cmp::Ordering;

use crate::{errors::SessionError, records::PhotoRecord};

/// Explicit position of a photo in the gallery.
///
/// Variant order matters: every `Ordered` position sorts before `Unordered`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    Ordered(i64),
    #[default]
    Unordered,
}

impl Position {
    pub fn from_order(order: Option<i64>) -> Self {
        order.map_or(Self::Unordered, Self::Ordered)
    }

    pub fn order(self) -> Option<i64> {
        match self {
            Self::Ordered(order) => Some(order),
            Self::Unordered => None,
        }
    }
}

/// Compares two photos for display.
///
/// 1. By position, explicit indexes ascending, unordered last.
/// 2. By server write timestamp, newest first; a missing timestamp counts as zero.
/// 3. By id.
pub fn compare(a: &PhotoRecord, b: &PhotoRecord) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| b.created_millis().cmp(&a.created_millis()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts photos into display order.
pub fn sort(records: &mut [PhotoRecord]) {
    records.sort_by(compare);
}

/// Moves the element at `from` to `to`, shifting the ones in between.
///
/// Every other element keeps its relative order.
///
/// # Errors
///
/// Returns [`SessionError::IndexOutOfRange`] if either index is past the end.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), SessionError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}
