use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Utc};

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Error,
    Warning,
    Success,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Error => write!(f, "error"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Success => write!(f, "success"),
        }
    }
}

/// A dismissable message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }
}

/// Queue of notices waiting to be seen, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    pending: VecDeque<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        self.pending.push_back(notice);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes the notice at `index`, returning it if it existed.
    pub fn dismiss(&mut self, index: usize) -> Option<Notice> {
        self.pending.remove(index)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Notice> + '_ {
        self.pending.drain(..)
    }
}
