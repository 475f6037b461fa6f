use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{
    CREATED_AT_FIELD, Document, DocumentId, Fields, StoredDocument, UserId, ordering::Position,
};

/// Caption shown for photos that have none.
pub const DEFAULT_CAPTION: &str = "Untold Story";
/// Signature used for guestbook messages posted without a name.
pub const DEFAULT_SENDER: &str = "Friend";

pub(crate) const URL_FIELD: &str = "url";
pub(crate) const CAPTION_FIELD: &str = "caption";
pub(crate) const DATE_FIELD: &str = "date";
pub(crate) const ORDER_FIELD: &str = "order";
pub(crate) const USER_FIELD: &str = "userId";
pub(crate) const TEXT_FIELD: &str = "text";
pub(crate) const SENDER_FIELD: &str = "sender";

/// Reads a field, treating absent, null and mistyped values alike.
pub(crate) fn field<T: DeserializeOwned>(fields: &Fields, key: &str) -> Option<T> {
    fields
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn timestamp(fields: &Fields, key: &str) -> Option<DateTime<Utc>> {
    field::<i64>(fields, key).and_then(DateTime::from_timestamp_millis)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// A photo of the gallery as seen by the client.
#[derive(Debug, Clone, Default, PartialEq, Document)]
#[collection("photos")]
pub struct PhotoRecord {
    pub id: DocumentId,
    /// Inline data URL or remote URL of the image.
    pub url: String,
    pub caption: String,
    /// When the uploader says the photo was taken, set once at upload.
    pub captured_at: Option<DateTime<Utc>>,
    /// Server write timestamp; missing until the store has stamped the upload.
    pub created_at: Option<DateTime<Utc>>,
    pub order: Position,
    pub user_id: Option<UserId>,
}

impl PhotoRecord {
    /// Decodes a stored photo, filling in defaults for anything missing or mistyped.
    pub fn from_stored(doc: &StoredDocument) -> Self {
        let fields = &doc.fields;
        let url = field::<String>(fields, URL_FIELD).unwrap_or_else(|| {
            warn!(id = %doc.id, "photo has no usable url");
            String::new()
        });
        let order = match fields.get(ORDER_FIELD) {
            None | Some(serde_json::Value::Null) => Position::Unordered,
            Some(_) => match field::<i64>(fields, ORDER_FIELD) {
                Some(order) => Position::Ordered(order),
                None => {
                    warn!(id = %doc.id, "ignoring non-integer photo order");
                    Position::Unordered
                }
            },
        };

        Self {
            id: doc.id.clone(),
            url,
            caption: field(fields, CAPTION_FIELD).unwrap_or_default(),
            captured_at: field::<String>(fields, DATE_FIELD)
                .and_then(|date| DateTime::parse_from_rfc3339(&date).ok())
                .map(|date| date.with_timezone(&Utc)),
            created_at: timestamp(fields, CREATED_AT_FIELD),
            order,
            user_id: field(fields, USER_FIELD),
        }
    }

    /// Caption to render, with the placeholder for blank captions.
    pub fn display_caption(&self) -> &str {
        non_blank(Some(&self.caption)).unwrap_or(DEFAULT_CAPTION)
    }

    /// Server timestamp in epoch milliseconds, zero while unstamped.
    pub fn created_millis(&self) -> i64 {
        self.created_at.map_or(0, |at| at.timestamp_millis())
    }
}

/// Fields of a photo about to be uploaded.
///
/// New photos never carry an order: they join the unordered, newest-first
/// group below anything placed by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub url: String,
    pub caption: String,
    pub captured_at: DateTime<Utc>,
    pub user_id: Option<UserId>,
}

impl NewPhoto {
    pub fn new(url: impl Into<String>, caption: Option<&str>) -> Self {
        Self {
            url: url.into(),
            caption: non_blank(caption).unwrap_or(DEFAULT_CAPTION).to_string(),
            captured_at: Utc::now(),
            user_id: None,
        }
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = at;
        self
    }

    pub fn uploaded_by(mut self, user: UserId) -> Self {
        self.user_id = Some(user);
        self
    }

    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(URL_FIELD.into(), self.url.into());
        fields.insert(CAPTION_FIELD.into(), self.caption.into());
        fields.insert(
            DATE_FIELD.into(),
            self.captured_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );
        if let Some(user) = self.user_id {
            fields.insert(USER_FIELD.into(), user.as_str().into());
        }
        fields
    }
}

/// A guestbook entry.
#[derive(Debug, Clone, Default, PartialEq, Document)]
#[collection("messages")]
pub struct MessageRecord {
    pub id: DocumentId,
    pub text: String,
    pub sender: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn from_stored(doc: &StoredDocument) -> Self {
        let fields = &doc.fields;
        let sender = field::<String>(fields, SENDER_FIELD);
        Self {
            id: doc.id.clone(),
            text: field(fields, TEXT_FIELD).unwrap_or_default(),
            sender: non_blank(sender.as_deref())
                .unwrap_or(DEFAULT_SENDER)
                .to_string(),
            created_at: timestamp(fields, CREATED_AT_FIELD),
        }
    }

    /// Fields of a new message; a blank sender signs as [`DEFAULT_SENDER`].
    pub fn new_fields(text: &str, sender: Option<&str>) -> Fields {
        let mut fields = Fields::new();
        fields.insert(TEXT_FIELD.into(), text.into());
        fields.insert(
            SENDER_FIELD.into(),
            non_blank(sender).unwrap_or(DEFAULT_SENDER).into(),
        );
        fields
    }
}
