use std::sync::LazyLock;

use futures::{FutureExt, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    Document, DocumentPath, DocumentStore, Fields,
    errors::SyncError,
    feed::{DocumentFeed, DocumentSnapshot},
    records::field,
};

/// Track played when no music URL is configured.
pub const DEFAULT_MUSIC: &str =
    "https://cdn.pixabay.com/download/audio/2022/10/25/audio_5176df912c.mp3";

const APP_NAME_FIELD: &str = "appName";
const TITLE_FIELD: &str = "title";
const SUBTITLE_FIELD: &str = "subtitle";
const DESCRIPTION_FIELD: &str = "description";
const MUSIC_URL_FIELD: &str = "musicUrl";

/// Display strings of the hero section, stored as a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Document)]
#[collection("config")]
#[serde(rename_all = "camelCase", default)]
pub struct HeroConfig {
    pub app_name: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub music_url: String,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            app_name: "VELVET".into(),
            title: "Happy Birthday.".into(),
            subtitle: "The Celebration".into(),
            description: "A collection of moments, memories, and wishes curated just for you."
                .into(),
            music_url: DEFAULT_MUSIC.into(),
        }
    }
}

impl HeroConfig {
    /// Id of the hero document inside its collection.
    pub const DOCUMENT_ID: &'static str = "main";

    /// Overwrites every field present in `fields` with a string value.
    pub fn merge(&mut self, fields: &Fields) {
        let targets = [
            (APP_NAME_FIELD, &mut self.app_name),
            (TITLE_FIELD, &mut self.title),
            (SUBTITLE_FIELD, &mut self.subtitle),
            (DESCRIPTION_FIELD, &mut self.description),
            (MUSIC_URL_FIELD, &mut self.music_url),
        ];
        for (key, target) in targets {
            if let Some(value) = field::<String>(fields, key) {
                *target = value;
            }
        }
    }

    pub fn to_fields(&self) -> Fields {
        [
            (APP_NAME_FIELD, &self.app_name),
            (TITLE_FIELD, &self.title),
            (SUBTITLE_FIELD, &self.subtitle),
            (DESCRIPTION_FIELD, &self.description),
            (MUSIC_URL_FIELD, &self.music_url),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::from(value.as_str())))
        .collect()
    }

    pub fn music(&self) -> MusicSource {
        MusicSource::from_url(&self.music_url)
    }
}

static YOUTUBE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").ok()
});

const YOUTUBE_ID_LEN: usize = 11;

/// Where the background music comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicSource {
    /// A YouTube video played through an embedded player.
    YouTube { video_id: String },
    /// Looks like a YouTube link but carries no usable video id; nothing plays.
    UnresolvedYouTube { url: String },
    /// A direct audio file.
    Audio { url: String },
}

impl MusicSource {
    pub fn from_url(url: &str) -> Self {
        let url = url.trim();
        if let Some(video_id) = youtube_id(url) {
            return Self::YouTube { video_id };
        }
        if is_youtube_url(url) {
            warn!(url, "youtube link without a video id");
            return Self::UnresolvedYouTube { url: url.into() };
        }
        if url.is_empty() {
            return Self::Audio {
                url: DEFAULT_MUSIC.into(),
            };
        }
        Self::Audio { url: url.into() }
    }
}

fn youtube_id(url: &str) -> Option<String> {
    let captures = YOUTUBE_ID.as_ref()?.captures(url)?;
    let id = captures.get(2)?.as_str();
    (id.chars().count() == YOUTUBE_ID_LEN).then(|| id.to_string())
}

fn is_youtube_url(url: &str) -> bool {
    let url = url.to_lowercase();
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// The hero section mirrored from its configuration document.
pub struct HeroSync<S> {
    store: S,
    path: DocumentPath,
    hero: HeroConfig,
    feed: Option<DocumentFeed>,
}

impl<S: DocumentStore> HeroSync<S> {
    /// Starts from `defaults` until the stored document says otherwise.
    pub fn new(store: S, path: DocumentPath, defaults: HeroConfig) -> Self {
        Self {
            store,
            path,
            hero: defaults,
            feed: None,
        }
    }

    pub fn hero(&self) -> &HeroConfig {
        &self.hero
    }

    pub fn subscribe(&mut self) -> Result<(), SyncError<S::StoreError>> {
        let feed = self
            .store
            .subscribe_document(&self.path)
            .map_err(SyncError::Remote)?;
        self.feed = Some(feed);
        self.pump();
        Ok(())
    }

    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(feed) = self.feed.as_mut() {
            match feed.next().now_or_never() {
                Some(Some(snapshot)) => {
                    self.apply_snapshot(snapshot);
                    applied += 1;
                }
                Some(None) => {
                    warn!(path = %self.path, "hero feed closed by the store");
                    self.feed = None;
                }
                None => break,
            }
        }
        applied
    }

    /// Merges a stored document over the current values. A missing document changes nothing.
    pub fn apply_snapshot(&mut self, snapshot: DocumentSnapshot) {
        if let Some(fields) = snapshot.fields {
            debug!(path = %snapshot.path, "applying hero snapshot");
            self.hero.merge(&fields);
        }
    }

    /// Replaces the whole hero document.
    pub async fn save(&mut self, hero: HeroConfig) -> Result<(), SyncError<S::StoreError>> {
        self.store
            .upsert_document(&self.path, hero.to_fields())
            .await
            .map_err(SyncError::Remote)?;
        self.hero = hero;
        Ok(())
    }
}
