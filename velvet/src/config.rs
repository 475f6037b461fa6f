use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{CollectionPath, Document, DocumentPath, HeroConfig, MessageRecord, PhotoRecord};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings of one card deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Namespace of every collection the card reads and writes.
    pub app_id: String,
    /// Token tried before falling back to an anonymous session.
    pub auth_token: Option<String>,
    /// Hero values shown until the stored configuration arrives.
    pub hero: HeroConfig,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            app_id: "velvet-birthday".into(),
            auth_token: None,
            hero: HeroConfig::default(),
        }
    }
}

impl CardConfig {
    /// Loads the config from a JSON file. A missing file gives the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), app_id = %config.app_id, "loaded card config");
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Path of the collection holding documents of type `D`.
    pub fn collection<D: Document>(&self) -> CollectionPath {
        CollectionPath::new(format!(
            "artifacts/{}/public/data/{}",
            self.app_id,
            D::COLLECTION
        ))
    }

    pub fn photos_path(&self) -> CollectionPath {
        self.collection::<PhotoRecord>()
    }

    pub fn messages_path(&self) -> CollectionPath {
        self.collection::<MessageRecord>()
    }

    pub fn hero_path(&self) -> DocumentPath {
        self.collection::<HeroConfig>().doc(HeroConfig::DOCUMENT_ID)
    }
}
