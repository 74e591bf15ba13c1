use crate::models::Position;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config group read by the module when the host does not name one
pub const DEFAULT_GROUP: &str = "player";

/// Default album art size in pixels
pub const DEFAULT_ART_SIZE: u32 = 64;

/// Largest album art size accepted, in pixels
pub const MAX_ART_SIZE: u32 = 512;

/// Cap `size` at [`MAX_ART_SIZE`], warning when it was larger
pub fn clamp_art_size(size: u32) -> u32 {
    if size > MAX_ART_SIZE {
        tracing::warn!("Album art size {} too large, using {}", size, MAX_ART_SIZE);
        return MAX_ART_SIZE;
    }
    size
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid [{group}] section: {source}")]
    Section {
        group: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Module configuration, read once at activation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Album art size in pixels, 0 disables art
    pub art_size: u32,
    pub position: Position,
    /// Keep the panel revealed while the lock screen is idle-hidden
    pub show_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            art_size: DEFAULT_ART_SIZE,
            position: Position::TopCenter,
            show_hidden: false,
        }
    }
}

impl Config {
    /// Load the `group` table of a TOML config file.
    ///
    /// A missing group yields the defaults; a missing file is an error so that
    /// callers can decide whether that matters.
    pub fn load(path: &Path, group: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: toml::Table = toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_table(&doc, group)
    }

    /// Like [`Config::load`], but a file that does not exist yields the defaults
    pub fn load_or_default(path: &Path, group: &str) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path, group)
    }

    pub fn from_table(doc: &toml::Table, group: &str) -> Result<Self, ConfigError> {
        let section = match doc.get(group) {
            Some(value) => value
                .clone()
                .try_into::<ModuleSection>()
                .map_err(|source| ConfigError::Section {
                    group: group.to_string(),
                    source,
                })?,
            None => ModuleSection::default(),
        };
        Ok(section.into())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ModuleSection {
    art_size: Option<u32>,
    position: Option<String>,
    show_hidden: Option<bool>,
}

impl From<ModuleSection> for Config {
    fn from(value: ModuleSection) -> Self {
        Config {
            art_size: value.art_size.map_or(DEFAULT_ART_SIZE, clamp_art_size),
            position: value
                .position
                .as_deref()
                .map(Position::from_config)
                .unwrap_or_default(),
            show_hidden: value.show_hidden.unwrap_or(false),
        }
    }
}
