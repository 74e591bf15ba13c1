//! Album art fetching for the player panel
//!
//! Art is read from `file://` URIs or downloaded over HTTP(S), decoded and
//! scaled on the tokio runtime, then handed back to the UI thread where it is
//! installed only if the widget still wants it.

use crate::executor::LocalExecutor;
use crate::widget::WidgetState;
use image::imageops::FilterType;
use lockplayer_core::MAX_ART_SIZE;
use reqwest::Url;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ArtError {
    #[error("unsupported art URI scheme {scheme:?} in {uri}")]
    UnsupportedScheme { scheme: String, uri: String },
    #[error("invalid art URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("art task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Decoded RGBA8 image, rows tightly packed
#[derive(Clone, PartialEq, Eq)]
pub struct Artwork {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for Artwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artwork")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Where a piece of album art lives
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtSource {
    File(PathBuf),
    Remote(Url),
}

impl ArtSource {
    /// Parse an `mpris:artUrl` value. Empty input is `Ok(None)`.
    pub fn parse(uri: &str) -> Result<Option<Self>, ArtError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Ok(None);
        }

        let url = Url::parse(uri).map_err(|e| ArtError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(|path| Some(ArtSource::File(path)))
                .map_err(|_| ArtError::InvalidUri {
                    uri: uri.to_string(),
                    reason: "not a local path".to_string(),
                }),
            "http" | "https" => Ok(Some(ArtSource::Remote(url))),
            scheme => Err(ArtError::UnsupportedScheme {
                scheme: scheme.to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}

impl fmt::Display for ArtSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtSource::File(path) => write!(f, "{}", path.display()),
            ArtSource::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Starts art loads and routes their results back to widgets
pub struct ArtFetcher {
    client: reqwest::Client,
    runtime: Handle,
    executor: Rc<dyn LocalExecutor>,
    size: u32,
}

impl ArtFetcher {
    /// `size` is capped at [`MAX_ART_SIZE`]
    pub fn new(
        size: u32,
        runtime: Handle,
        executor: Rc<dyn LocalExecutor>,
    ) -> Result<Self, ArtError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lockplayer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            runtime,
            executor,
            size: size.min(MAX_ART_SIZE),
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Load `uri` and install it into `target` under `generation`.
    ///
    /// Returns whether a load was started. Empty URIs are ignored silently,
    /// unusable ones with a warning. No retries, no cancellation: a result
    /// that arrives after the widget was destroyed or asked for newer art is
    /// dropped on the floor.
    pub fn request(&self, uri: &str, target: Weak<RefCell<WidgetState>>, generation: u64) -> bool {
        let source = match ArtSource::parse(uri) {
            Ok(Some(source)) => source,
            Ok(None) => return false,
            Err(e) => {
                warn!("Not loading album art: {}", e);
                return false;
            }
        };

        debug!("Loading album art from {}", source);
        let job = self
            .runtime
            .spawn(load_artwork(self.client.clone(), source, self.size));

        self.executor.spawn(Box::pin(async move {
            match job.await {
                Ok(Ok(art)) => install(&target, generation, art),
                Ok(Err(e)) => warn!("Failed to load album art: {}", e),
                Err(e) => warn!("Album art task failed: {}", e),
            }
        }));

        true
    }
}

fn install(target: &Weak<RefCell<WidgetState>>, generation: u64, art: Artwork) {
    let Some(state) = target.upgrade() else {
        debug!("Dropping album art, panel is gone");
        return;
    };
    let state = state.borrow();
    if !state.install_art(generation, &art) {
        debug!("Dropping stale album art for {:?}", state.window());
    }
}

/// Fetch and decode art, scaled so its larger side is `size` pixels
pub async fn load_artwork(
    client: reqwest::Client,
    source: ArtSource,
    size: u32,
) -> Result<Artwork, ArtError> {
    let bytes = match &source {
        ArtSource::File(path) => tokio::fs::read(path).await.map_err(|e| ArtError::Io {
            path: path.clone(),
            source: e,
        })?,
        ArtSource::Remote(url) => client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec(),
    };

    let art = tokio::task::spawn_blocking(move || decode_artwork(&bytes, size)).await??;
    Ok(art)
}

/// Decode image bytes and scale them to fit a `size` x `size` box
pub fn decode_artwork(bytes: &[u8], size: u32) -> Result<Artwork, ArtError> {
    let image = image::load_from_memory(bytes)?;
    let rgba = image.resize(size, size, FilterType::Triangle).to_rgba8();

    Ok(Artwork {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
    })
}
