//! Media-control bus for the lock-screen player panel
//!
//! This crate provides the player discovery and control surface consumed by
//! the lock-screen module:
//! - [`PlayerManager`] turns a discovered bus name into a tracked [`Player`]
//! - [`BusEvent`]s report players appearing, vanishing and changing state
//! - [`mpris`] implements both over MPRIS on the D-Bus session bus

use lockplayer_core::{PlayerCommand, PlayerSnapshot};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

pub mod mpris;

pub use mpris::MprisManager;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("D-Bus error: {0}")]
    ZBus(#[from] zbus::Error),
    #[error("D-Bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),
    #[error("media bus is not running")]
    Disconnected,
}

/// Well-known bus name of a player, e.g. `org.mpris.MediaPlayer2.spotify`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the MPRIS prefix (`spotify`)
    pub fn short(&self) -> &str {
        self.0.strip_prefix(mpris::MPRIS_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Notifications delivered by the bus to the UI thread
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// Players already present when the bus came up, in bus order
    Enumerated(Vec<PlayerName>),
    NameAppeared(PlayerName),
    /// A managed player left the bus
    PlayerVanished(PlayerName),
    MetadataChanged(PlayerName),
    PlaybackStatusChanged(PlayerName),
}

/// A player being tracked by the module
pub trait Player {
    fn name(&self) -> &PlayerName;

    /// Latest known state; never blocks on the bus
    fn snapshot(&self) -> PlayerSnapshot;

    /// Fire-and-forget command; failures are logged by the implementation
    fn send(&self, command: PlayerCommand);
}

/// Creates tracked players from bus names
pub trait PlayerManager {
    /// Start tracking `name`; state-change events for it begin to flow
    fn manage(&self, name: &PlayerName) -> Result<Rc<dyn Player>, MediaError>;
}

/// A manager together with the event stream it feeds
pub struct MediaBus {
    pub manager: Box<dyn PlayerManager>,
    pub events: UnboundedReceiver<BusEvent>,
}

/// Connect to MPRIS on the session bus, running bus I/O on `runtime`
pub fn create_media_bus(runtime: &tokio::runtime::Handle) -> MediaBus {
    MprisManager::spawn(runtime)
}
