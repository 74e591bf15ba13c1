//! MPRIS (Media Player Remote Interfacing Specification) over the D-Bus session bus
//!
//! A single background task owns the bus connection. It enumerates players at
//! startup, follows `NameOwnerChanged` for players coming and going, and runs
//! one watcher per managed player that keeps a shared [`PlayerSnapshot`] up to
//! date from `PropertiesChanged`. The UI thread only reads snapshots and sends
//! commands through a channel, so it never waits on the bus.

use crate::{BusEvent, MediaBus, MediaError, Player, PlayerManager, PlayerName};
use futures_util::StreamExt;
use lockplayer_core::{Capabilities, PlaybackStatus, PlayerCommand, PlayerSnapshot, TrackMeta};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use zbus::fdo::{DBusProxy, PropertiesProxy};
use zbus::zvariant::OwnedValue;
use zbus::{proxy, Connection};

// MPRIS identifiers used to discover and address players on the session bus.
pub(crate) const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";
const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const MPRIS_PLAYER: &str = "org.mpris.MediaPlayer2.Player";

/// Capabilities are re-read on this cadence because many players never
/// announce `CanGoNext` and friends through `PropertiesChanged`.
const CAPABILITY_POLL: Duration = Duration::from_secs(1);

#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
trait MediaPlayer2Player {
    fn play_pause(&self) -> zbus::Result<()>;

    fn next(&self) -> zbus::Result<()>;

    fn previous(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    #[zbus(property)]
    fn can_go_next(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn can_go_previous(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn can_pause(&self) -> zbus::Result<bool>;
}

/// Whether a bus name belongs to an MPRIS player
pub fn is_mpris_name(name: &str) -> bool {
    name.len() > MPRIS_PREFIX.len() && name.starts_with(MPRIS_PREFIX)
}

#[derive(Debug)]
enum ManagerCommand {
    Manage {
        name: PlayerName,
        state: Arc<RwLock<PlayerSnapshot>>,
    },
    Call {
        name: PlayerName,
        command: PlayerCommand,
    },
    Shutdown,
}

/// Handle to the background bus task
pub struct MprisManager {
    commands: UnboundedSender<ManagerCommand>,
}

impl MprisManager {
    /// Spawn the bus task on `runtime` and return the manager with its event stream.
    ///
    /// Connection failures are logged by the task; the event stream then simply
    /// ends and no player is ever reported.
    pub fn spawn(runtime: &tokio::runtime::Handle) -> MediaBus {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        runtime.spawn(async move {
            if let Err(e) = run_bus(event_tx, command_rx).await {
                warn!("MPRIS unavailable, player tracking disabled: {}", e);
            }
        });

        MediaBus {
            manager: Box::new(MprisManager {
                commands: command_tx,
            }),
            events: event_rx,
        }
    }
}

impl PlayerManager for MprisManager {
    fn manage(&self, name: &PlayerName) -> Result<Rc<dyn Player>, MediaError> {
        let state = Arc::new(RwLock::new(PlayerSnapshot::default()));
        self.commands
            .send(ManagerCommand::Manage {
                name: name.clone(),
                state: state.clone(),
            })
            .map_err(|_| MediaError::Disconnected)?;

        Ok(Rc::new(MprisPlayer {
            name: name.clone(),
            state,
            commands: self.commands.clone(),
        }))
    }
}

impl Drop for MprisManager {
    fn drop(&mut self) {
        let _ = self.commands.send(ManagerCommand::Shutdown);
    }
}

/// A managed MPRIS player as seen from the UI thread
pub struct MprisPlayer {
    name: PlayerName,
    state: Arc<RwLock<PlayerSnapshot>>,
    commands: UnboundedSender<ManagerCommand>,
}

impl Player for MprisPlayer {
    fn name(&self) -> &PlayerName {
        &self.name
    }

    fn snapshot(&self) -> PlayerSnapshot {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn send(&self, command: PlayerCommand) {
        let call = ManagerCommand::Call {
            name: self.name.clone(),
            command,
        };
        if self.commands.send(call).is_err() {
            warn!("Cannot send {} to {}: bus task is gone", command.method(), self.name);
        }
    }
}

async fn run_bus(
    events: UnboundedSender<BusEvent>,
    mut commands: UnboundedReceiver<ManagerCommand>,
) -> Result<(), MediaError> {
    let connection = Connection::session().await?;
    let dbus = DBusProxy::new(&connection).await?;
    // Subscribe before listing so a player starting in between is not missed.
    let mut owner_changes = dbus.receive_name_owner_changed().await?;

    let names: Vec<PlayerName> = dbus
        .list_names()
        .await?
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| is_mpris_name(name))
        .map(PlayerName::new)
        .collect();
    debug!("Found {} MPRIS player(s) at startup", names.len());
    if events.send(BusEvent::Enumerated(names)).is_err() {
        return Ok(());
    }

    let mut watchers: HashMap<PlayerName, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    None | Some(ManagerCommand::Shutdown) => break,
                    Some(ManagerCommand::Manage { name, state }) => {
                        debug!("Managing player {}", name);
                        let watcher = tokio::spawn(watch_player(
                            connection.clone(),
                            name.clone(),
                            state,
                            events.clone(),
                        ));
                        if let Some(previous) = watchers.insert(name, watcher) {
                            previous.abort();
                        }
                    }
                    Some(ManagerCommand::Call { name, command }) => {
                        let connection = connection.clone();
                        tokio::spawn(async move {
                            if let Err(e) = call_player(&connection, &name, command).await {
                                warn!("{} on {} failed: {}", command.method(), name, e);
                            }
                        });
                    }
                }
            }
            signal = owner_changes.next() => {
                let Some(signal) = signal else {
                    break;
                };
                let Ok(args) = signal.args() else {
                    continue;
                };
                let name = args.name().to_string();
                if !is_mpris_name(&name) {
                    continue;
                }
                let old_owner = args.old_owner().as_ref().map(|owner| owner.to_string());
                let new_owner = args.new_owner().as_ref().map(|owner| owner.to_string());
                let name = PlayerName::new(name);

                let event = match (old_owner, new_owner) {
                    (None, Some(_)) => Some(BusEvent::NameAppeared(name)),
                    (Some(_), None) => watchers.remove(&name).map(|watcher| {
                        watcher.abort();
                        BusEvent::PlayerVanished(name)
                    }),
                    _ => None,
                };
                if let Some(event) = event {
                    debug!("Bus event: {:?}", event);
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
        }
    }

    for (_, watcher) in watchers {
        watcher.abort();
    }
    debug!("MPRIS bus task stopped");
    Ok(())
}

async fn player_proxy(
    connection: &Connection,
    name: &PlayerName,
) -> zbus::Result<MediaPlayer2PlayerProxy<'static>> {
    MediaPlayer2PlayerProxy::builder(connection)
        .destination(name.as_str().to_owned())?
        .cache_properties(zbus::proxy::CacheProperties::No)
        .build()
        .await
}

async fn call_player(
    connection: &Connection,
    name: &PlayerName,
    command: PlayerCommand,
) -> zbus::Result<()> {
    let player = player_proxy(connection, name).await?;
    match command {
        PlayerCommand::PlayPause => player.play_pause().await,
        PlayerCommand::Next => player.next().await,
        PlayerCommand::Previous => player.previous().await,
    }
}

async fn watch_player(
    connection: Connection,
    name: PlayerName,
    state: Arc<RwLock<PlayerSnapshot>>,
    events: UnboundedSender<BusEvent>,
) {
    if let Err(e) = track_player(&connection, &name, &state, &events).await {
        warn!("Stopped watching {}: {}", name, e);
    }
}

async fn track_player(
    connection: &Connection,
    name: &PlayerName,
    state: &RwLock<PlayerSnapshot>,
    events: &UnboundedSender<BusEvent>,
) -> zbus::Result<()> {
    let player = player_proxy(connection, name).await?;
    let properties = PropertiesProxy::builder(connection)
        .destination(name.as_str().to_owned())?
        .path(MPRIS_PATH)?
        .build()
        .await?;
    let mut changes = properties.receive_properties_changed().await?;

    store(state, read_snapshot(&player).await);
    // The module refreshed with an empty snapshot when it started tracking us.
    if events.send(BusEvent::MetadataChanged(name.clone())).is_err() {
        return Ok(());
    }

    let mut poll = tokio::time::interval(CAPABILITY_POLL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            signal = changes.next() => {
                let Some(signal) = signal else {
                    break;
                };
                let (metadata_changed, status_changed) = {
                    let Ok(args) = signal.args() else {
                        continue;
                    };
                    if args.interface_name().as_str() != MPRIS_PLAYER {
                        continue;
                    }
                    let changed = args.changed_properties();
                    (
                        changed.contains_key("Metadata"),
                        changed.contains_key("PlaybackStatus"),
                    )
                };

                store(state, read_snapshot(&player).await);

                if metadata_changed
                    && events.send(BusEvent::MetadataChanged(name.clone())).is_err()
                {
                    break;
                }
                if status_changed
                    && events.send(BusEvent::PlaybackStatusChanged(name.clone())).is_err()
                {
                    break;
                }
            }
            _ = poll.tick() => {
                let capabilities = read_capabilities(&player).await;
                let mut guard = match state.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.capabilities = capabilities;
            }
        }
    }

    Ok(())
}

fn store(state: &RwLock<PlayerSnapshot>, snapshot: PlayerSnapshot) {
    let mut guard = match state.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = snapshot;
}

async fn read_snapshot(player: &MediaPlayer2PlayerProxy<'_>) -> PlayerSnapshot {
    let status = match player.playback_status().await {
        Ok(status) => PlaybackStatus::from_mpris(&status),
        Err(e) => {
            debug!("PlaybackStatus unavailable: {}", e);
            PlaybackStatus::Stopped
        }
    };

    let track = match player.metadata().await {
        Ok(metadata) => track_from_metadata(metadata),
        Err(e) => {
            debug!("Metadata unavailable: {}", e);
            TrackMeta::default()
        }
    };

    PlayerSnapshot {
        status,
        track,
        capabilities: read_capabilities(player).await,
    }
}

async fn read_capabilities(player: &MediaPlayer2PlayerProxy<'_>) -> Capabilities {
    Capabilities {
        can_go_previous: player.can_go_previous().await.unwrap_or(false),
        can_pause: player.can_pause().await.unwrap_or(false),
        can_go_next: player.can_go_next().await.unwrap_or(false),
    }
}

/// Extract the fields the panel shows from an MPRIS metadata map
fn track_from_metadata(metadata: HashMap<String, OwnedValue>) -> TrackMeta {
    let mut title = None;
    let mut album = None;
    let mut artists = None;
    let mut album_artists = None;
    let mut art_url = None;

    for (key, value) in metadata {
        match key.as_str() {
            "xesam:title" => title = String::try_from(value).ok(),
            "xesam:album" => album = String::try_from(value).ok(),
            "xesam:artist" => artists = Vec::<String>::try_from(value).ok(),
            "xesam:albumArtist" => album_artists = Vec::<String>::try_from(value).ok(),
            "mpris:artUrl" => art_url = String::try_from(value).ok(),
            _ => {}
        }
    }

    // Fall back to the album artist when the track artist is missing
    let artists = artists
        .filter(|list| list.iter().any(|a| !a.trim().is_empty()))
        .or(album_artists);

    TrackMeta::from_fields(title, album, artists, art_url)
}
