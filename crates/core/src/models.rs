use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Track metadata reported by the current player
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMeta {
    pub title: String,
    pub album: String,
    /// All artists joined with ", "
    pub artist: String,
    /// `mpris:artUrl`, usually `file://` or `https://`
    #[serde(default)]
    pub art_url: Option<String>,
}

impl TrackMeta {
    /// Build track metadata from raw MPRIS fields, dropping blank values
    pub fn from_fields(
        title: Option<String>,
        album: Option<String>,
        artists: Option<Vec<String>>,
        art_url: Option<String>,
    ) -> Self {
        let artist = artists
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            title: title.unwrap_or_default(),
            album: album.unwrap_or_default(),
            artist,
            art_url: art_url.filter(|url| !url.trim().is_empty()),
        }
    }

    /// Text for a label field, `None` when the field is empty
    pub fn field(&self, field: LabelField) -> Option<&str> {
        let value = match field {
            LabelField::Title => self.title.as_str(),
            LabelField::Album => self.album.as_str(),
            LabelField::Artist => self.artist.as_str(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Labels shown next to the album art, in display order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelField {
    Title,
    Album,
    Artist,
}

impl LabelField {
    pub const ALL: [LabelField; 3] = [LabelField::Title, LabelField::Album, LabelField::Artist];

    /// Widget name used for host CSS
    pub fn widget_name(&self) -> &'static str {
        match self {
            LabelField::Title => "title-label",
            LabelField::Album => "album-label",
            LabelField::Artist => "artist-label",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackStatus {
    /// Parse the MPRIS `PlaybackStatus` property; unknown values count as stopped
    pub fn from_mpris(value: &str) -> Self {
        match value {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }

    /// Icon for the play-pause button
    pub fn play_pause_icon(&self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "media-playback-pause",
            _ => "media-playback-start",
        }
    }
}

/// Capability flags that gate the control buttons
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_go_previous: bool,
    pub can_pause: bool,
    pub can_go_next: bool,
}

impl Capabilities {
    pub fn allows(&self, button: ControlButton) -> bool {
        match button {
            ControlButton::Previous => self.can_go_previous,
            ControlButton::PlayPause => self.can_pause,
            ControlButton::Next => self.can_go_next,
        }
    }
}

/// Everything the panel needs to know about a player at one point in time
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub track: TrackMeta,
    pub capabilities: Capabilities,
}

/// Transport buttons on the panel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlButton {
    Previous,
    PlayPause,
    Next,
}

impl ControlButton {
    pub const ALL: [ControlButton; 3] = [
        ControlButton::Previous,
        ControlButton::PlayPause,
        ControlButton::Next,
    ];

    pub fn command(&self) -> PlayerCommand {
        match self {
            ControlButton::Previous => PlayerCommand::Previous,
            ControlButton::PlayPause => PlayerCommand::PlayPause,
            ControlButton::Next => PlayerCommand::Next,
        }
    }

    /// Initial icon; the play-pause icon follows the playback status afterwards
    pub fn icon_name(&self) -> &'static str {
        match self {
            ControlButton::Previous => "media-skip-backward",
            ControlButton::PlayPause => "media-playback-start",
            ControlButton::Next => "media-skip-forward",
        }
    }
}

/// Fire-and-forget commands sent to a player
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    PlayPause,
    Next,
    Previous,
}

impl PlayerCommand {
    /// MPRIS method name
    pub fn method(&self) -> &'static str {
        match self {
            PlayerCommand::PlayPause => "PlayPause",
            PlayerCommand::Next => "Next",
            PlayerCommand::Previous => "Previous",
        }
    }
}

/// Where the panel is placed on each lock-screen window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    #[default]
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    AboveClock,
    UnderClock,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopCenter => "top-center",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomCenter => "bottom-center",
            Position::BottomRight => "bottom-right",
            Position::AboveClock => "above-clock",
            Position::UnderClock => "under-clock",
        }
    }

    /// Parse a configured position, falling back to top-center with a warning
    pub fn from_config(value: &str) -> Self {
        match value.parse() {
            Ok(position) => position,
            Err(ParsePositionError(raw)) => {
                tracing::warn!("Unknown position {:?}, using top-center", raw);
                Position::TopCenter
            }
        }
    }

    pub fn anchor(&self) -> Anchor {
        match self {
            Position::TopLeft => Anchor::overlay(Align::Start, Align::Start),
            Position::TopCenter => Anchor::overlay(Align::Center, Align::Start),
            Position::TopRight => Anchor::overlay(Align::End, Align::Start),
            Position::BottomLeft => Anchor::overlay(Align::Start, Align::End),
            Position::BottomCenter => Anchor::overlay(Align::Center, Align::End),
            Position::BottomRight => Anchor::overlay(Align::End, Align::End),
            Position::AboveClock => Anchor::AboveClock,
            Position::UnderClock => Anchor::UnderClock,
        }
    }
}

/// Error type for unrecognized position strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsePositionError(pub String);

impl std::fmt::Display for ParsePositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid position value: {}", self.0)
    }
}

impl std::error::Error for ParsePositionError {}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "top-left" => Ok(Position::TopLeft),
            "top-center" => Ok(Position::TopCenter),
            "top-right" => Ok(Position::TopRight),
            "bottom-left" => Ok(Position::BottomLeft),
            "bottom-center" => Ok(Position::BottomCenter),
            "bottom-right" => Ok(Position::BottomRight),
            "above-clock" => Ok(Position::AboveClock),
            "under-clock" => Ok(Position::UnderClock),
            _ => Err(ParsePositionError(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Start,
    Center,
    End,
}

/// How the panel is attached to a window's layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// Floating over the window at the given alignment
    Overlay { halign: Align, valign: Align },
    /// Inserted into the window box right before the clock
    AboveClock,
    /// Inserted into the window box right after the clock
    UnderClock,
}

impl Anchor {
    fn overlay(halign: Align, valign: Align) -> Self {
        Anchor::Overlay { halign, valign }
    }

    /// Offset from the clock's index when inserting into the window box
    pub fn clock_offset(&self) -> Option<i32> {
        match self {
            Anchor::AboveClock => Some(0),
            Anchor::UnderClock => Some(1),
            Anchor::Overlay { .. } => None,
        }
    }
}
