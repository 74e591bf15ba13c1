//! Which player the panel follows
//!
//! At most one player is tracked at a time. The first player found wins and
//! keeps the panel until it leaves the bus; players showing up in the
//! meantime are ignored.

use lockplayer_media_session::{Player, PlayerManager, PlayerName};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Effect of a bus event on the tracked player
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Appeared,
    Vanished,
}

pub struct PlayerSession {
    manager: Option<Box<dyn PlayerManager>>,
    current: Option<Rc<dyn Player>>,
}

impl PlayerSession {
    /// `None` means no media bus; the session then stays empty forever
    pub fn new(manager: Option<Box<dyn PlayerManager>>) -> Self {
        Self {
            manager,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Rc<dyn Player>> {
        self.current.clone()
    }

    pub fn has_player(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_current(&self, name: &PlayerName) -> bool {
        self.current.as_ref().is_some_and(|p| p.name() == name)
    }

    /// Players already on the bus at startup; track the first one that can
    /// be managed
    pub fn on_enumerated(&mut self, names: &[PlayerName]) -> Transition {
        if self.current.is_some() {
            return Transition::Unchanged;
        }
        for name in names {
            if self.try_manage(name) {
                return Transition::Appeared;
            }
        }
        debug!("No media player found on the bus");
        Transition::Unchanged
    }

    pub fn on_name_appeared(&mut self, name: &PlayerName) -> Transition {
        if let Some(current) = &self.current {
            debug!("Ignoring {}, already following {}", name, current.name());
            return Transition::Unchanged;
        }
        if self.try_manage(name) {
            Transition::Appeared
        } else {
            Transition::Unchanged
        }
    }

    /// Only managed players vanish, so this always clears the tracked player
    pub fn on_player_vanished(&mut self, name: &PlayerName) -> Transition {
        match self.current.take() {
            Some(player) => {
                if player.name() != name {
                    warn!("{} vanished while following {}", name, player.name());
                }
                info!("Media player {} vanished", player.name());
                Transition::Vanished
            }
            None => Transition::Unchanged,
        }
    }

    /// Drop the tracked player and the manager
    pub fn release(&mut self) {
        self.current = None;
        self.manager = None;
    }

    fn try_manage(&mut self, name: &PlayerName) -> bool {
        let Some(manager) = &self.manager else {
            return false;
        };
        match manager.manage(name) {
            Ok(player) => {
                info!("Following media player {}", name);
                self.current = Some(player);
                true
            }
            Err(e) => {
                warn!("Cannot follow media player {}: {}", name, e);
                false
            }
        }
    }
}
