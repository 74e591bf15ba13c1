//! Per-window panel state

use crate::art::{ArtFetcher, Artwork};
use crate::host::{PanelView, WindowId};
use lockplayer_core::{Capabilities, ControlButton, LabelField, PlaybackStatus, PlayerSnapshot, TrackMeta};
use lockplayer_media_session::Player;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use tracing::debug;

/// The panel shown on one lock-screen window.
///
/// Once destroyed, nothing touches the panel again. Async completions hold
/// only a `Weak` to this state and check [`WidgetState::is_destroyed`] (via
/// [`WidgetState::install_art`]) before writing.
pub struct WidgetState {
    window: WindowId,
    view: Box<dyn PanelView>,
    labels: BTreeSet<LabelField>,
    art_enabled: bool,
    /// Art URI last requested, `None` while the placeholder is wanted
    art_uri: Option<String>,
    art_generation: u64,
    destroyed: bool,
}

impl WidgetState {
    pub fn new(window: WindowId, view: Box<dyn PanelView>, art_enabled: bool) -> Self {
        Self {
            window,
            view,
            labels: BTreeSet::new(),
            art_enabled,
            art_uri: None,
            art_generation: 0,
            destroyed: false,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Label fields currently on screen, in display order
    pub fn labels(&self) -> impl Iterator<Item = LabelField> + '_ {
        self.labels.iter().copied()
    }

    pub fn set_reveal(&self, visible: bool) {
        if self.destroyed {
            return;
        }
        self.view.set_revealed(visible);
    }

    /// Show non-empty fields, remove empty ones
    pub fn update_labels(&mut self, track: &TrackMeta) {
        if self.destroyed {
            return;
        }
        for field in LabelField::ALL {
            match track.field(field) {
                Some(text) => {
                    self.view.show_label(field, text);
                    self.labels.insert(field);
                }
                None => {
                    if self.labels.remove(&field) {
                        self.view.remove_label(field);
                    }
                }
            }
        }
    }

    /// Enable each button iff the player allows it; no player disables all
    pub fn update_sensitivity(&self, capabilities: Option<Capabilities>) {
        if self.destroyed {
            return;
        }
        for button in ControlButton::ALL {
            let sensitive = capabilities.map_or(false, |caps| caps.allows(button));
            self.view.set_button_sensitive(button, sensitive);
        }
    }

    /// Start a new art request, invalidating any still in flight
    pub fn next_art_generation(&mut self) -> u64 {
        self.art_generation += 1;
        self.art_generation
    }

    /// Install art fetched for `generation`; returns whether it was applied
    pub fn install_art(&self, generation: u64, art: &Artwork) -> bool {
        if self.destroyed || generation != self.art_generation {
            return false;
        }
        self.view.set_art(art);
        true
    }

    /// Bring the panel in line with `snapshot`.
    ///
    /// Returns the art URI to fetch and the generation it belongs to.
    fn apply_snapshot(&mut self, snapshot: Option<&PlayerSnapshot>) -> Option<(String, u64)> {
        let empty = TrackMeta::default();
        let track = snapshot.map_or(&empty, |s| &s.track);
        let status = snapshot.map_or(PlaybackStatus::Stopped, |s| s.status);

        self.update_labels(track);
        self.view.set_play_icon(status.play_pause_icon());
        self.update_sensitivity(snapshot.map(|s| s.capabilities));
        self.view
            .set_controls_visible(snapshot.is_some() && status != PlaybackStatus::Stopped);

        if !self.art_enabled {
            return None;
        }
        let generation = self.next_art_generation();
        // Placeholder until art for the new URI is installed
        if track.art_url != self.art_uri {
            self.view.reset_art();
            self.art_uri = track.art_url.clone();
        }
        track.art_url.clone().map(|uri| (uri, generation))
    }

    /// Mark destroyed first, then release the panel
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.view.detach();
    }
}

/// Re-sync a panel with the current player and kick off its art load
pub fn refresh(
    state: &Rc<RefCell<WidgetState>>,
    player: Option<&dyn Player>,
    fetcher: Option<&ArtFetcher>,
) {
    let snapshot = player.map(|p| p.snapshot());

    let art_request = {
        let mut widget = state.borrow_mut();
        if widget.is_destroyed() {
            return;
        }
        widget.apply_snapshot(snapshot.as_ref())
    };

    if let (Some((uri, generation)), Some(fetcher)) = (art_request, fetcher) {
        fetcher.request(&uri, Rc::downgrade(state), generation);
    }
}

/// Window -> panel side table; the only owner of each [`WidgetState`]
#[derive(Default)]
pub struct WidgetRegistry {
    states: HashMap<WindowId, Rc<RefCell<WidgetState>>>,
}

impl WidgetRegistry {
    pub fn get(&self, window: WindowId) -> Option<Rc<RefCell<WidgetState>>> {
        self.states.get(&window).cloned()
    }

    /// Existing state for `window`, or a new one from `create`
    pub fn ensure(
        &mut self,
        window: WindowId,
        create: impl FnOnce() -> Option<WidgetState>,
    ) -> Option<Rc<RefCell<WidgetState>>> {
        if let Some(state) = self.states.get(&window) {
            return Some(state.clone());
        }
        let state = Rc::new(RefCell::new(create()?));
        debug!("Created player panel for {:?}", window);
        self.states.insert(window, state.clone());
        Some(state)
    }

    /// Destroy and forget the state of `window`; returns whether there was one
    pub fn destroy(&mut self, window: WindowId) -> bool {
        let Some(state) = self.states.get(&window) else {
            return false;
        };
        state.borrow_mut().destroy();
        self.states.remove(&window);
        debug!("Destroyed player panel for {:?}", window);
        true
    }

    pub fn destroy_all(&mut self) {
        for (_, state) in self.states.drain() {
            state.borrow_mut().destroy();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<RefCell<WidgetState>>> {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
