//! Headless lock screen for the preview binary
//!
//! Windows exist only as numbers and every panel change is written to the
//! log, which is enough to watch the module react to a real media player.

use lockplayer_core::{ControlButton, LabelField};
use lockplayer_module::art::Artwork;
use lockplayer_module::host::{LockScreen, PanelSpec, PanelView, Surface, WindowId};
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

pub struct PreviewLockScreen {
    windows: u64,
    focused: Cell<Option<WindowId>>,
    hidden: Cell<bool>,
}

impl PreviewLockScreen {
    pub fn new(windows: u64) -> Self {
        Self {
            windows: windows.max(1),
            focused: Cell::new(None),
            hidden: Cell::new(false),
        }
    }

    pub fn focus(&self, window: WindowId) -> Option<WindowId> {
        self.focused.replace(Some(window))
    }

    /// Window after the focused one, wrapping around
    pub fn next_window(&self) -> WindowId {
        match self.focused.get() {
            Some(WindowId(id)) => WindowId((id + 1) % self.windows),
            None => WindowId(0),
        }
    }

    /// Flip the idle-hidden flag, returning the new value
    pub fn toggle_hidden(&self) -> bool {
        let hidden = !self.hidden.get();
        self.hidden.set(hidden);
        hidden
    }
}

impl LockScreen for PreviewLockScreen {
    fn focused_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn surface(&self, window: WindowId) -> Option<Rc<dyn Surface>> {
        (window.0 < self.windows).then(|| Rc::new(LogSurface { window }) as Rc<dyn Surface>)
    }
}

struct LogSurface {
    window: WindowId,
}

impl Surface for LogSurface {
    fn attach_panel(&self, spec: PanelSpec) -> Box<dyn PanelView> {
        info!(
            window = self.window.0,
            "Attached panel at {:?}, art size {}", spec.anchor, spec.art_size
        );
        Box::new(LogPanel {
            window: self.window,
        })
    }
}

struct LogPanel {
    window: WindowId,
}

impl PanelView for LogPanel {
    fn set_art(&self, art: &Artwork) {
        info!(window = self.window.0, "Album art {}x{}", art.width, art.height);
    }

    fn reset_art(&self) {
        info!(window = self.window.0, "Album art placeholder");
    }

    fn show_label(&self, field: LabelField, text: &str) {
        info!(window = self.window.0, "{}: {}", field.widget_name(), text);
    }

    fn remove_label(&self, field: LabelField) {
        info!(window = self.window.0, "{} removed", field.widget_name());
    }

    fn set_play_icon(&self, icon: &str) {
        info!(window = self.window.0, "Play button icon {}", icon);
    }

    fn set_button_sensitive(&self, button: ControlButton, sensitive: bool) {
        tracing::debug!(window = self.window.0, "{:?} sensitive: {}", button, sensitive);
    }

    fn set_controls_visible(&self, visible: bool) {
        info!(window = self.window.0, "Controls visible: {}", visible);
    }

    fn set_revealed(&self, revealed: bool) {
        info!(window = self.window.0, "Revealed: {}", revealed);
    }

    fn detach(&self) {
        info!(window = self.window.0, "Panel detached");
    }
}
