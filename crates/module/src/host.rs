//! What the module needs from the lock-screen host and its toolkit

use crate::art::Artwork;
use lockplayer_core::{Anchor, ControlButton, LabelField};
use std::rc::Rc;

/// Identity of a lock-screen window (one per monitor)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// The host lock screen
pub trait LockScreen {
    /// Window that currently has focus, if any
    fn focused_window(&self) -> Option<WindowId>;

    /// Whether the lock screen is idle-hidden
    fn is_hidden(&self) -> bool;

    /// Layout surface of a window, `None` once the window is gone
    fn surface(&self, window: WindowId) -> Option<Rc<dyn Surface>>;
}

/// Called with the button the user pressed
pub type ButtonHandler = Rc<dyn Fn(ControlButton)>;

/// Everything a surface needs to build a panel
pub struct PanelSpec {
    pub anchor: Anchor,
    /// 0 means no art image at all
    pub art_size: u32,
    pub on_button: ButtonHandler,
}

/// A window's layout, able to host one player panel
pub trait Surface {
    /// Build the panel (revealer, placeholder art, empty label box, three
    /// buttons) and attach it at `spec.anchor`
    fn attach_panel(&self, spec: PanelSpec) -> Box<dyn PanelView>;
}

/// Toolkit handle to an attached panel.
///
/// Label operations are idempotent: showing an existing label updates its
/// text, removing a missing one does nothing.
pub trait PanelView {
    fn set_art(&self, art: &Artwork);
    /// Put the placeholder icon back
    fn reset_art(&self);
    fn show_label(&self, field: LabelField, text: &str);
    fn remove_label(&self, field: LabelField);
    fn set_play_icon(&self, icon: &str);
    fn set_button_sensitive(&self, button: ControlButton, sensitive: bool);
    fn set_controls_visible(&self, visible: bool);
    fn set_revealed(&self, revealed: bool);
    /// Remove the panel from the window and release its widgets
    fn detach(&self);
}
