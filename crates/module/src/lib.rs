//! Lock-screen "now playing" panel
//!
//! The module shows the current media player's track, album art and
//! transport controls on every lock-screen window:
//! - [`bridge::PlayerModule`] receives the host's lock-screen callbacks
//! - [`session`] decides which player the panel follows
//! - [`widget`] keeps one panel per window in sync with that player
//! - [`art`] loads album art off the UI thread
//!
//! Hosts implement the traits in [`host`] for their toolkit; the `gtk`
//! feature provides a GTK3 implementation.

pub mod art;
pub mod bridge;
pub mod executor;
#[cfg(feature = "gtk")]
pub mod gtk;
pub mod host;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod widget;

#[cfg(test)]
mod testing;

pub use bridge::{PlayerModule, MODULE_NAME, MODULE_VERSION};
pub use executor::{LocalExecutor, TokioLocal};
pub use host::{LockScreen, PanelView, Surface, WindowId};
pub use runtime::BackgroundRuntime;
