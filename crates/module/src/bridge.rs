//! Lock-screen entry points
//!
//! [`PlayerModule`] is what a host holds on to. It translates lock-screen
//! callbacks (focus changes, idle hide/show, window teardown, unload) and bus
//! events into widget updates. Everything here runs on the UI thread.

use crate::art::ArtFetcher;
use crate::executor::LocalExecutor;
use crate::host::{ButtonHandler, LockScreen, PanelSpec, WindowId};
use crate::session::{PlayerSession, Transition};
use crate::widget::{refresh, WidgetRegistry, WidgetState};
use lockplayer_core::{Config, ControlButton};
use lockplayer_media_session::{BusEvent, MediaBus};
use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

pub const MODULE_NAME: &str = "player";
pub const MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often button sensitivity is re-read from the player
pub const SENSITIVITY_PERIOD: Duration = Duration::from_secs(1);

/// The activated module. Dropping it unloads.
pub struct PlayerModule {
    ctx: Rc<ModuleContext>,
}

struct ModuleContext {
    host: Rc<dyn LockScreen>,
    config: Config,
    session: RefCell<PlayerSession>,
    widgets: RefCell<WidgetRegistry>,
    fetcher: RefCell<Option<ArtFetcher>>,
    unloaded: Cell<bool>,
}

impl PlayerModule {
    /// Start the module.
    ///
    /// `media` is `None` when no media bus could be set up; the module then
    /// runs without ever tracking a player. Must be called on the UI thread,
    /// `runtime` is where art I/O runs.
    pub fn activate(
        host: Rc<dyn LockScreen>,
        config: Config,
        executor: Rc<dyn LocalExecutor>,
        media: Option<MediaBus>,
        runtime: Handle,
    ) -> Self {
        info!("Activating {} module {}", MODULE_NAME, MODULE_VERSION);
        debug!("Module config: {:?}", config);

        let fetcher = if config.art_size == 0 {
            debug!("Album art disabled");
            None
        } else {
            match ArtFetcher::new(config.art_size, runtime, executor.clone()) {
                Ok(fetcher) => Some(fetcher),
                Err(e) => {
                    warn!("Album art unavailable: {}", e);
                    None
                }
            }
        };

        let (manager, events) = match media {
            Some(MediaBus { manager, events }) => (Some(manager), Some(events)),
            None => {
                warn!("No media bus, player panel will stay empty");
                (None, None)
            }
        };

        let ctx = Rc::new(ModuleContext {
            host,
            config,
            session: RefCell::new(PlayerSession::new(manager)),
            widgets: RefCell::new(WidgetRegistry::default()),
            fetcher: RefCell::new(fetcher),
            unloaded: Cell::new(false),
        });

        if let Some(events) = events {
            executor.spawn(Box::pin(pump_events(Rc::downgrade(&ctx), events)));
        }

        let weak = Rc::downgrade(&ctx);
        executor.every(
            SENSITIVITY_PERIOD,
            Box::new(move || match weak.upgrade() {
                Some(ctx) if !ctx.unloaded.get() => {
                    ctx.update_sensitivity();
                    ControlFlow::Continue(())
                }
                _ => ControlFlow::Break(()),
            }),
        );

        Self { ctx }
    }

    /// Focus moved to `window`, away from `old`
    pub fn on_focus_change(&self, window: WindowId, old: Option<WindowId>) {
        let ctx = &self.ctx;
        if ctx.unloaded.get() {
            return;
        }

        if let Some(state) = ctx.refresh_window(window) {
            let reveal = !ctx.host.is_hidden() || ctx.config.show_hidden;
            state.borrow().set_reveal(reveal);
        }

        if let Some(old) = old.filter(|old| *old != window) {
            if let Some(state) = ctx.widgets.borrow().get(old) {
                state.borrow().set_reveal(false);
            }
        }
    }

    /// The host is tearing `window` down
    pub fn on_window_destroy(&self, window: WindowId) {
        if self.ctx.unloaded.get() {
            return;
        }
        self.ctx.widgets.borrow_mut().destroy(window);
    }

    pub fn on_idle_hide(&self) {
        self.ctx.reveal_focused(self.ctx.config.show_hidden);
    }

    pub fn on_idle_show(&self) {
        self.ctx.reveal_focused(true);
    }

    /// Tear everything down; safe to call more than once
    pub fn on_unload(&self) {
        let ctx = &self.ctx;
        if ctx.unloaded.replace(true) {
            return;
        }
        ctx.widgets.borrow_mut().destroy_all();
        ctx.session.borrow_mut().release();
        ctx.fetcher.borrow_mut().take();
        info!("Unloaded {} module", MODULE_NAME);
    }

    pub fn has_player(&self) -> bool {
        self.ctx.session.borrow().has_player()
    }

    pub fn widget(&self, window: WindowId) -> Option<Rc<RefCell<WidgetState>>> {
        self.ctx.widgets.borrow().get(window)
    }

    pub fn widget_count(&self) -> usize {
        self.ctx.widgets.borrow().len()
    }
}

impl Drop for PlayerModule {
    fn drop(&mut self) {
        self.on_unload();
    }
}

async fn pump_events(ctx: Weak<ModuleContext>, mut events: UnboundedReceiver<BusEvent>) {
    while let Some(event) = events.recv().await {
        let Some(ctx) = ctx.upgrade() else {
            break;
        };
        if ctx.unloaded.get() {
            break;
        }
        ctx.handle_bus_event(event);
    }
    debug!("Bus event pump stopped");
}

impl ModuleContext {
    fn handle_bus_event(self: &Rc<Self>, event: BusEvent) {
        debug!("Bus event: {:?}", event);
        let transition = {
            let mut session = self.session.borrow_mut();
            match &event {
                BusEvent::Enumerated(names) => session.on_enumerated(names),
                BusEvent::NameAppeared(name) => session.on_name_appeared(name),
                BusEvent::PlayerVanished(name) => session.on_player_vanished(name),
                BusEvent::MetadataChanged(name) | BusEvent::PlaybackStatusChanged(name) => {
                    if !session.is_current(name) {
                        return;
                    }
                    Transition::Appeared
                }
            }
        };

        match transition {
            Transition::Unchanged => {}
            Transition::Appeared => self.refresh_focused(),
            Transition::Vanished => self.widgets.borrow_mut().destroy_all(),
        }
    }

    fn refresh_focused(self: &Rc<Self>) {
        if let Some(window) = self.host.focused_window() {
            self.refresh_window(window);
        }
    }

    /// Ensure `window` has a panel and bring it up to date
    fn refresh_window(self: &Rc<Self>, window: WindowId) -> Option<Rc<RefCell<WidgetState>>> {
        let state = self.ensure_widget(window)?;
        let player = self.session.borrow().current();
        let fetcher = self.fetcher.borrow();
        refresh(&state, player.as_deref(), fetcher.as_ref());
        Some(state)
    }

    fn ensure_widget(self: &Rc<Self>, window: WindowId) -> Option<Rc<RefCell<WidgetState>>> {
        self.widgets.borrow_mut().ensure(window, || {
            let Some(surface) = self.host.surface(window) else {
                warn!("No surface for {:?}, not showing the player", window);
                return None;
            };
            let view = surface.attach_panel(PanelSpec {
                anchor: self.config.position.anchor(),
                art_size: self.config.art_size,
                on_button: self.button_handler(window),
            });
            let state = WidgetState::new(window, view, self.config.art_size > 0);
            state.set_reveal(!self.host.is_hidden() || self.config.show_hidden);
            Some(state)
        })
    }

    fn button_handler(self: &Rc<Self>, window: WindowId) -> ButtonHandler {
        let ctx = Rc::downgrade(self);
        Rc::new(move |button| {
            if let Some(ctx) = ctx.upgrade() {
                ctx.on_button(window, button);
            }
        })
    }

    fn on_button(self: &Rc<Self>, window: WindowId, button: ControlButton) {
        if self.unloaded.get() {
            return;
        }
        let player = self.session.borrow().current();
        match player {
            Some(player) => {
                debug!("{:?} pressed for {}", button, player.name());
                player.send(button.command());
            }
            None => debug!("{:?} pressed without a player", button),
        }
        if self.widgets.borrow().get(window).is_some() {
            self.refresh_window(window);
        }
    }

    fn reveal_focused(&self, visible: bool) {
        if self.unloaded.get() {
            return;
        }
        let Some(window) = self.host.focused_window() else {
            return;
        };
        if let Some(state) = self.widgets.borrow().get(window) {
            state.borrow().set_reveal(visible);
        }
    }

    fn update_sensitivity(&self) {
        let capabilities = self
            .session
            .borrow()
            .current()
            .map(|player| player.snapshot().capabilities);
        for state in self.widgets.borrow().iter() {
            state.borrow().update_sensitivity(capabilities);
        }
    }
}
