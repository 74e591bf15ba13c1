//! In-memory host, panel and player doubles for unit tests

use crate::art::Artwork;
use crate::host::{ButtonHandler, LockScreen, PanelSpec, PanelView, Surface, WindowId};
use lockplayer_core::{Anchor, ControlButton, LabelField, PlayerCommand, PlayerSnapshot};
use lockplayer_media_session::{MediaError, Player, PlayerManager, PlayerName};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Everything a [`FakePanel`] was told to show
#[derive(Debug, Default)]
pub struct PanelRecord {
    pub labels: BTreeMap<LabelField, String>,
    created: HashMap<LabelField, usize>,
    /// Size of the installed art, `None` for the placeholder
    pub art: Option<(u32, u32)>,
    pub art_sets: usize,
    pub revealed: bool,
    pub controls_visible: bool,
    pub sensitive: HashMap<ControlButton, bool>,
    pub play_icon: Option<String>,
    pub detached: bool,
    /// Number of calls made on the panel
    pub mutations: usize,
}

impl PanelRecord {
    /// How many times a label for `field` was created from scratch
    pub fn label_creations(&self, field: LabelField) -> usize {
        self.created.get(&field).copied().unwrap_or(0)
    }
}

pub struct FakePanel {
    record: Rc<RefCell<PanelRecord>>,
}

impl FakePanel {
    pub fn new() -> (Self, Rc<RefCell<PanelRecord>>) {
        let record = Rc::new(RefCell::new(PanelRecord::default()));
        (
            Self {
                record: record.clone(),
            },
            record,
        )
    }

    fn update(&self, f: impl FnOnce(&mut PanelRecord)) {
        let mut record = self.record.borrow_mut();
        assert!(!record.detached, "panel used after detach");
        record.mutations += 1;
        f(&mut record);
    }
}

impl PanelView for FakePanel {
    fn set_art(&self, art: &Artwork) {
        self.update(|r| {
            r.art = Some((art.width, art.height));
            r.art_sets += 1;
        });
    }

    fn reset_art(&self) {
        self.update(|r| r.art = None);
    }

    fn show_label(&self, field: LabelField, text: &str) {
        self.update(|r| {
            if r.labels.insert(field, text.to_string()).is_none() {
                *r.created.entry(field).or_default() += 1;
            }
        });
    }

    fn remove_label(&self, field: LabelField) {
        self.update(|r| {
            r.labels.remove(&field);
        });
    }

    fn set_play_icon(&self, icon: &str) {
        self.update(|r| r.play_icon = Some(icon.to_string()));
    }

    fn set_button_sensitive(&self, button: ControlButton, sensitive: bool) {
        self.update(|r| {
            r.sensitive.insert(button, sensitive);
        });
    }

    fn set_controls_visible(&self, visible: bool) {
        self.update(|r| r.controls_visible = visible);
    }

    fn set_revealed(&self, revealed: bool) {
        self.update(|r| r.revealed = revealed);
    }

    fn detach(&self) {
        self.update(|r| r.detached = true);
    }
}

/// One window's layout; remembers every panel attached to it
#[derive(Default)]
pub struct FakeSurface {
    panels: RefCell<Vec<Rc<RefCell<PanelRecord>>>>,
    anchors: RefCell<Vec<Anchor>>,
    handlers: RefCell<Vec<ButtonHandler>>,
}

impl Surface for FakeSurface {
    fn attach_panel(&self, spec: PanelSpec) -> Box<dyn PanelView> {
        let (panel, record) = FakePanel::new();
        self.panels.borrow_mut().push(record);
        self.anchors.borrow_mut().push(spec.anchor);
        self.handlers.borrow_mut().push(spec.on_button);
        Box::new(panel)
    }
}

pub struct FakeLockScreen {
    surfaces: HashMap<WindowId, Rc<FakeSurface>>,
    focused: Cell<Option<WindowId>>,
    hidden: Cell<bool>,
}

impl FakeLockScreen {
    pub fn new(windows: &[u64]) -> Self {
        Self {
            surfaces: windows
                .iter()
                .map(|id| (WindowId(*id), Rc::new(FakeSurface::default())))
                .collect(),
            focused: Cell::new(None),
            hidden: Cell::new(false),
        }
    }

    pub fn set_focused(&self, window: Option<WindowId>) {
        self.focused.set(window);
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    /// Latest panel attached to `window`
    pub fn panel(&self, window: WindowId) -> Rc<RefCell<PanelRecord>> {
        self.surfaces[&window]
            .panels
            .borrow()
            .last()
            .cloned()
            .expect("no panel attached")
    }

    pub fn panels_attached(&self, window: WindowId) -> usize {
        self.surfaces[&window].panels.borrow().len()
    }

    pub fn anchors(&self, window: WindowId) -> Vec<Anchor> {
        self.surfaces[&window].anchors.borrow().clone()
    }

    /// Press `button` on the latest panel of `window`
    pub fn click(&self, window: WindowId, button: ControlButton) {
        let handler = self.surfaces[&window]
            .handlers
            .borrow()
            .last()
            .cloned()
            .expect("no panel attached");
        handler(button);
    }
}

impl LockScreen for FakeLockScreen {
    fn focused_window(&self) -> Option<WindowId> {
        self.focused.get()
    }

    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn surface(&self, window: WindowId) -> Option<Rc<dyn Surface>> {
        self.surfaces
            .get(&window)
            .map(|surface| surface.clone() as Rc<dyn Surface>)
    }
}

pub struct FakePlayer {
    name: PlayerName,
    snapshot: RefCell<PlayerSnapshot>,
    commands: RefCell<Vec<PlayerCommand>>,
}

impl FakePlayer {
    pub fn new(name: &str, snapshot: PlayerSnapshot) -> Rc<Self> {
        Rc::new(Self {
            name: PlayerName::new(name),
            snapshot: RefCell::new(snapshot),
            commands: RefCell::new(Vec::new()),
        })
    }

    pub fn set_snapshot(&self, snapshot: PlayerSnapshot) {
        *self.snapshot.borrow_mut() = snapshot;
    }

    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.commands.borrow().clone()
    }
}

impl Player for FakePlayer {
    fn name(&self) -> &PlayerName {
        &self.name
    }

    fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    fn send(&self, command: PlayerCommand) {
        self.commands.borrow_mut().push(command);
    }
}

#[derive(Default)]
struct ManagerState {
    refused: HashSet<String>,
    presets: HashMap<String, PlayerSnapshot>,
    players: Vec<Rc<FakePlayer>>,
}

/// Hands out [`FakePlayer`]s; clones share state
#[derive(Clone)]
pub struct FakeManager {
    attempts: Rc<RefCell<Vec<PlayerName>>>,
    state: Rc<RefCell<ManagerState>>,
}

impl FakeManager {
    /// The manager and a log of every name it was asked to manage
    pub fn new() -> (Self, Rc<RefCell<Vec<PlayerName>>>) {
        let attempts = Rc::new(RefCell::new(Vec::new()));
        let manager = Self {
            attempts: attempts.clone(),
            state: Rc::default(),
        };
        (manager, attempts)
    }

    /// Fail to manage `name`
    pub fn refuse(&self, name: &str) {
        self.state.borrow_mut().refused.insert(name.to_string());
    }

    /// State a player named `name` starts with
    pub fn preset(&self, name: &str, snapshot: PlayerSnapshot) {
        self.state
            .borrow_mut()
            .presets
            .insert(name.to_string(), snapshot);
    }

    /// Most recent player handed out for `name`
    pub fn player(&self, name: &str) -> Option<Rc<FakePlayer>> {
        self.state
            .borrow()
            .players
            .iter()
            .rev()
            .find(|p| p.name.as_str() == name)
            .cloned()
    }

    /// Names successfully managed, in order
    pub fn managed(&self) -> Vec<PlayerName> {
        self.state
            .borrow()
            .players
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }
}

impl PlayerManager for FakeManager {
    fn manage(&self, name: &PlayerName) -> Result<Rc<dyn Player>, MediaError> {
        self.attempts.borrow_mut().push(name.clone());
        let mut state = self.state.borrow_mut();
        if state.refused.contains(name.as_str()) {
            return Err(MediaError::Disconnected);
        }
        let snapshot = state.presets.get(name.as_str()).cloned().unwrap_or_default();
        let player = FakePlayer::new(name.as_str(), snapshot);
        state.players.push(player.clone());
        Ok(player as Rc<dyn Player>)
    }
}

/// A small solid PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Wait until `done` holds, failing the test after a few seconds
pub async fn settle(mut done: impl FnMut() -> bool) {
    let wait = async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("condition not reached in time");
}

/// Let queued local tasks run
pub async fn flush() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Number of warnings logged while running `f`
pub fn count_warnings(f: impl FnOnce()) -> usize {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
    tracing::subscriber::with_default(subscriber, f);
    count.load(Ordering::SeqCst)
}
