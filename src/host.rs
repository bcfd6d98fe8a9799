//! The host shell collaborators the extension is handed at enable time.
//!
//! The real shell owns all of these; they are modeled here as explicit
//! injected values with the same surface the extension consumes: signal
//! emission, the panel's corner slots and style property, the layout
//! manager's monitor list and chrome overlay. Nothing is looked up from
//! ambient state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::draw::Painter;
use crate::signals::{SignalHub, SourceId};
use crate::theme::{ThemeContext, ThemeNode};

/// Geometry of one monitor, re-enumerated on every rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monitor {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Monitor {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Anything that lives in the host's widget tree.
pub trait Actor {
    fn hub(&self) -> &Rc<SignalHub>;

    fn source_id(&self) -> SourceId {
        self.hub().source_id()
    }

    fn destroy(&self) {
        self.hub().emit_destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.hub().is_destroyed()
    }
}

pub type ActorRef = Rc<RefCell<dyn Actor>>;

/// The drawing and restyle contract every corner widget implements; the
/// host invokes both through this interface.
pub trait CornerWidget: Actor {
    fn repaint(&self, painter: &mut Painter);
    fn on_style_changed(&mut self);
}

/// Stand-in for a corner actor the host itself shipped. Old hosts populate
/// the panel's corner slots with these; the extension detaches them and puts
/// them back on disable.
pub struct NativeCorner {
    hub: Rc<SignalHub>,
}

impl NativeCorner {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            hub: SignalHub::with_destroy(),
        }))
    }
}

impl Actor for NativeCorner {
    fn hub(&self) -> &Rc<SignalHub> {
        &self.hub
    }
}

/// The host's top panel: a style property with change notification,
/// position and size, an optional theme node for its corners, and the two
/// corner slots.
pub struct Panel {
    hub: Rc<SignalHub>,
    style: RefCell<String>,
    position: Cell<(i32, i32)>,
    size: Cell<(i32, i32)>,
    theme_node: RefCell<Option<ThemeNode>>,
    left_corner: RefCell<Option<ActorRef>>,
    right_corner: RefCell<Option<ActorRef>>,
}

impl Panel {
    pub fn new(width: i32, height: i32) -> Rc<Self> {
        Rc::new(Self {
            hub: SignalHub::with_destroy(),
            style: RefCell::new(String::new()),
            position: Cell::new((0, 0)),
            size: Cell::new((width, height)),
            theme_node: RefCell::new(None),
            left_corner: RefCell::new(None),
            right_corner: RefCell::new(None),
        })
    }

    pub fn hub(&self) -> &Rc<SignalHub> {
        &self.hub
    }

    pub fn style(&self) -> String {
        self.style.borrow().clone()
    }

    pub fn set_style(&self, style: impl Into<String>) {
        *self.style.borrow_mut() = style.into();
        self.hub.emit("notify::style");
    }

    pub fn position(&self) -> (i32, i32) {
        self.position.get()
    }

    pub fn set_position(&self, x: i32, y: i32) {
        self.position.set((x, y));
        self.hub.emit("notify::position");
    }

    pub fn size(&self) -> (i32, i32) {
        self.size.get()
    }

    pub fn set_size(&self, width: i32, height: i32) {
        self.size.set((width, height));
        self.hub.emit("notify::size");
    }

    pub fn theme_node(&self) -> Option<ThemeNode> {
        self.theme_node.borrow().clone()
    }

    pub fn set_theme_node(&self, node: Option<ThemeNode>) {
        *self.theme_node.borrow_mut() = node;
    }

    pub fn left_corner(&self) -> Option<ActorRef> {
        self.left_corner.borrow().clone()
    }

    pub fn right_corner(&self) -> Option<ActorRef> {
        self.right_corner.borrow().clone()
    }

    pub fn set_left_corner(&self, actor: Option<ActorRef>) {
        *self.left_corner.borrow_mut() = actor;
    }

    pub fn set_right_corner(&self, actor: Option<ActorRef>) {
        *self.right_corner.borrow_mut() = actor;
    }

    pub fn take_left_corner(&self) -> Option<ActorRef> {
        self.left_corner.borrow_mut().take()
    }

    pub fn take_right_corner(&self) -> Option<ActorRef> {
        self.right_corner.borrow_mut().take()
    }
}

struct ChromeEntry {
    actor: ActorRef,
    track_fullscreen: bool,
}

/// The host's layout manager: monitor topology, startup state, and the
/// top-level chrome overlay screen corners are inserted into.
pub struct LayoutManager {
    hub: Rc<SignalHub>,
    monitors: RefCell<Vec<Monitor>>,
    starting_up: Cell<bool>,
    chrome: RefCell<Vec<ChromeEntry>>,
}

impl LayoutManager {
    pub fn new(monitors: Vec<Monitor>) -> Rc<Self> {
        Rc::new(Self {
            hub: SignalHub::new(),
            monitors: RefCell::new(monitors),
            starting_up: Cell::new(true),
            chrome: RefCell::new(Vec::new()),
        })
    }

    pub fn hub(&self) -> &Rc<SignalHub> {
        &self.hub
    }

    pub fn monitors(&self) -> Vec<Monitor> {
        self.monitors.borrow().clone()
    }

    pub fn set_monitors(&self, monitors: Vec<Monitor>) {
        *self.monitors.borrow_mut() = monitors;
        self.hub.emit("monitors-changed");
    }

    pub fn emit_workareas_changed(&self) {
        self.hub.emit("workareas-changed");
    }

    pub fn is_starting_up(&self) -> bool {
        self.starting_up.get()
    }

    /// Host finished starting; fires the one-shot startup signal.
    pub fn startup_complete(&self) {
        if !self.starting_up.get() {
            return;
        }
        self.starting_up.set(false);
        self.hub.emit("startup-complete");
    }

    pub fn add_top_chrome(&self, actor: ActorRef, track_fullscreen: bool) {
        self.chrome.borrow_mut().push(ChromeEntry {
            actor,
            track_fullscreen,
        });
    }

    pub fn remove_chrome(&self, source: SourceId) -> bool {
        let mut chrome = self.chrome.borrow_mut();
        let before = chrome.len();
        chrome.retain(|entry| entry.actor.borrow().source_id() != source);
        chrome.len() != before
    }

    pub fn chrome_len(&self) -> usize {
        self.chrome.borrow().len()
    }

    pub fn chrome_tracks_fullscreen(&self, source: SourceId) -> Option<bool> {
        self.chrome
            .borrow()
            .iter()
            .find(|entry| entry.actor.borrow().source_id() == source)
            .map(|entry| entry.track_fullscreen)
    }
}

/// Everything the extension is handed at enable time.
pub struct HostShell {
    pub panel: Rc<Panel>,
    pub layout: Rc<LayoutManager>,
    pub theme: Rc<ThemeContext>,
    overview_active: Cell<bool>,
}

impl HostShell {
    pub fn new(monitors: Vec<Monitor>) -> Rc<Self> {
        let panel_width = monitors.first().map_or(0, |m| m.width);
        Rc::new(Self {
            panel: Panel::new(panel_width, 32),
            layout: LayoutManager::new(monitors),
            theme: Rc::new(ThemeContext::new()),
            overview_active: Cell::new(false),
        })
    }

    pub fn overview_active(&self) -> bool {
        self.overview_active.get()
    }

    pub fn set_overview_active(&self, active: bool) {
        self.overview_active.set(active);
    }
}
