//! Rounded corners drawn at the edges of every monitor.
//!
//! Screen corners have no host-native equivalent and no theme node; every
//! visual property resolves straight from the preferences. The manager
//! rebuilds the full 4-per-monitor set whenever topology or preferences
//! change.

use std::cell::RefCell;
use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use tracing::debug;

use crate::connections::Connections;
use crate::draw::{Operator, Painter};
use crate::host::{Actor, ActorRef, CornerWidget, HostShell, Monitor};
use crate::settings::{KEYS, Settings, changed_signal};
use crate::signals::SignalHub;
use crate::style::{resolve_color, resolve_double, resolve_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl DisplayCorner {
    pub const ALL: [DisplayCorner; 4] = [
        DisplayCorner::TopLeft,
        DisplayCorner::TopRight,
        DisplayCorner::BottomLeft,
        DisplayCorner::BottomRight,
    ];
}

pub struct ScreenCorner {
    corner: DisplayCorner,
    monitor: Monitor,
    hub: Rc<SignalHub>,
    prefs: Rc<Settings>,
    host: Rc<HostShell>,
    size: (f64, f64),
    position: (f64, f64),
    opacity: f64,
}

impl ScreenCorner {
    pub fn new(
        corner: DisplayCorner,
        monitor: Monitor,
        prefs: Rc<Settings>,
        host: Rc<HostShell>,
    ) -> Rc<RefCell<Self>> {
        let widget = Rc::new(RefCell::new(Self {
            corner,
            monitor,
            hub: SignalHub::with_destroy(),
            prefs,
            host,
            size: (0.0, 0.0),
            position: (0.0, 0.0),
            opacity: 0.0,
        }));
        widget.borrow_mut().on_style_changed();
        widget
    }

    pub fn corner(&self) -> DisplayCorner {
        self.corner
    }

    pub fn monitor(&self) -> Monitor {
        self.monitor
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Radius-offset placement against the owning monitor's edges.
    fn update_allocation(&mut self, radius: f64) {
        let x = f64::from(self.monitor.x);
        let y = f64::from(self.monitor.y);
        let width = f64::from(self.monitor.width);
        let height = f64::from(self.monitor.height);

        self.position = match self.corner {
            DisplayCorner::TopLeft => (x, y),
            DisplayCorner::TopRight => (x + width - radius, y),
            DisplayCorner::BottomLeft => (x, y + height - radius),
            DisplayCorner::BottomRight => (x + width - radius, y + height - radius),
        };
    }
}

impl Actor for ScreenCorner {
    fn hub(&self) -> &Rc<SignalHub> {
        &self.hub
    }
}

impl CornerWidget for ScreenCorner {
    /// One quarter-disc, closed against the monitor edges rather than a
    /// sibling widget.
    fn repaint(&self, painter: &mut Painter) {
        let radius = resolve_length(None, "-screen-corner-radius", &self.prefs, &self.host.theme);
        let background_color =
            resolve_color(None, "-screen-corner-background-color", &self.prefs);

        painter.set_operator(Operator::Source);
        match self.corner {
            DisplayCorner::TopLeft => {
                painter.arc(radius, radius, radius, PI, 3.0 * FRAC_PI_2);
                painter.line_to(0.0, 0.0);
            }
            DisplayCorner::TopRight => {
                painter.arc(0.0, radius, radius, 3.0 * FRAC_PI_2, 2.0 * PI);
                painter.line_to(radius, 0.0);
            }
            DisplayCorner::BottomLeft => {
                painter.arc(radius, 0.0, radius, FRAC_PI_2, PI);
                painter.line_to(0.0, radius);
            }
            DisplayCorner::BottomRight => {
                painter.arc(0.0, 0.0, radius, 0.0, FRAC_PI_2);
                painter.line_to(radius, radius);
            }
        }
        painter.close_path();
        painter.fill(background_color);
    }

    fn on_style_changed(&mut self) {
        let radius = resolve_length(None, "-screen-corner-radius", &self.prefs, &self.host.theme);
        let opacity = resolve_double(None, "-screen-corner-opacity", &self.prefs);

        self.opacity = opacity;
        self.size = (radius, radius);
        self.update_allocation(radius);
    }
}

pub struct ScreenCorners {
    prefs: Rc<Settings>,
    host: Rc<HostShell>,
    connections: Connections,
    corners: Vec<Rc<RefCell<ScreenCorner>>>,
}

impl ScreenCorners {
    pub fn new(prefs: Rc<Settings>, host: Rc<HostShell>) -> Self {
        Self {
            prefs,
            host,
            connections: Connections::new(),
            corners: Vec::new(),
        }
    }

    /// Rebuild the full widget set from the current monitor topology:
    /// exactly four corners per monitor, inserted into the host's top
    /// chrome and kept visible over fullscreen windows.
    pub fn update(&mut self) {
        if self.prefs.debug.get() {
            debug!("updating screen corners");
        }

        self.remove();

        for monitor in self.host.layout.monitors() {
            for corner in DisplayCorner::ALL {
                let widget = ScreenCorner::new(
                    corner,
                    monitor,
                    Rc::clone(&self.prefs),
                    Rc::clone(&self.host),
                );

                let actor: ActorRef = widget.clone();
                self.host.layout.add_top_chrome(actor, true);

                // skip the re-entrant notification the color self-heal
                // produces for the widget currently being restyled
                for key in KEYS {
                    let weak = Rc::downgrade(&widget);
                    self.connections.connect(
                        self.prefs.backend().hub(),
                        &changed_signal(key.name),
                        move || {
                            if let Some(widget) = weak.upgrade()
                                && let Ok(mut widget) = widget.try_borrow_mut()
                            {
                                widget.on_style_changed();
                            }
                        },
                    );
                }

                self.corners.push(widget);
            }
        }

        if self.prefs.debug.get() {
            debug!(count = self.corners.len(), "screen corners updated");
        }
    }

    /// Full teardown: no preserved originals, every tracked widget dies.
    pub fn remove(&mut self) {
        self.connections.disconnect_all();
        for widget in self.corners.drain(..) {
            self.host.layout.remove_chrome(widget.borrow().source_id());
            widget.borrow().destroy();
        }
    }

    pub fn corners(&self) -> &[Rc<RefCell<ScreenCorner>>] {
        &self.corners
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
