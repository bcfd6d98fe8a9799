//! The two rounded corners drawn at the bottom edge of the panel.
//!
//! `PanelCorners` owns their lifecycle: it detaches any host-native corners
//! it finds in the panel slots on the first update (restoring them on
//! remove), installs one widget per side, keeps each widget's style bound to
//! the panel's, and resubscribes the style recompute to every preference key
//! through its own subscription ledger.

use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use tracing::debug;

use crate::animation::{Easing, Fade};
use crate::connections::Connections;
use crate::draw::{Operator, Painter};
use crate::host::{Actor, ActorRef, CornerWidget, HostShell};
use crate::settings::{KEYS, Settings, changed_signal};
use crate::signals::SignalHub;
use crate::style::{resolve_color, resolve_double, resolve_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

pub struct PanelCorner {
    side: Side,
    hub: Rc<SignalHub>,
    prefs: Rc<Settings>,
    host: Rc<HostShell>,
    style: String,
    size: (f64, f64),
    position: (f64, f64),
    translation_y: f64,
    opacity: f64,
    fade: Option<Fade>,
}

impl PanelCorner {
    pub fn new(side: Side, prefs: Rc<Settings>, host: Rc<HostShell>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            side,
            hub: SignalHub::with_destroy(),
            prefs,
            host,
            style: String::new(),
            size: (0.0, 0.0),
            position: (0.0, 0.0),
            translation_y: 0.0,
            opacity: 0.0,
            fade: None,
        }))
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// One-way binding target for the panel's style property.
    pub fn set_style(&mut self, style: String) {
        self.style = style;
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn translation_y(&self) -> f64 {
        self.translation_y
    }

    /// Opacity as of the last clock tick.
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Target of the in-flight fade, or the settled opacity.
    pub fn opacity_target(&self) -> f64 {
        self.fade.as_ref().map_or(self.opacity, Fade::target)
    }

    /// Advance the opacity fade by `dt_ms` of host clock.
    pub fn tick(&mut self, dt_ms: f64) {
        if let Some(fade) = &mut self.fade {
            self.opacity = fade.advance(dt_ms);
            if fade.is_done() {
                self.fade = None;
            }
        }
    }

    /// Pin the corner under the panel edge; the left corner hangs off the
    /// panel's bottom-left, the right corner off the bottom-right.
    pub fn update_allocation(&mut self) {
        let node = self.host.panel.theme_node();
        let radius = resolve_length(
            node.as_ref(),
            "-panel-corner-radius",
            &self.prefs,
            &self.host.theme,
        );
        let (px, py) = self.host.panel.position();
        let (pw, ph) = self.host.panel.size();
        let x = match self.side {
            Side::Left => f64::from(px),
            Side::Right => f64::from(px + pw) - radius,
        };
        self.position = (x, f64::from(py + ph));
    }
}

impl Actor for PanelCorner {
    fn hub(&self) -> &Rc<SignalHub> {
        &self.hub
    }
}

impl CornerWidget for PanelCorner {
    /// Quarter-disc of the resolved radius plus the straight edge that
    /// closes the corner's bounding box; left and right mirror the arc.
    fn repaint(&self, painter: &mut Painter) {
        let node = self.host.panel.theme_node();
        let radius = resolve_length(
            node.as_ref(),
            "-panel-corner-radius",
            &self.prefs,
            &self.host.theme,
        );
        let border_width = resolve_length(
            node.as_ref(),
            "-panel-corner-border-width",
            &self.prefs,
            &self.host.theme,
        );
        let background_color =
            resolve_color(node.as_ref(), "-panel-corner-background-color", &self.prefs);

        painter.set_operator(Operator::Source);
        painter.move_to(0.0, 0.0);
        match self.side {
            Side::Left => painter.arc(
                radius,
                border_width + radius,
                radius,
                PI,
                3.0 * PI / 2.0,
            ),
            Side::Right => painter.arc(
                0.0,
                border_width + radius,
                radius,
                3.0 * PI / 2.0,
                2.0 * PI,
            ),
        }
        painter.line_to(radius, 0.0);
        painter.close_path();
        painter.fill(background_color);
    }

    fn on_style_changed(&mut self) {
        let node = self.host.panel.theme_node();
        let radius = resolve_length(
            node.as_ref(),
            "-panel-corner-radius",
            &self.prefs,
            &self.host.theme,
        );
        let border_width = resolve_length(
            node.as_ref(),
            "-panel-corner-border-width",
            &self.prefs,
            &self.host.theme,
        );
        let opacity = resolve_double(node.as_ref(), "-panel-corner-opacity", &self.prefs);
        let duration = node
            .as_ref()
            .map_or(0.0, |n| n.transition_duration_ms())
            / self.host.theme.slow_down_factor();

        self.size = (radius, border_width + radius);
        self.translation_y = -border_width;
        self.update_allocation();

        // in the overview the corner must vanish entirely when the user
        // forces extension values
        let target = if self.prefs.force_extension_values.get() && self.host.overview_active() {
            0.0
        } else {
            opacity
        };

        if self.prefs.debug.get() {
            debug!(
                side = ?self.side,
                radius,
                border_width,
                target,
                "panel corner restyled"
            );
        }

        // replaces any fade already in flight
        self.fade = Some(Fade::new(self.opacity, target, duration, Easing::EaseInOutQuad));
    }
}

/// Stashed host-native corners, captured once before the first install.
struct OriginalCorners {
    left: Option<ActorRef>,
    right: Option<ActorRef>,
}

pub struct PanelCorners {
    prefs: Rc<Settings>,
    host: Rc<HostShell>,
    connections: Connections,
    left: Option<Rc<RefCell<PanelCorner>>>,
    right: Option<Rc<RefCell<PanelCorner>>>,
    original: Option<OriginalCorners>,
}

impl PanelCorners {
    pub fn new(prefs: Rc<Settings>, host: Rc<HostShell>) -> Self {
        Self {
            prefs,
            host,
            connections: Connections::new(),
            left: None,
            right: None,
            original: None,
        }
    }

    /// Tear down any existing pair and build a fresh one. Idempotent.
    pub fn update(&mut self) {
        if self.prefs.debug.get() {
            debug!("updating panel corners");
        }

        self.teardown_widgets();

        // corners shipped by the host itself are detached, never destroyed,
        // and go back in on remove()
        if self.original.is_none() {
            self.original = Some(OriginalCorners {
                left: self.host.panel.take_left_corner(),
                right: self.host.panel.take_right_corner(),
            });
        }

        self.left = Some(self.build(Side::Left));
        self.right = Some(self.build(Side::Right));
    }

    fn build(&self, side: Side) -> Rc<RefCell<PanelCorner>> {
        let corner = PanelCorner::new(side, Rc::clone(&self.prefs), Rc::clone(&self.host));
        let panel = Rc::clone(&self.host.panel);

        // style binding, synchronized at creation and on every panel change
        corner.borrow_mut().set_style(panel.style());
        {
            let weak = Rc::downgrade(&corner);
            let panel_for_style = Rc::clone(&panel);
            self.connections
                .connect(panel.hub(), "notify::style", move || {
                    if let Some(corner) = weak.upgrade() {
                        corner.borrow_mut().set_style(panel_for_style.style());
                    }
                });
        }

        // insert into the panel's corner slot
        let actor: ActorRef = corner.clone();
        match side {
            Side::Left => panel.set_left_corner(Some(actor)),
            Side::Right => panel.set_right_corner(Some(actor)),
        }

        corner.borrow_mut().on_style_changed();

        // follow the panel around the screen
        for signal in ["notify::position", "notify::size"] {
            let weak = Rc::downgrade(&corner);
            self.connections.connect(panel.hub(), signal, move || {
                if let Some(corner) = weak.upgrade() {
                    corner.borrow_mut().update_allocation();
                }
            });
        }

        // any preference change recomputes the style from scratch; the
        // color self-heal writes back into the store mid-recompute, so a
        // re-entrant notification for the widget being restyled is skipped
        for key in KEYS {
            let weak = Rc::downgrade(&corner);
            self.connections.connect(
                self.prefs.backend().hub(),
                &changed_signal(key.name),
                move || {
                    if let Some(corner) = weak.upgrade()
                        && let Ok(mut corner) = corner.try_borrow_mut()
                    {
                        corner.on_style_changed();
                    }
                },
            );
        }

        corner
    }

    /// Full teardown: our widgets go away and the host's own corners are
    /// put back where they were found.
    pub fn remove(&mut self) {
        self.teardown_widgets();
        if let Some(original) = self.original.take() {
            self.host.panel.set_left_corner(original.left);
            self.host.panel.set_right_corner(original.right);
        }
        if self.prefs.debug.get() {
            debug!("panel corners removed");
        }
    }

    fn teardown_widgets(&mut self) {
        self.connections.disconnect_all();
        for (corner, slot) in [
            (self.left.take(), Side::Left),
            (self.right.take(), Side::Right),
        ] {
            let Some(corner) = corner else { continue };
            let ours = corner.borrow().source_id();
            let panel = &self.host.panel;
            let occupant = match slot {
                Side::Left => panel.left_corner(),
                Side::Right => panel.right_corner(),
            };
            if occupant.is_some_and(|actor| actor.borrow().source_id() == ours) {
                match slot {
                    Side::Left => panel.set_left_corner(None),
                    Side::Right => panel.set_right_corner(None),
                }
            }
            corner.borrow().destroy();
        }
    }

    pub fn corners(&self) -> Vec<Rc<RefCell<PanelCorner>>> {
        [&self.left, &self.right]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::draw::PathOp;
    use crate::host::Monitor;
    use crate::settings::SettingsBackend;
    use crate::theme::ThemeNode;

    fn setup() -> (Rc<Settings>, Rc<HostShell>) {
        let prefs = Settings::new(SettingsBackend::in_memory());
        let host = HostShell::new(vec![Monitor::new(0, 0, 1920, 1080)]);
        (prefs, host)
    }

    #[test]
    fn test_update_installs_both_corners() {
        let (prefs, host) = setup();
        let mut corners = PanelCorners::new(prefs, Rc::clone(&host));

        corners.update();
        assert_eq!(corners.corners().len(), 2);
        assert!(host.panel.left_corner().is_some());
        assert!(host.panel.right_corner().is_some());
    }

    #[test]
    fn test_update_twice_does_not_leak() {
        let (prefs, host) = setup();
        let mut corners = PanelCorners::new(prefs, host);

        corners.update();
        let first_connections = corners.connection_count();
        corners.update();
        assert_eq!(corners.corners().len(), 2);
        assert_eq!(corners.connection_count(), first_connections);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (prefs, host) = setup();
        let mut corners = PanelCorners::new(prefs, Rc::clone(&host));

        corners.update();
        corners.remove();
        assert_eq!(corners.corners().len(), 0);
        assert_eq!(corners.connection_count(), 0);
        assert!(host.panel.left_corner().is_none());

        corners.remove();
        assert_eq!(corners.corners().len(), 0);
    }

    #[test]
    fn test_geometry_from_preferences() {
        let (prefs, host) = setup();
        prefs.force_extension_values.set(true);
        prefs.panel_corner_radius.set(16);
        prefs.panel_corner_border_width.set(2);

        let mut corners = PanelCorners::new(prefs, host);
        corners.update();

        for corner in corners.corners() {
            let corner = corner.borrow();
            assert_eq!(corner.size(), (16.0, 18.0));
            assert_eq!(corner.translation_y(), -2.0);
        }
    }

    #[test]
    fn test_preference_change_restyles_live_widgets() {
        let (prefs, host) = setup();
        prefs.force_extension_values.set(true);
        prefs.panel_corner_radius.set(10);

        let mut corners = PanelCorners::new(Rc::clone(&prefs), host);
        corners.update();

        prefs.panel_corner_radius.set(24);
        for corner in corners.corners() {
            assert_eq!(corner.borrow().size().0, 24.0);
        }
    }

    #[test]
    fn test_style_binding_tracks_panel() {
        let (prefs, host) = setup();
        host.panel.set_style("color: red;");

        let mut corners = PanelCorners::new(prefs, Rc::clone(&host));
        corners.update();

        // synchronized at creation
        for corner in corners.corners() {
            assert_eq!(corner.borrow().style(), "color: red;");
        }

        // and on later changes
        host.panel.set_style("color: blue;");
        for corner in corners.corners() {
            assert_eq!(corner.borrow().style(), "color: blue;");
        }
    }

    #[test]
    fn test_allocation_follows_panel() {
        let (prefs, host) = setup();
        prefs.force_extension_values.set(true);
        prefs.panel_corner_radius.set(10);
        host.panel.set_position(0, 0);
        host.panel.set_size(1920, 32);

        let mut corners = PanelCorners::new(prefs, Rc::clone(&host));
        corners.update();

        let positions: Vec<_> = corners
            .corners()
            .iter()
            .map(|c| (c.borrow().side(), c.borrow().position()))
            .collect();
        assert!(positions.contains(&(Side::Left, (0.0, 32.0))));
        assert!(positions.contains(&(Side::Right, (1910.0, 32.0))));

        host.panel.set_position(0, 8);
        for corner in corners.corners() {
            assert_eq!(corner.borrow().position().1, 40.0);
        }
    }

    #[test]
    fn test_repaint_mirrors_sides() {
        let (prefs, host) = setup();
        prefs.force_extension_values.set(true);
        prefs.panel_corner_radius.set(8);
        prefs.panel_corner_border_width.set(0);
        prefs
            .panel_corner_background_color
            .set("#123456ff".to_string());

        let mut corners = PanelCorners::new(prefs, host);
        corners.update();

        for corner in corners.corners() {
            let corner = corner.borrow();
            let mut painter = Painter::new();
            corner.repaint(&mut painter);

            assert_eq!(painter.ops()[0], PathOp::SetOperator(Operator::Source));
            assert_eq!(
                painter.fill_color(),
                Some(Rgba::new(0x12, 0x34, 0x56, 0xff))
            );
            let arc = painter.arcs().next().unwrap();
            match (corner.side(), arc) {
                (
                    Side::Left,
                    PathOp::Arc {
                        cx,
                        start_angle,
                        end_angle,
                        ..
                    },
                ) => {
                    assert_eq!(*cx, 8.0);
                    assert_eq!(*start_angle, PI);
                    assert_eq!(*end_angle, 3.0 * PI / 2.0);
                }
                (
                    Side::Right,
                    PathOp::Arc {
                        cx,
                        start_angle,
                        end_angle,
                        ..
                    },
                ) => {
                    assert_eq!(*cx, 0.0);
                    assert_eq!(*start_angle, 3.0 * PI / 2.0);
                    assert_eq!(*end_angle, 2.0 * PI);
                }
                _ => panic!("unexpected arc"),
            }
        }
    }

    #[test]
    fn test_theme_node_wins_without_force() {
        let (prefs, host) = setup();
        prefs.panel_corner_radius.set(10);
        host.panel.set_theme_node(Some(
            ThemeNode::new()
                .with_length("-panel-corner-radius", 6.0)
                .with_length("-panel-corner-border-width", 1.0),
        ));

        let mut corners = PanelCorners::new(prefs, host);
        corners.update();

        for corner in corners.corners() {
            assert_eq!(corner.borrow().size(), (6.0, 7.0));
        }
    }

    #[test]
    fn test_overview_forces_transparent_under_override() {
        let (prefs, host) = setup();
        prefs.force_extension_values.set(true);
        prefs.panel_corner_opacity.set(0.9);
        host.set_overview_active(true);

        let mut corners = PanelCorners::new(prefs, host);
        corners.update();

        for corner in corners.corners() {
            assert_eq!(corner.borrow().opacity_target(), 0.0);
        }
    }

    #[test]
    fn test_opacity_fade_eases_to_target() {
        let (prefs, host) = setup();
        prefs.force_extension_values.set(true);
        prefs.panel_corner_opacity.set(1.0);
        host.panel.set_theme_node(Some(
            ThemeNode::new().with_transition_duration(100.0),
        ));

        let mut corners = PanelCorners::new(prefs, host);
        corners.update();

        let corner = corners.corners().remove(0);
        // theme node present without force would win lookups, but the node
        // has no opacity value so the preference applies
        assert_eq!(corner.borrow().opacity_target(), 1.0);

        corner.borrow_mut().tick(50.0);
        let halfway = corner.borrow().opacity();
        assert!(halfway > 0.0 && halfway < 1.0);

        corner.borrow_mut().tick(50.0);
        assert_eq!(corner.borrow().opacity(), 1.0);
    }

    #[test]
    fn test_native_corners_preserved_and_restored() {
        use crate::host::NativeCorner;

        let (prefs, host) = setup();
        let native_left = NativeCorner::new();
        let native_right = NativeCorner::new();
        let left_id = native_left.borrow().source_id();
        host.panel.set_left_corner(Some(native_left.clone()));
        host.panel.set_right_corner(Some(native_right.clone()));

        let mut corners = PanelCorners::new(prefs, Rc::clone(&host));
        corners.update();

        // ours are installed, natives detached but alive
        assert_ne!(
            host.panel.left_corner().unwrap().borrow().source_id(),
            left_id
        );
        assert!(!native_left.borrow().is_destroyed());

        corners.remove();

        // natives are back and were never destroyed
        assert_eq!(
            host.panel.left_corner().unwrap().borrow().source_id(),
            left_id
        );
        assert!(!native_left.borrow().is_destroyed());
        assert!(!native_right.borrow().is_destroyed());
    }
}
