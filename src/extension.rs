//! Top-level enable/disable/update orchestration.
//!
//! The host hands over its collaborators once and then drives this through
//! `enable` and `disable`, exactly once each per activation cycle. Corner
//! construction waits for the host to finish starting up; topology changes
//! and the two per-category preference toggles rebuild whatever is affected
//! at runtime. Nothing here raises back to the host.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::connections::Connections;
use crate::host::HostShell;
use crate::panel_corner::PanelCorners;
use crate::screen_corner::ScreenCorners;
use crate::settings::{Settings, SettingsBackend, changed_signal};

pub struct Extension {
    host: Rc<HostShell>,
    backend: Rc<SettingsBackend>,
    prefs: Option<Rc<Settings>>,
    connections: Option<Connections>,
    panel_corners: Option<PanelCorners>,
    screen_corners: Option<ScreenCorners>,
}

impl Extension {
    pub fn new(host: Rc<HostShell>, backend: Rc<SettingsBackend>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            host,
            backend,
            prefs: None,
            connections: None,
            panel_corners: None,
            screen_corners: None,
        }))
    }

    /// Build the preference layer, watch host topology, and defer corner
    /// construction until the host finished starting up.
    pub fn enable(this: &Rc<RefCell<Self>>) {
        info!("starting up");

        let (host, backend) = {
            let ext = this.borrow();
            (Rc::clone(&ext.host), Rc::clone(&ext.backend))
        };

        let prefs = Settings::new(backend);
        let connections = Connections::new();

        for signal in ["monitors-changed", "workareas-changed"] {
            let weak = Rc::downgrade(this);
            connections.connect(host.layout.hub(), signal, move || {
                if let Some(ext) = weak.upgrade() {
                    Extension::update(&ext);
                }
            });
        }

        let starting_up = host.layout.is_starting_up();
        if starting_up {
            let weak = Rc::downgrade(this);
            connections.connect(host.layout.hub(), "startup-complete", move || {
                if let Some(ext) = weak.upgrade() {
                    Extension::load(&ext);
                }
            });
        }

        {
            let mut ext = this.borrow_mut();
            ext.prefs = Some(prefs);
            ext.connections = Some(connections);
        }

        if !starting_up {
            Extension::load(this);
        }
    }

    /// First construction of the managers, plus the runtime toggles that
    /// tear down or rebuild a single category.
    fn load(this: &Rc<RefCell<Self>>) {
        let Some(prefs) = this.borrow().prefs.clone() else {
            return;
        };
        let host = Rc::clone(&this.borrow().host);

        {
            let mut ext = this.borrow_mut();
            if prefs.panel_corners.get() {
                ext.panel_corners = Some(PanelCorners::new(Rc::clone(&prefs), Rc::clone(&host)));
            }
            if prefs.screen_corners.get() {
                ext.screen_corners = Some(ScreenCorners::new(Rc::clone(&prefs), Rc::clone(&host)));
            }
        }

        {
            let ext = this.borrow();
            if let Some(connections) = &ext.connections {
                for toggle in ["panel-corners", "screen-corners"] {
                    let weak = Rc::downgrade(this);
                    connections.connect(
                        prefs.backend().hub(),
                        &changed_signal(toggle),
                        move || {
                            if let Some(ext) = weak.upgrade() {
                                Extension::sync_managers(&ext);
                            }
                        },
                    );
                }
            }
        }

        Extension::update(this);
    }

    /// React to a flipped category toggle: build and fill the missing
    /// manager, or tear down the disabled one, leaving the other untouched.
    fn sync_managers(this: &Rc<RefCell<Self>>) {
        let Some(prefs) = this.borrow().prefs.clone() else {
            return;
        };
        let host = Rc::clone(&this.borrow().host);
        let mut ext = this.borrow_mut();

        match (prefs.panel_corners.get(), ext.panel_corners.is_some()) {
            (true, false) => {
                let mut manager = PanelCorners::new(Rc::clone(&prefs), Rc::clone(&host));
                manager.update();
                ext.panel_corners = Some(manager);
            }
            (false, true) => {
                if let Some(mut manager) = ext.panel_corners.take() {
                    manager.remove();
                }
            }
            _ => {}
        }

        match (prefs.screen_corners.get(), ext.screen_corners.is_some()) {
            (true, false) => {
                let mut manager = ScreenCorners::new(Rc::clone(&prefs), Rc::clone(&host));
                manager.update();
                ext.screen_corners = Some(manager);
            }
            (false, true) => {
                if let Some(mut manager) = ext.screen_corners.take() {
                    manager.remove();
                }
            }
            _ => {}
        }
    }

    /// Delegate to whichever managers currently exist.
    pub fn update(this: &Rc<RefCell<Self>>) {
        let mut ext = this.borrow_mut();
        if let Some(manager) = ext.panel_corners.as_mut() {
            manager.update();
        }
        if let Some(manager) = ext.screen_corners.as_mut() {
            manager.update();
        }
    }

    /// Tear everything down. Manager teardown runs before the controller
    /// ledger and the settings listeners are cleared, since it uses both.
    pub fn disable(this: &Rc<RefCell<Self>>) {
        info!("shutting down");

        let mut ext = this.borrow_mut();
        if let Some(mut manager) = ext.panel_corners.take() {
            manager.remove();
        }
        if let Some(mut manager) = ext.screen_corners.take() {
            manager.remove();
        }
        if let Some(connections) = ext.connections.take() {
            connections.disconnect_all();
        }
        if let Some(prefs) = ext.prefs.take() {
            prefs.disconnect_all_settings();
        }
    }

    pub fn panel_corners(&self) -> Option<&PanelCorners> {
        self.panel_corners.as_ref()
    }

    pub fn screen_corners(&self) -> Option<&ScreenCorners> {
        self.screen_corners.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.prefs.is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.as_ref().map_or(0, Connections::len)
    }
}
