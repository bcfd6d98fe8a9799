//! Single-threaded signal emitter, the model for every host event source.
//!
//! Each host object (panel, layout manager, settings backend, widget actor)
//! carries one `SignalHub`. Handlers are registered under a signal name and
//! fired synchronously on `emit`. Sources that can disappear at runtime are
//! created destroy-capable; `emit_destroy` fires their `"destroy"` handlers
//! once, marks the source dead and drops every remaining slot.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, bail};

/// Handle returned by `connect`, used to disconnect later.
pub type SignalId = u64;

/// Identity of one signal source, unique for the process lifetime.
pub type SourceId = u64;

pub const DESTROY_SIGNAL: &str = "destroy";

static NEXT_SOURCE: AtomicU64 = AtomicU64::new(1);

struct Slot {
    id: SignalId,
    handler: Rc<dyn Fn()>,
}

pub struct SignalHub {
    source: SourceId,
    has_destroy: bool,
    destroyed: Cell<bool>,
    next_id: Cell<SignalId>,
    slots: RefCell<HashMap<String, Vec<Slot>>>,
}

impl SignalHub {
    /// A hub for a source that never goes away (e.g. the settings backend).
    pub fn new() -> Rc<Self> {
        Self::build(false)
    }

    /// A hub for a source that can be destroyed (widget actors, the panel).
    pub fn with_destroy() -> Rc<Self> {
        Self::build(true)
    }

    fn build(has_destroy: bool) -> Rc<Self> {
        Rc::new(Self {
            source: NEXT_SOURCE.fetch_add(1, Ordering::Relaxed),
            has_destroy,
            destroyed: Cell::new(false),
            next_id: Cell::new(1),
            slots: RefCell::new(HashMap::new()),
        })
    }

    pub fn source_id(&self) -> SourceId {
        self.source
    }

    pub fn has_destroy_signal(&self) -> bool {
        self.has_destroy
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn connect(&self, signal: &str, handler: impl Fn() + 'static) -> SignalId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.slots
            .borrow_mut()
            .entry(signal.to_string())
            .or_default()
            .push(Slot {
                id,
                handler: Rc::new(handler),
            });
        id
    }

    pub fn disconnect(&self, id: SignalId) -> Result<()> {
        if self.destroyed.get() {
            bail!("source {} already destroyed", self.source);
        }
        let mut slots = self.slots.borrow_mut();
        for handlers in slots.values_mut() {
            if let Some(index) = handlers.iter().position(|slot| slot.id == id) {
                handlers.remove(index);
                return Ok(());
            }
        }
        bail!("unknown handler id {} on source {}", id, self.source)
    }

    /// Fire every handler registered for `signal`. The handler list is
    /// snapshotted first so handlers may connect or disconnect during
    /// dispatch without affecting this emission.
    pub fn emit(&self, signal: &str) {
        if self.destroyed.get() {
            return;
        }
        let handlers: Vec<Rc<dyn Fn()>> = self
            .slots
            .borrow()
            .get(signal)
            .map(|slots| slots.iter().map(|slot| Rc::clone(&slot.handler)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler();
        }
    }

    /// Fire `"destroy"` handlers, then mark the source dead and drop every
    /// slot. Safe to call more than once.
    pub fn emit_destroy(&self) {
        if self.destroyed.get() {
            return;
        }
        self.emit(DESTROY_SIGNAL);
        self.destroyed.set(true);
        self.slots.borrow_mut().clear();
    }
}
