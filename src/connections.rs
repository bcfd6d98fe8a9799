//! Bookkeeping for every signal handler the extension registers, so that
//! teardown can be done in bulk without dangling handles.
//!
//! Each manager and the lifecycle controller own one `Connections`. A row is
//! stored per `connect`; sources that support a destroy notification get a
//! destroy watcher which drops every row for that source when it fires, so a
//! widget destroyed by the host never leaves stale rows behind.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::signals::{DESTROY_SIGNAL, SignalHub, SignalId, SourceId};

struct Row {
    hub: Weak<SignalHub>,
    source: SourceId,
    signal: String,
    handler: SignalId,
    destroy_watch: Option<SignalId>,
}

pub struct Connections {
    rows: Rc<RefCell<Vec<Row>>>,
}

impl Default for Connections {
    fn default() -> Self {
        Self::new()
    }
}

impl Connections {
    pub fn new() -> Self {
        Self {
            rows: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register `handler` for `signal` on `hub` and track the subscription.
    pub fn connect(&self, hub: &Rc<SignalHub>, signal: &str, handler: impl Fn() + 'static) {
        let id = hub.connect(signal, handler);

        // Destroy-capable sources clean their own rows up when they go away.
        let destroy_watch = if hub.has_destroy_signal() {
            let rows = Rc::downgrade(&self.rows);
            let source = hub.source_id();
            Some(hub.connect(DESTROY_SIGNAL, move || {
                if let Some(rows) = rows.upgrade() {
                    rows.borrow_mut().retain(|row: &Row| row.source != source);
                }
            }))
        } else {
            None
        };

        self.rows.borrow_mut().push(Row {
            hub: Rc::downgrade(hub),
            source: hub.source_id(),
            signal: signal.to_string(),
            handler: id,
            destroy_watch,
        });
    }

    /// Remove every row whose source matches `hub`. A failing disconnect on
    /// an already-gone source is logged and skipped, never raised.
    pub fn disconnect_all_for(&self, hub: &SignalHub) {
        let source = hub.source_id();
        let removed: Vec<Row> = {
            let mut rows = self.rows.borrow_mut();
            let mut kept = Vec::with_capacity(rows.len());
            let mut taken = Vec::new();
            for row in rows.drain(..) {
                if row.source == source {
                    taken.push(row);
                } else {
                    kept.push(row);
                }
            }
            *rows = kept;
            taken
        };
        for row in removed {
            Self::disconnect_row(&row);
        }
    }

    /// Remove every row. Afterwards the ledger is empty and no handler
    /// registered through it fires again.
    pub fn disconnect_all(&self) {
        let removed: Vec<Row> = self.rows.borrow_mut().drain(..).collect();
        for row in removed {
            Self::disconnect_row(&row);
        }
    }

    fn disconnect_row(row: &Row) {
        let Some(hub) = row.hub.upgrade() else {
            warn!(
                source = row.source,
                signal = %row.signal,
                "signal source already dropped, skipping disconnect"
            );
            return;
        };
        if let Err(e) = hub.disconnect(row.handler) {
            warn!(
                source = row.source,
                signal = %row.signal,
                error = %e,
                "error removing connection, continuing"
            );
        }
        if let Some(watch) = row.destroy_watch
            && let Err(e) = hub.disconnect(watch)
        {
            warn!(
                source = row.source,
                error = %e,
                "error removing destroy watch, continuing"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_connect_tracks_rows_and_fires() {
        let conns = Connections::new();
        let hub = SignalHub::new();
        let hits = Rc::new(Cell::new(0));

        let hits_clone = Rc::clone(&hits);
        conns.connect(&hub, "changed::debug", move || {
            hits_clone.set(hits_clone.get() + 1)
        });
        assert_eq!(conns.len(), 1);

        hub.emit("changed::debug");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_disconnect_all_leaves_nothing_firing() {
        let conns = Connections::new();
        let hub = SignalHub::new();
        let hits = Rc::new(Cell::new(0));

        for signal in ["changed::panel-corner-radius", "changed::debug"] {
            let hits_clone = Rc::clone(&hits);
            conns.connect(&hub, signal, move || hits_clone.set(hits_clone.get() + 1));
        }

        conns.disconnect_all();
        assert_eq!(conns.len(), 0);

        hub.emit("changed::panel-corner-radius");
        hub.emit("changed::debug");
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_disconnect_all_for_only_touches_one_source() {
        let conns = Connections::new();
        let a = SignalHub::new();
        let b = SignalHub::new();
        let hits = Rc::new(Cell::new(0));

        let hits_a = Rc::clone(&hits);
        conns.connect(&a, "notify::size", move || hits_a.set(hits_a.get() + 1));
        let hits_b = Rc::clone(&hits);
        conns.connect(&b, "notify::size", move || hits_b.set(hits_b.get() + 1));

        conns.disconnect_all_for(&a);
        assert_eq!(conns.len(), 1);

        a.emit("notify::size");
        b.emit("notify::size");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_source_destroy_auto_removes_rows() {
        let conns = Connections::new();
        let hub = SignalHub::with_destroy();

        conns.connect(&hub, "notify::style", || {});
        conns.connect(&hub, "notify::position", || {});
        assert_eq!(conns.len(), 2);

        hub.emit_destroy();
        assert_eq!(conns.len(), 0);
    }

    #[test]
    fn test_disconnect_after_destroy_is_tolerated() {
        let conns = Connections::new();
        // no destroy signal on this source, so the ledger gets no warning
        // when it dies and must swallow the failing disconnect
        let hub = SignalHub::new();
        conns.connect(&hub, "notify::style", || {});

        hub.emit_destroy();
        conns.disconnect_all();
        assert_eq!(conns.len(), 0);
    }

    #[test]
    fn test_double_disconnect_all_is_idempotent() {
        let conns = Connections::new();
        let hub = SignalHub::new();
        conns.connect(&hub, "changed::debug", || {});

        conns.disconnect_all();
        conns.disconnect_all();
        assert!(conns.is_empty());
    }

    #[test]
    fn test_dropped_source_is_skipped() {
        let conns = Connections::new();
        {
            let hub = SignalHub::new();
            conns.connect(&hub, "changed::debug", || {});
        }
        // hub dropped entirely; teardown logs and continues
        conns.disconnect_all();
        assert!(conns.is_empty());
    }
}
