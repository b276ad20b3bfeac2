//! Per-key cell registry bound to one storage backend.

use std::{any::Any, cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    cell::{FaultSink, ItemCell},
    keys::{ItemKey, RegistryError},
    storage::{ExternalChange, StorageBackend, PROBE_KEY},
};

trait LiveCell {
    fn apply_external(&self, new_raw: Option<String>);
    fn reload(&self);
}

impl<V: Clone + 'static> LiveCell for ItemCell<V> {
    fn apply_external(&self, new_raw: Option<String>) {
        ItemCell::apply_external(self, new_raw);
    }

    fn reload(&self) {
        ItemCell::reload(self);
    }
}

#[derive(Clone)]
struct CellEntry {
    live: Rc<dyn LiveCell>,
    typed: Rc<dyn Any>,
}

struct RegistryInner {
    backend: Rc<dyn StorageBackend>,
    fault_sink: Option<FaultSink>,
    cells: RefCell<HashMap<String, CellEntry>>,
}

impl RegistryInner {
    fn dispatch_external(&self, change: &ExternalChange) {
        match &change.key {
            Some(key) => {
                let live = self.cells.borrow().get(key).map(|entry| entry.live.clone());
                if let Some(live) = live {
                    live.apply_external(change.new_raw.clone());
                }
            }
            None => {
                let live: Vec<_> = self
                    .cells
                    .borrow()
                    .values()
                    .map(|entry| entry.live.clone())
                    .collect();
                for cell in live {
                    cell.reload();
                }
            }
        }
    }
}

/// Lazily created [`ItemCell`] per storage key, sharing one backend.
///
/// Cells live as long as the registry. External changes are routed to the matching live cell;
/// changes to keys nobody has accessed are ignored.
#[derive(Clone)]
pub struct ItemRegistry {
    inner: Rc<RegistryInner>,
}

impl ItemRegistry {
    /// Creates a registry over `backend` without a fault sink.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self::build(Rc::new(backend), None)
    }

    /// Creates a registry over `backend` that reports persist faults to `sink`.
    pub fn with_fault_sink(backend: impl StorageBackend + 'static, sink: FaultSink) -> Self {
        Self::build(Rc::new(backend), Some(sink))
    }

    fn build(backend: Rc<dyn StorageBackend>, fault_sink: Option<FaultSink>) -> Self {
        let inner = Rc::new(RegistryInner {
            backend,
            fault_sink,
            cells: RefCell::new(HashMap::new()),
        });
        let weak = Rc::downgrade(&inner);
        inner
            .backend
            .on_external_change(Rc::new(move |change: &ExternalChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.dispatch_external(change);
                }
            }));
        Self { inner }
    }

    /// Returns the cell for `key`, creating and initializing it on first access.
    ///
    /// The codec of the first access stays bound to the cell.
    ///
    /// # Errors
    ///
    /// Returns an error for the reserved probe key, or when the key already has a cell of a
    /// different value type.
    pub fn cell<V: Clone + 'static>(
        &self,
        key: &ItemKey<V>,
    ) -> Result<Rc<ItemCell<V>>, RegistryError> {
        let name = key.name();
        if name == PROBE_KEY {
            return Err(RegistryError::ReservedKey(name.to_string()));
        }

        let existing = self.inner.cells.borrow().get(name).cloned();
        if let Some(entry) = existing {
            return entry
                .typed
                .downcast::<ItemCell<V>>()
                .map_err(|_| RegistryError::TypeMismatch {
                    key: name.to_string(),
                });
        }

        let cell = ItemCell::new(
            name,
            key.codec(),
            self.inner.backend.clone(),
            self.inner.fault_sink.clone(),
        );
        self.inner.cells.borrow_mut().insert(
            name.to_string(),
            CellEntry {
                live: cell.clone(),
                typed: cell.clone(),
            },
        );
        Ok(cell)
    }

    /// Returns `true` when a cell exists for `name`.
    pub fn has_cell(&self, name: &str) -> bool {
        self.inner.cells.borrow().contains_key(name)
    }

    /// Names of keys with a live cell, sorted.
    pub fn live_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.inner.cells.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Backend shared by every cell.
    pub fn backend(&self) -> Rc<dyn StorageBackend> {
        self.inner.backend.clone()
    }

    /// Routes an external change to the matching live cell.
    ///
    /// Backends call this through the listener registered at construction; it is public for
    /// hosts that receive change signals from elsewhere.
    pub fn apply_external_change(&self, change: &ExternalChange) {
        self.inner.dispatch_external(change);
    }
}

impl std::fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRegistry")
            .field("live_keys", &self.live_keys())
            .finish()
    }
}
