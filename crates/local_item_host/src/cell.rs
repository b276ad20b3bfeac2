//! Shared subscribable cell owning the decoded value of one storage key.
//!
//! Every read, write and notification for a key goes through its [`ItemCell`]. Transitions
//! replace the held [`LocalValue`] wholesale and fan the new value out to subscribers in
//! registration order. Callbacks run with no internal borrow held, so they may read, write or
//! unsubscribe re-entrantly.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::{Rc, Weak},
};

use thiserror::Error;

use crate::{
    codec::{decode_raw, encode_value, EncodeError, SharedCodec},
    storage::{StorageBackend, StorageError},
    value::LocalValue,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Fault raised while persisting a cell transition.
///
/// A storage fault only reports lost durability; the in-memory value is updated regardless.
/// An encode fault means the value was rejected and the cell kept its previous value.
pub enum WriteError {
    /// The backend rejected the write or removal.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The codec could not encode the value.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Callback receiving the new value after every transition.
pub type Subscriber<V> = Rc<dyn Fn(&LocalValue<V>)>;

/// Side channel receiving `(key, fault)` for every failed persist.
pub type FaultSink = Rc<dyn Fn(&str, &WriteError)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Identifies one subscriber within a cell. Tokens increase in registration order.
pub struct SubscriberToken(u64);

struct CellState<V> {
    current: LocalValue<V>,
    version: u64,
    next_token: u64,
    subscribers: BTreeMap<SubscriberToken, Subscriber<V>>,
}

/// Shared owner of one storage key's decoded value and its subscribers.
pub struct ItemCell<V> {
    key: String,
    codec: SharedCodec<V>,
    backend: Rc<dyn StorageBackend>,
    fault_sink: Option<FaultSink>,
    state: RefCell<CellState<V>>,
}

impl<V: Clone + 'static> ItemCell<V> {
    /// Creates a cell and initializes it from the backend. No notification is sent.
    pub fn new(
        key: impl Into<String>,
        codec: SharedCodec<V>,
        backend: Rc<dyn StorageBackend>,
        fault_sink: Option<FaultSink>,
    ) -> Rc<Self> {
        let key = key.into();
        let current = decode_raw(codec.as_ref(), backend.read(&key));
        Rc::new(Self {
            key,
            codec,
            backend,
            fault_sink,
            state: RefCell::new(CellState {
                current,
                version: 0,
                next_token: 0,
                subscribers: BTreeMap::new(),
            }),
        })
    }

    /// Storage key owned by this cell.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the current value.
    pub fn read(&self) -> LocalValue<V> {
        self.state.borrow().current.clone()
    }

    /// Encodes and persists `value`, then sets the cell to `Valid(value)` and notifies.
    ///
    /// The cell updates even when the backend rejects the write. A value the codec refuses to
    /// encode leaves the cell untouched.
    ///
    /// # Errors
    ///
    /// Returns the encode or persist fault after it has also been passed to the fault sink.
    pub fn write(&self, value: V) -> Result<(), WriteError> {
        let raw = match encode_value(self.codec.as_ref(), &value) {
            Ok(raw) => raw,
            Err(err) => {
                let err = WriteError::from(err);
                self.report(&err);
                return Err(err);
            }
        };
        let persisted = self
            .backend
            .write(&self.key, &raw)
            .map_err(WriteError::from);
        self.transition(LocalValue::Valid(value), persisted)
    }

    /// Removes the stored entry, then sets the cell to `Absent` and notifies.
    ///
    /// # Errors
    ///
    /// Returns the backend fault after it has also been passed to the fault sink.
    pub fn remove(&self) -> Result<(), WriteError> {
        let persisted = self.backend.remove(&self.key).map_err(WriteError::from);
        self.transition(LocalValue::Absent, persisted)
    }

    /// Re-decodes content changed by another execution context and notifies.
    pub fn apply_external(&self, new_raw: Option<String>) {
        let next = decode_raw(self.codec.as_ref(), new_raw);
        self.replace_and_notify(next);
    }

    /// Re-reads the backend and notifies.
    pub fn reload(&self) {
        self.apply_external(self.backend.read(&self.key));
    }

    /// Registers `callback` and immediately delivers the current value to it.
    pub fn subscribe(
        self: &Rc<Self>,
        callback: impl Fn(&LocalValue<V>) + 'static,
    ) -> Subscription {
        let callback: Subscriber<V> = Rc::new(callback);
        let (token, current) = {
            let mut state = self.state.borrow_mut();
            state.next_token = state.next_token.saturating_add(1);
            let token = SubscriberToken(state.next_token);
            state.subscribers.insert(token, callback.clone());
            (token, state.current.clone())
        };
        callback(&current);

        let cell: Weak<ItemCell<V>> = Rc::downgrade(self);
        let cell: Weak<dyn SubscriberSet> = cell;
        Subscription {
            cell,
            token,
            active: Cell::new(true),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    fn transition(
        &self,
        next: LocalValue<V>,
        persisted: Result<(), WriteError>,
    ) -> Result<(), WriteError> {
        if let Err(err) = &persisted {
            self.report(err);
        }
        self.replace_and_notify(next);
        persisted
    }

    fn report(&self, err: &WriteError) {
        if let Some(sink) = &self.fault_sink {
            sink(&self.key, err);
        }
    }

    fn replace_and_notify(&self, next: LocalValue<V>) {
        let (version, tokens) = {
            let mut state = self.state.borrow_mut();
            state.current = next.clone();
            state.version = state.version.wrapping_add(1);
            let tokens: Vec<_> = state.subscribers.keys().copied().collect();
            (state.version, tokens)
        };

        for token in tokens {
            let callback = {
                let state = self.state.borrow();
                // A nested transition already reached every subscriber with a newer value.
                if state.version != version {
                    return;
                }
                match state.subscribers.get(&token) {
                    Some(callback) => callback.clone(),
                    None => continue,
                }
            };
            callback(&next);
        }
    }
}

trait SubscriberSet {
    fn remove_subscriber(&self, token: SubscriberToken);
}

impl<V> SubscriberSet for ItemCell<V> {
    fn remove_subscriber(&self, token: SubscriberToken) {
        // Dropped after the borrow ends; the callback may own other subscriptions.
        let removed = self.state.borrow_mut().subscribers.remove(&token);
        drop(removed);
    }
}

/// Drop-based subscription handle returned by [`ItemCell::subscribe`].
pub struct Subscription {
    cell: Weak<dyn SubscriberSet>,
    token: SubscriberToken,
    active: Cell<bool>,
}

impl Subscription {
    /// Stops further deliveries. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if self.active.replace(false) {
            if let Some(cell) = self.cell.upgrade() {
                cell.remove_subscriber(self.token);
            }
        }
    }

    /// Returns `true` until [`Subscription::unsubscribe`] runs.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Token identifying this subscriber within its cell.
    pub fn token(&self) -> SubscriberToken {
        self.token
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<V> std::fmt::Debug for ItemCell<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self
            .state
            .try_borrow()
            .map(|state| state.subscribers.len())
            .ok();
        f.debug_struct("ItemCell")
            .field("key", &self.key)
            .field("subscribers", &subscribers)
            .finish()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .field("active", &self.active.get())
            .finish()
    }
}
