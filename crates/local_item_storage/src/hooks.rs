//! Leptos bindings that subscribe a component to an [`ItemCell`].
//!
//! Each hook call creates a component-local signal, subscribes it to the key's shared cell and
//! unsubscribes when the owning reactive scope is cleaned up. All hook instances for one key
//! share the same cell, so a write from any of them reaches every other instance.

use std::rc::Rc;

use leptos::*;
use local_item_host::{
    Defaulted, ItemCell, ItemKey, ItemRegistry, LocalValue, MemoryStorage, Subscription,
    WriteError,
};

use crate::host_adapters::item_registry;

/// Writer bound to one key's shared cell.
pub struct LocalItemWriter<V> {
    cell: Rc<ItemCell<V>>,
}

impl<V> Clone for LocalItemWriter<V> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<V: Clone + 'static> LocalItemWriter<V> {
    /// Stores `value` and notifies every subscriber of the key.
    ///
    /// The in-memory value updates even when persisting fails. A value the key's codec
    /// refuses is not stored and leaves the current value in place.
    ///
    /// # Errors
    ///
    /// Returns the encode or persist fault, which has also been logged.
    pub fn set(&self, value: V) -> Result<(), WriteError> {
        self.cell.write(value)
    }

    /// Removes the stored entry and notifies every subscriber of the key.
    ///
    /// # Errors
    ///
    /// Returns the backend fault, which has also been logged.
    pub fn remove(&self) -> Result<(), WriteError> {
        self.cell.remove()
    }

    /// Current value without tracking.
    pub fn current(&self) -> LocalValue<V> {
        self.cell.read()
    }

    /// Storage key this writer targets.
    pub fn key(&self) -> &str {
        self.cell.key()
    }
}

/// Reader/writer pair returned by hooks built with [`make_use_local_item`].
pub struct LocalItem<V: 'static> {
    /// Reactive tri-state value.
    pub value: Signal<LocalValue<V>>,
    /// Writer for the same key.
    pub writer: LocalItemWriter<V>,
}

/// Reader/writer pair returned by hooks built with [`make_defaulted_use_local_item`].
pub struct DefaultedLocalItem<V: 'static> {
    /// Reactive value with `Absent` replaced by the default.
    pub value: Signal<Defaulted<V>>,
    /// Writer for the same key.
    pub writer: LocalItemWriter<V>,
}

/// Builds a hook bound to `key` on the process-wide registry.
///
/// Calling the returned hook inside a component yields the key's current [`LocalValue`] as a
/// signal plus a writer.
pub fn make_use_local_item<V: Clone + 'static>(
    key: ItemKey<V>,
) -> impl Fn() -> LocalItem<V> + Clone + 'static {
    move || use_local_item_in(&current_registry(), &key)
}

/// Builds a hook bound to `key` that substitutes `default()` for an absent value.
pub fn make_defaulted_use_local_item<V, D>(
    key: ItemKey<V>,
    default: D,
) -> impl Fn() -> DefaultedLocalItem<V> + Clone + 'static
where
    V: Clone + 'static,
    D: Fn() -> V + 'static,
{
    let default = Rc::new(default);
    move || use_defaulted_local_item_in(&current_registry(), &key, default.clone())
}

/// Subscribes the calling scope to `key` on an explicit registry.
pub fn use_local_item_in<V: Clone + 'static>(
    registry: &ItemRegistry,
    key: &ItemKey<V>,
) -> LocalItem<V> {
    let cell = resolve_cell(registry, key);
    let value = create_rw_signal(cell.read());
    let subscription = cell.subscribe(move |next| value.set(next.clone()));
    release_with_owner(subscription);
    LocalItem {
        value: value.into(),
        writer: LocalItemWriter { cell },
    }
}

/// Defaulted variant of [`use_local_item_in`].
pub fn use_defaulted_local_item_in<V, D>(
    registry: &ItemRegistry,
    key: &ItemKey<V>,
    default: Rc<D>,
) -> DefaultedLocalItem<V>
where
    V: Clone + 'static,
    D: Fn() -> V + ?Sized + 'static,
{
    let LocalItem { value, writer } = use_local_item_in(registry, key);
    let value = Signal::derive(move || value.get().to_defaulted_with(|| default()));
    DefaultedLocalItem { value, writer }
}

/// Makes `registry` the one hooks in descendant scopes use instead of the process-wide one.
pub fn provide_item_registry(registry: ItemRegistry) {
    provide_context(registry);
}

fn current_registry() -> ItemRegistry {
    use_context::<ItemRegistry>().unwrap_or_else(item_registry)
}

fn resolve_cell<V: Clone + 'static>(registry: &ItemRegistry, key: &ItemKey<V>) -> Rc<ItemCell<V>> {
    match registry.cell(key) {
        Ok(cell) => cell,
        Err(err) => {
            // Misdeclared keys degrade to a private in-memory cell rather than failing the view.
            logging::warn!("local item `{}` detached from storage: {err}", key.name());
            ItemCell::new(
                key.name(),
                key.codec(),
                Rc::new(MemoryStorage::default()),
                None,
            )
        }
    }
}

fn release_with_owner(subscription: Subscription) {
    if Owner::current().is_some() {
        on_cleanup(move || subscription.unsubscribe());
    } else {
        // Nothing will ever clean up an unowned scope; keep delivering for the page lifetime.
        std::mem::forget(subscription);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use local_item_host::{
        json, json_with, ExternalChange, ExternalChangeListener, ItemKeys, LiteralUnion,
        StorageBackend, StorageError, ValidationError, ValidationErrors, PROBE_KEY,
    };
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Clone, Default)]
    struct TabStorage {
        inner: MemoryStorage,
        listeners: Rc<RefCell<Vec<ExternalChangeListener>>>,
    }

    impl TabStorage {
        fn other_tab_writes(&self, key: &str, raw: &str) {
            self.inner.write(key, raw).expect("write");
            let change = ExternalChange::key(key, Some(raw.to_string()));
            let listeners = self.listeners.borrow().clone();
            for listener in listeners {
                listener(&change);
            }
        }
    }

    impl StorageBackend for TabStorage {
        fn read(&self, key: &str) -> Option<String> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, raw: &str) -> Result<(), StorageError> {
            self.inner.write(key, raw)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }

        fn on_external_change(&self, listener: ExternalChangeListener) {
            self.listeners.borrow_mut().push(listener);
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Layout {
        sidebar_width: u32,
    }

    fn theme_key(keys: &mut ItemKeys) -> ItemKey<String> {
        keys.declare("theme", json_with(LiteralUnion::new(["light", "dark"])))
            .expect("declare theme")
    }

    #[test]
    fn hook_instances_on_one_key_stay_in_sync() {
        let _ = leptos::create_runtime();
        let mut keys = ItemKeys::new();
        let use_theme = make_use_local_item(theme_key(&mut keys));

        let header = use_theme();
        let settings = use_theme();
        assert_eq!(header.value.get_untracked(), LocalValue::Absent);

        settings.writer.set("dark".to_string()).expect("write");
        assert_eq!(
            header.value.get_untracked(),
            LocalValue::Valid("dark".to_string())
        );
        assert_eq!(
            settings.value.get_untracked(),
            LocalValue::Valid("dark".to_string())
        );
        assert!(crate::storage_backend_name().starts_with("memory"));
    }

    #[test]
    fn defaulted_hook_collapses_absent_to_default() {
        let _ = leptos::create_runtime();
        let mut keys = ItemKeys::new();
        let use_theme =
            make_defaulted_use_local_item(theme_key(&mut keys), || "light".to_string());

        let theme = use_theme();
        assert_eq!(theme.value.get_untracked(), Ok("light".to_string()));

        theme.writer.set("dark".to_string()).expect("write");
        assert_eq!(theme.value.get_untracked(), Ok("dark".to_string()));

        theme.writer.remove().expect("remove");
        assert_eq!(theme.value.get_untracked(), Ok("light".to_string()));
    }

    #[test]
    fn defaulted_hook_surfaces_invalid_stored_data() {
        let _ = leptos::create_runtime();
        let storage = TabStorage::default();
        storage.inner.write("theme", "\"blue\"").expect("seed");
        let registry = ItemRegistry::new(storage);
        let mut keys = ItemKeys::new();
        let key = theme_key(&mut keys);

        let theme =
            use_defaulted_local_item_in(&registry, &key, Rc::new(|| "light".to_string()));
        assert_eq!(
            theme.value.get_untracked(),
            Err(ValidationErrors::single(ValidationError::root(
                "not a member of {light, dark}"
            )))
        );
    }

    #[test]
    fn other_tab_changes_reach_hook_signal() {
        let _ = leptos::create_runtime();
        let storage = TabStorage::default();
        let registry = ItemRegistry::new(storage.clone());
        let mut keys = ItemKeys::new();
        let layout_key = keys
            .declare("layout", json::<Layout>())
            .expect("declare layout");

        let layout = use_local_item_in(&registry, &layout_key);
        storage.other_tab_writes("layout", "{\"sidebar_width\":240}");
        assert_eq!(
            layout.value.get_untracked(),
            LocalValue::Valid(Layout { sidebar_width: 240 })
        );

        storage.other_tab_writes("layout", "{\"sidebar_width\":\"wide\"}");
        assert!(layout.value.get_untracked().is_invalid());
    }

    #[test]
    fn unowned_hook_keeps_its_subscription() {
        let _ = leptos::create_runtime();
        let registry = ItemRegistry::new(MemoryStorage::default());
        let key = ItemKey::new("zoom", json::<u32>());
        let zoom = use_local_item_in(&registry, &key);
        let cell = registry.cell(&key).expect("cell");
        assert_eq!(cell.subscriber_count(), 1);
        assert_eq!(zoom.writer.key(), "zoom");
    }

    #[test]
    fn misdeclared_key_degrades_to_detached_cell() {
        let _ = leptos::create_runtime();
        let registry = ItemRegistry::new(MemoryStorage::default());
        let probe = use_local_item_in(&registry, &ItemKey::new(PROBE_KEY, json::<u32>()));
        probe.writer.set(1).expect("memory write");
        assert_eq!(probe.value.get_untracked(), LocalValue::Valid(1));
        assert_eq!(registry.backend().read(PROBE_KEY), None);
        assert!(!registry.has_cell(PROBE_KEY));
    }
}
