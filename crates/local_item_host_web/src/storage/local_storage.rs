//! `window.localStorage`-backed [`StorageBackend`] implementation.
//!
//! The browser API is synchronous, so this adapter maps it one to one. Cross-tab changes arrive
//! as `storage` events on the window and are translated into [`ExternalChange`] values.

use local_item_host::{ExternalChange, ExternalChangeListener, StorageBackend, StorageError};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

#[derive(Debug, Clone)]
/// Browser storage backed by `window.localStorage`.
pub struct WebLocalStorage {
    #[cfg(target_arch = "wasm32")]
    storage: web_sys::Storage,
}

impl WebLocalStorage {
    /// Opens the window's localStorage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when there is no window, access is denied, or the
    /// target is not `wasm32`.
    pub fn open() -> Result<Self, StorageError> {
        #[cfg(target_arch = "wasm32")]
        {
            let storage = web_sys::window()
                .ok_or(StorageError::Unavailable)?
                .local_storage()
                .map_err(|_| StorageError::Unavailable)?
                .ok_or(StorageError::Unavailable)?;
            Ok(Self { storage })
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Err(StorageError::Unavailable)
        }
    }
}

impl StorageBackend for WebLocalStorage {
    fn read(&self, key: &str) -> Option<String> {
        #[cfg(target_arch = "wasm32")]
        {
            self.storage.get_item(key).ok().flatten()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = key;
            None
        }
    }

    fn write(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        #[cfg(target_arch = "wasm32")]
        {
            self.storage
                .set_item(key, raw)
                .map_err(|e| StorageError::Write {
                    key: key.to_string(),
                    reason: describe_js_error(&e),
                })
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (key, raw);
            Err(StorageError::Unavailable)
        }
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        #[cfg(target_arch = "wasm32")]
        {
            self.storage
                .remove_item(key)
                .map_err(|e| StorageError::Remove {
                    key: key.to_string(),
                    reason: describe_js_error(&e),
                })
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = key;
            Err(StorageError::Unavailable)
        }
    }

    fn on_external_change(&self, listener: ExternalChangeListener) {
        #[cfg(target_arch = "wasm32")]
        {
            let Some(window) = web_sys::window() else {
                return;
            };
            let storage = self.storage.clone();
            let on_storage = Closure::<dyn FnMut(web_sys::StorageEvent)>::wrap(Box::new(
                move |event: web_sys::StorageEvent| {
                    // sessionStorage changes share the same event.
                    if event.storage_area().is_some_and(|area| area != storage) {
                        return;
                    }
                    listener(&change_from_event_parts(event.key(), event.new_value()));
                },
            ));
            if window
                .add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())
                .is_ok()
            {
                on_storage.forget();
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = listener;
        }
    }
}

#[cfg_attr(not(any(test, target_arch = "wasm32")), allow(dead_code))]
fn change_from_event_parts(key: Option<String>, new_value: Option<String>) -> ExternalChange {
    match key {
        Some(key) => ExternalChange::key(key, new_value),
        None => ExternalChange::cleared(),
    }
}

#[cfg(target_arch = "wasm32")]
fn describe_js_error(value: &JsValue) -> String {
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => format!("{}: {}", String::from(err.name()), String::from(err.message())),
        None => format!("{value:?}"),
    }
}
