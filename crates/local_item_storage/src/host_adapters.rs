use std::rc::Rc;

use leptos::logging;
use local_item_host::{ItemRegistry, WriteError};
use local_item_host_web::{backend_strategy_name, local_storage_backend};

#[derive(Clone)]
struct HostStorage {
    registry: ItemRegistry,
    strategy: &'static str,
}

fn build_host_storage() -> HostStorage {
    let selection = local_storage_backend();
    let strategy = backend_strategy_name(&selection);
    if let Some(reason) = &selection.fallback_reason {
        logging::log!("local item storage using in-memory fallback: {reason}");
    }
    let registry = ItemRegistry::with_fault_sink(
        selection.backend,
        Rc::new(|key: &str, err: &WriteError| {
            logging::warn!("persist local item `{key}` failed: {err}");
        }),
    );
    HostStorage { registry, strategy }
}

thread_local! {
    static HOST_STORAGE: HostStorage = build_host_storage();
}

/// Returns the process-wide registry, selecting the backend on first use.
pub(crate) fn item_registry() -> ItemRegistry {
    HOST_STORAGE.with(|host| host.registry.clone())
}

/// Returns the token naming the backend the process-wide registry selected.
pub(crate) fn storage_strategy() -> &'static str {
    HOST_STORAGE.with(|host| host.strategy)
}
