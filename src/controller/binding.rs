//! The external view binding: two opaque string slots.

use std::sync::Arc;

use dashmap::DashMap;

/// Where the controller persists the current view and restores it from.
///
/// Typically backed by a router's query parameters; the controller only ever
/// touches the two slots named by
/// [`TableConfig`](crate::TableConfig)`::{page_param, key_param}`. Several
/// controllers may share one binding.
pub trait ViewBinding: Send + Sync + 'static {
    /// Reads a slot.
    fn get(&self, name: &str) -> Option<String>;

    /// Writes a slot.
    fn set(&self, name: &str, value: &str);

    /// Removes a slot.
    fn remove(&self, name: &str);
}

impl<B: ViewBinding> ViewBinding for Arc<B> {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: &str) {
        (**self).set(name, value)
    }

    fn remove(&self, name: &str) {
        (**self).remove(name)
    }
}

/// An in-memory binding backed by a concurrent map.
///
/// Useful for tests and for embedders without a router. State is lost when
/// the process exits.
#[derive(Debug, Default)]
pub struct MemoryBinding {
    store: DashMap<String, String>,
}

impl MemoryBinding {
    /// Creates a new empty binding.
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }
}

impl ViewBinding for MemoryBinding {
    fn get(&self, name: &str) -> Option<String> {
        self.store.get(name).map(|v| v.value().clone())
    }

    fn set(&self, name: &str, value: &str) {
        self.store.insert(name.to_string(), value.to_string());
    }

    fn remove(&self, name: &str) {
        self.store.remove(name);
    }
}
