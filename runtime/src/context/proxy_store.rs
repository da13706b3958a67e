use crate::keys::LoaderScope;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes of every generated holder and accessor class, keyed by loader and name, so
/// the host can define them in the right loader when they are first requested.
#[derive(Debug, Default)]
pub struct ProxyDefinitionStore {
    definitions: DashMap<(LoaderScope, String), Arc<[u8]>>,
    counter: AtomicU64,
}

impl ProxyDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A name no other generated class has, within this store, across all loaders.
    pub fn next_proxy_name(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}{n}")
    }

    /// Panics if `name` was already saved for `scope`: generated names never repeat.
    pub fn save(&self, scope: &LoaderScope, name: &str, bytes: Vec<u8>) {
        match self.definitions.entry((scope.clone(), name.to_string())) {
            Entry::Occupied(_) => panic!("proxy definition {name} already saved for loader {scope}"),
            Entry::Vacant(slot) => {
                slot.insert(Arc::from(bytes));
            }
        }
    }

    pub fn load(&self, scope: &LoaderScope, name: &str) -> Option<Arc<[u8]>> {
        self.definitions
            .get(&(scope.clone(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, scope: &LoaderScope, name: &str) -> bool {
        self.definitions.contains_key(&(scope.clone(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Names saved for `scope`, sorted.
    pub fn names_in(&self, scope: &LoaderScope) -> Vec<String> {
        let mut names: Vec<String> = self
            .definitions
            .iter()
            .filter(|entry| &entry.key().0 == scope)
            .map(|entry| entry.key().1.clone())
            .collect();
        names.sort();
        names
    }
}
