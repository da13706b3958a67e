//! Registries shared by every redefinition in one loader scope: static holders (so a
//! field keeps its holder, and its value, across redefinitions), instance accessors,
//! and the proxy names generated for each owner.

use crate::context::proxy_store::ProxyDefinitionStore;
use crate::debug_log;
use crate::keys::{FieldKey, LoaderScope, OwnedFieldKey, Symbol};
use crate::proxy::PendingDefinition;
use crate::storage::FieldAccessor;
use crate::RedefineConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lasso::ThreadedRodeo;
use std::sync::Arc;

pub mod proxy_store;

pub struct RedefinitionContext {
    scope: LoaderScope,
    config: RedefineConfig,
    interner: Arc<ThreadedRodeo>,
    store: Arc<ProxyDefinitionStore>,
    holders: DashMap<OwnedFieldKey, Symbol>,
    holder_counts: DashMap<Symbol, u32>,
    accessors: DashMap<Symbol, FieldAccessor>,
    owner_proxies: DashMap<Symbol, Vec<Symbol>>,
}

impl RedefinitionContext {
    pub fn new(scope: LoaderScope, config: RedefineConfig, store: Arc<ProxyDefinitionStore>) -> Self {
        Self::with_interner(scope, config, store, Arc::new(ThreadedRodeo::default()))
    }

    pub fn with_interner(
        scope: LoaderScope,
        config: RedefineConfig,
        store: Arc<ProxyDefinitionStore>,
        interner: Arc<ThreadedRodeo>,
    ) -> Self {
        Self {
            scope,
            config,
            interner,
            store,
            holders: DashMap::new(),
            holder_counts: DashMap::new(),
            accessors: DashMap::new(),
            owner_proxies: DashMap::new(),
        }
    }

    pub fn scope(&self) -> &LoaderScope {
        &self.scope
    }

    pub fn config(&self) -> &RedefineConfig {
        &self.config
    }

    pub fn store(&self) -> &ProxyDefinitionStore {
        &self.store
    }

    pub fn interner(&self) -> &ThreadedRodeo {
        &self.interner
    }

    fn field_key(&self, owner: &str, name: &str, descriptor: &str) -> OwnedFieldKey {
        OwnedFieldKey {
            owner: self.interner.get_or_intern(owner),
            field: FieldKey {
                name: self.interner.get_or_intern(name),
                desc: self.interner.get_or_intern(descriptor),
            },
        }
    }

    /// Holder already backing `owner.name:descriptor`, if a previous pass created one.
    pub fn holder_for(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
        let key = self.field_key(owner, name, descriptor);
        self.holders
            .get(&key)
            .map(|sym| self.interner.resolve(sym.value()).to_string())
    }

    pub fn next_holder_name(&self, owner: &str) -> String {
        let owner_sym = self.interner.get_or_intern(owner);
        let mut count = self.holder_counts.entry(owner_sym).or_insert(0);
        let name = format!("{owner}{}{}", self.config.holder_name_suffix, *count);
        *count += 1;
        name
    }

    pub fn accessor(&self, proxy: &str) -> Option<FieldAccessor> {
        let sym = self.interner.get(proxy)?;
        self.accessors.get(&sym).map(|entry| entry.value().clone())
    }

    /// Accessor proxies generated for `owner`, oldest first.
    pub fn proxies_of(&self, owner: &str) -> Vec<String> {
        let Some(owner_sym) = self.interner.get(owner) else {
            return Vec::new();
        };
        self.owner_proxies
            .get(&owner_sym)
            .map(|entry| {
                entry
                    .iter()
                    .map(|sym| self.interner.resolve(sym).to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Saves and registers definitions built by a successful pass.
    ///
    /// Panics when an accessor name is registered twice; generated names are unique.
    pub(crate) fn commit(&self, pending: Vec<PendingDefinition>) {
        for definition in pending {
            match definition {
                PendingDefinition::StaticHolder {
                    owner,
                    field_name,
                    descriptor,
                    holder,
                    bytes,
                } => {
                    self.store.save(&self.scope, &holder, bytes);
                    let key = self.field_key(&owner, &field_name, &descriptor);
                    let holder_sym = self.interner.get_or_intern(&holder);
                    self.holders.insert(key, holder_sym);
                    debug_log!("Registered static holder {holder} for {owner}.{field_name}");
                }
                PendingDefinition::InstanceAccessor {
                    owner,
                    proxy,
                    bytes,
                    accessor,
                } => {
                    self.store.save(&self.scope, &proxy, bytes);
                    let owner_sym = self.interner.get_or_intern(&owner);
                    let proxy_sym = self.interner.get_or_intern(&proxy);
                    match self.accessors.entry(proxy_sym) {
                        Entry::Occupied(_) => panic!("field accessor {proxy} registered twice"),
                        Entry::Vacant(slot) => {
                            slot.insert(accessor);
                        }
                    }
                    self.owner_proxies.entry(owner_sym).or_default().push(proxy_sym);
                    debug_log!("Registered accessor proxy {proxy} for {owner}");
                }
            }
        }
    }
}
