//! Append-only name ↔ key table for extension component properties and events.
//!
//! Keys are used as map keys by the component layer, so a name keeps its key for the life of
//! the registry. Clones share the same table.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::PropertyKey;

/// First key handed out by [`PropertyKeyRegistry::new`].
pub const DEFAULT_KEY_BASE: PropertyKey = 1;

#[derive(Clone)]
pub struct PropertyKeyRegistry {
    table: Arc<RwLock<KeyTable>>,
}

#[derive(Debug)]
struct KeyTable {
    by_name: HashMap<String, PropertyKey>,
    by_key: BTreeMap<PropertyKey, String>,
    next: PropertyKey,
}

impl PropertyKeyRegistry {
    pub fn new() -> Self {
        Self::with_base(DEFAULT_KEY_BASE)
    }

    /// Hosts with built-in property keys start extension keys above their own range.
    pub fn with_base(base: PropertyKey) -> Self {
        Self {
            table: Arc::new(RwLock::new(KeyTable {
                by_name: HashMap::new(),
                by_key: BTreeMap::new(),
                next: base,
            })),
        }
    }

    /// Key for `name`, allocating the next one if the name is new.
    pub fn append(&self, name: &str) -> PropertyKey {
        if let Some(key) = self.key(name) {
            return key;
        }
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = table.by_name.get(name) {
            return *key;
        }
        let key = table.next;
        table.next += 1;
        table.by_name.insert(name.to_owned(), key);
        table.by_key.insert(key, name.to_owned());
        key
    }

    pub fn key(&self, name: &str) -> Option<PropertyKey> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.by_name.get(name).copied()
    }

    pub fn name(&self, key: PropertyKey) -> Option<String> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.by_key.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PropertyKeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PropertyKeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyKeyRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_and_increasing() {
        let registry = PropertyKeyRegistry::with_base(500);
        let volume = registry.append("volume");
        let muted = registry.append("muted");
        assert_eq!(volume, 500);
        assert_eq!(muted, 501);
        assert_eq!(registry.append("volume"), volume);
        assert_eq!(registry.name(muted).as_deref(), Some("muted"));
        assert_eq!(registry.key("missing"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn clones_share_the_table() {
        let registry = PropertyKeyRegistry::new();
        let other = registry.clone();
        let key = other.append("onEnd");
        assert_eq!(registry.key("onEnd"), Some(key));
    }

    #[test]
    fn concurrent_appends_stay_bijective() {
        let registry = PropertyKeyRegistry::new();
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.append(&format!("prop{}", (i + worker) % 60));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked");
        }
        assert_eq!(registry.len(), 53);
        for i in 0..53 {
            let name = format!("prop{i}");
            let key = registry.key(&name).expect("name registered");
            assert_eq!(registry.name(key), Some(name));
        }
    }
}
