//! Registry of all current proxies, swapped atomically on reload.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use super::AnyProxy;

/// Name → proxy lookup shared by the API and the reload path.
pub struct ProxyRegistry {
    proxies: ArcSwap<HashMap<String, AnyProxy>>,
}

impl ProxyRegistry {
    pub fn new(proxies: HashMap<String, AnyProxy>) -> Self {
        Self {
            proxies: ArcSwap::from_pointee(proxies),
        }
    }

    pub fn get(&self, name: &str) -> Option<AnyProxy> {
        self.proxies.load().get(name).cloned()
    }

    /// Current snapshot of every proxy.
    pub fn snapshot(&self) -> Arc<HashMap<String, AnyProxy>> {
        self.proxies.load_full()
    }

    /// All group-capable proxies, sorted by name.
    pub fn groups(&self) -> Vec<AnyProxy> {
        let mut groups: Vec<AnyProxy> = self
            .proxies
            .load()
            .values()
            .filter(|p| p.as_group().is_some())
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name().cmp(b.name()));
        groups
    }

    pub fn replace(&self, proxies: HashMap<String, AnyProxy>) {
        self.proxies.store(Arc::new(proxies));
    }

    pub fn len(&self) -> usize {
        self.proxies.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}
