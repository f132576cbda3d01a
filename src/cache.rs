use std::collections::HashMap;

use crate::pdata::Map;
use crate::walker::NodeId;

/// Scratch maps keyed by node, alive for one processing invocation.
///
/// Every resource, scope and profile gets its own map. Groups that visit the
/// same node share it, and nodes never see each other's entries.
#[derive(Debug, Default)]
pub struct CacheManager {
    caches: HashMap<NodeId, Map>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache of `node`, created empty on first use.
    pub fn cache(&mut self, node: NodeId) -> &mut Map {
        self.caches.entry(node).or_default()
    }

    pub fn peek(&self, node: NodeId) -> Option<&Map> {
        self.caches.get(&node)
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn clear(&mut self) {
        self.caches.clear();
    }
}
