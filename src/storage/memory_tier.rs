use dashmap::DashMap;

/// Process-lifetime cache. Nothing here survives a restart.
pub struct MemoryTier<V> {
    entries: DashMap<String, V>,
}

impl<V: Clone> MemoryTier<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn count_prefixed(&self, prefix: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .count()
    }

    pub fn remove_prefixed(&self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for MemoryTier<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_contract() {
        let tier = MemoryTier::new();
        assert!(!tier.has("k"));
        tier.set("k", 1);
        assert_eq!(tier.get("k"), Some(1));
        tier.delete("k");
        tier.delete("k");
        assert_eq!(tier.get("k"), None);
        tier.set("a", 1);
        tier.set("b", 2);
        tier.clear();
        assert!(tier.is_empty());
    }

    #[test]
    fn prefixed_entries_are_counted_and_removed_together() {
        let tier = MemoryTier::new();
        tier.set("claims:a", 1);
        tier.set("claims:b", 2);
        tier.set("tokens", 3);
        assert_eq!(tier.count_prefixed("claims:"), 2);
        tier.remove_prefixed("claims:");
        assert_eq!(tier.count_prefixed("claims:"), 0);
        assert_eq!(tier.get("tokens"), Some(3));
    }
}
