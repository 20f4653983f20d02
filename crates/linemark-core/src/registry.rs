use std::num::NonZeroUsize;

use lru::LruCache;

use crate::markdown::Markdown;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Converters kept by name, so a configuration is set up once and reused.
///
/// The least recently used entry is evicted once the registry is full.
pub struct Registry {
    instances: LruCache<String, Markdown>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            instances: LruCache::new(capacity),
        }
    }

    /// Returns the converter named `name`, creating a default one on first use.
    pub fn get_or_create(&mut self, name: &str) -> &Markdown {
        let full = self.instances.len() == self.instances.cap().get();
        let oldest = self
            .instances
            .peek_lru()
            .filter(|_| full)
            .map(|(key, _)| key.clone());
        self.instances.get_or_insert(name.to_string(), || {
            tracing::debug!(name, "creating converter");
            if let Some(evicted) = oldest {
                tracing::debug!(name = %evicted, "evicted converter");
            }
            Markdown::default()
        })
    }

    pub fn insert(&mut self, name: &str, markdown: Markdown) {
        if let Some((evicted, _)) = self.instances.push(name.to_string(), markdown)
            && evicted != name
        {
            tracing::debug!(name = %evicted, "evicted converter");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains(name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::Registry;
    use crate::markdown::Markdown;

    #[test]
    fn creates_default_instances_lazily() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        let html = registry.get_or_create("default").convert("*a*");
        assert_eq!(html, "<p><em>a</em></p>");
        assert!(registry.contains("default"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn configured_instances_are_reused() {
        let mut registry = Registry::new();
        registry.insert("safe", Markdown::new().with_safe_mode(true));
        assert!(registry.get_or_create("safe").options().safe_mode);
        assert!(registry.get_or_create("safe").options().safe_mode);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn least_recently_used_instance_is_evicted() {
        let capacity = NonZeroUsize::new(2).unwrap();
        let mut registry = Registry::with_capacity(capacity);
        registry.get_or_create("a");
        registry.get_or_create("b");
        registry.get_or_create("a");
        registry.get_or_create("c");
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert!(!registry.contains("b"));
        assert!(registry.contains("c"));
    }
}
