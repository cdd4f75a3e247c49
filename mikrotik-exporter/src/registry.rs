//! Catalogue of available collectors.

use std::collections::{BTreeMap, HashMap};

use crate::collector::{self, CollectorHandle};

/// Name-to-collector table.
///
/// Populated at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: BTreeMap<&'static str, CollectorHandle>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in collector.
    pub fn with_defaults(namespace: &str) -> Self {
        let mut registry = Self::new();
        for handle in collector::builtin(namespace) {
            registry.register(handle);
        }
        registry
    }

    /// Insert a collector, replacing any previous one with the same name.
    pub fn register(&mut self, handle: CollectorHandle) {
        let name = handle.name();
        if self.collectors.insert(name, handle).is_some() {
            tracing::debug!(collector = name, "Replaced registered collector");
        }
    }

    /// Collectors enabled in `selection`, ordered by name.
    ///
    /// Names that are not registered are ignored.
    pub fn resolve(&self, selection: &HashMap<String, bool>) -> Vec<CollectorHandle> {
        self.collectors
            .iter()
            .filter(|(name, _)| selection.get(**name).copied().unwrap_or(false))
            .map(|(_, handle)| handle.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&CollectorHandle> {
        self.collectors.get(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        self.collectors.keys().copied().collect()
    }

    /// Registered collectors, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &CollectorHandle> {
        self.collectors.values()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(name, enabled)| (name.to_string(), *enabled))
            .collect()
    }

    #[test]
    fn test_with_defaults_lists_all_sorted() {
        let registry = CollectorRegistry::with_defaults("ns");

        assert_eq!(
            registry.list(),
            vec!["bgp", "dhcp", "firewall", "interfaces", "system", "wireless"]
        );
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_resolve_filters_and_orders() {
        let registry = CollectorRegistry::with_defaults("ns");
        let resolved = registry.resolve(&selection(&[
            ("system", true),
            ("bgp", true),
            ("dhcp", false),
            ("nonexistent", true),
        ]));

        let names: Vec<_> = resolved.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["bgp", "system"]);
    }

    #[test]
    fn test_resolve_empty_selection() {
        let registry = CollectorRegistry::with_defaults("ns");

        assert!(registry.resolve(&HashMap::new()).is_empty());
        assert!(registry.resolve(&selection(&[("bgp", false)])).is_empty());
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = CollectorRegistry::with_defaults("old");
        registry.register(std::sync::Arc::new(crate::collector::BgpCollector::new("new")));

        assert_eq!(registry.len(), 6);
        let bgp = registry.get("bgp").unwrap();
        assert!(bgp.describe()[0].name().starts_with("new_"));
    }
}
