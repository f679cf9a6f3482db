use crate::element::{ComponentMap, Element};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The component table for one render.
///
/// Lookups fall through to a shared, immutable base (usually the tenant's
/// cached components). Fetched components are memoized locally, and
/// discarded names stay unresolvable for the rest of the render without
/// touching the shared base, so concurrent renders never see each other's
/// changes.
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    base: Arc<ComponentMap>,
    local: ComponentMap,
    discarded: HashSet<String>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table reading from a shared base
    pub fn from_base(base: Arc<ComponentMap>) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// A table owning the given definitions
    pub fn from_components(components: HashMap<String, Element>) -> Self {
        let base = components
            .into_iter()
            .map(|(name, element)| (name, Arc::new(element)))
            .collect();
        Self::from_base(Arc::new(base))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Element>> {
        if self.discarded.contains(name) {
            return None;
        }
        self.local
            .get(name)
            .or_else(|| self.base.get(name))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.discarded.contains(name)
            && (self.local.contains_key(name) || self.base.contains_key(name))
    }

    /// Whether `name` was discarded earlier in this render
    pub fn is_discarded(&self, name: &str) -> bool {
        self.discarded.contains(name)
    }

    /// Add or replace a definition for the rest of this render
    pub fn insert(&mut self, name: impl Into<String>, element: Element) -> Arc<Element> {
        let name = name.into();
        let element = Arc::new(element);
        self.discarded.remove(&name);
        self.local.insert(name, Arc::clone(&element));
        element
    }

    /// Make `name` unresolvable for the rest of this render.
    /// Returns true if a definition was visible before.
    pub fn discard(&mut self, name: &str) -> bool {
        let was_visible = self.contains(name);
        self.local.remove(name);
        self.discarded.insert(name.to_string());
        was_visible
    }

    /// Sorted names of every resolvable component
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .base
            .keys()
            .chain(self.local.keys())
            .filter(|name| !self.discarded.contains(*name))
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }
}
