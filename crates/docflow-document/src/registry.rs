use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::class::DocumentClass;
use crate::error::{DocumentError, DocumentResult};

/// Name→class lookup for polymorphic reconstruction.
///
/// Query results and change feed payloads are raw records; the registry
/// lets deserialization sites turn them into typed [`Document`]s knowing
/// only the store-facing class name. Names are unique per registry. The
/// registry only looks classes up, it never owns their instances.
///
/// There is deliberately no process-global registry: one `Registry` is
/// owned per application context (usually by the session) and passed to
/// the call sites that need it.
///
/// [`Document`]: crate::Document
#[derive(Debug, Default)]
pub struct Registry {
    classes: RwLock<HashMap<String, Arc<DocumentClass>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under its store-facing name.
    pub fn register(&self, class: Arc<DocumentClass>) -> DocumentResult<()> {
        let mut classes = self.classes.write().expect("registry lock poisoned");
        if classes.contains_key(class.name()) {
            return Err(DocumentError::DuplicateRegistration(
                class.name().to_string(),
            ));
        }
        classes.insert(class.name().to_string(), class);
        Ok(())
    }

    /// Remove a class by name. Returns `true` if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.classes
            .write()
            .expect("registry lock poisoned")
            .remove(name)
            .is_some()
    }

    /// Look up a class by name.
    pub fn resolve(&self, name: &str) -> DocumentResult<Arc<DocumentClass>> {
        self.classes
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes
            .read()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered classes, sorted by name. Used for schema
    /// initialization.
    pub fn classes(&self) -> Vec<Arc<DocumentClass>> {
        let classes = self.classes.read().expect("registry lock poisoned");
        let mut out: Vec<Arc<DocumentClass>> = classes.values().cloned().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Arc<DocumentClass> {
        DocumentClass::builder(name).build().unwrap()
    }

    #[test]
    fn register_and_resolve() {
        let registry = Registry::new();
        registry.register(class("Hero")).unwrap();
        let resolved = registry.resolve("Hero").unwrap();
        assert_eq!(resolved.name(), "Hero");
        assert!(registry.contains("Hero"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = Registry::new();
        registry.register(class("Hero")).unwrap();
        let err = registry.register(class("Hero")).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateRegistration(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_fails_resolve() {
        let registry = Registry::new();
        let err = registry.resolve("Ghost").unwrap_err();
        assert!(matches!(err, DocumentError::UnknownType(_)));
    }

    #[test]
    fn unregister_frees_the_name() {
        let registry = Registry::new();
        registry.register(class("Hero")).unwrap();
        assert!(registry.unregister("Hero"));
        assert!(!registry.unregister("Hero"));
        registry.register(class("Hero")).unwrap();
    }

    #[test]
    fn classes_are_sorted_by_name() {
        let registry = Registry::new();
        registry.register(class("Zone")).unwrap();
        registry.register(class("Hero")).unwrap();
        let classes = registry.classes();
        let names: Vec<&str> = classes.iter().map(|c| c.name()).collect();
        // order is stable for schema init
        assert_eq!(names, vec!["Hero", "Zone"]);
    }
}
