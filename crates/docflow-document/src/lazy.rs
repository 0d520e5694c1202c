use std::sync::{Arc, RwLock};

use docflow_schema::Value;
use docflow_store::Store;
use tracing::debug;

use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};
use crate::registry::Registry;

/// Lazily resolved reference to a document of another class.
///
/// On the wire a reference is nothing but the target document's primary
/// key. A `LazyRef` starts unresolved, holding only that key;
/// [`resolve`] fetches the referenced document on first call and caches
/// it, so a second access returns the cached instance without touching
/// the store. [`invalidate`] drops the cache, for example when a change
/// feed reports that the underlying field moved.
///
/// Clones share the cache: resolving one clone resolves them all.
///
/// [`resolve`]: LazyRef::resolve
/// [`invalidate`]: LazyRef::invalidate
#[derive(Clone, Debug)]
pub struct LazyRef {
    target: String,
    key: Value,
    cell: Arc<RwLock<Option<Document>>>,
}

impl LazyRef {
    /// Reference by key only; nothing is fetched yet.
    pub fn unresolved(target: impl Into<String>, key: Value) -> Self {
        Self {
            target: target.into(),
            key,
            cell: Arc::new(RwLock::new(None)),
        }
    }

    /// Reference an already loaded document; the cache starts warm.
    ///
    /// The document must have been saved: an unsaved document has no
    /// primary key to reference.
    pub fn from_document(document: &Document) -> DocumentResult<Self> {
        if !document.is_persisted() {
            return Err(DocumentError::IllegalState(
                "referenced document is not stored in the database".into(),
            ));
        }
        Ok(Self {
            target: document.class().name().to_string(),
            key: document.key().clone(),
            cell: Arc::new(RwLock::new(Some(document.clone()))),
        })
    }

    /// Store-facing name of the referenced class.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Primary key of the referenced document (the wire value).
    pub fn key(&self) -> &Value {
        &self.key
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.read().expect("lazy cell poisoned").is_some()
    }

    /// Return the referenced document, fetching it from the store on
    /// the first call and from the cache afterwards.
    ///
    /// Fails with a pass-through `NotFound` when the referenced record
    /// does not exist, and with [`DocumentError::UnknownType`] when the
    /// target class is not registered.
    pub async fn resolve(
        &self,
        store: &dyn Store,
        registry: &Registry,
    ) -> DocumentResult<Document> {
        if let Some(cached) = self.cell.read().expect("lazy cell poisoned").as_ref() {
            return Ok(cached.clone());
        }

        let class = registry.resolve(&self.target)?;
        let document = Document::load(class, store, self.key.clone()).await?;
        debug!(target = %self.target, key = %self.key, "lazy reference resolved");
        *self.cell.write().expect("lazy cell poisoned") = Some(document.clone());
        Ok(document)
    }

    /// Return the cached document without I/O, or
    /// [`DocumentError::NotLoaded`] when the reference is unresolved.
    pub fn get(&self) -> DocumentResult<Document> {
        self.cell
            .read()
            .expect("lazy cell poisoned")
            .clone()
            .ok_or_else(|| DocumentError::NotLoaded(self.target.clone()))
    }

    /// Drop the cached document; the next [`resolve`] fetches again.
    ///
    /// [`resolve`]: LazyRef::resolve
    pub fn invalidate(&self) {
        *self.cell.write().expect("lazy cell poisoned") = None;
    }
}

/// References compare by target class and key; the cache state is not
/// part of identity.
impl PartialEq for LazyRef {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.key == other.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::DocumentClass;
    use docflow_schema::{FieldSpec, ValueType};
    use docflow_store::{MemoryStore, Store};
    use serde_json::json;

    async fn setup() -> (MemoryStore, Registry, Document) {
        let class = DocumentClass::builder("Hero")
            .field(FieldSpec::new("name", ValueType::string()).required())
            .build()
            .unwrap();
        let registry = Registry::new();
        registry.register(Arc::clone(&class)).unwrap();

        let store = MemoryStore::new();
        store.create_table(&class.table_spec()).await.unwrap();

        let mut hero = Document::new(class);
        hero.set("name", json!("ada")).unwrap();
        hero.save(&store).await.unwrap();
        (store, registry, hero)
    }

    #[tokio::test]
    async fn resolve_fetches_then_caches() {
        let (store, registry, hero) = setup().await;
        let lref = LazyRef::unresolved("Hero", hero.key().clone());
        assert!(!lref.is_resolved());

        let doc = lref.resolve(&store, &registry).await.unwrap();
        assert_eq!(doc.get("name"), Some(&json!("ada")));
        assert!(lref.is_resolved());

        // Remove the backing record: a second access must hit the cache,
        // not the store.
        store.delete("heroes", hero.key()).await.unwrap();
        let cached = lref.resolve(&store, &registry).await.unwrap();
        assert_eq!(cached.get("name"), Some(&json!("ada")));
    }

    #[tokio::test]
    async fn get_before_resolve_is_not_loaded() {
        let (_, _, hero) = setup().await;
        let lref = LazyRef::unresolved("Hero", hero.key().clone());
        let err = lref.get().unwrap_err();
        assert!(matches!(err, DocumentError::NotLoaded(_)));
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_fetch() {
        let (store, registry, hero) = setup().await;
        let lref = LazyRef::unresolved("Hero", hero.key().clone());
        lref.resolve(&store, &registry).await.unwrap();

        // Mutate the record behind the cache, then invalidate.
        let patch: docflow_schema::Record =
            [("name".to_string(), json!("lovelace"))].into_iter().collect();
        store.update("heroes", hero.key(), patch, None).await.unwrap();

        assert_eq!(lref.get().unwrap().get("name"), Some(&json!("ada")));
        lref.invalidate();
        assert!(!lref.is_resolved());
        let fresh = lref.resolve(&store, &registry).await.unwrap();
        assert_eq!(fresh.get("name"), Some(&json!("lovelace")));
    }

    #[tokio::test]
    async fn dangling_reference_is_not_found() {
        let (store, registry, _) = setup().await;
        let lref = LazyRef::unresolved("Hero", json!("ghost"));
        let err = lref.resolve(&store, &registry).await.unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Store(docflow_store::StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unregistered_target_is_unknown_type() {
        let (store, _, hero) = setup().await;
        let empty = Registry::new();
        let lref = LazyRef::unresolved("Hero", hero.key().clone());
        let err = lref.resolve(&store, &empty).await.unwrap_err();
        assert!(matches!(err, DocumentError::UnknownType(_)));
    }

    #[tokio::test]
    async fn from_document_starts_resolved() {
        let (_, _, hero) = setup().await;
        let lref = LazyRef::from_document(&hero).unwrap();
        assert!(lref.is_resolved());
        assert_eq!(lref.key(), hero.key());
        assert_eq!(lref.get().unwrap().key(), hero.key());
    }

    #[tokio::test]
    async fn from_unsaved_document_is_illegal() {
        let (_, _, hero) = setup().await;
        let unsaved = Document::new(Arc::clone(hero.class()));
        let err = LazyRef::from_document(&unsaved).unwrap_err();
        assert!(matches!(err, DocumentError::IllegalState(_)));
    }

    #[tokio::test]
    async fn clones_share_the_cache() {
        let (store, registry, hero) = setup().await;
        let lref = LazyRef::unresolved("Hero", hero.key().clone());
        let clone = lref.clone();
        lref.resolve(&store, &registry).await.unwrap();
        assert!(clone.is_resolved());
    }
}
