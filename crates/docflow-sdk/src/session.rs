use std::sync::Arc;

use docflow_document::{Document, DocumentClass, DocumentFeed, LazyRef, Registry};
use docflow_schema::Value;
use docflow_store::{MemoryStore, Query, Store};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::SdkResult;

/// Application-level entry point: one store connection, one class
/// registry, and the conveniences that tie them together.
///
/// A session owns the [`Registry`] so call sites never pass one around,
/// and routes every persistence call through its store. Documents and
/// feeds returned by the session are plain crate types; nothing holds a
/// borrow of the session.
pub struct Session {
    config: SessionConfig,
    store: Arc<dyn Store>,
    registry: Registry,
}

impl Session {
    /// Open a session backed by the built-in in-memory store.
    pub async fn connect(config: SessionConfig) -> SdkResult<Self> {
        let store = Arc::new(MemoryStore::with_channel_capacity(config.feed_capacity));
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "session connected (in-memory store)"
        );
        Ok(Self {
            config,
            store,
            registry: Registry::new(),
        })
    }

    /// Open a session over an externally constructed store backend.
    pub fn with_store(config: SessionConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store,
            registry: Registry::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ---- Class management ----

    /// Register a document class with this session.
    pub fn register(&self, class: Arc<DocumentClass>) -> SdkResult<()> {
        self.registry.register(class)?;
        Ok(())
    }

    /// Create the backing table for every registered class.
    ///
    /// Tables that already exist are left untouched, so this is safe to
    /// run on every application start. Returns the names of the tables
    /// that were created.
    pub async fn init_schema(&self) -> SdkResult<Vec<String>> {
        let mut created = Vec::new();
        for class in self.registry.classes() {
            let spec = class.table_spec();
            if self.store.table_exists(spec.name()).await? {
                debug!(table = spec.name(), "table already exists, skipping");
                continue;
            }
            self.store.create_table(&spec).await?;
            info!(class = class.name(), table = spec.name(), "table created");
            created.push(spec.name().to_string());
        }
        Ok(created)
    }

    // ---- Document conveniences ----

    /// New, unsaved instance of a registered class.
    pub fn create(&self, class_name: &str) -> SdkResult<Document> {
        let class = self.registry.resolve(class_name)?;
        Ok(Document::new(class))
    }

    /// Load a document of a registered class by primary key.
    pub async fn load(&self, class_name: &str, key: Value) -> SdkResult<Document> {
        let class = self.registry.resolve(class_name)?;
        Ok(Document::load(class, self.store.as_ref(), key).await?)
    }

    /// Save through the session's store.
    pub async fn save(&self, document: &mut Document) -> SdkResult<()> {
        document.save(self.store.as_ref()).await?;
        Ok(())
    }

    /// Delete through the session's store.
    pub async fn delete(&self, document: &mut Document) -> SdkResult<bool> {
        Ok(document.delete(self.store.as_ref()).await?)
    }

    /// Query a registered class's table into typed documents.
    pub async fn query(&self, class_name: &str, query: &Query) -> SdkResult<Vec<Document>> {
        let class = self.registry.resolve(class_name)?;
        Ok(Document::from_query(class, self.store.as_ref(), query).await?)
    }

    /// Resolve a lazy reference against this session's store and
    /// registry.
    pub async fn resolve(&self, reference: &LazyRef) -> SdkResult<Document> {
        Ok(reference.resolve(self.store.as_ref(), &self.registry).await?)
    }

    // ---- Change feeds ----

    /// Follow every change in a registered class's table.
    pub async fn feed(&self, class_name: &str) -> SdkResult<DocumentFeed> {
        let class = self.registry.resolve(class_name)?;
        Ok(DocumentFeed::table(class, self.store.as_ref()).await?)
    }

    /// Track one persisted document through its table's change feed.
    pub async fn follow(&self, document: &Document) -> SdkResult<DocumentFeed> {
        Ok(DocumentFeed::follow(document, self.store.as_ref()).await?)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("database", &self.config.database)
            .field("classes", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_document::{DocState, DocumentError};
    use docflow_schema::{FieldSpec, ValueType};
    use serde_json::json;

    use crate::error::SdkError;

    fn hero() -> Arc<DocumentClass> {
        DocumentClass::builder("Hero")
            .field(FieldSpec::new("name", ValueType::string()).required().indexed())
            .field(FieldSpec::new("level", ValueType::int()).default_value(json!(1)))
            .build()
            .unwrap()
    }

    fn sidekick() -> Arc<DocumentClass> {
        DocumentClass::builder("Sidekick")
            .field(FieldSpec::new("name", ValueType::string()).required())
            .field(FieldSpec::new("hero", ValueType::reference("Hero")))
            .build()
            .unwrap()
    }

    async fn session() -> Session {
        let session = Session::connect(SessionConfig::default()).await.unwrap();
        session.register(hero()).unwrap();
        session.register(sidekick()).unwrap();
        session.init_schema().await.unwrap();
        session
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn init_schema_creates_tables_once() {
        let session = Session::connect(SessionConfig::default()).await.unwrap();
        session.register(hero()).unwrap();
        session.register(sidekick()).unwrap();

        let created = session.init_schema().await.unwrap();
        assert_eq!(created, vec!["heroes".to_string(), "sidekicks".to_string()]);

        // second run is a no-op
        let created = session.init_schema().await.unwrap();
        assert!(created.is_empty());

        let tables = session.store().list_tables().await.unwrap();
        assert_eq!(tables, vec!["heroes".to_string(), "sidekicks".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let session = Session::connect(SessionConfig::default()).await.unwrap();
        session.register(hero()).unwrap();
        let err = session.register(hero()).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Document(DocumentError::DuplicateRegistration(_))
        ));
    }

    #[tokio::test]
    async fn with_store_shares_an_external_backend() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let session = Session::with_store(SessionConfig::default(), Arc::clone(&store));
        session.register(hero()).unwrap();
        session.init_schema().await.unwrap();
        assert!(store.table_exists("heroes").await.unwrap());
    }

    // -----------------------------------------------------------------------
    // Document round trips
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_save_load_by_name() {
        let session = session().await;

        let mut doc = session.create("Hero").unwrap();
        doc.set("name", json!("ada")).unwrap();
        session.save(&mut doc).await.unwrap();
        assert_eq!(doc.state(), DocState::Saved);

        let loaded = session.load("Hero", doc.key().clone()).await.unwrap();
        assert_eq!(loaded.get("name"), Some(&json!("ada")));
        assert_eq!(loaded.get("level"), Some(&json!(1)));

        assert!(session.delete(&mut doc).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_class_name_fails() {
        let session = session().await;
        let err = session.create("Ghost").unwrap_err();
        assert!(matches!(
            err,
            SdkError::Document(DocumentError::UnknownType(_))
        ));
    }

    #[tokio::test]
    async fn query_returns_typed_documents() {
        let session = session().await;
        for name in ["ada", "bob"] {
            let mut doc = session.create("Hero").unwrap();
            doc.set("name", json!(name)).unwrap();
            session.save(&mut doc).await.unwrap();
        }

        let query = Query::table("heroes").filter("name", json!("ada"));
        let docs = session.query("Hero", &query).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("name"), Some(&json!("ada")));
    }

    #[tokio::test]
    async fn resolve_uses_session_registry_and_store() {
        let session = session().await;

        let mut ada = session.create("Hero").unwrap();
        ada.set("name", json!("ada")).unwrap();
        session.save(&mut ada).await.unwrap();

        let mut side = session.create("Sidekick").unwrap();
        side.set("name", json!("pascal")).unwrap();
        side.set("hero", ada.key().clone()).unwrap();
        session.save(&mut side).await.unwrap();

        let lref = side.lazy_ref("hero").unwrap();
        let resolved = session.resolve(&lref).await.unwrap();
        assert_eq!(resolved.get("name"), Some(&json!("ada")));
    }

    // -----------------------------------------------------------------------
    // Feeds
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn table_feed_through_the_session() {
        let session = session().await;
        let mut feed = session.feed("Hero").await.unwrap();

        let mut doc = session.create("Hero").unwrap();
        doc.set("name", json!("ada")).unwrap();
        session.save(&mut doc).await.unwrap();

        let change = feed.next().await.unwrap().unwrap();
        assert!(change.event.is_create());
        assert_eq!(
            change.document.unwrap().get("name"),
            Some(&json!("ada"))
        );
    }

    #[tokio::test]
    async fn follow_feed_through_the_session() {
        let session = session().await;

        let mut doc = session.create("Hero").unwrap();
        doc.set("name", json!("ada")).unwrap();
        session.save(&mut doc).await.unwrap();

        let mut feed = session.follow(&doc).await.unwrap();

        let mut other = session.load("Hero", doc.key().clone()).await.unwrap();
        other.set("level", json!(2)).unwrap();
        session.save(&mut other).await.unwrap();

        let change = feed.next().await.unwrap().unwrap();
        assert_eq!(change.changed_fields, vec!["level".to_string()]);
        assert_eq!(
            change.document.unwrap().get("level"),
            Some(&json!(2))
        );
    }
}
