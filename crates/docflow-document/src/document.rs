use std::collections::HashMap;
use std::sync::Arc;

use docflow_schema::{FieldContainer, Record, Revision, Value, ValueType};
use docflow_store::{Query, Store, StoreError};
use tracing::debug;

use crate::class::DocumentClass;
use crate::error::{DocumentError, DocumentResult};
use crate::lazy::LazyRef;

/// Lifecycle state of a document instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocState {
    /// Created in memory, never saved; may not have a key yet.
    New,
    /// In sync with the store.
    Saved,
    /// Has a key, but carries unsaved changes.
    Modified,
    /// Explicitly deleted from the store. Terminal.
    Deleted,
}

/// A top-level, persistable unit: one field container bound to one
/// store record.
///
/// Documents add identity (the primary key), the lifecycle state
/// machine, and the revision token used for conflict detection on save.
/// They are created in memory, optionally loaded from a record, mutated
/// through [`set`]/[`unset`] (which moves them to `Modified`), and
/// persisted with [`save`]. Deletion is always explicit.
///
/// Cloning a document clones its fields; clones share lazy-reference
/// caches but not dirty state from later mutations.
///
/// [`set`]: Document::set
/// [`unset`]: Document::unset
/// [`save`]: Document::save
#[derive(Clone, Debug)]
pub struct Document {
    class: Arc<DocumentClass>,
    fields: FieldContainer,
    state: DocState,
    revision: Option<Revision>,
    lazy: HashMap<String, LazyRef>,
}

impl Document {
    /// Create a fresh, unsaved instance of a class.
    pub fn new(class: Arc<DocumentClass>) -> Self {
        let fields = FieldContainer::new(Arc::clone(class.schema()));
        Self {
            class,
            fields,
            state: DocState::New,
            revision: None,
            lazy: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Arc<DocumentClass> {
        &self.class
    }

    pub fn state(&self) -> DocState {
        self.state
    }

    /// Revision the instance was last synchronized at; `None` before the
    /// first save.
    pub fn revision(&self) -> Option<Revision> {
        self.revision
    }

    /// `true` once the document has a store record behind it.
    pub fn is_persisted(&self) -> bool {
        matches!(self.state, DocState::Saved | DocState::Modified)
    }

    pub fn fields(&self) -> &FieldContainer {
        &self.fields
    }

    /// Current primary key value; `Null` while unset.
    pub fn key(&self) -> &Value {
        self.fields
            .get(self.class.schema().primary_key())
            .expect("schema invariant: primary key field exists")
    }

    // -----------------------------------------------------------------------
    // Field access
    // -----------------------------------------------------------------------

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field, validating declared fields. Moves a `Saved` document
    /// to `Modified` and drops any lazy-reference cache for the field.
    pub fn set(&mut self, name: &str, value: Value) -> DocumentResult<()> {
        self.guard_not_deleted("set field")?;
        self.fields.set(name, value)?;
        self.lazy.remove(name);
        self.mark_mutated();
        Ok(())
    }

    /// Remove a field's value. Returns `true` if a value was present.
    pub fn unset(&mut self, name: &str) -> DocumentResult<bool> {
        self.guard_not_deleted("unset field")?;
        let removed = self.fields.unset(name);
        if removed {
            self.lazy.remove(name);
            self.mark_mutated();
        }
        Ok(removed)
    }

    /// Point a reference field at an already saved document.
    ///
    /// Stores the target's primary key as the field value and warms the
    /// lazy cache with the target instance.
    pub fn set_ref(&mut self, name: &str, target: &Document) -> DocumentResult<()> {
        self.guard_not_deleted("set reference")?;
        let declared_target = self.ref_target(name)?;
        if declared_target != target.class().name() {
            return Err(DocumentError::Schema(
                docflow_schema::SchemaError::validation(
                    name,
                    format!(
                        "reference expects class `{declared_target}`, got `{}`",
                        target.class().name()
                    ),
                ),
            ));
        }
        let lref = LazyRef::from_document(target)?;
        self.fields.set(name, target.key().clone())?;
        self.lazy.insert(name.to_string(), lref);
        self.mark_mutated();
        Ok(())
    }

    /// The lazy reference stored in a `Ref` field.
    ///
    /// The returned handle is cached on the instance: repeated calls for
    /// the same field share one resolution cache until the field changes.
    pub fn lazy_ref(&mut self, name: &str) -> DocumentResult<LazyRef> {
        let target = self.ref_target(name)?;
        let key = self
            .fields
            .get(name)
            .cloned()
            .unwrap_or(Value::Null);
        let lref = self
            .lazy
            .entry(name.to_string())
            .or_insert_with(|| LazyRef::unresolved(target, key));
        Ok(lref.clone())
    }

    fn ref_target(&self, name: &str) -> DocumentResult<String> {
        let spec = self
            .class
            .schema()
            .field(name)
            .ok_or_else(|| DocumentError::NotReference(name.to_string()))?;
        match spec.value_type() {
            ValueType::Ref { target } => Ok(target.clone()),
            _ => Err(DocumentError::NotReference(name.to_string())),
        }
    }

    fn mark_mutated(&mut self) {
        if self.state == DocState::Saved {
            self.state = DocState::Modified;
        }
    }

    fn guard_not_deleted(&self, op: &str) -> DocumentResult<()> {
        if self.state == DocState::Deleted {
            return Err(DocumentError::IllegalState(format!(
                "can't {op} on a deleted document"
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Persist dirty state to the store.
    ///
    /// A `New` document is inserted as a whole record, adopting the
    /// store-generated primary key when it declared none. A `Modified`
    /// document sends only its dirty fields as a patch, with its last
    /// seen revision as the conflict guard. Saving a `Saved` document is
    /// a no-op; saving a `Deleted` one is illegal.
    pub async fn save(&mut self, store: &dyn Store) -> DocumentResult<()> {
        match self.state {
            DocState::Deleted => Err(DocumentError::IllegalState(
                "can't save a deleted document".into(),
            )),
            DocState::Saved => Ok(()),
            DocState::New => self.insert(store).await,
            DocState::Modified => self.update(store).await,
        }
    }

    async fn insert(&mut self, store: &dyn Store) -> DocumentResult<()> {
        self.fields.validate_all()?;
        let record = self.fields.to_record();
        let (key, revision) = store.insert(self.class.table(), record).await?;

        // The store may have generated the key for us.
        let pk = self.class.schema().primary_key().to_string();
        self.fields.set_clean(&pk, key)?;
        self.fields.clear_dirty();
        self.state = DocState::Saved;
        self.revision = Some(revision);
        debug!(class = self.class.name(), key = %self.key(), "document inserted");
        Ok(())
    }

    async fn update(&mut self, store: &dyn Store) -> DocumentResult<()> {
        if !self.fields.is_dirty() {
            self.state = DocState::Saved;
            return Ok(());
        }
        self.fields.validate_dirty()?;
        let patch = self.fields.patch_record();
        let key = self.key().clone();
        let revision = store
            .update(self.class.table(), &key, patch, self.revision)
            .await?;
        self.fields.clear_dirty();
        self.state = DocState::Saved;
        self.revision = Some(revision);
        debug!(class = self.class.name(), key = %key, %revision, "document updated");
        Ok(())
    }

    /// Delete the backing record. The instance enters the terminal
    /// `Deleted` state either way; the return value says whether the
    /// store still had the record.
    pub async fn delete(&mut self, store: &dyn Store) -> DocumentResult<bool> {
        match self.state {
            DocState::New => Err(DocumentError::IllegalState(
                "can't delete a document that was never saved".into(),
            )),
            DocState::Deleted => Ok(false),
            DocState::Saved | DocState::Modified => {
                let key = self.key().clone();
                let existed = store.delete(self.class.table(), &key).await?;
                self.state = DocState::Deleted;
                self.revision = None;
                debug!(class = self.class.name(), key = %key, existed, "document deleted");
                Ok(existed)
            }
        }
    }

    /// Construct a `Saved` instance from a raw store record.
    pub fn from_record(
        class: Arc<DocumentClass>,
        record: &Record,
        revision: Revision,
    ) -> DocumentResult<Self> {
        let fields = FieldContainer::from_record(Arc::clone(class.schema()), record)?;
        Ok(Self {
            class,
            fields,
            state: DocState::Saved,
            revision: Some(revision),
            lazy: HashMap::new(),
        })
    }

    /// Load a document by primary key.
    ///
    /// Fails with a pass-through [`StoreError::NotFound`] when the key
    /// does not exist.
    pub async fn load(
        class: Arc<DocumentClass>,
        store: &dyn Store,
        key: Value,
    ) -> DocumentResult<Self> {
        let (record, revision) = store
            .get(class.table(), &key)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                table: class.table().to_string(),
                key: key.to_string(),
            })?;
        Self::from_record(class, &record, revision)
    }

    /// Build instances from an arbitrary store query. The query must
    /// return complete records of this class's table.
    pub async fn from_query(
        class: Arc<DocumentClass>,
        store: &dyn Store,
        query: &Query,
    ) -> DocumentResult<Vec<Self>> {
        let rows = store.query(query).await?;
        rows.iter()
            .map(|(record, revision)| Self::from_record(Arc::clone(&class), record, *revision))
            .collect()
    }

    /// Copy all fields except the primary key into a fresh `New`
    /// instance, ready to be saved as its own record.
    pub fn copy(&self) -> Self {
        let mut fields = self.fields.copy();
        fields.unset(self.class.schema().primary_key());
        Self {
            class: Arc::clone(&self.class),
            fields,
            state: DocState::New,
            revision: None,
            lazy: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Change feed plumbing (crate-internal)
    // -----------------------------------------------------------------------

    /// Apply one field from a change feed event: no dirty marking, any
    /// lazy cache for the field is invalidated.
    pub(crate) fn apply_field(&mut self, name: &str, value: Value) -> DocumentResult<()> {
        self.fields.set_clean(name, value)?;
        if let Some(lref) = self.lazy.remove(name) {
            lref.invalidate();
        }
        Ok(())
    }

    pub(crate) fn set_revision(&mut self, revision: Revision) {
        self.revision = Some(revision);
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.state = DocState::Deleted;
        self.revision = None;
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.class.name(), self.key())
    }
}
