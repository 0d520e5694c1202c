use std::sync::Arc;

use docflow_schema::{Record, Value};
use docflow_store::{ChangeEvent, Store};
use tracing::debug;

use crate::class::DocumentClass;
use crate::document::Document;
use crate::error::{DocumentError, DocumentResult};

/// One typed change delivered by a [`DocumentFeed`].
///
/// `document` is the post-change view (`None` for deletes on a table
/// feed; a `Deleted` instance on a tracking feed). `changed_fields`
/// holds the declared names of the fields that differ between the old
/// and new record, with fields removed server-side reported as changed
/// to `Null`. The raw store event rides along untouched.
#[derive(Clone, Debug)]
pub struct DocumentChange {
    pub document: Option<Document>,
    pub changed_fields: Vec<String>,
    pub event: ChangeEvent,
}

impl DocumentChange {
    pub fn is_delete(&self) -> bool {
        self.event.is_delete()
    }
}

/// Cursor over live changes, yielding typed documents instead of raw
/// records.
///
/// Two flavors share the type:
/// - [`table`] follows every change in a class's table and builds a
///   fresh [`Document`] per event.
/// - [`follow`] tracks one loaded instance, patching its fields in
///   place as changes arrive and yielding the updated view. Lazy
///   reference caches on touched fields are invalidated.
///
/// Drop the feed to unsubscribe.
///
/// [`table`]: DocumentFeed::table
/// [`follow`]: DocumentFeed::follow
pub struct DocumentFeed {
    class: Arc<DocumentClass>,
    feed: docflow_store::ChangeFeed,
    tracked: Option<Document>,
}

impl DocumentFeed {
    /// Follow all changes in the class's table.
    pub async fn table(class: Arc<DocumentClass>, store: &dyn Store) -> DocumentResult<Self> {
        let feed = store.changes(class.table(), None).await?;
        debug!(class = class.name(), table = class.table(), "table feed opened");
        Ok(Self {
            class,
            feed,
            tracked: None,
        })
    }

    /// Track one persisted document, updating it in place per event.
    pub async fn follow(document: &Document, store: &dyn Store) -> DocumentResult<Self> {
        if !document.is_persisted() {
            return Err(DocumentError::IllegalState(
                "can't follow a document that is not stored in the database".into(),
            ));
        }
        let class = Arc::clone(document.class());
        let feed = store
            .changes(class.table(), Some(document.key().clone()))
            .await?;
        debug!(class = class.name(), key = %document.key(), "document feed opened");
        Ok(Self {
            class,
            feed,
            tracked: Some(document.clone()),
        })
    }

    /// Wait for the next change. Returns `Ok(None)` once the underlying
    /// store feed closes; a lagged consumer gets the store's lag error
    /// and may resubscribe.
    pub async fn next(&mut self) -> DocumentResult<Option<DocumentChange>> {
        loop {
            let Some(event) = self.feed.next().await? else {
                return Ok(None);
            };

            let changes =
                diff_records(&self.class, event.old_val.as_ref(), event.new_val.as_ref());
            if changes.is_empty() && !event.is_delete() {
                // Nothing observable changed. Keep the tracked revision
                // fresh so a later save doesn't conflict spuriously.
                if let Some(doc) = &mut self.tracked {
                    doc.set_revision(event.revision);
                }
                continue;
            }
            return self.deliver(event, changes).map(Some);
        }
    }

    fn deliver(
        &mut self,
        event: ChangeEvent,
        changes: Vec<(String, Value)>,
    ) -> DocumentResult<DocumentChange> {
        let changed_fields: Vec<String> = changes.iter().map(|(name, _)| name.clone()).collect();

        let document = match &mut self.tracked {
            Some(doc) => {
                if event.is_delete() {
                    doc.mark_deleted();
                } else {
                    for (name, value) in changes {
                        doc.apply_field(&name, value)?;
                    }
                    doc.set_revision(event.revision);
                }
                Some(doc.clone())
            }
            None => match &event.new_val {
                Some(record) => Some(Document::from_record(
                    Arc::clone(&self.class),
                    record,
                    event.revision,
                )?),
                None => None,
            },
        };

        Ok(DocumentChange {
            document,
            changed_fields,
            event,
        })
    }
}

impl std::fmt::Debug for DocumentFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentFeed")
            .field("class", &self.class.name())
            .field("tracking", &self.tracked.is_some())
            .finish()
    }
}

/// Diff two wire records into `(declared field name, new value)` pairs.
///
/// Keys present only in the old record are reported with `Null`: a
/// field removed server-side reads as unset afterwards.
fn diff_records(
    class: &DocumentClass,
    old: Option<&Record>,
    new: Option<&Record>,
) -> Vec<(String, Value)> {
    let schema = class.schema();
    let mut out = Vec::new();
    if let Some(new) = new {
        for (wire, value) in new.iter() {
            let unchanged = old.and_then(|o| o.get(wire)) == Some(value);
            if !unchanged {
                out.push((schema.field_name_for_wire(wire).to_string(), value.clone()));
            }
        }
    }
    if let Some(old) = old {
        for (wire, _) in old.iter() {
            if new.map_or(true, |n| n.get(wire).is_none()) {
                out.push((schema.field_name_for_wire(wire).to_string(), Value::Null));
            }
        }
    }
    out
}
