use std::collections::HashMap;
use std::sync::RwLock;

use docflow_schema::{Record, Revision, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeRouter};
use crate::query::Query;
use crate::table::TableSpec;
use crate::traits::Store;
use async_trait::async_trait;

/// Default capacity of per-subscriber change feed channels.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Canonical map key for a primary key value.
///
/// Primary keys are scalars; their compact JSON rendering is unique per
/// value and doubles as the display form in errors.
fn encode_key(key: &Value) -> String {
    key.to_string()
}

struct TableState {
    spec: TableSpec,
    records: HashMap<String, (Record, Revision)>,
    router: ChangeRouter,
}

impl TableState {
    fn new(spec: TableSpec) -> Self {
        Self {
            spec,
            records: HashMap::new(),
            router: ChangeRouter::new(),
        }
    }
}

/// In-memory, `HashMap`-based record store.
///
/// Intended for tests and embedding. Tables are held behind a `RwLock`;
/// records are cloned on read and write. Every mutation publishes a
/// [`ChangeEvent`] to the table's feed subscribers before the call
/// returns, and bumps the record's [`Revision`] for conflict detection.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, TableState>>,
    channel_capacity: usize,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a store with a custom change feed channel capacity.
    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            channel_capacity: capacity,
        }
    }

    /// Number of records in a table. Mostly useful in tests.
    pub fn table_len(&self, table: &str) -> StoreResult<usize> {
        let tables = self.tables.read().expect("store lock poisoned");
        let state = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(state.records.len())
    }

    /// Number of live feed subscribers on a table.
    pub fn subscriber_count(&self, table: &str) -> StoreResult<usize> {
        let tables = self.tables.read().expect("store lock poisoned");
        let state = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(state.router.subscriber_count())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, table: &str, key: &Value) -> StoreResult<Option<(Record, Revision)>> {
        let tables = self.tables.read().expect("store lock poisoned");
        let state = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(state.records.get(&encode_key(key)).cloned())
    }

    async fn insert(&self, table: &str, mut record: Record) -> StoreResult<(Value, Revision)> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        let state = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let pk = state.spec.primary_key().to_string();
        let key = match record.get(&pk) {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                // No caller-provided key: generate one.
                let generated = Value::String(Uuid::new_v4().to_string());
                record.insert(pk, generated.clone());
                generated
            }
        };

        let encoded = encode_key(&key);
        if state.records.contains_key(&encoded) {
            return Err(StoreError::DuplicateKey {
                table: table.to_string(),
                key: encoded,
            });
        }

        let revision = Revision::INITIAL;
        state.records.insert(encoded, (record.clone(), revision));
        state.router.route(&ChangeEvent {
            table: table.to_string(),
            key: key.clone(),
            old_val: None,
            new_val: Some(record),
            revision,
        });
        debug!(table, key = %key, "record inserted");
        Ok((key, revision))
    }

    async fn update(
        &self,
        table: &str,
        key: &Value,
        patch: Record,
        expected: Option<Revision>,
    ) -> StoreResult<Revision> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        let state = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        let encoded = encode_key(key);
        let (record, revision) =
            state
                .records
                .get_mut(&encoded)
                .ok_or_else(|| StoreError::NotFound {
                    table: table.to_string(),
                    key: encoded.clone(),
                })?;

        if let Some(expected) = expected {
            if expected != *revision {
                return Err(StoreError::Conflict {
                    table: table.to_string(),
                    key: encoded,
                    expected,
                    found: *revision,
                });
            }
        }

        let old_val = record.clone();
        record.merge(&patch);
        *revision = revision.next();
        let (new_val, revision) = (record.clone(), *revision);

        state.router.route(&ChangeEvent {
            table: table.to_string(),
            key: key.clone(),
            old_val: Some(old_val),
            new_val: Some(new_val),
            revision,
        });
        debug!(table, key = %key, %revision, "record updated");
        Ok(revision)
    }

    async fn delete(&self, table: &str, key: &Value) -> StoreResult<bool> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        let state = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        match state.records.remove(&encode_key(key)) {
            Some((old_val, revision)) => {
                state.router.route(&ChangeEvent {
                    table: table.to_string(),
                    key: key.clone(),
                    old_val: Some(old_val),
                    new_val: None,
                    revision,
                });
                debug!(table, key = %key, "record deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<(Record, Revision)>> {
        let tables = self.tables.read().expect("store lock poisoned");
        let state = tables
            .get(query.table_name())
            .ok_or_else(|| StoreError::UnknownTable(query.table_name().to_string()))?;

        // Sort by encoded key for deterministic result order.
        let mut entries: Vec<(&String, &(Record, Revision))> = state
            .records
            .iter()
            .filter(|(_, (record, _))| query.matches(record))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let limit = query.limit_value().unwrap_or(usize::MAX);
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn changes(&self, table: &str, key: Option<Value>) -> StoreResult<ChangeFeed> {
        let tables = self.tables.read().expect("store lock poisoned");
        let state = tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(state
            .router
            .subscribe(ChangeFilter { key }, self.channel_capacity))
    }

    async fn create_table(&self, spec: &TableSpec) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        if tables.contains_key(spec.name()) {
            return Err(StoreError::TableExists(spec.name().to_string()));
        }
        debug!(table = spec.name(), primary_key = spec.primary_key(), "table created");
        tables.insert(spec.name().to_string(), TableState::new(spec.clone()));
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let tables = self.tables.read().expect("store lock poisoned");
        Ok(tables.contains_key(table))
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().expect("store lock poisoned");
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.tables.read().expect("store lock poisoned").len();
        f.debug_struct("MemoryStore")
            .field("table_count", &count)
            .finish()
    }
}
