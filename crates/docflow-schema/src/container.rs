use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{SchemaError, SchemaResult};
use crate::record::Record;
use crate::schema::Schema;

const NULL: Value = Value::Null;

/// Selector for the field views: everything, declared fields only, or
/// undeclared fields only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Which {
    All,
    DeclaredOnly,
    UndeclaredOnly,
}

/// Schema-aware bag of named fields.
///
/// A container holds two kinds of fields behind one string-keyed
/// interface: declared fields (validated against their [`FieldSpec`] on
/// every set) and undeclared fields (unconstrained key/value data that
/// passes through serialization unchanged, in insertion order).
///
/// Every successful mutation marks the field dirty, so the persistence
/// layer above can write minimal patches and knows whether a save is
/// needed at all. State applied from the store (loads, change feeds)
/// goes through [`FieldContainer::set_clean`] and does not dirty the
/// container.
///
/// The container is not safe for concurrent mutation; wrap it in
/// external synchronization if tasks share one instance.
///
/// [`FieldSpec`]: crate::FieldSpec
#[derive(Clone, Debug)]
pub struct FieldContainer {
    schema: Arc<Schema>,
    declared: HashMap<String, Value>,
    undeclared: IndexMap<String, Value>,
    dirty: IndexSet<String>,
}

impl FieldContainer {
    /// Create an empty container for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            declared: HashMap::new(),
            undeclared: IndexMap::new(),
            dirty: IndexSet::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    // -----------------------------------------------------------------------
    // Field access
    // -----------------------------------------------------------------------

    /// Get a field's value.
    ///
    /// Declared fields always yield a value: what was set, else the
    /// spec's default, else `Null`. Undeclared fields yield their value
    /// or `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(spec) = self.schema.field(name) {
            Some(
                self.declared
                    .get(name)
                    .or_else(|| spec.default())
                    .unwrap_or(&NULL),
            )
        } else {
            self.undeclared.get(name)
        }
    }

    /// Set a field's value, validating declared fields and marking the
    /// field dirty on success.
    ///
    /// An undeclared name that equals some declared field's wire name is
    /// rejected: it would collide in the record representation.
    pub fn set(&mut self, name: &str, value: Value) -> SchemaResult<()> {
        self.store(name, value)?;
        self.dirty.insert(name.to_string());
        Ok(())
    }

    /// Set a field without marking it dirty. Used when applying state
    /// that came from the store (loads, change feed events).
    pub fn set_clean(&mut self, name: &str, value: Value) -> SchemaResult<()> {
        self.store(name, value)
    }

    fn store(&mut self, name: &str, value: Value) -> SchemaResult<()> {
        if let Some(spec) = self.schema.field(name) {
            spec.validate(&value)?;
            self.declared.insert(name.to_string(), value);
        } else {
            if self.schema.has_wire_name(name) {
                return Err(SchemaError::WireNameCollision(name.to_string()));
            }
            self.undeclared.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Remove a field's value, marking the field dirty. Returns `true`
    /// if a value was present. A removed declared field falls back to
    /// its default on the next `get`.
    pub fn unset(&mut self, name: &str) -> bool {
        let removed = if self.schema.contains(name) {
            self.declared.remove(name).is_some()
        } else {
            self.undeclared.shift_remove(name).is_some()
        };
        if removed {
            self.dirty.insert(name.to_string());
        }
        removed
    }

    /// `true` for every declared field name and for present undeclared
    /// fields.
    pub fn contains(&self, name: &str) -> bool {
        self.schema.contains(name) || self.undeclared.contains_key(name)
    }

    /// Field names: declared fields in schema order, then undeclared
    /// fields in insertion order.
    pub fn keys(&self, which: Which) -> Vec<&str> {
        let mut out = Vec::new();
        if which != Which::UndeclaredOnly {
            out.extend(self.schema.fields().map(|f| f.name()));
        }
        if which != Which::DeclaredOnly {
            out.extend(self.undeclared.keys().map(String::as_str));
        }
        out
    }

    pub fn len(&self, which: Which) -> usize {
        match which {
            Which::All => self.schema.len() + self.undeclared.len(),
            Which::DeclaredOnly => self.schema.len(),
            Which::UndeclaredOnly => self.undeclared.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len(Which::All) == 0
    }

    // -----------------------------------------------------------------------
    // Dirty tracking
    // -----------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Names of fields touched since the last [`clear_dirty`], in touch
    /// order.
    ///
    /// [`clear_dirty`]: FieldContainer::clear_dirty
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    // -----------------------------------------------------------------------
    // Record conversion
    // -----------------------------------------------------------------------

    /// Produce the store-ready representation of the whole container.
    ///
    /// Declared fields appear under their wire names; an unset primary
    /// key is omitted so the store can generate one. Undeclared fields
    /// follow in insertion order.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        for spec in self.schema.fields() {
            let value = self
                .declared
                .get(spec.name())
                .or_else(|| spec.default())
                .unwrap_or(&NULL);
            if spec.is_primary_key() && value.is_null() {
                continue;
            }
            record.insert(spec.wire(), value.clone());
        }
        for (k, v) in &self.undeclared {
            record.insert(k.clone(), v.clone());
        }
        record
    }

    /// Store-ready representation of the dirty fields only.
    ///
    /// A dirty name with no remaining value patches to `Null`: a store
    /// update cannot remove keys from a record, so removed fields are
    /// overwritten instead.
    pub fn patch_record(&self) -> Record {
        let mut record = Record::new();
        for name in &self.dirty {
            if let Some(spec) = self.schema.field(name) {
                let value = self
                    .declared
                    .get(name.as_str())
                    .or_else(|| spec.default())
                    .unwrap_or(&NULL);
                record.insert(spec.wire(), value.clone());
            } else {
                record.insert(name.clone(), self.undeclared.get(name).cloned().unwrap_or(NULL));
            }
        }
        record
    }

    /// Populate a container from a raw record, validating declared
    /// fields and passing unknown keys through as undeclared fields.
    /// The resulting container is clean.
    pub fn from_record(schema: Arc<Schema>, record: &Record) -> SchemaResult<Self> {
        let mut container = Self::new(schema);
        for (wire, value) in record.iter() {
            let name = container.schema.field_name_for_wire(wire).to_string();
            container.set_clean(&name, value.clone())?;
        }
        Ok(container)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Validate every declared field's effective value. Run before a
    /// full insert.
    pub fn validate_all(&self) -> SchemaResult<()> {
        for spec in self.schema.fields() {
            let value = self
                .declared
                .get(spec.name())
                .or_else(|| spec.default())
                .unwrap_or(&NULL);
            spec.validate(value)?;
        }
        Ok(())
    }

    /// Validate the dirty declared fields. Run before a patch update;
    /// catches in-place mutation of list or map values the container
    /// could not observe.
    pub fn validate_dirty(&self) -> SchemaResult<()> {
        for name in &self.dirty {
            if let Some(spec) = self.schema.field(name) {
                let value = self
                    .declared
                    .get(name.as_str())
                    .or_else(|| spec.default())
                    .unwrap_or(&NULL);
                spec.validate(value)?;
            }
        }
        Ok(())
    }

    /// Shallow-copy all fields into a fresh container. Every copied
    /// field is dirty in the copy, as if it had been set by hand.
    pub fn copy(&self) -> Self {
        let mut out = Self::new(Arc::clone(&self.schema));
        for (k, v) in &self.declared {
            out.declared.insert(k.clone(), v.clone());
            out.dirty.insert(k.clone());
        }
        for (k, v) in &self.undeclared {
            out.undeclared.insert(k.clone(), v.clone());
            out.dirty.insert(k.clone());
        }
        out
    }
}

/// Containers compare by observable content: the effective value of
/// every declared field (what `get` yields, so an unset field equals an
/// explicitly stored `Null` or default) plus the undeclared fields.
/// Dirty state is not part of identity.
impl PartialEq for FieldContainer {
    fn eq(&self, other: &Self) -> bool {
        self.schema.len() == other.schema.len()
            && self
                .schema
                .fields()
                .all(|f| other.schema.contains(f.name()) && self.get(f.name()) == other.get(f.name()))
            && self.undeclared == other.undeclared
    }
}
