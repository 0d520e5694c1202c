use std::collections::HashMap;

use crate::error::{SchemaError, SchemaResult};
use crate::field::FieldSpec;
use crate::value_type::ValueType;

/// Wire name the builder uses when it has to inject a primary key field.
pub const GENERATED_PK_NAME: &str = "id";

/// An ordered, frozen set of field specs with exactly one primary key.
///
/// Built with [`SchemaBuilder`]. When no field is flagged as primary key,
/// the builder injects an `id` field of type [`ValueType::Any`], leaving
/// key generation to the store.
#[derive(Clone, Debug)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    by_name: HashMap<String, usize>,
    wire_to_name: HashMap<String, String>,
    primary_key: String,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Look up a field spec by declared name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Look up a field spec by its wire name.
    pub fn field_by_wire(&self, wire: &str) -> Option<&FieldSpec> {
        self.wire_to_name.get(wire).and_then(|n| self.field(n))
    }

    /// Translate a wire name back to the declared field name. Unknown wire
    /// names map to themselves (undeclared fields use one name in both
    /// worlds).
    pub fn field_name_for_wire<'a>(&'a self, wire: &'a str) -> &'a str {
        self.wire_to_name.get(wire).map_or(wire, String::as_str)
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// `true` if some declared field stores under this wire name.
    pub fn has_wire_name(&self, wire: &str) -> bool {
        self.wire_to_name.contains_key(wire)
    }

    /// Declared name of the primary key field.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The primary key's field spec.
    pub fn primary_key_spec(&self) -> &FieldSpec {
        self.field(&self.primary_key)
            .expect("schema invariant: primary key field exists")
    }
}

/// Assembles a [`Schema`], enforcing spec-level invariants at build time.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field spec. Order of calls is the schema's field order.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Validate the accumulated specs and freeze them into a schema.
    ///
    /// Fails with [`SchemaError::IllegalSpec`] on duplicate field or wire
    /// names, more than one primary key, or a primary key clash with the
    /// injected `id` field.
    pub fn build(mut self) -> SchemaResult<Schema> {
        let mut primary_key: Option<String> = None;
        for spec in &self.fields {
            spec.check()?;
            if spec.is_primary_key() {
                if let Some(existing) = &primary_key {
                    return Err(SchemaError::IllegalSpec(format!(
                        "schema can't have more than one primary key (`{existing}` and `{}`)",
                        spec.name()
                    )));
                }
                primary_key = Some(spec.name().to_string());
            }
        }

        // No declared primary key: inject `id` and let the store generate
        // key values. A user-declared non-pk `id` field would shadow it.
        let primary_key = match primary_key {
            Some(name) => name,
            None => {
                if self.fields.iter().any(|f| f.name() == GENERATED_PK_NAME) {
                    return Err(SchemaError::IllegalSpec(format!(
                        "`{GENERATED_PK_NAME}` is reserved for the generated primary key field"
                    )));
                }
                self.fields
                    .push(FieldSpec::new(GENERATED_PK_NAME, ValueType::Any).primary_key());
                GENERATED_PK_NAME.to_string()
            }
        };

        let mut by_name = HashMap::new();
        let mut wire_to_name = HashMap::new();
        for (i, spec) in self.fields.iter().enumerate() {
            if by_name.insert(spec.name().to_string(), i).is_some() {
                return Err(SchemaError::IllegalSpec(format!(
                    "duplicate field name `{}`",
                    spec.name()
                )));
            }
            if wire_to_name
                .insert(spec.wire().to_string(), spec.name().to_string())
                .is_some()
            {
                return Err(SchemaError::IllegalSpec(format!(
                    "duplicate wire name `{}`",
                    spec.wire()
                )));
            }
        }

        Ok(Schema {
            fields: self.fields,
            by_name,
            wire_to_name,
            primary_key,
        })
    }
}
