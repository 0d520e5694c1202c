use std::sync::Arc;

use docflow_schema::{FieldSpec, Schema, SchemaBuilder};
use docflow_store::TableSpec;

use crate::error::DocumentResult;

/// Runtime descriptor of a document class.
///
/// Where a statically typed model would be a struct, docflow documents
/// are described at runtime: a store-facing class name (the registry
/// key), a table name, and a frozen [`Schema`]. Instances of the class
/// are [`Document`]s sharing the descriptor through an `Arc`.
///
/// [`Document`]: crate::Document
#[derive(Debug)]
pub struct DocumentClass {
    name: String,
    table: String,
    schema: Arc<Schema>,
}

impl DocumentClass {
    /// Start declaring a class. The table name defaults to the
    /// snake-cased plural of the class name (`GuildHero` → `guild_heroes`).
    pub fn builder(name: impl Into<String>) -> DocumentClassBuilder {
        DocumentClassBuilder {
            name: name.into(),
            table: None,
            schema: Schema::builder(),
        }
    }

    /// Store-facing class name; unique per registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the backing store table.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Wire name of the primary key field.
    pub fn primary_key_wire(&self) -> &str {
        self.schema.primary_key_spec().wire()
    }

    /// Table spec for schema initialization: primary key plus secondary
    /// indexes for every `indexed` field.
    pub fn table_spec(&self) -> TableSpec {
        let mut spec = TableSpec::new(&self.table, self.primary_key_wire());
        for field in self.schema.fields() {
            if field.is_indexed() {
                spec = spec.index(field.wire());
            }
        }
        spec
    }
}

/// Builder for [`DocumentClass`].
pub struct DocumentClassBuilder {
    name: String,
    table: Option<String>,
    schema: SchemaBuilder,
}

impl DocumentClassBuilder {
    /// Override the derived table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declare a field. Order of calls is the schema's field order.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.schema = self.schema.field(spec);
        self
    }

    /// Freeze the class. Fails when the field specs are illegal (see
    /// [`SchemaBuilder::build`]).
    ///
    /// [`SchemaBuilder::build`]: docflow_schema::SchemaBuilder::build
    pub fn build(self) -> DocumentResult<Arc<DocumentClass>> {
        let schema = Arc::new(self.schema.build()?);
        let table = self.table.unwrap_or_else(|| tableize(&self.name));
        Ok(Arc::new(DocumentClass {
            name: self.name,
            table,
            schema,
        }))
    }
}

/// Derive a table name from a class name: snake case, pluralized.
fn tableize(name: &str) -> String {
    let snake = to_snake_case(name);
    pluralize(&snake)
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        let penultimate = stem.chars().last();
        if penultimate.map_or(false, |c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_schema::ValueType;

    // -----------------------------------------------------------------------
    // Table naming
    // -----------------------------------------------------------------------

    #[test]
    fn tableize_snake_cases_and_pluralizes() {
        assert_eq!(tableize("Hero"), "heroes");
        assert_eq!(tableize("GuildMember"), "guild_members");
        assert_eq!(tableize("Category"), "categories");
        assert_eq!(tableize("Boss"), "bosses");
        assert_eq!(tableize("Day"), "days");
    }

    #[test]
    fn explicit_table_name_wins() {
        let class = DocumentClass::builder("Hero")
            .table("legacy_heroes")
            .build()
            .unwrap();
        assert_eq!(class.table(), "legacy_heroes");
    }

    // -----------------------------------------------------------------------
    // Schema wiring
    // -----------------------------------------------------------------------

    #[test]
    fn builder_assembles_schema_with_injected_pk() {
        let class = DocumentClass::builder("Hero")
            .field(FieldSpec::new("name", ValueType::string()).required())
            .build()
            .unwrap();
        assert_eq!(class.name(), "Hero");
        assert_eq!(class.schema().primary_key(), "id");
        assert_eq!(class.primary_key_wire(), "id");
    }

    #[test]
    fn table_spec_collects_indexes() {
        let class = DocumentClass::builder("Hero")
            .field(FieldSpec::new("name", ValueType::string()).indexed())
            .field(FieldSpec::new("guild", ValueType::string()).indexed().wire_name("g"))
            .field(FieldSpec::new("level", ValueType::int()))
            .build()
            .unwrap();
        let spec = class.table_spec();
        assert_eq!(spec.name(), "heroes");
        assert_eq!(spec.primary_key(), "id");
        assert_eq!(spec.indexes(), &["name".to_string(), "g".to_string()]);
    }

    #[test]
    fn illegal_schema_fails_build() {
        let err = DocumentClass::builder("Hero")
            .field(FieldSpec::new("a", ValueType::Any).primary_key())
            .field(FieldSpec::new("b", ValueType::Any).primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::DocumentError::Schema(_)));
    }
}
