use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};
use crate::value_type::ValueType;

/// A declared, typed slot in a schema.
///
/// Field specs are assembled with chained setters and become immutable
/// once the owning [`crate::Schema`] is built. The spec alone validates
/// values; storage lives in [`crate::FieldContainer`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    name: String,
    value_type: ValueType,
    required: bool,
    indexed: bool,
    primary_key: bool,
    wire_name: Option<String>,
    default: Option<Value>,
}

impl FieldSpec {
    /// Declare a field with the given name and value type.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
            indexed: false,
            primary_key: false,
            wire_name: None,
            default: None,
        }
    }

    /// A non-null value is required for this field to validate.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Ask the store for a secondary index on this field.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Use this field as the container's primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Store this field under a different name than its declared name.
    pub fn wire_name(mut self, name: impl Into<String>) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// Value used when the field has not been set.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Store-side name: the explicit wire name, or the declared name.
    pub fn wire(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Validate a value against this spec: presence first, then type.
    pub fn validate(&self, value: &Value) -> SchemaResult<()> {
        if value.is_null() && self.required {
            return Err(SchemaError::validation(
                &self.name,
                "no value for required field",
            ));
        }
        self.value_type.validate(&self.name, value)
    }

    /// Consistency checks run by the schema builder before the spec is
    /// frozen into a schema.
    pub(crate) fn check(&self) -> SchemaResult<()> {
        if self.primary_key && self.indexed {
            return Err(SchemaError::IllegalSpec(format!(
                "field `{}` can't be indexed *and* primary key",
                self.name
            )));
        }
        if let Some(default) = &self.default {
            self.validate(default).map_err(|e| {
                SchemaError::IllegalSpec(format!(
                    "default value for field `{}` fails its own validator: {e}",
                    self.name
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_defaults_to_name() {
        let spec = FieldSpec::new("title", ValueType::string());
        assert_eq!(spec.wire(), "title");

        let spec = FieldSpec::new("title", ValueType::string()).wire_name("t");
        assert_eq!(spec.wire(), "t");
    }

    #[test]
    fn required_rejects_null() {
        let spec = FieldSpec::new("name", ValueType::string()).required();
        assert!(spec.validate(&Value::Null).is_err());
        assert!(spec.validate(&json!("ok")).is_ok());
    }

    #[test]
    fn optional_accepts_null() {
        let spec = FieldSpec::new("name", ValueType::string());
        assert!(spec.validate(&Value::Null).is_ok());
    }

    #[test]
    fn indexed_primary_key_is_illegal() {
        let spec = FieldSpec::new("slug", ValueType::string())
            .indexed()
            .primary_key();
        let err = spec.check().unwrap_err();
        assert!(matches!(err, SchemaError::IllegalSpec(_)));
    }

    #[test]
    fn invalid_default_is_illegal() {
        let spec = FieldSpec::new("count", ValueType::int()).default_value(json!("zero"));
        let err = spec.check().unwrap_err();
        assert!(matches!(err, SchemaError::IllegalSpec(_)));
    }

    #[test]
    fn valid_default_passes_check() {
        let spec = FieldSpec::new("count", ValueType::int()).default_value(json!(0));
        assert!(spec.check().is_ok());
    }
}
