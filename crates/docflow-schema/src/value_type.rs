use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};

/// Validation and wire-conversion rule for one field slot.
///
/// A `ValueType` holds no data; it describes what values are acceptable
/// in a field and how they look on the wire. `Null` always passes here —
/// presence requirements are enforced by [`crate::FieldSpec`]'s `required`
/// flag, not by the value type.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    /// Accepts any value. No conversion.
    Any,
    /// Boolean.
    Bool,
    /// Signed integer, optionally range-restricted (inclusive bounds).
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    /// Floating point number. Integers pass too.
    Float,
    /// String, optionally length-capped and/or required to contain a
    /// fixed substring.
    String {
        max_length: Option<usize>,
        contains: Option<std::string::String>,
    },
    /// Sequence whose elements all satisfy the inner type.
    List(Box<ValueType>),
    /// Nested mapping whose values all satisfy the inner type. Keys are
    /// strings, as in any store record.
    Map(Box<ValueType>),
    /// Reference to a document of the named class. The wire value is the
    /// referenced document's primary key; resolution is layered above
    /// this crate.
    Ref { target: std::string::String },
}

impl ValueType {
    /// Plain integer with no bounds.
    pub fn int() -> Self {
        Self::Int {
            min: None,
            max: None,
        }
    }

    /// Plain string with no constraints.
    pub fn string() -> Self {
        Self::String {
            max_length: None,
            contains: None,
        }
    }

    /// Reference to a document class by its registered name.
    pub fn reference(target: impl Into<std::string::String>) -> Self {
        Self::Ref {
            target: target.into(),
        }
    }

    /// Human-readable name of this value type, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int { .. } => "int",
            Self::Float => "float",
            Self::String { .. } => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Ref { .. } => "ref",
        }
    }

    /// Validate a wire value against this type.
    ///
    /// `field` is the owning field's name, threaded through for error
    /// reporting. `Null` passes unconditionally.
    pub fn validate(&self, field: &str, value: &Value) -> SchemaResult<()> {
        if value.is_null() {
            return Ok(());
        }

        match self {
            Self::Any => Ok(()),
            Self::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(self.mismatch(field, value))
                }
            }
            Self::Int { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| self.mismatch(field, value))?;
                if let Some(lo) = min {
                    if n < *lo {
                        return Err(SchemaError::validation(
                            field,
                            format!("{n} is below the minimum {lo}"),
                        ));
                    }
                }
                if let Some(hi) = max {
                    if n > *hi {
                        return Err(SchemaError::validation(
                            field,
                            format!("{n} is above the maximum {hi}"),
                        ));
                    }
                }
                Ok(())
            }
            Self::Float => {
                if value.is_f64() || value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(self.mismatch(field, value))
                }
            }
            Self::String {
                max_length,
                contains,
            } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| self.mismatch(field, value))?;
                if let Some(cap) = max_length {
                    if s.chars().count() > *cap {
                        return Err(SchemaError::validation(
                            field,
                            format!("string is too long ({} chars, max {cap})", s.chars().count()),
                        ));
                    }
                }
                if let Some(needle) = contains {
                    if !s.contains(needle.as_str()) {
                        return Err(SchemaError::validation(
                            field,
                            format!("string does not contain required `{needle}`"),
                        ));
                    }
                }
                Ok(())
            }
            Self::List(elem) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| self.mismatch(field, value))?;
                for item in items {
                    elem.validate(field, item)?;
                }
                Ok(())
            }
            Self::Map(val_type) => {
                let entries = value
                    .as_object()
                    .ok_or_else(|| self.mismatch(field, value))?;
                for v in entries.values() {
                    val_type.validate(field, v)?;
                }
                Ok(())
            }
            Self::Ref { .. } => {
                // The wire value is the referenced document's primary key.
                // Any non-null scalar key shape is acceptable here.
                if value.is_array() || value.is_object() {
                    Err(SchemaError::validation(
                        field,
                        "a reference key must be a scalar value",
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn mismatch(&self, field: &str, value: &Value) -> SchemaError {
        SchemaError::validation(
            field,
            format!("value {value} is not of type {}", self.kind_name()),
        )
    }
}

impl Default for ValueType {
    fn default() -> Self {
        Self::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // Scalars
    // -----------------------------------------------------------------------

    #[test]
    fn any_accepts_everything() {
        for v in [json!(null), json!(1), json!("x"), json!([1, 2]), json!({"a": 1})] {
            assert!(ValueType::Any.validate("f", &v).is_ok());
        }
    }

    #[test]
    fn null_always_passes() {
        for vt in [
            ValueType::Bool,
            ValueType::int(),
            ValueType::Float,
            ValueType::string(),
            ValueType::List(Box::new(ValueType::Any)),
            ValueType::reference("Hero"),
        ] {
            assert!(vt.validate("f", &Value::Null).is_ok());
        }
    }

    #[test]
    fn bool_rejects_other_types() {
        assert!(ValueType::Bool.validate("f", &json!(true)).is_ok());
        assert!(ValueType::Bool.validate("f", &json!(1)).is_err());
    }

    #[test]
    fn int_bounds() {
        let vt = ValueType::Int {
            min: Some(0),
            max: Some(10),
        };
        assert!(vt.validate("f", &json!(0)).is_ok());
        assert!(vt.validate("f", &json!(10)).is_ok());
        assert!(vt.validate("f", &json!(-1)).is_err());
        assert!(vt.validate("f", &json!(11)).is_err());
        assert!(vt.validate("f", &json!("5")).is_err());
    }

    #[test]
    fn float_accepts_integers() {
        assert!(ValueType::Float.validate("f", &json!(1.5)).is_ok());
        assert!(ValueType::Float.validate("f", &json!(3)).is_ok());
        assert!(ValueType::Float.validate("f", &json!("3")).is_err());
    }

    #[test]
    fn string_max_length() {
        let vt = ValueType::String {
            max_length: Some(3),
            contains: None,
        };
        assert!(vt.validate("f", &json!("abc")).is_ok());
        assert!(vt.validate("f", &json!("abcd")).is_err());
    }

    #[test]
    fn string_contains() {
        let vt = ValueType::String {
            max_length: None,
            contains: Some("@".into()),
        };
        assert!(vt.validate("f", &json!("a@b")).is_ok());
        assert!(vt.validate("f", &json!("ab")).is_err());
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    #[test]
    fn list_validates_elements() {
        let vt = ValueType::List(Box::new(ValueType::int()));
        assert!(vt.validate("f", &json!([1, 2, 3])).is_ok());
        assert!(vt.validate("f", &json!([1, "x"])).is_err());
        assert!(vt.validate("f", &json!("not a list")).is_err());
    }

    #[test]
    fn map_validates_values() {
        let vt = ValueType::Map(Box::new(ValueType::string()));
        assert!(vt.validate("f", &json!({"a": "x", "b": "y"})).is_ok());
        assert!(vt.validate("f", &json!({"a": 1})).is_err());
    }

    #[test]
    fn nested_list_of_maps() {
        let vt = ValueType::List(Box::new(ValueType::Map(Box::new(ValueType::int()))));
        assert!(vt.validate("f", &json!([{"a": 1}, {"b": 2}])).is_ok());
        assert!(vt.validate("f", &json!([{"a": "x"}])).is_err());
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------

    #[test]
    fn ref_accepts_scalar_keys() {
        let vt = ValueType::reference("Hero");
        assert!(vt.validate("f", &json!("abc-123")).is_ok());
        assert!(vt.validate("f", &json!(42)).is_ok());
        assert!(vt.validate("f", &json!(["composite"])).is_err());
    }

    #[test]
    fn error_message_names_the_field() {
        let err = ValueType::Bool.validate("active", &json!(3)).unwrap_err();
        assert!(err.to_string().contains("active"));
    }
}
