use serde::{Deserialize, Serialize};

/// Description of a store table: its name, the wire name of the primary
/// key field, and the secondary indexes to maintain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    name: String,
    primary_key: String,
    indexes: Vec<String>,
}

impl TableSpec {
    /// Describe a table keyed by the given primary key wire name.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            indexes: Vec::new(),
        }
    }

    /// Add a secondary index on a wire field name.
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indexes.push(field.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_indexes() {
        let spec = TableSpec::new("heroes", "id").index("name").index("guild");
        assert_eq!(spec.name(), "heroes");
        assert_eq!(spec.primary_key(), "id");
        assert_eq!(spec.indexes(), &["name".to_string(), "guild".to_string()]);
    }
}
