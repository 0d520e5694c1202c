use docflow_schema::{Record, Value};
use serde::{Deserialize, Serialize};

/// A minimal store query: equality filters over one table, with an
/// optional result cap.
///
/// This is deliberately small. Anything richer (ranges, joins,
/// aggregation) belongs to the underlying driver's query language, which
/// this layer does not wrap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    table: String,
    filters: Vec<(String, Value)>,
    limit: Option<usize>,
}

impl Query {
    /// Query all records of a table.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: name.into(),
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Keep only records whose wire field equals the given value.
    /// Multiple filters are conjunctive.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// Cap the number of returned records.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// `true` if the record satisfies every filter.
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, level: i64) -> Record {
        [
            ("name".to_string(), json!(name)),
            ("level".to_string(), json!(level)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn unfiltered_matches_everything() {
        let q = Query::table("heroes");
        assert!(q.matches(&record("ada", 1)));
    }

    #[test]
    fn filters_are_conjunctive() {
        let q = Query::table("heroes")
            .filter("name", json!("ada"))
            .filter("level", json!(3));
        assert!(q.matches(&record("ada", 3)));
        assert!(!q.matches(&record("ada", 4)));
        assert!(!q.matches(&record("bob", 3)));
    }

    #[test]
    fn missing_field_never_matches() {
        let q = Query::table("heroes").filter("guild", json!("north"));
        assert!(!q.matches(&record("ada", 1)));
    }
}
