use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire representation of a field container: an order-preserving mapping
/// from wire field name to value.
///
/// Records are what crosses the store boundary in both directions. The
/// store never interprets values beyond the primary key field; insertion
/// order is preserved so undeclared fields round-trip faithfully.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a value, returning the previous value for the key, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlay another record's entries onto this one.
    pub fn merge(&mut self, patch: &Record) {
        for (k, v) in patch.iter() {
            self.0.insert(k.to_string(), v.clone());
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Store-side revision token, bumped on every write to a record.
///
/// Save operations hand their last-seen revision back to the store so
/// concurrent modification surfaces as a conflict instead of a silent
/// overwrite.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Revision(u64);

impl Revision {
    /// Revision assigned to a freshly inserted record.
    pub const INITIAL: Revision = Revision(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_and_get() {
        let mut r = Record::new();
        assert!(r.is_empty());
        r.insert("name", json!("ada"));
        assert_eq!(r.get("name"), Some(&json!("ada")));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn preserves_insertion_order() {
        let mut r = Record::new();
        r.insert("z", json!(1));
        r.insert("a", json!(2));
        r.insert("m", json!(3));
        let keys: Vec<&str> = r.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn merge_overlays_entries() {
        let mut base: Record = [("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
            .into_iter()
            .collect();
        let patch: Record = [("b".to_string(), json!(20)), ("c".to_string(), json!(3))]
            .into_iter()
            .collect();
        base.merge(&patch);
        assert_eq!(base.get("a"), Some(&json!(1)));
        assert_eq!(base.get("b"), Some(&json!(20)));
        assert_eq!(base.get("c"), Some(&json!(3)));
    }

    #[test]
    fn serde_roundtrip() {
        let mut r = Record::new();
        r.insert("x", json!([1, 2, 3]));
        r.insert("y", json!({"nested": true}));
        let s = serde_json::to_string(&r).unwrap();
        let back: Record = serde_json::from_str(&s).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn revision_ordering() {
        let r1 = Revision::INITIAL;
        let r2 = r1.next();
        assert!(r2 > r1);
        assert_eq!(r2.get(), 2);
        assert_eq!(format!("{r2}"), "r2");
    }
}
