use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::profiles::Profile;
use super::value::{Map, Value};
use crate::error::TraversalError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

/// Batch-wide tables shared by every profile record.
///
/// Entries are only ever appended. Records that carry equal attributes point
/// at the same entry, so writing through a record replaces its index list
/// and leaves existing entries alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesDictionary {
    #[serde(default)]
    pub attribute_table: Vec<KeyValue>,
    /// Key and value fingerprint to the first matching table index. Covers
    /// the first `indexed` entries and catches up lazily.
    #[serde(skip)]
    lookup: HashMap<(String, String), i32>,
    #[serde(skip)]
    indexed: usize,
}

impl PartialEq for ProfilesDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.attribute_table == other.attribute_table
    }
}

impl ProfilesDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attribute_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_table.is_empty()
    }

    pub fn get(&self, index: i32) -> Result<&KeyValue, TraversalError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.attribute_table.get(i))
            .ok_or(TraversalError::AttributeIndexOutOfRange {
                index,
                len: self.attribute_table.len(),
            })
    }

    /// Builds the attribute map an index list refers to. Later indices win on
    /// duplicate keys.
    pub fn resolve(&self, indices: &[i32]) -> Result<Map, TraversalError> {
        let mut attributes = Map::with_capacity(indices.len());
        for &index in indices {
            let entry = self.get(index)?;
            attributes.insert(entry.key.clone(), entry.value.clone());
        }
        Ok(attributes)
    }

    /// Returns the index of an entry equal to `key`/`value`, appending one
    /// when none exists.
    pub fn intern(&mut self, key: &str, value: &Value) -> Result<i32, TraversalError> {
        self.sync_lookup()?;
        let fingerprint = (key.to_string(), fingerprint(value));
        if let Some(&index) = self.lookup.get(&fingerprint) {
            return Ok(index);
        }
        let index = self.index_of(self.attribute_table.len())?;
        self.attribute_table.push(KeyValue {
            key: key.to_string(),
            value: value.clone(),
        });
        self.lookup.insert(fingerprint, index);
        self.indexed = self.attribute_table.len();
        Ok(index)
    }

    pub fn indices_for(&mut self, attributes: &Map) -> Result<Vec<i32>, TraversalError> {
        attributes
            .iter()
            .map(|(key, value)| self.intern(key, value))
            .collect()
    }

    pub fn attributes(&self, profile: &Profile) -> Result<Map, TraversalError> {
        self.resolve(&profile.attribute_indices)
    }

    pub fn set_attributes(
        &mut self,
        profile: &mut Profile,
        attributes: &Map,
    ) -> Result<(), TraversalError> {
        profile.attribute_indices = self.indices_for(attributes)?;
        Ok(())
    }

    pub fn put_attribute<V: Into<Value>>(
        &mut self,
        profile: &mut Profile,
        key: &str,
        value: V,
    ) -> Result<(), TraversalError> {
        let mut attributes = self.attributes(profile)?;
        attributes.insert(key.to_string(), value.into());
        self.set_attributes(profile, &attributes)
    }

    /// Indexes entries appended or loaded since the last call.
    fn sync_lookup(&mut self) -> Result<(), TraversalError> {
        if self.indexed > self.attribute_table.len() {
            self.lookup.clear();
            self.indexed = 0;
        }
        for pos in self.indexed..self.attribute_table.len() {
            let index = self.index_of(pos)?;
            let entry = &self.attribute_table[pos];
            self.lookup
                .entry((entry.key.clone(), fingerprint(&entry.value)))
                .or_insert(index);
        }
        self.indexed = self.attribute_table.len();
        Ok(())
    }

    fn index_of(&self, pos: usize) -> Result<i32, TraversalError> {
        i32::try_from(pos).map_err(|_| TraversalError::DictionaryFull {
            len: self.attribute_table.len(),
        })
    }
}

/// `Debug` keeps ints, doubles, strings and bytes apart, which `Value`
/// equality also does. Maps equal up to key order may fingerprint apart;
/// they then get separate entries.
fn fingerprint(value: &Value) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_reuses_equal_entries() {
        let mut dictionary = ProfilesDictionary::new();
        let first = dictionary.intern("http.method", &Value::from("get")).unwrap();
        let second = dictionary.intern("http.method", &Value::from("get")).unwrap();
        let third = dictionary.intern("http.method", &Value::from("post")).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(dictionary.len(), 2);
    }

    #[test]
    fn test_shared_entry_is_not_mutated() {
        let mut dictionary = ProfilesDictionary::new();
        let mut a = Profile::default();
        let mut b = Profile::default();
        dictionary.put_attribute(&mut a, "k", "v").unwrap();
        dictionary.put_attribute(&mut b, "k", "v").unwrap();
        assert_eq!(a.attribute_indices, b.attribute_indices);

        dictionary.put_attribute(&mut a, "k", "changed").unwrap();
        assert_eq!(
            dictionary.attributes(&b).unwrap().get("k"),
            Some(&Value::from("v"))
        );
        assert_eq!(
            dictionary.attributes(&a).unwrap().get("k"),
            Some(&Value::from("changed"))
        );
    }

    #[test]
    fn test_resolve_out_of_range() {
        let dictionary = ProfilesDictionary::new();
        assert_eq!(
            dictionary.resolve(&[3]),
            Err(TraversalError::AttributeIndexOutOfRange { index: 3, len: 0 })
        );
        assert!(dictionary.resolve(&[-1]).is_err());
    }

    #[test]
    fn test_intern_distinguishes_kinds() {
        let mut dictionary = ProfilesDictionary::new();
        let int = dictionary.intern("n", &Value::Int(1)).unwrap();
        let double = dictionary.intern("n", &Value::Double(1.0)).unwrap();
        let string = dictionary.intern("n", &Value::from("1")).unwrap();
        let bytes = dictionary.intern("n", &Value::Bytes(vec![1])).unwrap();
        let slice = dictionary.intern("n", &Value::Slice(vec![Value::Int(1)])).unwrap();
        assert_eq!(dictionary.len(), 5);
        assert_eq!(
            [int, double, string, bytes, slice],
            [0, 1, 2, 3, 4]
        );
        assert_eq!(dictionary.intern("n", &Value::Double(1.0)).unwrap(), double);
    }

    #[test]
    fn test_intern_reuses_loaded_entries() {
        let mut dictionary: ProfilesDictionary = serde_json::from_str(
            r#"{"attribute_table": [
                {"key": "a", "value": "x"},
                {"key": "a", "value": "x"},
                {"key": "b", "value": 2}
            ]}"#,
        )
        .unwrap();
        assert_eq!(dictionary.intern("a", &Value::from("x")).unwrap(), 0);
        assert_eq!(dictionary.intern("b", &Value::Int(2)).unwrap(), 2);
        assert_eq!(dictionary.len(), 3);

        dictionary.attribute_table.push(KeyValue {
            key: "c".into(),
            value: Value::Bool(true),
        });
        assert_eq!(dictionary.intern("c", &Value::Bool(true)).unwrap(), 3);
        assert_eq!(dictionary.len(), 4);
    }

    #[test]
    fn test_rewriting_many_records_keeps_table_compact() {
        let mut dictionary = ProfilesDictionary::new();
        let mut profiles = vec![Profile::default(); 5_000];
        for (i, profile) in profiles.iter_mut().enumerate() {
            dictionary.put_attribute(profile, "id", i as i64).unwrap();
            dictionary.put_attribute(profile, "service", "checkout").unwrap();
        }
        for profile in &mut profiles {
            let id = dictionary.attributes(profile).unwrap()["id"].clone();
            dictionary.put_attribute(profile, "copy", id).unwrap();
        }
        // One entry per distinct id, per copied id, plus the shared service.
        assert_eq!(dictionary.len(), 5_000 * 2 + 1);
        assert_eq!(
            dictionary.attributes(&profiles[42]).unwrap()["copy"],
            Value::Int(42)
        );
    }
}
