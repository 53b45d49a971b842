//! Keyed view of one data row.
//!
//! All values are strings at this layer: booleans are `"true"`/`"false"`,
//! numbers are decimal text, dates are ISO strings. Typed reads happen at
//! the repository boundary via the accessors here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consent::is_truthy;

/// A decoded, keyed view of one data row: column name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Record(BTreeMap::new())
    }

    /// Value for a column, if the column is present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Value for a column, or the empty string when absent.
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Boolean read: whether the stored value is truthy
    /// (`1`, `true`, `yes`, `ja`, `on`, `x`, case-insensitive).
    pub fn get_bool(&self, column: &str) -> bool {
        is_truthy(self.get_or_empty(column))
    }

    /// Set a column value. Values are trimmed on write, mirroring how
    /// rows are stored in the backing sheet.
    pub fn set(&mut self, column: impl Into<String>, value: impl AsRef<str>) {
        self.0.insert(column.into(), value.as_ref().trim().to_string());
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Merge-patch: overwrite this record's values with the patch's,
    /// leaving columns absent from the patch untouched.
    pub fn merge(&mut self, patch: &Record) {
        for (column, value) in patch.iter() {
            self.set(column.to_string(), value);
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}
