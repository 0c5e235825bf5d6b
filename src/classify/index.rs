//! Class-index table: model output index to disease label.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::Path;

use crate::error::ClassIndexError;

/// Validated mapping from a model output index to its label.
///
/// Loaded from a JSON object whose keys are string-encoded indices, e.g.
/// `{"0": "Apple___Apple_scab", "1": "Apple___healthy"}`. Validation runs
/// eagerly; a table that loads is a table that can be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndex {
    labels: BTreeMap<u32, String>,
}

impl ClassIndex {
    /// Load and validate a class-index file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassIndexError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ClassIndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate class-index JSON.
    pub fn from_json(json: &str) -> Result<Self, ClassIndexError> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(ClassIndexError::Parse)?;

        let mut labels = BTreeMap::new();
        for (key, label) in raw {
            let index: u32 = key
                .trim()
                .parse()
                .map_err(|_| ClassIndexError::InvalidIndex(key.clone()))?;
            if label.trim().is_empty() {
                return Err(ClassIndexError::EmptyLabel(key));
            }
            match labels.entry(index) {
                // "1" and "01" name the same class
                Entry::Occupied(_) => return Err(ClassIndexError::DuplicateIndex(index)),
                Entry::Vacant(slot) => {
                    slot.insert(label);
                }
            }
        }

        if labels.is_empty() {
            return Err(ClassIndexError::Empty);
        }
        Ok(Self { labels })
    }

    /// Build a table from `(index, label)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ClassIndexError>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let mut labels = BTreeMap::new();
        for (index, label) in pairs {
            let label = label.into();
            if label.trim().is_empty() {
                return Err(ClassIndexError::EmptyLabel(index.to_string()));
            }
            if labels.insert(index, label).is_some() {
                return Err(ClassIndexError::DuplicateIndex(index));
            }
        }
        if labels.is_empty() {
            return Err(ClassIndexError::Empty);
        }
        Ok(Self { labels })
    }

    /// Label for a model output index.
    pub fn label(&self, index: usize) -> Option<&str> {
        let index = u32::try_from(index).ok()?;
        self.labels.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
