//! Metadata path registry
//!
//! Maps each [`MetadataCategory`] to the ordered field names that locate it
//! inside the `metadata` document. The registry is built once at startup and
//! shared read-only; every writer addressing a category goes through it, so
//! adding a category is a single new entry here.

use std::collections::HashMap;

use crate::attribute::{AttrMap, AttrValue};
use crate::error::{StoreError, StoreResult};
use crate::models::MetadataCategory;

#[derive(Debug, Clone)]
pub struct PathRegistry {
    entries: HashMap<MetadataCategory, Vec<String>>,
}

impl PathRegistry {
    /// Build a registry from explicit entries.
    ///
    /// Every path needs at least one segment and no segment may be empty.
    pub fn from_entries<I, P, S>(entries: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = (MetadataCategory, P)>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = HashMap::new();
        for (category, path) in entries {
            let path: Vec<String> = path.into_iter().map(Into::into).collect();
            if path.is_empty() {
                return Err(StoreError::InvalidPath(format!(
                    "path for {} has no segments",
                    category
                )));
            }
            if path.iter().any(|segment| segment.is_empty()) {
                return Err(StoreError::InvalidPath(format!(
                    "path for {} contains an empty segment",
                    category
                )));
            }
            map.insert(category, path);
        }
        Ok(Self { entries: map })
    }

    /// Field names locating `category` inside `metadata`.
    pub fn resolve(&self, category: MetadataCategory) -> StoreResult<&[String]> {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::UnknownCategory(category.to_string()))
    }

    /// Resolve a category by its name, e.g. `"validation.basic"`.
    pub fn resolve_name(&self, name: &str) -> StoreResult<&[String]> {
        self.resolve(name.parse()?)
    }

    pub fn categories(&self) -> impl Iterator<Item = MetadataCategory> + '_ {
        self.entries.keys().copied()
    }

    /// Empty `metadata` document with a nested map at every registered path,
    /// so each category can later be written with a single nested `SET`.
    pub fn skeleton(&self) -> AttrMap {
        let mut root = AttrMap::new();
        for path in self.entries.values() {
            let mut node = &mut root;
            for segment in path {
                let child = node
                    .entry(segment.clone())
                    .or_insert_with(AttrValue::empty_map);
                node = match child {
                    AttrValue::Map(m) => m,
                    // Another entry already placed a leaf here; leave it.
                    _ => break,
                };
            }
        }
        root
    }
}

impl Default for PathRegistry {
    fn default() -> Self {
        let entries = HashMap::from([
            (
                MetadataCategory::ValidationBasic,
                vec!["validation".to_string(), "basic".to_string()],
            ),
            (
                MetadataCategory::ValidationStream,
                vec!["validation".to_string(), "stream".to_string()],
            ),
            (MetadataCategory::Technical, vec!["technical".to_string()]),
            (MetadataCategory::Quality, vec!["quality".to_string()]),
            (MetadataCategory::Content, vec!["content".to_string()]),
        ]);
        Self { entries }
    }
}
