//! # Scope Module
//!
//! The key/value mapping handed to the template engine.
//!
//! Keys prefixed with [`PRIVATE_PREFIX`] hold deferred node references; the
//! compositor replaces them with rendered fragments before the template runs.

use serde::Serialize;
use std::collections::BTreeMap;

/// Prefix marking a deferred node reference.
pub const PRIVATE_PREFIX: &str = "__";

/// The HTML produced by a child node, with enough information to annotate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedFragment {
    pub name: String,
    pub template: Option<String>,
    pub html: String,
}

/// A value stored in a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScopeValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    List(Vec<ScopeValue>),
    Map(BTreeMap<String, ScopeValue>),
    Fragment(RenderedFragment),
}

impl ScopeValue {
    /// The text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_fragment(&self) -> Option<&RenderedFragment> {
        match self {
            Self::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[ScopeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScopeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ScopeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<RenderedFragment> for ScopeValue {
    fn from(value: RenderedFragment) -> Self {
        Self::Fragment(value)
    }
}

impl<T: Into<ScopeValue>> From<Vec<T>> for ScopeValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ScopeValue>> for ScopeValue {
    fn from(value: BTreeMap<String, ScopeValue>) -> Self {
        Self::Map(value)
    }
}

/// Ordered key/value data of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Scope {
    entries: BTreeMap<String, ScopeValue>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ScopeValue> {
        self.entries.get(key)
    }

    /// Text stored under `key`, or `""` when missing or not text.
    #[must_use]
    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(ScopeValue::as_text).unwrap_or("")
    }

    /// Set a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ScopeValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Set every entry of `other`; entries of `other` win.
    pub fn extend(&mut self, other: Scope) {
        self.entries.extend(other.entries);
    }

    /// Add a value, turning the entry into a list when the key already exists.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<ScopeValue>) {
        let value = value.into();
        match self.entries.entry(key.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => match slot.get_mut() {
                ScopeValue::List(items) => items.push(value),
                existing => {
                    let first = std::mem::replace(existing, ScopeValue::List(Vec::new()));
                    *existing = ScopeValue::List(vec![first, value]);
                }
            },
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ScopeValue> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScopeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys holding deferred node references, in order.
    #[must_use]
    pub fn private_keys(&self) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| key.starts_with(PRIVATE_PREFIX))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ScopeValue>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scope = Scope::new();
        for (key, value) in iter {
            scope.set(key, value);
        }
        scope
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_of_missing_key_is_empty() {
        let scope = Scope::new();
        assert_eq!(scope.text("nope"), "");
    }

    #[test]
    fn set_replaces_value() {
        let mut scope = Scope::new();
        scope.set("title", "first");
        scope.set("title", "second");
        assert_eq!(scope.text("title"), "second");
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn append_accumulates_into_list() {
        let mut scope = Scope::new();
        scope.append("tag", "a");
        assert_eq!(scope.text("tag"), "a");

        scope.append("tag", "b");
        scope.append("tag", "c");
        assert_eq!(
            scope.get("tag"),
            Some(&ScopeValue::from(vec!["a", "b", "c"]))
        );
    }

    #[test]
    fn extend_overrides_existing_keys() {
        let mut scope: Scope = [("a", "1"), ("b", "2")].into_iter().collect();
        let other: Scope = [("b", "3"), ("c", "4")].into_iter().collect();
        scope.extend(other);

        assert_eq!(scope.text("a"), "1");
        assert_eq!(scope.text("b"), "3");
        assert_eq!(scope.text("c"), "4");
    }

    #[test]
    fn private_keys_are_listed_in_order() {
        let mut scope = Scope::new();
        scope.set("__menu", "Menu");
        scope.set("title", "x");
        scope.set("__footer", "Footer");
        assert_eq!(scope.private_keys(), vec!["__footer", "__menu"]);
    }
}
