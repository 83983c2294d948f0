//! # Data Model
//!
//! The rows that describe a site: routes, nodes with their values, and the
//! value types tagging each value as literal data or as a node reference.
//!
//! All entities are written out-of-band (seed files) and read per request.

use serde::{Deserialize, Serialize};

/// Name of the value type that marks a value as a reference to another node.
pub const NODE_VALUE_TYPE: &str = "node";

/// Name of the default literal value type.
pub const TEXT_VALUE_TYPE: &str = "text";

/// A URL pattern bound to a view, by view name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Unique route name, used for URL generation.
    pub name: String,
    /// Pattern in `/path/{param}` form.
    pub pattern: String,
    /// Name of the view node served on this route.
    pub view: String,
}

impl Route {
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            view: view.into(),
        }
    }

    /// Build the path of this route, substituting `{param}` placeholders.
    ///
    /// Accepts `{name}`, `{name:regex}` and `*tail` segments. Returns `None`
    /// when a parameter is missing from `lookup`.
    pub fn path<'a, F>(&self, mut lookup: F) -> Option<String>
    where
        F: FnMut(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let close = rest[open..].find('}')? + open;
            let inner = &rest[open + 1..close];
            let name = inner.split(':').next().unwrap_or(inner).trim();
            out.push_str(lookup(name)?);
            rest = &rest[close + 1..];
        }

        if let Some(star) = rest.find('*') {
            out.push_str(&rest[..star]);
            out.push_str(lookup(&rest[star + 1..])?);
        } else {
            out.push_str(rest);
        }

        if !out.starts_with('/') {
            out.insert(0, '/');
        }
        Some(out)
    }
}

/// Tag of a node value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueType {
    pub id: u64,
    pub name: String,
}

impl ValueType {
    /// How values carrying this type are loaded into a scope.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        ValueKind::from_name(&self.name)
    }
}

/// Literal data or a deferred node reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Node,
}

impl ValueKind {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name == NODE_VALUE_TYPE {
            Self::Node
        } else {
            Self::Scalar
        }
    }
}

/// One scope entry of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeValueRecord {
    pub key: String,
    pub value: String,
    pub value_type_id: u64,
}

impl NodeValueRecord {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, value_type_id: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            value_type_id,
        }
    }
}

/// A stored node or view.
///
/// Values are kept in insertion order; that order decides how repeated keys
/// accumulate into lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Assigned by the store on insert.
    pub id: u64,
    pub name: String,
    /// Behavior name, resolved through the registry.
    pub node_type: String,
    pub template: Option<String>,
    /// Optional parent reference.
    pub reference: Option<String>,
    pub values: Vec<NodeValueRecord>,
}

/// A node about to be inserted (no id yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub name: String,
    pub node_type: String,
    pub template: Option<String>,
    pub reference: Option<String>,
    pub values: Vec<NodeValueRecord>,
}

impl NewNode {
    #[must_use]
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            template: None,
            reference: None,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>, value_type_id: u64) -> Self {
        self.values.push(NodeValueRecord::new(key, value, value_type_id));
        self
    }

    pub(crate) fn into_record(self, id: u64) -> NodeRecord {
        NodeRecord {
            id,
            name: self.name,
            node_type: self.node_type,
            template: self.template,
            reference: self.reference,
            values: self.values,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_path_without_params() {
        let route = Route::new("home", "/", "Home");
        assert_eq!(route.path(|_| None), Some("/".to_string()));
    }

    #[test]
    fn route_path_substitutes_params() {
        let route = Route::new("article", "/articles/{slug:[a-z-]+}/{page}", "Article");
        let path = route.path(|name| match name {
            "slug" => Some("hello-world"),
            "page" => Some("2"),
            _ => None,
        });
        assert_eq!(path, Some("/articles/hello-world/2".to_string()));
    }

    #[test]
    fn route_path_fills_tail_segment() {
        let route = Route::new("files", "/files/*subpath", "Files");
        let path = route.path(|name| (name == "subpath").then_some("a/b.txt"));
        assert_eq!(path, Some("/files/a/b.txt".to_string()));
    }

    #[test]
    fn route_path_missing_param_is_none() {
        let route = Route::new("article", "/articles/{slug}", "Article");
        assert_eq!(route.path(|_| None), None);
    }

    #[test]
    fn value_kind_from_name() {
        assert_eq!(ValueKind::from_name("node"), ValueKind::Node);
        assert_eq!(ValueKind::from_name("text"), ValueKind::Scalar);
        assert_eq!(ValueKind::from_name("Node"), ValueKind::Scalar);
    }
}
