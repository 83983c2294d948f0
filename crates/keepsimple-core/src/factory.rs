//! # Factory Module
//!
//! Turns stored node records into [`Node`]s.
//!
//! Values typed `node` are stored under their key prefixed with
//! [`PRIVATE_PREFIX`]: they stay deferred until the compositor resolves them.
//! Repeated keys accumulate into lists.

use crate::error::{CmsError, Result};
use crate::model::{NodeRecord, ValueKind};
use crate::node::Node;
use crate::registry::NodeRegistry;
use crate::scope::{PRIVATE_PREFIX, Scope};
use crate::storage::{ContentStore, NodeQuery};
use std::collections::BTreeMap;

type Predicate = Box<dyn Fn(&Node) -> bool + Send + Sync>;
type SortKey = Box<dyn Fn(&Node) -> String + Send + Sync>;

/// A node query plus the post-processing applied to its results.
#[derive(Default)]
pub struct NodeFactory {
    query: NodeQuery,
    filter: Option<Predicate>,
    sort_key: Option<SortKey>,
}

impl std::fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFactory")
            .field("query", &self.query)
            .field("filter", &self.filter.is_some())
            .field("sorted", &self.sort_key.is_some())
            .finish()
    }
}

impl NodeFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.query.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.query.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.query.node_type = Some(node_type.into());
        self
    }

    /// Keep only nodes for which `predicate` holds.
    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Sort nodes by `key` (stable, so ties keep id order).
    #[must_use]
    pub fn sorted_by<F>(mut self, key: F) -> Self
    where
        F: Fn(&Node) -> String + Send + Sync + 'static,
    {
        self.sort_key = Some(Box::new(key));
        self
    }

    /// Run the query and instantiate every matching record.
    pub fn build(&self, store: &dyn ContentStore, registry: &NodeRegistry) -> Result<Vec<Node>> {
        let mut nodes = store
            .nodes(&self.query)?
            .into_iter()
            .map(|record| Self::from_record(store, registry, record))
            .collect::<Result<Vec<_>>>()?;

        if let Some(predicate) = &self.filter {
            nodes.retain(|node| predicate(node));
        }
        if let Some(key) = &self.sort_key {
            nodes.sort_by_cached_key(|node| key(node));
        }
        Ok(nodes)
    }

    /// Like [`build`](Self::build), grouped by the text of scope key `key`.
    pub fn build_indexed(
        &self,
        store: &dyn ContentStore,
        registry: &NodeRegistry,
        key: &str,
    ) -> Result<BTreeMap<String, Vec<Node>>> {
        let mut indexed: BTreeMap<String, Vec<Node>> = BTreeMap::new();
        for node in self.build(store, registry)? {
            indexed
                .entry(node.scope().text(key).to_string())
                .or_default()
                .push(node);
        }
        Ok(indexed)
    }

    /// Instantiate a single record.
    pub fn from_record(
        store: &dyn ContentStore,
        registry: &NodeRegistry,
        record: NodeRecord,
    ) -> Result<Node> {
        let behavior = registry.resolve(&record.node_type)?;
        let kinds: BTreeMap<u64, ValueKind> = store
            .value_types()?
            .into_iter()
            .map(|value_type| (value_type.id, value_type.kind()))
            .collect();

        let mut values = Scope::new();
        for value in record.values {
            match kinds.get(&value.value_type_id) {
                Some(ValueKind::Node) => {
                    values.append(format!("{PRIVATE_PREFIX}{}", value.key), value.value);
                }
                Some(ValueKind::Scalar) => values.append(value.key, value.value),
                None => {
                    return Err(CmsError::UnknownValueType(value.value_type_id.to_string()));
                }
            }
        }

        let route = store.route_for_view(&record.name)?;
        let mut node = Node::new(record.name, record.node_type, behavior);
        node.template = record.template;
        node.reference = record.reference;
        node.route = route;
        node.scope_mut().extend(values);
        Ok(node)
    }
}

// =============================================================================
// TESTS
// =============================================================================
