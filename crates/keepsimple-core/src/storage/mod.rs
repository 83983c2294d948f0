//! # Storage Module
//!
//! Where routes, nodes and value types live.
//!
//! - [`MemoryStore`]: BTreeMap-backed store for tests and previews
//! - [`RedbStore`]: disk-backed store using the redb embedded database
//!   (ACID transactions, MVCC readers)
//!
//! Both implement [`ContentStore`]. Queries return nodes in ascending id
//! order, so "first match" always means the oldest record.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::error::Result;
use crate::model::{NewNode, NodeRecord, Route, ValueType};

/// Criteria for a node query. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeQuery {
    pub name: Option<String>,
    pub reference: Option<String>,
    pub node_type: Option<String>,
}

impl NodeQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether `record` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, record: &NodeRecord) -> bool {
        self.name.as_ref().is_none_or(|name| *name == record.name)
            && self
                .reference
                .as_ref()
                .is_none_or(|reference| record.reference.as_ref() == Some(reference))
            && self
                .node_type
                .as_ref()
                .is_none_or(|node_type| *node_type == record.node_type)
    }
}

/// Read and administrative write access to the site description.
pub trait ContentStore {
    /// All routes, ordered by name.
    fn routes(&self) -> Result<Vec<Route>>;

    fn route(&self, name: &str) -> Result<Option<Route>>;

    /// The route serving the view `view`, if any.
    fn route_for_view(&self, view: &str) -> Result<Option<Route>> {
        Ok(self.routes()?.into_iter().find(|route| route.view == view))
    }

    /// Nodes matching `query`, ordered by id.
    fn nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRecord>>;

    /// First node named `name`.
    fn node_by_name(&self, name: &str) -> Result<Option<NodeRecord>> {
        Ok(self.nodes(&NodeQuery::by_name(name))?.into_iter().next())
    }

    /// All value types, ordered by id.
    fn value_types(&self) -> Result<Vec<ValueType>>;

    fn value_type_by_name(&self, name: &str) -> Result<Option<ValueType>> {
        Ok(self
            .value_types()?
            .into_iter()
            .find(|value_type| value_type.name == name))
    }

    /// Register a value type. Returns the existing id when the name is taken.
    fn insert_value_type(&mut self, name: &str) -> Result<u64>;

    /// Insert a route. Fails on a duplicate name.
    fn insert_route(&mut self, route: Route) -> Result<()>;

    /// Insert a node and return its id. Fails on a duplicate name or on a
    /// value pointing at an unknown value type.
    fn insert_node(&mut self, node: NewNode) -> Result<u64>;
}

/// Check every value of `node` against the known value type ids.
pub(crate) fn check_value_types(node: &NewNode, value_types: &[ValueType]) -> Result<()> {
    for value in &node.values {
        if !value_types.iter().any(|vt| vt.id == value.value_type_id) {
            return Err(crate::CmsError::UnknownValueType(
                value.value_type_id.to_string(),
            ));
        }
    }
    Ok(())
}
