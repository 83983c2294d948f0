use super::{ContentStore, NodeQuery, check_value_types};
use crate::error::{CmsError, Result};
use crate::model::{NewNode, NodeRecord, Route, ValueType};
use std::collections::BTreeMap;

/// In-memory content store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    routes: BTreeMap<String, Route>,
    nodes: BTreeMap<u64, NodeRecord>,
    value_types: BTreeMap<u64, ValueType>,
    next_node_id: u64,
    next_value_type_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_node_id: 1,
            next_value_type_id: 1,
            ..Self::default()
        }
    }

    /// A store holding the default `text` and `node` value types.
    pub fn with_default_types() -> Result<Self> {
        let mut store = Self::new();
        store.insert_value_type(crate::model::TEXT_VALUE_TYPE)?;
        store.insert_value_type(crate::model::NODE_VALUE_TYPE)?;
        Ok(store)
    }
}

impl ContentStore for MemoryStore {
    fn routes(&self) -> Result<Vec<Route>> {
        Ok(self.routes.values().cloned().collect())
    }

    fn route(&self, name: &str) -> Result<Option<Route>> {
        Ok(self.routes.get(name).cloned())
    }

    fn nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRecord>> {
        Ok(self
            .nodes
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn value_types(&self) -> Result<Vec<ValueType>> {
        Ok(self.value_types.values().cloned().collect())
    }

    fn insert_value_type(&mut self, name: &str) -> Result<u64> {
        if let Some(existing) = self.value_types.values().find(|vt| vt.name == name) {
            return Ok(existing.id);
        }
        let id = self.next_value_type_id.max(1);
        self.next_value_type_id = id.saturating_add(1);
        self.value_types.insert(
            id,
            ValueType {
                id,
                name: name.to_string(),
            },
        );
        Ok(id)
    }

    fn insert_route(&mut self, route: Route) -> Result<()> {
        if self.routes.contains_key(&route.name) {
            return Err(CmsError::DuplicateRoute(route.name));
        }
        self.routes.insert(route.name.clone(), route);
        Ok(())
    }

    fn insert_node(&mut self, node: NewNode) -> Result<u64> {
        if self.nodes.values().any(|record| record.name == node.name) {
            return Err(CmsError::DuplicateNode(node.name));
        }
        let value_types: Vec<_> = self.value_types.values().cloned().collect();
        check_value_types(&node, &value_types)?;

        let id = self.next_node_id.max(1);
        self.next_node_id = id.saturating_add(1);
        self.nodes.insert(id, node.into_record(id));
        Ok(id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
