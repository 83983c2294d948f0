//! # Registry Module
//!
//! Maps the type names stored on node records to behaviors.

use crate::error::{CmsError, Result};
use crate::node::{BaseNode, BaseView, NodeBehavior};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name -> behavior table.
///
/// Names may be dotted (`keepsimplecms.node.View`); resolution tries the full
/// name first, then its last segment.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    behaviors: BTreeMap<String, Arc<dyn NodeBehavior>>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.behaviors.keys()).finish()
    }
}

impl NodeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `Node` and `View` types.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new().with("Node", BaseNode).with("View", BaseView)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, behavior: impl NodeBehavior + 'static) -> Self {
        self.register(name, behavior);
        self
    }

    /// Register `behavior` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, behavior: impl NodeBehavior + 'static) {
        self.behaviors.insert(name.into(), Arc::new(behavior));
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.resolve(type_name).is_ok()
    }

    /// Behavior registered for `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<dyn NodeBehavior>> {
        let short = type_name.rsplit('.').next().unwrap_or(type_name);
        self.behaviors
            .get(type_name)
            .or_else(|| self.behaviors.get(short))
            .cloned()
            .ok_or_else(|| CmsError::UnknownNodeType(type_name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(String::as_str)
    }
}

// =============================================================================
// TESTS
// =============================================================================
