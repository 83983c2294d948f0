//! # Node Module
//!
//! A [`Node`] is one independently templated part of a page. A view is a node
//! bound to a route whose render answers a request with a full page.
//!
//! What a node does beyond loading its stored values is decided by its
//! [`NodeBehavior`], picked by type name through the
//! [`NodeRegistry`](crate::registry::NodeRegistry).

use crate::error::Result;
use crate::factory::NodeFactory;
use crate::model::Route;
use crate::registry::NodeRegistry;
use crate::scope::{Scope, ScopeValue};
use crate::storage::ContentStore;
use crate::template::TemplateEngine;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default layout of every view.
pub const DEFAULT_LAYOUT: &str = "layouts/default.html";

/// Default page title of every view.
pub const DEFAULT_PAGE_TITLE: &str = "Sample title";

/// Per-type logic of a node.
pub trait NodeBehavior: Send + Sync {
    /// Whether nodes of this type answer a route with a full page.
    fn is_view(&self) -> bool {
        false
    }

    /// Values every node of this type starts with. Stored values override them.
    fn defaults(&self, _scope: &mut Scope) {}

    /// Set extra scope values once references are resolved.
    fn render(&self, _node: &mut Node, _ctx: &RenderContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Plain fragment: stored values only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseNode;

impl NodeBehavior for BaseNode {}

/// Plain page: stored values on top of the default layout and title.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseView;

impl NodeBehavior for BaseView {
    fn is_view(&self) -> bool {
        true
    }

    fn defaults(&self, scope: &mut Scope) {
        scope.set("layout", DEFAULT_LAYOUT);
        scope.set("page_title", DEFAULT_PAGE_TITLE);
    }
}

/// Data of the request being answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub path: String,
    /// Parameters matched in the route pattern.
    pub matchdict: BTreeMap<String, String>,
    /// Query-string parameters.
    pub params: BTreeMap<String, String>,
}

impl RequestInfo {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Everything a render pass reads from.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub store: &'a dyn ContentStore,
    pub registry: &'a NodeRegistry,
    pub templates: &'a TemplateEngine,
    pub request: &'a RequestInfo,
}

impl<'a> RenderContext<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn ContentStore,
        registry: &'a NodeRegistry,
        templates: &'a TemplateEngine,
        request: &'a RequestInfo,
    ) -> Self {
        Self {
            store,
            registry,
            templates,
            request,
        }
    }
}

/// An instantiated node with its scope.
#[derive(Clone)]
pub struct Node {
    pub name: String,
    pub reference: Option<String>,
    pub template: Option<String>,
    /// Route serving this node, when it is a view.
    pub route: Option<Route>,
    type_name: String,
    scope: Scope,
    behavior: Arc<dyn NodeBehavior>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("template", &self.template)
            .field("reference", &self.reference)
            .field("route", &self.route)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Node {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        behavior: Arc<dyn NodeBehavior>,
    ) -> Self {
        let mut scope = Scope::new();
        behavior.defaults(&mut scope);
        Self {
            name: name.into(),
            reference: None,
            template: None,
            route: None,
            type_name: type_name.into(),
            scope,
            behavior,
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn is_view(&self) -> bool {
        self.behavior.is_view()
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    #[must_use]
    pub fn into_scope(self) -> Scope {
        self.scope
    }

    /// Shorthand for `scope_mut().set(..)`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ScopeValue>) {
        self.scope.set(key, value);
    }

    /// Merge the scopes of every node matched by `factory` into this one.
    pub fn extend(&mut self, ctx: &RenderContext<'_>, factory: &NodeFactory) -> Result<()> {
        for node in factory.build(ctx.store, ctx.registry)? {
            self.scope.extend(node.into_scope());
        }
        Ok(())
    }

    pub(crate) fn behavior(&self) -> Arc<dyn NodeBehavior> {
        Arc::clone(&self.behavior)
    }
}

// =============================================================================
// TESTS
// =============================================================================
