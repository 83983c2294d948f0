//! # Compositor Module
//!
//! The render pass that assembles a page from its nodes.
//!
//! For every node, deferred references (private `__key` entries) are resolved
//! depth-first into rendered fragments before the node's own template runs,
//! so a template never sees an unresolved reference. Lookups that fail
//! degrade to a visible placeholder instead of failing the request.

use crate::error::{CmsError, Result};
use crate::factory::NodeFactory;
use crate::node::{Node, RenderContext};
use crate::scope::{PRIVATE_PREFIX, RenderedFragment, Scope, ScopeValue};
use std::collections::BTreeMap;

/// Maximum nesting of node references below a page.
pub const MAX_RENDER_DEPTH: usize = 16;

/// A fully rendered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    /// The scope the page template was rendered with.
    pub scope: Scope,
}

/// Placeholder for a reference to a node that does not exist.
#[must_use]
pub fn not_found_placeholder(name: &str) -> String {
    format!("Node \"{name}\" not found.")
}

fn cycle_placeholder(name: &str) -> String {
    format!("Node \"{name}\" is already being rendered.")
}

fn too_deep_placeholder(name: &str) -> String {
    format!("Node \"{name}\" exceeds the maximum nesting depth.")
}

/// Drives the render pass.
pub struct Compositor;

impl Compositor {
    /// Load the node named `name` and render it as a full page.
    pub fn render_page(ctx: &RenderContext<'_>, name: &str) -> Result<RenderedPage> {
        let record = ctx
            .store
            .node_by_name(name)?
            .ok_or_else(|| CmsError::NodeNotFound(name.to_string()))?;
        let mut node = NodeFactory::from_record(ctx.store, ctx.registry, record)?;
        let html = Self::render(ctx, &mut node)?;
        Ok(RenderedPage {
            html,
            scope: node.into_scope(),
        })
    }

    /// Resolve `node`'s scope and render its template.
    pub fn render(ctx: &RenderContext<'_>, node: &mut Node) -> Result<String> {
        Self::render_at(ctx, node, &mut Vec::new())
    }

    /// Resolve `node`'s scope without rendering its template.
    pub fn compose(ctx: &RenderContext<'_>, node: &mut Node) -> Result<()> {
        let mut path = vec![node.name.clone()];
        Self::compose_at(ctx, node, &mut path)
    }

    fn render_at(ctx: &RenderContext<'_>, node: &mut Node, path: &mut Vec<String>) -> Result<String> {
        path.push(node.name.clone());
        let result = Self::compose_at(ctx, node, path).and_then(|()| match &node.template {
            Some(template) => ctx.templates.render(template, node.scope()),
            None => Ok(String::new()),
        });
        path.pop();

        tracing::debug!(node = %node.name, depth = path.len(), ok = result.is_ok(), "rendered node");
        result
    }

    fn compose_at(ctx: &RenderContext<'_>, node: &mut Node, path: &mut Vec<String>) -> Result<()> {
        node.set("matchdict", string_map(&ctx.request.matchdict));
        node.set("params", string_map(&ctx.request.params));

        Self::resolve_references(ctx, node, path)?;
        node.behavior().render(node, ctx)?;

        // The hook may have pulled in more references (e.g. through extend).
        if !node.scope().private_keys().is_empty() {
            Self::resolve_references(ctx, node, path)?;
        }
        Ok(())
    }

    fn resolve_references(ctx: &RenderContext<'_>, node: &mut Node, path: &mut Vec<String>) -> Result<()> {
        for key in node.scope().private_keys() {
            let Some(value) = node.scope_mut().remove(&key) else {
                continue;
            };

            let resolved = match value {
                ScopeValue::List(items) => ScopeValue::List(
                    items
                        .iter()
                        .map(|item| Self::resolve_one(ctx, item, path))
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => Self::resolve_one(ctx, &other, path)?,
            };
            node.set(&key[PRIVATE_PREFIX.len()..], resolved);
        }
        Ok(())
    }

    fn resolve_one(ctx: &RenderContext<'_>, value: &ScopeValue, path: &mut Vec<String>) -> Result<ScopeValue> {
        let Some(name) = value.as_text() else {
            return Ok(value.clone());
        };

        if path.iter().any(|ancestor| ancestor == name) {
            tracing::warn!(node = %name, path = ?path, "node reference cycle");
            return Ok(ScopeValue::Text(cycle_placeholder(name)));
        }
        if path.len() >= MAX_RENDER_DEPTH {
            tracing::warn!(node = %name, depth = path.len(), "node nesting too deep");
            return Ok(ScopeValue::Text(too_deep_placeholder(name)));
        }

        let Some(record) = ctx.store.node_by_name(name)? else {
            tracing::warn!(node = %name, "referenced node not found");
            return Ok(ScopeValue::Text(not_found_placeholder(name)));
        };

        let mut child = NodeFactory::from_record(ctx.store, ctx.registry, record)?;
        let html = Self::render_at(ctx, &mut child, path)?;
        Ok(ScopeValue::Fragment(RenderedFragment {
            name: child.name,
            template: child.template,
            html,
        }))
    }
}

fn string_map(map: &BTreeMap<String, String>) -> ScopeValue {
    ScopeValue::Map(
        map.iter()
            .map(|(key, value)| (key.clone(), ScopeValue::from(value.as_str())))
            .collect(),
    )
}

// =============================================================================
// TESTS
// =============================================================================
