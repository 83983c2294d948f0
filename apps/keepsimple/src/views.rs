//! # Views
//!
//! The site's own node behaviors, registered next to the built-in `Node` and
//! `View` types.

use keepsimple_core::{
    BaseView, ContentStore, Node, NodeBehavior, NodeQuery, NodeRegistry, RenderContext, Result,
    ScopeValue,
};
use std::collections::BTreeMap;

/// Type name of the backoffice home view.
pub const BACKOFFICE_VIEW: &str = "BackOfficeHome";
pub const BACKOFFICE_PATTERN: &str = "/backoffice";
pub const BACKOFFICE_TEMPLATE: &str = "views/backoffice/home.html";
pub const BACKOFFICE_LAYOUT: &str = "layouts/backoffice/base.html";

/// Registry with the built-ins and every view of this module.
pub fn site_registry() -> NodeRegistry {
    NodeRegistry::with_builtins()
        .with("Home", Home)
        .with("SampleNode", SampleNode)
        .with(BACKOFFICE_VIEW, BackOfficeHome)
}

/// Front page.
#[derive(Debug, Clone, Copy, Default)]
pub struct Home;

impl NodeBehavior for Home {
    fn is_view(&self) -> bool {
        true
    }

    fn defaults(&self, scope: &mut keepsimple_core::Scope) {
        BaseView.defaults(scope);
    }

    fn render(&self, node: &mut Node, _ctx: &RenderContext<'_>) -> Result<()> {
        node.set("foo", "bar");
        Ok(())
    }
}

/// Demo fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleNode;

impl NodeBehavior for SampleNode {
    fn render(&self, node: &mut Node, _ctx: &RenderContext<'_>) -> Result<()> {
        node.set("foo2", "bar2");
        Ok(())
    }
}

/// Lists what the database describes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackOfficeHome;

impl NodeBehavior for BackOfficeHome {
    fn is_view(&self) -> bool {
        true
    }

    fn defaults(&self, scope: &mut keepsimple_core::Scope) {
        scope.set("layout", BACKOFFICE_LAYOUT);
        scope.set("page_title", "Backoffice");
    }

    fn render(&self, node: &mut Node, ctx: &RenderContext<'_>) -> Result<()> {
        let routes: Vec<ScopeValue> = ctx
            .store
            .routes()?
            .into_iter()
            .map(|route| {
                record([
                    ("name", route.name),
                    ("pattern", route.pattern),
                    ("view", route.view),
                ])
            })
            .collect();

        let nodes: Vec<ScopeValue> = ctx
            .store
            .nodes(&NodeQuery::new())?
            .into_iter()
            .map(|node| {
                record([
                    ("name", node.name),
                    ("type", node.node_type),
                    ("template", node.template.unwrap_or_default()),
                    ("ref", node.reference.unwrap_or_default()),
                ])
            })
            .collect();

        node.set("routes", routes);
        node.set("nodes", nodes);
        Ok(())
    }
}

fn record<const N: usize>(fields: [(&str, String); N]) -> ScopeValue {
    ScopeValue::Map(
        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), ScopeValue::Text(value)))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Route name for a view name: `BackOfficeHome` -> `Back-Office-Home`.
pub fn route_name_for(view: &str) -> String {
    let mut out = String::with_capacity(view.len() + 4);
    let mut previous_lower = false;
    for ch in view.chars() {
        if ch.is_ascii_uppercase() && previous_lower {
            out.push('-');
        }
        previous_lower = ch.is_ascii_lowercase();
        out.push(ch);
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use keepsimple_core::{
        Compositor, MemoryStore, NewNode, RequestInfo, Route, TemplateEngine,
    };

    fn render(store: &MemoryStore, templates: &TemplateEngine, view: &str) -> keepsimple_core::RenderedPage {
        let registry = site_registry();
        let request = RequestInfo::new("/");
        let ctx = RenderContext::new(store, &registry, templates, &request);
        Compositor::render_page(&ctx, view).unwrap()
    }

    #[test]
    fn home_view_scope() {
        let mut store = MemoryStore::with_default_types().unwrap();
        store
            .insert_node(NewNode::new("Home", "Home").with_template("home.html"))
            .unwrap();
        let mut templates = TemplateEngine::in_memory();
        templates
            .add_template("home.html", "{{ page_title }} {{ foo }}")
            .unwrap();

        let page = render(&store, &templates, "Home");
        assert_eq!(page.scope.text("page_title"), "Sample title");
        assert_eq!(
            page.scope.text("layout"),
            keepsimple_core::node::DEFAULT_LAYOUT
        );
        assert_eq!(page.scope.text("foo"), "bar");
        assert_eq!(page.html, "Sample title bar");
    }

    #[test]
    fn sample_node_sets_value() {
        let mut store = MemoryStore::with_default_types().unwrap();
        store.insert_node(NewNode::new("Sample", "SampleNode")).unwrap();
        let page = render(&store, &TemplateEngine::in_memory(), "Sample");
        assert_eq!(page.scope.text("foo2"), "bar2");
    }

    #[test]
    fn backoffice_lists_routes_and_nodes() {
        let mut store = MemoryStore::with_default_types().unwrap();
        store.insert_node(NewNode::new("Home", "Home")).unwrap();
        store.insert_route(Route::new("home", "/", "Home")).unwrap();

        let registry = site_registry();
        let templates = TemplateEngine::in_memory();
        let request = RequestInfo::new(BACKOFFICE_PATTERN);
        let ctx = RenderContext::new(&store, &registry, &templates, &request);

        let behavior = std::sync::Arc::new(BackOfficeHome);
        let mut node = Node::new(BACKOFFICE_VIEW, BACKOFFICE_VIEW, behavior);
        Compositor::compose(&ctx, &mut node).unwrap();

        assert_eq!(node.scope().text("layout"), BACKOFFICE_LAYOUT);
        let routes = node.scope().get("routes").and_then(ScopeValue::as_list).unwrap();
        assert_eq!(routes.len(), 1);
        let nodes = node.scope().get("nodes").and_then(ScopeValue::as_list).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn route_names_split_camel_case() {
        assert_eq!(route_name_for("BackOfficeHome"), "Back-Office-Home");
        assert_eq!(route_name_for("Home"), "Home");
        assert_eq!(route_name_for("RSSFeed"), "RSSFeed");
    }
}
