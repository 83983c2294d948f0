use crate::config::ServerConfig;
use crate::error::AppError;
use crate::views::{BACKOFFICE_PATTERN, BACKOFFICE_TEMPLATE, BACKOFFICE_VIEW, route_name_for};
use keepsimple_core::{
    CmsError, Compositor, ContentStore, Node, NodeQuery, NodeRegistry, RedbStore, RenderContext,
    RenderedPage, RequestInfo, Route, TemplateEngine,
};

/// The route of the built-in backoffice view.
pub fn backoffice_route() -> Route {
    Route::new(
        route_name_for(BACKOFFICE_VIEW),
        BACKOFFICE_PATTERN,
        BACKOFFICE_VIEW,
    )
}

/// Store, registry and templates shared by every request.
pub struct Site {
    store: Box<dyn ContentStore + Send + Sync>,
    registry: NodeRegistry,
    templates: TemplateEngine,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Site {
    /// Assemble a site. `_url` learns every stored route plus the backoffice.
    pub fn new(
        store: impl ContentStore + Send + Sync + 'static,
        registry: NodeRegistry,
        mut templates: TemplateEngine,
    ) -> Result<Self, AppError> {
        let mut routes = store.routes()?;
        routes.push(backoffice_route());
        templates.set_routes(routes);
        Ok(Self {
            store: Box::new(store),
            registry,
            templates,
        })
    }

    /// Open the configured database and template directory.
    pub fn open(config: &ServerConfig, registry: NodeRegistry) -> Result<Self, AppError> {
        if !config.db_path.exists() {
            return Err(AppError::DatabaseMissing(config.db_path.clone()));
        }
        let store = RedbStore::open(&config.db_path)?;
        Self::new(store, registry, TemplateEngine::from_dir(&config.templates))
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Every stored route, after checking that the whole site can be served:
    /// each node type resolves and each route names an existing view.
    pub fn checked_routes(&self) -> Result<Vec<Route>, AppError> {
        for record in self.store.nodes(&NodeQuery::new())? {
            self.registry.resolve(&record.node_type)?;
        }

        let routes = self.store.routes()?;
        for route in &routes {
            let record = self.store.node_by_name(&route.view)?.ok_or_else(|| {
                CmsError::ViewNotFound {
                    route: route.name.clone(),
                    view: route.view.clone(),
                }
            })?;
            if !self.registry.resolve(&record.node_type)?.is_view() {
                tracing::warn!(
                    route = %route.name,
                    view = %route.view,
                    node_type = %record.node_type,
                    "route points at a node that is not a view"
                );
            }
        }
        Ok(routes)
    }

    /// Render the node named `view` as a page.
    pub fn render(&self, view: &str, request: &RequestInfo) -> Result<RenderedPage, CmsError> {
        let ctx = RenderContext::new(
            self.store.as_ref(),
            &self.registry,
            &self.templates,
            request,
        );
        Compositor::render_page(&ctx, view)
    }

    /// Render the backoffice home, which has no database row.
    pub fn render_backoffice(&self, request: &RequestInfo) -> Result<RenderedPage, CmsError> {
        let ctx = RenderContext::new(
            self.store.as_ref(),
            &self.registry,
            &self.templates,
            request,
        );
        let behavior = self.registry.resolve(BACKOFFICE_VIEW)?;
        let mut node = Node::new(BACKOFFICE_VIEW, BACKOFFICE_VIEW, behavior)
            .with_template(BACKOFFICE_TEMPLATE);
        node.route = Some(backoffice_route());
        let html = Compositor::render(&ctx, &mut node)?;
        Ok(RenderedPage {
            html,
            scope: node.into_scope(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
