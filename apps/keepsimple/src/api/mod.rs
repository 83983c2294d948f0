//! # HTTP API
//!
//! The router is built once at startup from the route table. Each route
//! renders its view on a blocking thread; node rows are read again on every
//! request, so content edits show up without a restart. Route edits need one.

mod pattern;
mod site;

pub use pattern::{check_axum_path, to_axum_path};
pub use site::{Site, backoffice_route};

use crate::error::AppError;
use crate::views::BACKOFFICE_PATTERN;
use axum::{
    Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use keepsimple_core::{RenderedPage, RequestInfo, Route};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path as FsPath;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(site: Site, admin_token: Option<String>) -> Self {
        Self {
            site: Arc::new(site),
            admin_token: admin_token.map(Arc::from),
        }
    }
}

type Params = BTreeMap<String, String>;

pub const STATIC_PREFIX: &str = "/static";

/// Build the router: one GET route per stored route, the backoffice, and
/// `/static` when a directory is given.
///
/// Fails when a node type is unknown, a route names a missing view, a path
/// is malformed, or two paths would match the same requests. Every path goes
/// through a `matchit` table first so axum never sees a conflicting route.
pub fn build_router(state: AppState, static_dir: Option<&FsPath>) -> Result<Router, AppError> {
    let routes = state.site.checked_routes()?;
    let mut router: Router<AppState> = Router::new();
    let mut table: matchit::Router<()> = matchit::Router::new();

    for route in routes {
        let path = to_axum_path(&route.pattern);
        check_axum_path(&path).map_err(|reason| setup_error(&route, &path, reason))?;
        if static_dir.is_some()
            && (path == STATIC_PREFIX || path.starts_with(&format!("{STATIC_PREFIX}/")))
        {
            return Err(setup_error(&route, &path, "collides with the static files"));
        }
        table
            .insert(path.clone(), ())
            .map_err(|err| setup_error(&route, &path, err))?;
        tracing::info!(route = %route.name, %path, view = %route.view, "route registered");

        let view = route.view;
        router = router.route(
            &path,
            get(
                move |State(state): State<AppState>,
                      uri: Uri,
                      matched: Option<Path<Params>>,
                      Query(params): Query<Params>| {
                    let view = view.clone();
                    async move {
                        let request = RequestInfo {
                            path: uri.path().to_string(),
                            matchdict: matched.map(|Path(m)| m).unwrap_or_default(),
                            params,
                        };
                        render_view(state, view, request).await
                    }
                },
            ),
        );
    }

    if table.insert(BACKOFFICE_PATTERN, ()).is_ok() {
        let guarded = Router::new()
            .route(BACKOFFICE_PATTERN, get(backoffice))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
        router = router.merge(guarded);
        tracing::info!(path = BACKOFFICE_PATTERN, "backoffice registered");
    } else {
        tracing::warn!(
            path = BACKOFFICE_PATTERN,
            "a stored route already uses the backoffice path, backoffice disabled"
        );
    }

    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "serving static files under /static");
        router = router.nest_service(STATIC_PREFIX, ServeDir::new(dir));
    }

    Ok(router
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state))
}

fn setup_error(route: &Route, path: &str, reason: impl Display) -> AppError {
    AppError::Setup(format!("route `{}` (path `{path}`): {reason}", route.name))
}

async fn render_view(state: AppState, view: String, request: RequestInfo) -> Response {
    let site = Arc::clone(&state.site);
    let name = view.clone();
    let result = tokio::task::spawn_blocking(move || site.render(&name, &request)).await;
    page_response(&view, result)
}

async fn backoffice(State(state): State<AppState>, uri: Uri, Query(params): Query<Params>) -> Response {
    let site = Arc::clone(&state.site);
    let request = RequestInfo {
        path: uri.path().to_string(),
        matchdict: Params::new(),
        params,
    };
    let result = tokio::task::spawn_blocking(move || site.render_backoffice(&request)).await;
    page_response(BACKOFFICE_PATTERN, result)
}

fn page_response(
    view: &str,
    result: Result<Result<RenderedPage, keepsimple_core::CmsError>, tokio::task::JoinError>,
) -> Response {
    match result {
        Ok(Ok(page)) => Html(page.html).into_response(),
        Ok(Err(err)) => {
            tracing::error!(view, error = %err, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
        Err(err) => {
            tracing::error!(view, error = %err, "render task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Reject backoffice requests without the configured bearer token.
async fn require_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "backoffice request rejected");
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            "Unauthorized",
        )
            .into_response()
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

// =============================================================================
// TESTS
// =============================================================================
