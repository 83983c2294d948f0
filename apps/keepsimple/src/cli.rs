//! # Command line
//!
//! Each subcommand is a `cmd_*` function so it can be driven from tests
//! without going through argument parsing.

use crate::api::{AppState, Site, build_router};
use crate::config::{DEFAULT_ADDR, DEFAULT_DB, DEFAULT_TEMPLATES, ServerConfig};
use crate::error::AppError;
use crate::views::site_registry;
use clap::{Parser, Subcommand};
use keepsimple_core::formats::install_default_types;
use keepsimple_core::{ContentStore, RedbStore, RequestInfo, Route, SeedDocument, SeedSummary};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "keepsimple", version, about = "A small database-driven CMS")]
pub struct Cli {
    /// Path of the site database.
    #[arg(long, global = true, env = "KEEPSIMPLE_DB", default_value = DEFAULT_DB)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database with the default value types, then apply a seed.
    InitDb {
        /// JSON seed document.
        #[arg(long)]
        seed: Option<PathBuf>,
        /// Replace an existing database.
        #[arg(long)]
        force: bool,
    },
    /// Serve the site over HTTP.
    Serve {
        #[arg(long, env = "KEEPSIMPLE_ADDR", default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
        #[arg(long, env = "KEEPSIMPLE_TEMPLATES", default_value = DEFAULT_TEMPLATES)]
        templates: PathBuf,
        /// Directory served under `/static`.
        #[arg(long, env = "KEEPSIMPLE_STATIC")]
        static_dir: Option<PathBuf>,
        /// Bearer token required by the backoffice.
        #[arg(long, env = "KEEPSIMPLE_ADMIN_TOKEN", hide_env_values = true)]
        admin_token: Option<String>,
    },
    /// List the route table.
    Routes {
        #[arg(long)]
        json: bool,
    },
    /// Render a view by node name and print it.
    Render {
        view: String,
        #[arg(long, env = "KEEPSIMPLE_TEMPLATES", default_value = DEFAULT_TEMPLATES)]
        templates: PathBuf,
        /// Print the resolved scope as JSON instead of the HTML.
        #[arg(long)]
        json: bool,
    },
}

/// Run the parsed command line.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::InitDb { seed, force } => {
            let summary = cmd_init(&cli.db, seed.as_deref(), force)?;
            println!(
                "Initialized {} ({} value types, {} nodes, {} routes)",
                cli.db.display(),
                summary.value_types,
                summary.nodes,
                summary.routes
            );
        }
        Commands::Serve {
            addr,
            templates,
            static_dir,
            admin_token,
        } => {
            let config = ServerConfig::new(addr, &cli.db)
                .with_templates(templates)
                .with_static_dir(static_dir)
                .with_admin_token(admin_token);
            cmd_serve(config).await?;
        }
        Commands::Routes { json } => {
            println!("{}", cmd_routes(&cli.db, json)?);
        }
        Commands::Render {
            view,
            templates,
            json,
        } => {
            println!("{}", cmd_render(&cli.db, &templates, &view, json)?);
        }
    }
    Ok(())
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Create the database at `db_path`.
///
/// The database is built in a temporary file next to `db_path` and moved into
/// place only once the seed applied cleanly, so a failing seed never leaves a
/// partial database behind and `force` never loses the old one.
pub fn cmd_init(db_path: &Path, seed: Option<&Path>, force: bool) -> Result<SeedSummary, AppError> {
    if db_path.exists() && !force {
        return Err(AppError::DatabaseExists(db_path.to_path_buf()));
    }

    let document = match seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Some(serde_json::from_str::<SeedDocument>(&raw)?)
        }
        None => None,
    };

    let dir = match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".keepsimple-")
        .suffix(".redb")
        .tempfile_in(dir)?;

    let summary = {
        let mut store = RedbStore::open(staging.path())?;
        match document {
            Some(document) => document.apply(&mut store)?,
            None => {
                install_default_types(&mut store)?;
                SeedSummary {
                    value_types: store.value_types()?.len(),
                    ..SeedSummary::default()
                }
            }
        }
    };

    if db_path.exists() {
        tracing::info!(path = %db_path.display(), "replacing existing database");
    }
    staging.persist(db_path).map_err(|err| AppError::Io(err.error))?;
    tracing::info!(path = %db_path.display(), "database initialized");
    Ok(summary)
}

/// Serve until Ctrl-C.
pub async fn cmd_serve(config: ServerConfig) -> Result<(), AppError> {
    let site = Site::open(&config, site_registry())?;
    let state = AppState::new(site, config.admin_token.clone());
    let router = build_router(state, config.static_dir.as_deref())?;

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(
        addr = %config.addr,
        db = %config.db_path.display(),
        templates = %config.templates.display(),
        backoffice_auth = config.admin_token.is_some(),
        "keepsimple listening"
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
}

/// The route table, as a text listing or as JSON.
pub fn cmd_routes(db_path: &Path, json: bool) -> Result<String, AppError> {
    let store = open_existing(db_path)?;
    let routes = store.routes()?;
    if json {
        return Ok(serde_json::to_string_pretty(&routes)?);
    }
    Ok(format_routes(&routes))
}

fn format_routes(routes: &[Route]) -> String {
    if routes.is_empty() {
        return "No routes.".to_string();
    }
    let width = routes.iter().map(|r| r.name.len()).max().unwrap_or(0);
    routes
        .iter()
        .map(|route| {
            format!(
                "{:width$}  {}  -> {}",
                route.name,
                route.pattern,
                route.view,
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the node named `view` with templates from `templates`.
pub fn cmd_render(db_path: &Path, templates: &Path, view: &str, json: bool) -> Result<String, AppError> {
    let config = ServerConfig::new(([127, 0, 0, 1], 0).into(), db_path).with_templates(templates);
    let site = Site::open(&config, site_registry())?;

    let path = site
        .store()
        .route_for_view(view)?
        .and_then(|route| route.path(|_| None))
        .unwrap_or_else(|| "/".to_string());
    let page = site.render(view, &RequestInfo::new(path))?;

    if json {
        return Ok(serde_json::to_string_pretty(&page.scope)?);
    }
    Ok(page.html)
}

fn open_existing(db_path: &Path) -> Result<RedbStore, AppError> {
    if !db_path.exists() {
        return Err(AppError::DatabaseMissing(db_path.to_path_buf()));
    }
    Ok(RedbStore::open(db_path)?)
}

// =============================================================================
// TESTS
// =============================================================================
