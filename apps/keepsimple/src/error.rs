//! Errors of the keepsimple binary.

use keepsimple_core::CmsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cms(#[from] CmsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database {} already exists (use --force to replace it)", .0.display())]
    DatabaseExists(PathBuf),

    #[error("database {} does not exist (run `keepsimple init-db` first)", .0.display())]
    DatabaseMissing(PathBuf),

    /// The route table cannot be turned into a router.
    #[error("route setup failed: {0}")]
    Setup(String),
}
