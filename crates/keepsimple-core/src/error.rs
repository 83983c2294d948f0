//! # Error Module
//!
//! The single error type of the content model.

use thiserror::Error;

/// Result alias used across keepsimple-core.
pub type Result<T> = std::result::Result<T, CmsError>;

/// Errors raised while loading, composing or rendering nodes.
#[derive(Debug, Error)]
pub enum CmsError {
    /// A record names a behavior that is not registered.
    #[error("node type `{0}` is not registered")]
    UnknownNodeType(String),

    /// A route points at a view that does not exist.
    #[error("the view {view} has not been found (route `{route}`)")]
    ViewNotFound { route: String, view: String },

    /// A node lookup by name found nothing.
    #[error("node `{0}` has not been found")]
    NodeNotFound(String),

    #[error("route `{0}` already exists")]
    DuplicateRoute(String),

    #[error("node `{0}` already exists")]
    DuplicateNode(String),

    /// A node value references a value type that is not in the store.
    #[error("value type `{0}` does not exist")]
    UnknownValueType(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// A seed document is inconsistent.
    #[error("invalid seed: {0}")]
    Seed(String),
}

// redb splits its errors per operation; funnel them through `redb::Error`.
macro_rules! storage_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for CmsError {
                fn from(err: $ty) -> Self {
                    Self::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
