//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:6543";
pub const DEFAULT_DB: &str = "keepsimple.redb";
pub const DEFAULT_TEMPLATES: &str = "templates";

/// Everything `serve` needs, assembled from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub templates: PathBuf,
    /// Served under `/static` when set.
    pub static_dir: Option<PathBuf>,
    /// Bearer token guarding the backoffice.
    pub admin_token: Option<String>,
}

impl ServerConfig {
    pub fn new(addr: SocketAddr, db_path: impl Into<PathBuf>) -> Self {
        Self {
            addr,
            db_path: db_path.into(),
            templates: PathBuf::from(DEFAULT_TEMPLATES),
            static_dir: None,
            admin_token: None,
        }
    }

    #[must_use]
    pub fn with_templates(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates = dir.into();
        self
    }

    #[must_use]
    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// An empty token counts as none.
    #[must_use]
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.filter(|token| !token.is_empty());
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_admin_token_is_ignored() {
        let addr: SocketAddr = DEFAULT_ADDR.parse().unwrap();
        let config = ServerConfig::new(addr, DEFAULT_DB).with_admin_token(Some(String::new()));
        assert_eq!(config.admin_token, None);

        let config = config.with_admin_token(Some("secret".to_string()));
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
    }

    #[test]
    fn defaults() {
        let addr: SocketAddr = DEFAULT_ADDR.parse().unwrap();
        let config = ServerConfig::new(addr, DEFAULT_DB);
        assert_eq!(config.templates, PathBuf::from("templates"));
        assert!(config.static_dir.is_none());
    }
}
