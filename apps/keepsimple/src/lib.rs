//! # keepsimple
//!
//! The HTTP server and command line of the keepsimple CMS. Content, routing
//! and rendering logic live in `keepsimple-core`; this crate wires them to
//! axum and clap.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod views;

pub use error::AppError;

// Re-export keepsimple_core for convenience
pub use keepsimple_core;
