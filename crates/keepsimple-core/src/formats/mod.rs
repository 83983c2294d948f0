//! # Formats Module
//!
//! Exchange formats for site descriptions.
//!
//! This module contains:
//! - The seed document used to populate a fresh database
//!
//! Note: File I/O and JSON parsing remain in the app layer (apps/keepsimple).
//! This module only maps documents onto a store.

mod seed;

pub use seed::*;
