//! # keepsimple-core
//!
//! The content model behind keepsimple: pages are trees of nodes described by
//! database rows, each node carrying a scope of key/value data and an optional
//! template.
//!
//! ```text
//! Route ──view──► NodeRecord ──values──► NodeValueRecord ──type──► ValueType
//!                     │                                   ("node" = reference)
//!                     ▼
//!        NodeFactory ─► Node (scope with __deferred refs)
//!                     │
//!                     ▼
//!        Compositor ─► resolve refs depth-first ─► TemplateEngine ─► HTML
//! ```
//!
//! This crate has no async and no network code; the HTTP layer lives in
//! `apps/keepsimple`.

pub mod compositor;
pub mod error;
pub mod factory;
pub mod formats;
pub mod model;
pub mod node;
pub mod registry;
pub mod scope;
pub mod storage;
pub mod template;

pub use compositor::{Compositor, MAX_RENDER_DEPTH, RenderedPage};
pub use error::{CmsError, Result};
pub use factory::NodeFactory;
pub use formats::{SeedDocument, SeedSummary};
pub use model::{NewNode, NodeRecord, NodeValueRecord, Route, ValueKind, ValueType};
pub use node::{BaseNode, BaseView, Node, NodeBehavior, RenderContext, RequestInfo};
pub use registry::NodeRegistry;
pub use scope::{RenderedFragment, Scope, ScopeValue};
pub use storage::{ContentStore, MemoryStore, NodeQuery, RedbStore};
pub use template::TemplateEngine;
