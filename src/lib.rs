//! # Pagecraft
//!
//! Keeps the three representations of a component page consistent:
//! breakpoint-keyed storage, the flattened view an editor works on for one
//! screen size, and a live view with template expressions resolved by an
//! external evaluator.
//!
//! ## Core Concepts
//!
//! - **Breakpoints**: Responsive fields store one value per screen size,
//!   cascading toward `$xlg`
//! - **Serializer**: Merges single-breakpoint edits back into storage
//! - **Sanitizer**: Trims stored documents to the current schema
//! - **Templates**: Streams evaluated expressions into a copy-on-write tree
//!
//! ## Example
//!
//! ```ignore
//! use pagecraft::{Breakpoint, EditSession, PageDocument, UserConfiguration};
//! use std::sync::Arc;
//!
//! let config = Arc::new(UserConfiguration::from_path("./components.json")?);
//! let stored = PageDocument::from_json_str(&page_json)?;
//!
//! let mut session = EditSession::new(config, stored);
//! session.set_breakpoint(Breakpoint::Sm);
//!
//! // Edit the flattened view, then write it back
//! let mut view = session.view();
//! view.content[0].props.insert("title".into(), "Hello".into());
//! session.commit(&view);
//! ```

pub mod breakpoints;
pub mod error;
pub mod sanitize;
pub mod schema;
pub mod session;
pub mod templates;
pub mod tree;
pub mod types;

// Re-exports
pub use breakpoints::{
    explicit_value, flatten, flatten_node, is_breakpoint_value, resolve, serialize,
    BreakpointModeMap, BreakpointSerializer,
};
pub use error::{EvaluatorError, PageError, Result};
pub use sanitize::{sanitize, sanitize_opt};
pub use schema::{
    ComponentSchema, DocumentFieldLookup, FieldKind, FieldLookup, FieldMap, FieldSchema,
    UserConfiguration,
};
pub use session::EditSession;
pub use templates::{
    collect_templates, has_any_templates, CancellationToken, CloseReason, RenderOptions,
    RenderTemplateRequest, ResolveEvent, ResolveSession, ResolverConfig, TemplateEvaluator,
    TemplateMessage, TemplateModeMap, TemplateResolver,
};
pub use tree::{PathSegment, Tree, TreePath};
pub use types::*;
