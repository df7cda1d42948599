//! Field schemas and component configuration.
//!
//! Field declarations are parsed from their JSON wire shape into the closed
//! [`FieldKind`] variant type; everything that branches on field types
//! (serializer, flattener, sanitizer, template coercion) matches on it.

mod config;
mod field;
mod lookup;

pub use config::{ComponentSchema, UserConfiguration};
pub use field::{FieldKind, FieldMap, FieldSchema, FieldStorage, SelectOption, TemplateSettings};
pub use lookup::{DocumentFieldLookup, FieldLookup};
