//! Storage to single-breakpoint projection.

use super::cascade;
use crate::schema::{FieldMap, FieldSchema, FieldStorage, UserConfiguration};
use crate::types::{Breakpoint, ComponentNode, PageDocument};
use serde_json::{Map, Value};

/// Project a stored document onto one breakpoint.
///
/// Declared fields are replaced with their effective value at `active`;
/// nodes without a schema, undeclared props and zones pass through as
/// stored.
pub fn flatten(document: &PageDocument, active: Breakpoint, config: &UserConfiguration) -> PageDocument {
    let root = match config.root_fields() {
        Some(fields) => flatten_node(&document.root, fields, active),
        None => document.root.clone(),
    };

    let content = document
        .content
        .iter()
        .map(|node| match config.node_fields(node) {
            Some(fields) => flatten_node(node, fields, active),
            None => node.clone(),
        })
        .collect();

    PageDocument {
        root,
        content,
        zones: document.zones.clone(),
    }
}

/// Project a single node onto one breakpoint.
pub fn flatten_node(node: &ComponentNode, fields: &FieldMap, active: Breakpoint) -> ComponentNode {
    ComponentNode {
        component_type: node.component_type.clone(),
        props: flatten_props(&node.props, fields, active),
    }
}

/// Project a props map onto one breakpoint.
pub fn flatten_props(props: &Map<String, Value>, fields: &FieldMap, active: Breakpoint) -> Map<String, Value> {
    props
        .iter()
        .map(|(name, value)| {
            let flat = match fields.get(name) {
                Some(field) => flatten_field(value, field, active),
                None => value.clone(),
            };
            (name.clone(), flat)
        })
        .collect()
}

fn flatten_field(value: &Value, field: &FieldSchema, active: Breakpoint) -> Value {
    let resolved = cascade::resolve(value, active);
    match (field.storage(), resolved) {
        (FieldStorage::Nested(fields), Value::Object(map)) => {
            Value::Object(flatten_props(map, fields, active))
        }
        _ => resolved.clone(),
    }
}
