//! Schema trimming.
//!
//! Removes everything from a stored document that the current schema no
//! longer declares, so documents saved under an older schema shed removed
//! components and props before they are persisted again.

use crate::breakpoints::is_breakpoint_value;
use crate::schema::{FieldMap, FieldStorage, UserConfiguration};
use crate::types::{ComponentNode, PageDocument, INSTANCE_ID_PROP};
use serde_json::{Map, Value};
use tracing::debug;

/// Trim `document` to the fields `config` declares.
///
/// Content nodes of unknown types (or types without fields) are dropped;
/// surviving nodes keep their instance id and declared props, with plain object fields
/// trimmed recursively. Root props are trimmed against the root fields and
/// emptied when there are none. Zones are left untouched.
pub fn sanitize(document: &PageDocument, config: &UserConfiguration) -> PageDocument {
    let content = document
        .content
        .iter()
        .filter_map(|node| match config.node_fields(node) {
            Some(fields) => {
                let mut props = trim_props(&node.props, fields);
                // The instance id is identity, not a field.
                if let Some(id) = node.props.get(INSTANCE_ID_PROP) {
                    props.insert(INSTANCE_ID_PROP.to_string(), id.clone());
                }
                Some(ComponentNode {
                    component_type: node.component_type.clone(),
                    props,
                })
            }
            None => {
                debug!(
                    component_type = ?node.component_type,
                    instance = ?node.instance_id(),
                    "dropping node without schema"
                );
                None
            }
        })
        .collect();

    let root_props = match config.root_fields() {
        Some(fields) => trim_props(&document.root.props, fields),
        None => Map::new(),
    };

    PageDocument {
        root: ComponentNode {
            component_type: document.root.component_type.clone(),
            props: root_props,
        },
        content,
        zones: document.zones.clone(),
    }
}

/// Sanitize with optional inputs: without a configuration the document is
/// returned unchanged, without a document there is nothing to return.
pub fn sanitize_opt(document: Option<&PageDocument>, config: Option<&UserConfiguration>) -> Option<PageDocument> {
    let document = document?;
    Some(match config {
        Some(config) => sanitize(document, config),
        None => document.clone(),
    })
}

/// Keep only declared props, recursing into plain object fields.
pub fn trim_props(props: &Map<String, Value>, fields: &FieldMap) -> Map<String, Value> {
    props
        .iter()
        .filter_map(|(name, value)| {
            let field = fields.get(name)?;
            let trimmed = match (field.storage(), value) {
                (FieldStorage::Nested(children), Value::Object(map)) if !is_breakpoint_value(value) => {
                    Value::Object(trim_props(map, children))
                }
                _ => value.clone(),
            };
            Some((name.clone(), trimmed))
        })
        .collect()
}
