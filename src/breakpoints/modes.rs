//! Per-instance breakpoint mode flags.

use super::cascade;
use crate::schema::{FieldMap, FieldStorage, UserConfiguration};
use crate::types::{FieldPath, PageDocument, ROOT_INSTANCE_ID};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Which fields of which instances store one value per breakpoint.
///
/// Session state only; never persisted with the document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointModeMap {
    entries: HashMap<String, HashMap<FieldPath, bool>>,
}

impl BreakpointModeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map with breakpoint mode enabled for every field whose stored
    /// value already carries per-breakpoint overrides, or whose schema asks
    /// for responsive mode.
    pub fn seed_from_document(document: &PageDocument, config: &UserConfiguration) -> Self {
        let mut modes = Self::new();

        if let Some(fields) = config.root_fields() {
            modes.seed_props(ROOT_INSTANCE_ID, &document.root.props, fields, &FieldPath::empty());
        }

        for node in &document.content {
            if let (Some(id), Some(fields)) = (node.instance_id(), config.node_fields(node)) {
                modes.seed_props(id, &node.props, fields, &FieldPath::empty());
            }
        }

        modes
    }

    fn seed_props(&mut self, instance: &str, props: &Map<String, Value>, fields: &FieldMap, parent: &FieldPath) {
        for (name, field) in fields {
            let path = parent.child(name);
            let value = props.get(name);

            match field.storage() {
                FieldStorage::Nested(children) => {
                    if let Some(Value::Object(map)) = value {
                        if !cascade::is_breakpoint_map(map) {
                            self.seed_props(instance, map, children, &path);
                        }
                    }
                }
                FieldStorage::Whole => {}
                FieldStorage::Responsive => {
                    if field.responsive_mode || value.map_or(false, cascade::has_overrides) {
                        self.set(instance, path, true);
                    }
                }
            }
        }
    }

    /// Whether `path` on `instance` currently stores per-breakpoint values.
    pub fn is_enabled(&self, instance: &str, path: &FieldPath) -> bool {
        self.entries
            .get(instance)
            .and_then(|fields| fields.get(path))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, instance: &str, path: FieldPath, enabled: bool) {
        self.entries
            .entry(instance.to_string())
            .or_default()
            .insert(path, enabled);
    }

    /// Flip the flag and return the new state.
    pub fn toggle(&mut self, instance: &str, path: FieldPath) -> bool {
        let enabled = !self.is_enabled(instance, &path);
        self.set(instance, path, enabled);
        enabled
    }

    /// Forget every flag of an instance (e.g. after it was deleted).
    pub fn remove_instance(&mut self, instance: &str) {
        self.entries.remove(instance);
    }

    /// Flags recorded for one instance.
    pub fn instance(&self, instance: &str) -> Option<&HashMap<FieldPath, bool>> {
        self.entries.get(instance)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
