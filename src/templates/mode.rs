//! Per-field template authoring mode.

use super::collect::{empty_template, is_template};
use crate::breakpoints::resolve;
use crate::schema::FieldSchema;
use crate::types::{Breakpoint, FieldPath};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// Which fields of which instances are being edited as template
/// expressions instead of static values.
///
/// Session state only; never persisted with the document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateModeMap {
    entries: HashMap<String, HashMap<FieldPath, bool>>,
}

impl TemplateModeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag recorded for `path`, if any.
    pub fn get(&self, instance: &str, path: &FieldPath) -> Option<bool> {
        self.entries.get(instance)?.get(path).copied()
    }

    pub fn set(&mut self, instance: &str, path: FieldPath, enabled: bool) {
        self.entries
            .entry(instance.to_string())
            .or_default()
            .insert(path, enabled);
    }

    /// Whether the field is in template mode.
    ///
    /// True when the map says so, or when the value (resolved at `active`
    /// for breakpoint-keyed values) is a template.
    pub fn is_enabled(&self, instance: &str, path: &FieldPath, value: Option<&Value>, active: Breakpoint) -> bool {
        if self.get(instance, path) == Some(true) {
            return true;
        }
        value.map_or(false, |value| carries_template(value, active))
    }

    /// Flip template mode and return the value the field should now hold:
    /// an empty template when switching on, the field's reset value when
    /// switching off. `None` (and no change) when the field does not allow
    /// templates.
    pub fn toggle(
        &mut self,
        instance: &str,
        path: FieldPath,
        field: &FieldSchema,
        value: Option<&Value>,
        active: Breakpoint,
    ) -> Option<Value> {
        if !field.allows_templates() {
            trace!(instance, path = %path, "templates not allowed for field");
            return None;
        }

        let enable = !self.is_enabled(instance, &path, value, active);
        self.set(instance, path, enable);

        Some(if enable {
            Value::String(empty_template())
        } else {
            field.reset_value()
        })
    }

    /// Forget every flag of an instance.
    pub fn remove_instance(&mut self, instance: &str) {
        self.entries.remove(instance);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn carries_template(value: &Value, active: Breakpoint) -> bool {
    resolve(value, active).as_str().map_or(false, is_template)
}
