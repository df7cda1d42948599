//! Component and page-level schema configuration.

use crate::error::{PageError, Result};
use crate::schema::field::FieldMap;
use crate::types::ComponentNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Schema of one component type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Declared fields. A component without fields is not editable and is
    /// dropped by the sanitizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldMap>,
}

impl ComponentSchema {
    pub fn with_fields(fields: FieldMap) -> Self {
        Self {
            label: None,
            fields: Some(fields),
        }
    }
}

/// All component schemas plus the root schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfiguration {
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSchema>,

    #[serde(default)]
    pub root: ComponentSchema,
}

impl UserConfiguration {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PageError::InvalidConfig(e.to_string()))
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Fields declared for a component type, if the type is known and
    /// declares any.
    pub fn component_fields(&self, component_type: &str) -> Option<&FieldMap> {
        self.components
            .get(component_type)
            .and_then(|schema| schema.fields.as_ref())
    }

    /// Fields declared for the page root.
    pub fn root_fields(&self) -> Option<&FieldMap> {
        self.root.fields.as_ref()
    }

    /// Fields governing a content or zone node.
    pub fn node_fields(&self, node: &ComponentNode) -> Option<&FieldMap> {
        node.component_type
            .as_deref()
            .and_then(|component_type| self.component_fields(component_type))
    }
}
