//! Field declarations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field declarations of a component, keyed by prop name.
pub type FieldMap = BTreeMap<String, FieldSchema>;

/// Declared type of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Slider,
    Switch,
    Select { options: Vec<SelectOption> },
    Color,
    Object { fields: FieldMap },
    Array { fields: FieldMap },
    Slot,
    Divider,
    /// Field type this crate has no special handling for; stored like a
    /// scalar leaf.
    Custom(String),
}

impl FieldKind {
    /// Type name as written in the schema.
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Slider => "slider",
            FieldKind::Switch => "switch",
            FieldKind::Select { .. } => "select",
            FieldKind::Color => "color",
            FieldKind::Object { .. } => "object",
            FieldKind::Array { .. } => "array",
            FieldKind::Slot => "slot",
            FieldKind::Divider => "divider",
            FieldKind::Custom(name) => name,
        }
    }
}

/// How a field's value is laid out in storage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldStorage<'a> {
    /// Plain object whose own fields are stored individually.
    Nested(&'a FieldMap),
    /// Always `{ $xlg: <whole value> }`.
    Whole,
    /// One value per breakpoint while breakpoint mode is on.
    Responsive,
}

/// One option of a select field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub value: Value,
}

/// Per-field template settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSettings {
    pub enabled: bool,
}

/// Declaration of a single field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldSchema", into = "RawFieldSchema")]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub label: Option<String>,
    pub default: Option<Value>,
    /// Store the field as a single value regardless of breakpoint mode.
    pub disable_breakpoints: bool,
    /// Start edit sessions with breakpoint mode enabled for this field.
    pub responsive_mode: bool,
    pub templates: Option<TemplateSettings>,
}

impl FieldSchema {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            label: None,
            default: None,
            disable_breakpoints: false,
            responsive_mode: false,
            templates: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_disabled_breakpoints(mut self) -> Self {
        self.disable_breakpoints = true;
        self
    }

    pub fn with_templates(mut self, enabled: bool) -> Self {
        self.templates = Some(TemplateSettings { enabled });
        self
    }

    /// Storage classification shared by the serializer, flattener and
    /// sanitizer.
    pub fn storage(&self) -> FieldStorage<'_> {
        match &self.kind {
            FieldKind::Object { fields } => FieldStorage::Nested(fields),
            FieldKind::Array { .. } | FieldKind::Divider => FieldStorage::Whole,
            _ if self.disable_breakpoints => FieldStorage::Whole,
            _ => FieldStorage::Responsive,
        }
    }

    /// Whether the field may hold a template expression.
    pub fn allows_templates(&self) -> bool {
        let kind_allows = match self.kind {
            FieldKind::Slot | FieldKind::Divider | FieldKind::Object { .. } | FieldKind::Array { .. } => false,
            FieldKind::Text
            | FieldKind::Number
            | FieldKind::Slider
            | FieldKind::Switch
            | FieldKind::Select { .. }
            | FieldKind::Color
            | FieldKind::Custom(_) => true,
        };
        kind_allows && self.templates.map_or(true, |t| t.enabled)
    }

    /// Value a field falls back to when it leaves template mode: the
    /// declared default, else the first select option, else null.
    pub fn reset_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match &self.kind {
            FieldKind::Select { options } => options
                .first()
                .map(|option| option.value.clone())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Declarations of nested fields (object or array items).
    pub fn child_fields(&self) -> Option<&FieldMap> {
        match &self.kind {
            FieldKind::Object { fields } | FieldKind::Array { fields } => Some(fields),
            _ => None,
        }
    }
}

/// Wire shape of a field declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldSchema {
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_fields: Option<FieldMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    array_fields: Option<FieldMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disable_breakpoints: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    responsive_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    templates: Option<TemplateSettings>,
}

impl From<RawFieldSchema> for FieldSchema {
    fn from(raw: RawFieldSchema) -> Self {
        let kind = match raw.field_type.as_str() {
            "text" | "textarea" => FieldKind::Text,
            "number" => FieldKind::Number,
            "slider" => FieldKind::Slider,
            "switch" => FieldKind::Switch,
            "select" | "radio" => FieldKind::Select {
                options: raw.options.unwrap_or_default(),
            },
            "color" => FieldKind::Color,
            "object" => FieldKind::Object {
                fields: raw.object_fields.unwrap_or_default(),
            },
            "array" => FieldKind::Array {
                fields: raw.array_fields.unwrap_or_default(),
            },
            "slot" => FieldKind::Slot,
            "divider" => FieldKind::Divider,
            other => FieldKind::Custom(other.to_string()),
        };

        FieldSchema {
            kind,
            label: raw.label,
            default: raw.default,
            disable_breakpoints: raw.disable_breakpoints.unwrap_or(false),
            responsive_mode: raw.responsive_mode.unwrap_or(false),
            templates: raw.templates,
        }
    }
}

impl From<FieldSchema> for RawFieldSchema {
    fn from(schema: FieldSchema) -> Self {
        let field_type = schema.kind.type_name().to_string();
        let (object_fields, array_fields, options) = match schema.kind {
            FieldKind::Object { fields } => (Some(fields), None, None),
            FieldKind::Array { fields } => (None, Some(fields), None),
            FieldKind::Select { options } => (None, None, Some(options)),
            _ => (None, None, None),
        };

        RawFieldSchema {
            field_type,
            label: schema.label,
            default: schema.default,
            object_fields,
            array_fields,
            options,
            disable_breakpoints: schema.disable_breakpoints.then_some(true),
            responsive_mode: schema.responsive_mode.then_some(true),
            templates: schema.templates,
        }
    }
}
