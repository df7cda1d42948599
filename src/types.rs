//! Core types for page documents.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Marker carried by string values that hold a template expression.
pub const TEMPLATE_PREFIX: &str = "template::";

/// Instance id used for the page root in per-instance maps.
pub const ROOT_INSTANCE_ID: &str = "root";

/// Prop carrying a content node's instance id.
pub const INSTANCE_ID_PROP: &str = "id";

/// Screen-size tier used to key responsive values.
///
/// Ordered smallest to largest; `Xlg` is the base tier every breakpoint
/// value must carry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xxs,
    Xs,
    Sm,
    Md,
    Lg,
    Xlg,
}

impl Breakpoint {
    /// All breakpoints, smallest first.
    pub const ALL: [Breakpoint; 6] = [
        Breakpoint::Xxs,
        Breakpoint::Xs,
        Breakpoint::Sm,
        Breakpoint::Md,
        Breakpoint::Lg,
        Breakpoint::Xlg,
    ];

    /// Bare name (`"sm"`).
    pub fn name(self) -> &'static str {
        match self {
            Breakpoint::Xxs => "xxs",
            Breakpoint::Xs => "xs",
            Breakpoint::Sm => "sm",
            Breakpoint::Md => "md",
            Breakpoint::Lg => "lg",
            Breakpoint::Xlg => "xlg",
        }
    }

    /// Storage key (`"$sm"`).
    pub fn key(self) -> &'static str {
        match self {
            Breakpoint::Xxs => "$xxs",
            Breakpoint::Xs => "$xs",
            Breakpoint::Sm => "$sm",
            Breakpoint::Md => "$md",
            Breakpoint::Lg => "$lg",
            Breakpoint::Xlg => "$xlg",
        }
    }

    /// Parse a storage key (`"$sm"`). Bare names are not keys.
    pub fn from_key(key: &str) -> Option<Self> {
        key.strip_prefix('$').and_then(Self::from_name)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|bp| bp.name() == name)
    }

    /// Next larger tier, `None` for `Xlg`.
    pub fn larger(self) -> Option<Self> {
        match self {
            Breakpoint::Xxs => Some(Breakpoint::Xs),
            Breakpoint::Xs => Some(Breakpoint::Sm),
            Breakpoint::Sm => Some(Breakpoint::Md),
            Breakpoint::Md => Some(Breakpoint::Lg),
            Breakpoint::Lg => Some(Breakpoint::Xlg),
            Breakpoint::Xlg => None,
        }
    }

    /// This tier followed by every larger one, ending at `Xlg`.
    pub fn cascade(self) -> impl Iterator<Item = Breakpoint> {
        std::iter::successors(Some(self), |bp| bp.larger())
    }
}

impl Default for Breakpoint {
    fn default() -> Self {
        Breakpoint::Xlg
    }
}

impl fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Breakpoint({})", self.name())
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Breakpoint {
    type Err = PageError;

    /// Accepts both `"sm"` and `"$sm"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix('$').unwrap_or(s);
        Self::from_name(name).ok_or_else(|| PageError::InvalidBreakpoint(s.to_string()))
    }
}

/// Dot-joined path of a field inside an instance's props
/// (`options.deep.deepText`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FieldPath(String);

impl FieldPath {
    /// Path of a top-level prop.
    pub fn new(segment: impl Into<String>) -> Self {
        FieldPath(segment.into())
    }

    /// Empty path, used as the parent of top-level props.
    pub fn empty() -> Self {
        FieldPath(String::new())
    }

    /// Path of a nested field.
    pub fn child(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            FieldPath(segment.to_string())
        } else {
            FieldPath(format!("{}.{}", self.0, segment))
        }
    }

    /// Prefix the path with a plugin/addon scope id.
    pub fn with_scope(&self, scope: &str) -> Self {
        FieldPath::new(scope).child(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({})", self.0)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        FieldPath(s.to_string())
    }
}

/// One typed entry in the page tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    /// Component type; selects the schema. The root has none.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,

    #[serde(default)]
    pub props: Map<String, Value>,
}

impl ComponentNode {
    /// Create a typed node with the given props.
    pub fn new(component_type: impl Into<String>, props: Map<String, Value>) -> Self {
        Self {
            component_type: Some(component_type.into()),
            props,
        }
    }

    /// Instance id (`props.id`), when it is a string.
    pub fn instance_id(&self) -> Option<&str> {
        self.props.get(INSTANCE_ID_PROP).and_then(Value::as_str)
    }
}

/// A whole page: root props, top-level content and named zones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    #[serde(default)]
    pub root: ComponentNode,

    #[serde(default)]
    pub content: Vec<ComponentNode>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub zones: BTreeMap<String, Vec<ComponentNode>>,
}

impl PageDocument {
    /// Parse a document from JSON text.
    pub fn from_json_str(s: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parse a document from a JSON value.
    pub fn from_value(value: Value) -> crate::error::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode the document as a JSON value.
    pub fn to_value(&self) -> crate::error::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Find a content node by instance id.
    pub fn find_content(&self, id: &str) -> Option<&ComponentNode> {
        self.content.iter().find(|node| node.instance_id() == Some(id))
    }
}
