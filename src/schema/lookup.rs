//! Find the field declaration that governs a position in a tree.

use crate::schema::config::UserConfiguration;
use crate::schema::field::{FieldKind, FieldMap, FieldSchema};
use crate::tree::{PathSegment, Tree, TreePath};
use crate::types::Breakpoint;
use std::sync::Arc;

/// Maps tree paths to field declarations.
pub trait FieldLookup: Send + Sync {
    fn field_at(&self, path: &TreePath) -> Option<&FieldSchema>;
}

/// Paths relative to a component's props.
impl FieldLookup for FieldMap {
    fn field_at(&self, path: &TreePath) -> Option<&FieldSchema> {
        descend(self, path.segments())
    }
}

/// Paths relative to a whole page document
/// (`root.props.*`, `content.<i>.props.*`, `zones.<zone>.<i>.props.*`).
pub struct DocumentFieldLookup {
    config: Arc<UserConfiguration>,
    document: Tree,
}

impl DocumentFieldLookup {
    pub fn new(config: Arc<UserConfiguration>, document: Tree) -> Self {
        Self { config, document }
    }

    fn node_fields(&self, node: &[PathSegment]) -> Option<&FieldMap> {
        let type_path = TreePath::from(node.to_vec()).key("type");
        let component_type = self.document.get(&type_path)?.as_str()?;
        self.config.component_fields(component_type)
    }
}

impl FieldLookup for DocumentFieldLookup {
    fn field_at(&self, path: &TreePath) -> Option<&FieldSchema> {
        use PathSegment::{Index, Key};

        let segments = path.segments();
        let (fields, rest) = match segments {
            [Key(root), Key(props), rest @ ..] if root == "root" && props == "props" => {
                (self.config.root_fields()?, rest)
            }
            [Key(content), Index(_), Key(props), rest @ ..]
                if content == "content" && props == "props" =>
            {
                (self.node_fields(&segments[..2])?, rest)
            }
            [Key(zones), Key(_), Index(_), Key(props), rest @ ..]
                if zones == "zones" && props == "props" =>
            {
                (self.node_fields(&segments[..3])?, rest)
            }
            _ => return None,
        };

        descend(fields, rest)
    }
}

fn descend<'a>(fields: &'a FieldMap, segments: &[PathSegment]) -> Option<&'a FieldSchema> {
    let (head, rest) = segments.split_first()?;
    let PathSegment::Key(name) = head else {
        return None;
    };
    descend_field(fields.get(name)?, rest)
}

fn descend_field<'a>(field: &'a FieldSchema, segments: &[PathSegment]) -> Option<&'a FieldSchema> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(field);
    };

    // Breakpoint keys address a value of the same field.
    if let PathSegment::Key(key) = head {
        if Breakpoint::from_key(key).is_some() {
            return descend_field(field, rest);
        }
    }

    match (&field.kind, head) {
        (FieldKind::Object { fields }, PathSegment::Key(_)) => descend(fields, segments),
        (FieldKind::Array { fields }, PathSegment::Index(_)) => descend(fields, rest),
        _ => None,
    }
}
