//! Finding template expressions in a tree.

use crate::tree::{PathSegment, Tree, TreePath};
use crate::types::TEMPLATE_PREFIX;

/// A template expression found in a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateField {
    pub path: TreePath,
    /// Expression with the marker stripped.
    pub expression: String,
}

/// Whether `s` carries the template marker.
pub fn is_template(s: &str) -> bool {
    s.starts_with(TEMPLATE_PREFIX)
}

/// The expression of a template string, `None` for literal strings.
pub fn template_expression(s: &str) -> Option<&str> {
    s.strip_prefix(TEMPLATE_PREFIX)
}

/// Marker with an empty expression; the value a field takes when it enters
/// template mode.
pub fn empty_template() -> String {
    TEMPLATE_PREFIX.to_string()
}

/// Collect every template expression in `tree`, in document order.
pub fn collect_templates(tree: &Tree) -> Vec<TemplateField> {
    let mut found = Vec::new();
    let mut path = TreePath::root();
    walk(tree, &mut path, &mut found);
    found
}

fn walk(node: &Tree, path: &mut TreePath, found: &mut Vec<TemplateField>) {
    match node {
        Tree::String(s) => {
            if let Some(expression) = template_expression(s) {
                found.push(TemplateField {
                    path: path.clone(),
                    expression: expression.to_string(),
                });
            }
        }
        Tree::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk(item, path, found);
                path.pop();
            }
        }
        Tree::Object(map) => {
            for (key, value) in map.iter() {
                path.push(PathSegment::Key(key.clone()));
                walk(value, path, found);
                path.pop();
            }
        }
        Tree::Null | Tree::Bool(_) | Tree::Number(_) => {}
    }
}

/// Whether `tree` contains at least one template expression. Stops at the
/// first one.
pub fn has_any_templates(tree: &Tree) -> bool {
    match tree {
        Tree::String(s) => is_template(s),
        Tree::Array(items) => items.iter().any(has_any_templates),
        Tree::Object(map) => map.values().any(has_any_templates),
        Tree::Null | Tree::Bool(_) | Tree::Number(_) => false,
    }
}
