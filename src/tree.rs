//! Copy-on-write JSON tree.
//!
//! Containers sit behind `Arc`, so cloning a [`Tree`] is cheap and patching a
//! leaf with [`Tree::set`] copies only the ancestor chain of that leaf.
//! Siblings keep pointing at the allocations of the tree they were cloned
//! from, which leaves the source tree untouched.

use serde::ser::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One step of a [`TreePath`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Debug for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{:?}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Address of a node inside a [`Tree`].
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath(Vec<PathSegment>);

impl TreePath {
    pub fn root() -> Self {
        TreePath(Vec::new())
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreePath({})", self)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for TreePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        TreePath(segments)
    }
}

/// Immutable JSON tree with shared containers.
#[derive(Clone, Debug, PartialEq)]
pub enum Tree {
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Tree>>),
    Object(Arc<BTreeMap<String, Tree>>),
}

impl Default for Tree {
    fn default() -> Self {
        Tree::Null
    }
}

impl Tree {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    /// Look up the node at `path`.
    pub fn get(&self, path: &TreePath) -> Option<&Tree> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (Tree::Object(map), PathSegment::Key(key)) => map.get(key),
                (Tree::Array(items), PathSegment::Index(index)) => items.get(*index),
                _ => None,
            })
    }

    /// Replace the node at `path`, copying only the containers along the
    /// way. Returns false (and leaves the tree as it was) when the path
    /// does not exist.
    pub fn set(&mut self, path: &TreePath, value: Tree) -> bool {
        if self.get(path).is_none() {
            return false;
        }
        set_at(self, path.segments(), value)
    }

    /// True when both trees point at the same container or string
    /// allocation.
    pub fn shares_allocation(&self, other: &Tree) -> bool {
        match (self, other) {
            (Tree::String(a), Tree::String(b)) => Arc::ptr_eq(a, b),
            (Tree::Array(a), Tree::Array(b)) => Arc::ptr_eq(a, b),
            (Tree::Object(a), Tree::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Convert back into a plain JSON value.
    pub fn to_value(&self) -> Value {
        Value::from(self)
    }
}

fn set_at(node: &mut Tree, segments: &[PathSegment], value: Tree) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return true;
    };

    let child = match (node, head) {
        (Tree::Object(map), PathSegment::Key(key)) => Arc::make_mut(map).get_mut(key),
        (Tree::Array(items), PathSegment::Index(index)) => Arc::make_mut(items).get_mut(*index),
        _ => None,
    };

    match child {
        Some(child) => set_at(child, rest, value),
        None => false,
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Null,
            Value::Bool(b) => Tree::Bool(b),
            Value::Number(n) => Tree::Number(n),
            Value::String(s) => Tree::String(Arc::from(s)),
            Value::Array(items) => Tree::Array(Arc::new(items.into_iter().map(Tree::from).collect())),
            Value::Object(map) => Tree::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect(),
            )),
        }
    }
}

impl From<&Tree> for Value {
    fn from(tree: &Tree) -> Self {
        match tree {
            Tree::Null => Value::Null,
            Tree::Bool(b) => Value::Bool(*b),
            Tree::Number(n) => Value::Number(n.clone()),
            Tree::String(s) => Value::String(s.to_string()),
            Tree::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            Tree::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::String(Arc::from(s))
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Number(n) => n.serialize(serializer),
            Tree::String(s) => serializer.serialize_str(s),
            Tree::Array(items) => serializer.collect_seq(items.iter()),
            Tree::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Tree {
        Tree::from(json!({
            "content": [
                { "props": { "title": "a", "count": 1 } },
                { "props": { "title": "b" } }
            ],
            "root": { "props": { "theme": "dark" } }
        }))
    }

    #[test]
    fn test_get() {
        let tree = sample();
        let path = TreePath::root().key("content").index(1).key("props").key("title");
        assert_eq!(tree.get(&path).and_then(Tree::as_str), Some("b"));
        assert!(tree.get(&TreePath::root().key("content").index(7)).is_none());
        assert_eq!(tree.get(&TreePath::root()), Some(&tree));
    }

    #[test]
    fn test_set_copies_only_ancestors() {
        let original = sample();
        let mut patched = original.clone();
        let path = TreePath::root().key("content").index(0).key("props").key("title");

        assert!(patched.set(&path, Tree::from("changed")));

        // Original untouched
        assert_eq!(original.get(&path).and_then(Tree::as_str), Some("a"));
        assert_eq!(patched.get(&path).and_then(Tree::as_str), Some("changed"));

        // Untouched siblings still share their allocation
        let root_path = TreePath::root().key("root");
        assert!(original
            .get(&root_path)
            .unwrap()
            .shares_allocation(patched.get(&root_path).unwrap()));
        let sibling = TreePath::root().key("content").index(1);
        assert!(original
            .get(&sibling)
            .unwrap()
            .shares_allocation(patched.get(&sibling).unwrap()));

        // The patched chain was copied
        let chain = TreePath::root().key("content").index(0);
        assert!(!original
            .get(&chain)
            .unwrap()
            .shares_allocation(patched.get(&chain).unwrap()));
    }

    #[test]
    fn test_set_missing_path() {
        let mut tree = sample();
        let before = tree.clone();
        assert!(!tree.set(&TreePath::root().key("nope").key("deeper"), Tree::Null));
        assert!(!tree.set(&TreePath::root().key("content").key("0"), Tree::Null));
        assert_eq!(tree, before);
        assert!(tree.shares_allocation(&before));
    }

    #[test]
    fn test_value_conversion() {
        let value = json!({ "a": [1, "two", null, { "b": true }] });
        let tree = Tree::from(value.clone());
        assert_eq!(tree.to_value(), value);
        assert_eq!(serde_json::to_value(&tree).unwrap(), value);
    }

    #[test]
    fn test_path_display() {
        let path = TreePath::root().key("content").index(3).key("props");
        assert_eq!(path.to_string(), "content.3.props");
    }
}
