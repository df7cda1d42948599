//! Merge single-breakpoint edits back into multi-breakpoint storage.

use super::cascade::{self, is_breakpoint_map};
use super::flatten::{flatten_node, flatten_props};
use super::modes::BreakpointModeMap;
use crate::schema::{FieldMap, FieldSchema, FieldStorage, UserConfiguration};
use crate::types::{Breakpoint, ComponentNode, FieldPath, PageDocument, ROOT_INSTANCE_ID};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Serializes flattened edits made at one breakpoint into stored documents.
pub struct BreakpointSerializer<'a> {
    config: &'a UserConfiguration,
    modes: &'a BreakpointModeMap,
    active: Breakpoint,
    scope: Option<&'a str>,
}

impl<'a> BreakpointSerializer<'a> {
    pub fn new(config: &'a UserConfiguration, modes: &'a BreakpointModeMap, active: Breakpoint) -> Self {
        Self {
            config,
            modes,
            active,
            scope: None,
        }
    }

    /// Look up breakpoint modes under `scope.<field path>`.
    pub fn with_scope(mut self, scope: &'a str) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Produce new stored data from `original` and the edited, flattened
    /// `changed` document.
    ///
    /// Content order follows `changed`; nodes are matched to stored nodes by
    /// instance id. Zones are kept as stored.
    pub fn serialize(&self, original: &PageDocument, changed: &PageDocument) -> PageDocument {
        let content = changed
            .content
            .iter()
            .map(|node| self.serialize_content_node(original, node))
            .collect();

        PageDocument {
            root: self.serialize_root(&original.root, &changed.root),
            content,
            zones: original.zones.clone(),
        }
    }

    fn serialize_content_node(&self, original: &PageDocument, node: &ComponentNode) -> ComponentNode {
        let Some(fields) = self.config.node_fields(node) else {
            debug!(
                component_type = ?node.component_type,
                "no schema for node, passing through"
            );
            return node.clone();
        };

        let instance = node.instance_id();
        let stored = instance
            .and_then(|id| original.find_content(id))
            .filter(|stored| stored.component_type == node.component_type);

        if let Some(stored) = stored {
            if flatten_node(stored, fields, self.active) == *node {
                trace!(instance = ?instance, "node untouched by edit, keeping stored value");
                return stored.clone();
            }
        }

        let computed = self.serialize_props(
            instance,
            fields,
            stored.map(|stored| &stored.props),
            &node.props,
            &FieldPath::empty(),
            true,
        );

        let props = match stored {
            Some(stored) => {
                let mut props = stored.props.clone();
                merge_props(&mut props, computed);
                props
            }
            None => computed,
        };

        ComponentNode {
            component_type: node.component_type.clone(),
            props,
        }
    }

    /// Root props are replaced by the declared fields of the edit; anything
    /// the schema no longer declares is dropped.
    fn serialize_root(&self, stored: &ComponentNode, changed: &ComponentNode) -> ComponentNode {
        let props = match self.config.root_fields() {
            Some(fields) if flatten_props(&stored.props, fields, self.active) == changed.props => stored
                .props
                .iter()
                .filter(|(name, _)| fields.contains_key(*name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            Some(fields) => self.serialize_props(
                Some(ROOT_INSTANCE_ID),
                fields,
                Some(&stored.props),
                &changed.props,
                &FieldPath::empty(),
                false,
            ),
            None => Map::new(),
        };

        ComponentNode {
            component_type: stored.component_type.clone(),
            props,
        }
    }

    fn serialize_props(
        &self,
        instance: Option<&str>,
        fields: &FieldMap,
        stored: Option<&Map<String, Value>>,
        changed: &Map<String, Value>,
        parent: &FieldPath,
        keep_undeclared: bool,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for (name, value) in changed {
            let path = parent.child(name);
            match fields.get(name) {
                Some(field) => {
                    let stored_value = stored.and_then(|props| props.get(name));
                    let serialized = self.serialize_field(instance, field, stored_value, value, &path);
                    out.insert(name.clone(), serialized);
                }
                None if keep_undeclared => {
                    out.insert(name.clone(), value.clone());
                }
                None => trace!(field = %path, "dropping undeclared prop"),
            }
        }

        out
    }

    fn serialize_field(
        &self,
        instance: Option<&str>,
        field: &FieldSchema,
        stored: Option<&Value>,
        current: &Value,
        path: &FieldPath,
    ) -> Value {
        let current = cascade::resolve(current, self.active);

        match field.storage() {
            FieldStorage::Nested(children) => match current {
                Value::Object(map) => {
                    let stored_map = stored
                        .and_then(Value::as_object)
                        .filter(|stored| !is_breakpoint_map(stored));
                    Value::Object(self.serialize_props(instance, children, stored_map, map, path, true))
                }
                other => other.clone(),
            },
            FieldStorage::Whole => base_only(current),
            FieldStorage::Responsive if !self.mode_enabled(instance, path) => base_only(current),
            FieldStorage::Responsive => {
                let mut values = stored
                    .and_then(Value::as_object)
                    .filter(|stored| is_breakpoint_map(stored))
                    .cloned()
                    .unwrap_or_default();

                values.insert(self.active.key().to_string(), current.clone());
                values
                    .entry(Breakpoint::Xlg.key())
                    .or_insert_with(|| current.clone());

                Value::Object(values)
            }
        }
    }

    fn mode_enabled(&self, instance: Option<&str>, path: &FieldPath) -> bool {
        let Some(instance) = instance else {
            return false;
        };
        match self.scope {
            Some(scope) => self.modes.is_enabled(instance, &path.with_scope(scope)),
            None => self.modes.is_enabled(instance, path),
        }
    }
}

/// Deep-merge `overlay` into `target`. Plain objects merge key by key;
/// arrays, scalars and breakpoint values replace what was there.
fn merge_props(target: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (name, value) in overlay {
        let nested = matches!(
            (target.get(&name), &value),
            (Some(Value::Object(existing)), Value::Object(incoming))
                if !is_breakpoint_map(existing) && !is_breakpoint_map(incoming)
        );

        if nested {
            if let (Some(Value::Object(existing)), Value::Object(incoming)) = (target.get_mut(&name), value) {
                merge_props(existing, incoming);
            }
        } else {
            target.insert(name, value);
        }
    }
}

fn base_only(value: &Value) -> Value {
    let mut map = Map::new();
    map.insert(Breakpoint::Xlg.key().to_string(), value.clone());
    Value::Object(map)
}

/// Serialize with optional inputs: a missing edit or configuration returns
/// the stored document unchanged.
pub fn serialize(
    original: &PageDocument,
    changed: Option<&PageDocument>,
    active: Breakpoint,
    config: Option<&UserConfiguration>,
    modes: &BreakpointModeMap,
) -> PageDocument {
    match (changed, config) {
        (Some(changed), Some(config)) => BreakpointSerializer::new(config, modes, active).serialize(original, changed),
        _ => original.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::flatten;
    use serde_json::json;

    fn config() -> UserConfiguration {
        serde_json::from_value(json!({
            "components": {
                "Card": { "fields": {
                    "title": { "type": "text" },
                    "options": { "type": "object", "objectFields": {
                        "number": { "type": "number" },
                        "deep": { "type": "object", "objectFields": { "deepText": { "type": "text" } } }
                    }},
                    "items": { "type": "array", "arrayFields": { "label": { "type": "text" } } },
                    "rule": { "type": "divider" },
                    "fixed": { "type": "number", "disableBreakpoints": true }
                }},
                "Empty": {}
            },
            "root": { "fields": { "title": { "type": "text" } } }
        }))
        .unwrap()
    }

    fn stored() -> PageDocument {
        PageDocument::from_value(json!({
            "root": { "props": { "title": { "$xlg": "Home" } } },
            "content": [
                { "type": "Card", "props": {
                    "id": "card-1",
                    "title": { "$xlg": "One" },
                    "options": { "number": { "$xlg": 16, "$sm": 14 }, "deep": { "deepText": { "$xlg": "d" } } }
                }},
                { "type": "Card", "props": {
                    "id": "card-2",
                    "title": { "$xlg": "Two", "$md": "Deux" },
                    "options": { "number": { "$xlg": 8, "$lg": 9 } }
                }}
            ]
        }))
        .unwrap()
    }

    fn edit(at: Breakpoint, id: &str, f: impl FnOnce(&mut Map<String, Value>)) -> PageDocument {
        let mut changed = flatten(&stored(), at, &config());
        let node = changed
            .content
            .iter_mut()
            .find(|node| node.instance_id() == Some(id))
            .unwrap();
        f(&mut node.props);
        changed
    }

    fn set_number(props: &mut Map<String, Value>, value: Value) {
        props["options"]["number"] = value;
    }

    #[test]
    fn test_mode_on_adds_breakpoint() {
        let mut modes = BreakpointModeMap::new();
        modes.set("card-1", FieldPath::new("options").child("number"), true);
        let changed = edit(Breakpoint::Xs, "card-1", |p| set_number(p, json!(15)));

        let result = serialize(&stored(), Some(&changed), Breakpoint::Xs, Some(&config()), &modes);

        assert_eq!(
            result.content[0].props["options"]["number"],
            json!({ "$xlg": 16, "$sm": 14, "$xs": 15 })
        );
    }

    #[test]
    fn test_mode_off_collapses_history() {
        let modes = BreakpointModeMap::new();
        let changed = edit(Breakpoint::Xs, "card-1", |p| set_number(p, json!(15)));

        let result = serialize(&stored(), Some(&changed), Breakpoint::Xs, Some(&config()), &modes);

        assert_eq!(result.content[0].props["options"]["number"], json!({ "$xlg": 15 }));
        assert_eq!(result.content[0].props["title"], json!({ "$xlg": "One" }));
    }

    #[test]
    fn test_first_enable_sets_floor() {
        let mut modes = BreakpointModeMap::new();
        modes.set("card-1", FieldPath::new("title"), true);
        let mut original = stored();
        original.content[0].props["title"] = json!("legacy");
        let mut changed = flatten(&original, Breakpoint::Md, &config());
        changed.content[0].props["title"] = json!("medium");

        let result = serialize(&original, Some(&changed), Breakpoint::Md, Some(&config()), &modes);

        assert_eq!(
            result.content[0].props["title"],
            json!({ "$md": "medium", "$xlg": "medium" })
        );
    }

    #[test]
    fn test_untouched_instance_preserved() {
        let modes = BreakpointModeMap::new();
        let changed = edit(Breakpoint::Xs, "card-1", |p| set_number(p, json!(15)));

        let result = serialize(&stored(), Some(&changed), Breakpoint::Xs, Some(&config()), &modes);

        assert_eq!(result.content[1], stored().content[1]);
    }

    #[test]
    fn test_wholesale_fields() {
        let mut modes = BreakpointModeMap::new();
        modes.set("card-1", FieldPath::new("items"), true);
        modes.set("card-1", FieldPath::new("fixed"), true);
        let mut original = stored();
        original.content[0].props.insert("items".into(), json!({ "$xlg": [{ "label": "a" }], "$sm": [] }));
        let mut changed = flatten(&original, Breakpoint::Sm, &config());
        let props = &mut changed.content[0].props;
        props.insert("items".into(), json!([{ "label": "b" }]));
        props.insert("rule".into(), json!({ "color": "red" }));
        props.insert("fixed".into(), json!(3));

        let result = serialize(&original, Some(&changed), Breakpoint::Sm, Some(&config()), &modes);
        let props = &result.content[0].props;

        assert_eq!(props["items"], json!({ "$xlg": [{ "label": "b" }] }));
        assert_eq!(props["rule"], json!({ "$xlg": { "color": "red" } }));
        assert_eq!(props["fixed"], json!({ "$xlg": 3 }));
    }

    #[test]
    fn test_stored_props_missing_from_edit_survive() {
        let modes = BreakpointModeMap::new();
        let mut original = stored();
        original.content[0].props.insert("items".into(), json!({ "$xlg": [{ "label": "a" }] }));
        let mut changed = flatten(&original, Breakpoint::Xs, &config());
        let props = &mut changed.content[0].props;
        props.remove("items");
        props["options"].as_object_mut().unwrap().remove("deep");
        set_number(props, json!(15));

        let result = serialize(&original, Some(&changed), Breakpoint::Xs, Some(&config()), &modes);
        let props = &result.content[0].props;

        assert_eq!(props["options"]["number"], json!({ "$xlg": 15 }));
        assert_eq!(props["options"]["deep"], json!({ "deepText": { "$xlg": "d" } }));
        assert_eq!(props["items"], json!({ "$xlg": [{ "label": "a" }] }));
        assert_eq!(props["title"], json!({ "$xlg": "One" }));
    }

    #[test]
    fn test_merge_replaces_arrays_and_breakpoint_values() {
        let mut target = json!({
            "items": { "$xlg": [1, 2, 3] },
            "number": { "$xlg": 16, "$sm": 14 },
            "nested": { "a": 1, "b": { "$xlg": [1] } },
            "kept": true
        })
        .as_object()
        .cloned()
        .unwrap();
        let overlay = json!({
            "items": { "$xlg": [9] },
            "number": { "$xlg": 15 },
            "nested": { "b": { "$xlg": [] } }
        })
        .as_object()
        .cloned()
        .unwrap();

        merge_props(&mut target, overlay);

        assert_eq!(
            Value::Object(target),
            json!({
                "items": { "$xlg": [9] },
                "number": { "$xlg": 15 },
                "nested": { "a": 1, "b": { "$xlg": [] } },
                "kept": true
            })
        );
    }

    #[test]
    fn test_root_drops_undeclared_props() {
        let modes = BreakpointModeMap::new();
        let mut changed = flatten(&stored(), Breakpoint::Xlg, &config());
        changed.root.props.insert("title".into(), json!("New"));
        changed.root.props.insert("legacy".into(), json!(true));

        let result = serialize(&stored(), Some(&changed), Breakpoint::Xlg, Some(&config()), &modes);

        assert_eq!(result.root.props["title"], json!({ "$xlg": "New" }));
        assert!(!result.root.props.contains_key("legacy"));
    }

    #[test]
    fn test_untouched_root_drops_stale_fields() {
        let modes = BreakpointModeMap::new();
        let mut original = stored();
        original.root.props.insert("removed".into(), json!({ "$xlg": 1 }));
        let changed = flatten(&original, Breakpoint::Xlg, &config());

        let result = serialize(&original, Some(&changed), Breakpoint::Xlg, Some(&config()), &modes);
        assert_eq!(result.root.props.len(), 1);
        assert_eq!(result.root.props["title"], json!({ "$xlg": "Home" }));
    }

    #[test]
    fn test_unknown_nodes_pass_through() {
        let modes = BreakpointModeMap::new();
        let mut changed = flatten(&stored(), Breakpoint::Xlg, &config());
        let stranger = ComponentNode::new("Stranger", json!({ "id": "s", "x": 1 }).as_object().cloned().unwrap());
        let empty = ComponentNode::new("Empty", json!({ "id": "e" }).as_object().cloned().unwrap());
        changed.content.push(stranger.clone());
        changed.content.push(empty.clone());

        let result = serialize(&stored(), Some(&changed), Breakpoint::Xlg, Some(&config()), &modes);

        assert_eq!(result.content[2], stranger);
        assert_eq!(result.content[3], empty);
    }

    #[test]
    fn test_reordered_content_matched_by_id() {
        let mut modes = BreakpointModeMap::new();
        modes.set("card-2", FieldPath::new("title"), true);
        let mut changed = flatten(&stored(), Breakpoint::Sm, &config());
        changed.content.reverse();
        changed.content[0].props["title"] = json!("Small");

        let result = serialize(&stored(), Some(&changed), Breakpoint::Sm, Some(&config()), &modes);

        assert_eq!(result.content[0].instance_id(), Some("card-2"));
        assert_eq!(
            result.content[0].props["title"],
            json!({ "$xlg": "Two", "$md": "Deux", "$sm": "Small" })
        );
        assert_eq!(result.content[1], stored().content[0]);
    }

    #[test]
    fn test_scoped_modes() {
        let mut modes = BreakpointModeMap::new();
        modes.set("card-1", FieldPath::new("title").with_scope("addon"), true);
        let changed = edit(Breakpoint::Lg, "card-1", |p| {
            p.insert("title".into(), json!("Large"));
        });

        let result = BreakpointSerializer::new(&config(), &modes, Breakpoint::Lg)
            .with_scope("addon")
            .serialize(&stored(), &changed);

        assert_eq!(result.content[0].props["title"], json!({ "$xlg": "One", "$lg": "Large" }));
    }

    #[test]
    fn test_idempotent_at_same_breakpoint() {
        let mut modes = BreakpointModeMap::new();
        modes.set("card-1", FieldPath::new("options").child("number"), true);
        let changed = edit(Breakpoint::Xs, "card-1", |p| set_number(p, json!(15)));

        let once = serialize(&stored(), Some(&changed), Breakpoint::Xs, Some(&config()), &modes);
        let twice = serialize(&once, Some(&changed), Breakpoint::Xs, Some(&config()), &modes);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_inputs_return_original() {
        let modes = BreakpointModeMap::new();
        let original = stored();
        assert_eq!(serialize(&original, None, Breakpoint::Sm, Some(&config()), &modes), original);
        assert_eq!(serialize(&original, Some(&original), Breakpoint::Sm, None, &modes), original);
    }
}
