//! # Edit Session
//!
//! Bundles everything one editor needs while working on a page: the stored
//! multi-breakpoint document, the active breakpoint and the per-session
//! breakpoint and template mode maps.
//!
//! The editor works on [`EditSession::view`], a document flattened to the
//! active breakpoint, and hands edited views back to [`EditSession::commit`],
//! which serializes them into storage.

use crate::breakpoints::{flatten, BreakpointModeMap, BreakpointSerializer};
use crate::error::Result;
use crate::sanitize::sanitize;
use crate::schema::{DocumentFieldLookup, FieldLookup, FieldMap, FieldSchema, UserConfiguration};
use crate::templates::{ResolveSession, TemplateModeMap, TemplateResolver};
use crate::tree::{PathSegment, Tree, TreePath};
use crate::types::{Breakpoint, FieldPath, PageDocument, ROOT_INSTANCE_ID};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Editing state for one page.
pub struct EditSession {
    config: Arc<UserConfiguration>,

    /// Multi-breakpoint storage
    stored: PageDocument,

    breakpoint: Breakpoint,
    breakpoint_modes: BreakpointModeMap,
    template_modes: TemplateModeMap,
}

impl EditSession {
    /// Start a session on a stored document.
    ///
    /// Breakpoint mode is seeded from the stored values, so fields that
    /// already carry per-breakpoint overrides keep them on the first edit.
    pub fn new(config: Arc<UserConfiguration>, stored: PageDocument) -> Self {
        let breakpoint_modes = BreakpointModeMap::seed_from_document(&stored, &config);
        Self {
            config,
            stored,
            breakpoint: Breakpoint::default(),
            breakpoint_modes,
            template_modes: TemplateModeMap::new(),
        }
    }

    pub fn config(&self) -> &UserConfiguration {
        &self.config
    }

    pub fn stored(&self) -> &PageDocument {
        &self.stored
    }

    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.breakpoint = breakpoint;
    }

    pub fn breakpoint_modes(&self) -> &BreakpointModeMap {
        &self.breakpoint_modes
    }

    pub fn breakpoint_modes_mut(&mut self) -> &mut BreakpointModeMap {
        &mut self.breakpoint_modes
    }

    pub fn template_modes(&self) -> &TemplateModeMap {
        &self.template_modes
    }

    pub fn template_modes_mut(&mut self) -> &mut TemplateModeMap {
        &mut self.template_modes
    }

    /// The stored document flattened to the active breakpoint.
    pub fn view(&self) -> PageDocument {
        flatten(&self.stored, self.breakpoint, &self.config)
    }

    /// Serialize an edited view into storage and return the new stored
    /// document.
    pub fn commit(&mut self, changed: &PageDocument) -> &PageDocument {
        let serializer = BreakpointSerializer::new(&self.config, &self.breakpoint_modes, self.breakpoint);
        self.stored = serializer.serialize(&self.stored, changed);
        debug!(
            breakpoint = %self.breakpoint,
            nodes = self.stored.content.len(),
            "committed edit"
        );
        &self.stored
    }

    /// Swap in a new configuration and trim storage to it.
    pub fn update_config(&mut self, config: Arc<UserConfiguration>) {
        self.stored = sanitize(&self.stored, &config);
        self.config = config;
    }

    /// Flip breakpoint mode of a field; returns the new state.
    pub fn toggle_breakpoint_mode(&mut self, instance: &str, path: FieldPath) -> bool {
        self.breakpoint_modes.toggle(instance, path)
    }

    /// Whether a field is in template mode at the active breakpoint.
    pub fn is_template_mode(&self, instance: &str, path: &FieldPath) -> bool {
        let value = find_props(&self.stored, instance).and_then(|props| get_path(props, path));
        self.template_modes
            .is_enabled(instance, path, value, self.breakpoint)
    }

    /// Flip template mode of a field and commit the resulting value at the
    /// active breakpoint.
    ///
    /// Returns the new value, or `None` when the instance or field is
    /// unknown or the field does not allow templates.
    pub fn toggle_template_mode(&mut self, instance: &str, path: &FieldPath) -> Option<Value> {
        let config = self.config.clone();
        let field = instance_fields(&config, &self.stored, instance)
            .and_then(|fields| field_at(fields, path))?;

        let mut view = self.view();
        let props = find_props_mut(&mut view, instance)?;
        let value = self.template_modes.toggle(
            instance,
            path.clone(),
            field,
            get_path(props, path),
            self.breakpoint,
        )?;

        set_path(props, path, value.clone());
        self.commit(&view);
        Some(value)
    }

    /// Resolve every template of the current view.
    pub async fn resolve(&self, resolver: &TemplateResolver) -> Result<ResolveSession> {
        let view = self.view();
        let tree = Tree::from(view.to_value()?);
        let lookup: Arc<dyn FieldLookup> =
            Arc::new(DocumentFieldLookup::new(self.config.clone(), tree.clone()));
        Ok(resolver.resolve(tree, Some(lookup)).await)
    }
}

fn instance_fields<'a>(
    config: &'a UserConfiguration,
    document: &PageDocument,
    instance: &str,
) -> Option<&'a FieldMap> {
    if instance == ROOT_INSTANCE_ID {
        config.root_fields()
    } else {
        config.node_fields(document.find_content(instance)?)
    }
}

fn field_at<'a>(fields: &'a FieldMap, path: &FieldPath) -> Option<&'a FieldSchema> {
    let segments: Vec<PathSegment> = path
        .as_str()
        .split('.')
        .map(|segment| PathSegment::Key(segment.to_string()))
        .collect();
    fields.field_at(&TreePath::from(segments))
}

fn find_props<'a>(document: &'a PageDocument, instance: &str) -> Option<&'a Map<String, Value>> {
    if instance == ROOT_INSTANCE_ID {
        Some(&document.root.props)
    } else {
        document.find_content(instance).map(|node| &node.props)
    }
}

fn find_props_mut<'a>(document: &'a mut PageDocument, instance: &str) -> Option<&'a mut Map<String, Value>> {
    if instance == ROOT_INSTANCE_ID {
        return Some(&mut document.root.props);
    }
    document
        .content
        .iter_mut()
        .find(|node| node.instance_id() == Some(instance))
        .map(|node| &mut node.props)
}

fn get_path<'a>(props: &'a Map<String, Value>, path: &FieldPath) -> Option<&'a Value> {
    let mut segments = path.as_str().split('.');
    let first = props.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.as_object()?.get(segment))
}

fn set_path(props: &mut Map<String, Value>, path: &FieldPath, value: Value) {
    let segments: Vec<&str> = path.as_str().split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut target = props;
    for segment in parents {
        let entry = target
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        target = map;
    }
    target.insert(last.to_string(), value);
}
