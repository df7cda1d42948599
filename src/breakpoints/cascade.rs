//! Breakpoint cascade resolution (read path).

use crate::types::Breakpoint;
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Whether `value` is a breakpoint-keyed object: non-empty, and every key is
/// one of `$xxs`..`$xlg`.
pub fn is_breakpoint_value(value: &Value) -> bool {
    value.as_object().map_or(false, is_breakpoint_map)
}

pub(crate) fn is_breakpoint_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| Breakpoint::from_key(key).is_some())
}

/// Effective value of `value` at `active`.
///
/// Plain values are returned unchanged. Breakpoint values yield the entry
/// for `active` when present, otherwise the nearest larger breakpoint that
/// has one, ending at `$xlg`. A malformed value with none of those keys
/// resolves to null.
pub fn resolve(value: &Value, active: Breakpoint) -> &Value {
    match value.as_object() {
        Some(map) if is_breakpoint_map(map) => active
            .cascade()
            .find_map(|bp| map.get(bp.key()))
            .unwrap_or(&NULL),
        _ => value,
    }
}

/// Value stored explicitly for `bp`, without cascading.
pub fn explicit_value(value: &Value, bp: Breakpoint) -> Option<&Value> {
    value
        .as_object()
        .filter(|map| is_breakpoint_map(map))
        .and_then(|map| map.get(bp.key()))
}

/// Whether a breakpoint value carries anything besides its `$xlg` floor.
pub fn has_overrides(value: &Value) -> bool {
    value.as_object().map_or(false, |map| {
        is_breakpoint_map(map) && map.keys().any(|key| key != Breakpoint::Xlg.key())
    })
}
