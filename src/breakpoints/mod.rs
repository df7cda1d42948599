//! Breakpoint-keyed storage.
//!
//! Stored documents keep one value per breakpoint for responsive fields
//! (`{ "$xlg": 16, "$sm": 14 }`). While a screen size is being edited the
//! document is flattened to plain values for that breakpoint, and edits are
//! serialized back without disturbing other breakpoints or instances.

mod cascade;
mod flatten;
mod modes;
mod serializer;

pub use cascade::{explicit_value, has_overrides, is_breakpoint_value, resolve};
pub use flatten::{flatten, flatten_node, flatten_props};
pub use modes::BreakpointModeMap;
pub use serializer::{serialize, BreakpointSerializer};
