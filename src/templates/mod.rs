//! Live template resolution.
//!
//! String values starting with [`TEMPLATE_PREFIX`](crate::types::TEMPLATE_PREFIX)
//! are expressions evaluated by an external [`TemplateEvaluator`]. A
//! [`TemplateResolver`] subscribes every expression in a tree and keeps a
//! copy-on-write resolved tree up to date as results are pushed.

mod coerce;
mod collect;
mod mode;
mod resolver;
mod subscription;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use coerce::coerce_result;
pub use collect::{
    collect_templates, empty_template, has_any_templates, is_template, template_expression,
    TemplateField,
};
pub use mode::TemplateModeMap;
pub use resolver::{ResolveSession, TemplateResolver};
pub use subscription::{subscribe_template, CancellationToken, ListenerId, TemplateSubscription};
pub use types::{
    CloseReason, MessageCallback, RenderOptions, RenderTemplateRequest, ResolveEvent,
    ResolverConfig, SubscriptionPhase, TemplateEvaluator, TemplateMessage, Unsubscribe,
};
