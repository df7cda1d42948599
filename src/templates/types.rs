//! Types shared by the template engine and its evaluator.

use crate::error::EvaluatorError;
use crate::tree::{Tree, TreePath};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Options forwarded with every render request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOptions {
    /// Variables made available to the expression.
    pub variables: Option<Map<String, Value>>,
    /// Fail on undefined variables instead of rendering them empty.
    pub strict: Option<bool>,
    /// Ask the evaluator to push render errors as messages.
    pub report_errors: Option<bool>,
    /// Evaluation timeout.
    pub timeout: Option<Duration>,
}

/// Configuration for a [`TemplateResolver`](super::TemplateResolver).
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub render: RenderOptions,

    /// Max buffered session events. Events that do not fit are dropped;
    /// the session's current tree is always up to date.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            buffer_size: 1000,
        }
    }
}

/// Subscribe request sent to the evaluator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderTemplateRequest {
    #[serde(rename = "type")]
    pub request_type: &'static str,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_errors: Option<bool>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

impl RenderTemplateRequest {
    pub const TYPE: &'static str = "render_template";

    pub fn new(template: impl Into<String>, options: &RenderOptions) -> Self {
        Self {
            request_type: Self::TYPE,
            template: template.into(),
            variables: options.variables.clone(),
            strict: options.strict,
            report_errors: options.report_errors,
            timeout: options.timeout.map(|t| t.as_secs_f64()),
        }
    }
}

/// Message pushed by the evaluator for one subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateMessage {
    Error { error: String },
    Result { result: Value },
}

impl TemplateMessage {
    pub fn result(value: impl Into<Value>) -> Self {
        TemplateMessage::Result {
            result: value.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        TemplateMessage::Error {
            error: message.into(),
        }
    }
}

/// Receives every message of one subscription.
pub type MessageCallback = Arc<dyn Fn(TemplateMessage) + Send + Sync>;

/// Ends one evaluator subscription.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// External service that evaluates template expressions and pushes
/// results.
///
/// The returned future resolves once the evaluator acknowledged the
/// subscription. Messages may arrive before and after that.
pub trait TemplateEvaluator: Send + Sync {
    fn subscribe(
        &self,
        on_message: MessageCallback,
        request: RenderTemplateRequest,
    ) -> BoxFuture<'static, Result<Unsubscribe, EvaluatorError>>;
}

/// Lifecycle of one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionPhase {
    /// Subscribe issued, not yet acknowledged.
    Pending,
    /// Acknowledged, delivering results.
    Streaming,
    Closed,
}

/// Events emitted by a resolve session.
#[derive(Clone, Debug)]
pub enum ResolveEvent {
    /// Subscriptions were issued; no full result set yet.
    Loading,

    /// Every field received its first result.
    Ready { tree: Tree },

    /// A field changed after the session became ready.
    Updated { path: TreePath, tree: Tree },

    /// The evaluator reported an error for one field.
    FieldError { path: TreePath, error: String },

    /// A subscription could not be set up.
    Failed { error: String },

    /// The session's subscriptions were torn down.
    Closed { reason: CloseReason },
}

/// Why a session's subscriptions were torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// Replaced by a reload.
    Reloaded,
    /// Explicitly closed or dropped.
    Unsubscribed,
}
