//! Single-field subscriptions and cooperative cancellation.

use super::types::{
    MessageCallback, RenderOptions, RenderTemplateRequest, SubscriptionPhase, TemplateEvaluator,
    TemplateMessage, Unsubscribe,
};
use crate::error::{PageError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::mem;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

type Listener = Box<dyn FnOnce() + Send>;

/// Handle for removing a cancellation listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct TokenState {
    cancelled: bool,
    next_listener: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

/// Shared cancellation signal for one resolve session.
///
/// Listeners run once, outside the token's lock, when the token is
/// cancelled; cancelling twice is a no-op.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Mutex<TokenState>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let listeners = {
            let mut state = self.inner.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            mem::take(&mut state.listeners)
        };

        for (_, listener) in listeners {
            listener();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Run `listener` on cancellation. An already cancelled token runs it
    /// immediately and returns `None`.
    pub fn on_cancel(&self, listener: impl FnOnce() + Send + 'static) -> Option<ListenerId> {
        let mut state = self.inner.lock();
        if state.cancelled {
            drop(state);
            listener();
            return None;
        }

        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push((id, Box::new(listener)));
        Some(id)
    }

    /// Remove a listener that has not run yet.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.inner.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
        state.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

enum State {
    Pending { close_requested: bool },
    Streaming(Unsubscribe),
    Closed,
}

struct Inner {
    state: Mutex<State>,
    token: CancellationToken,
    listener: Mutex<Option<ListenerId>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(id) = self.listener.get_mut().take() {
            self.token.remove_listener(id);
        }
        if let State::Streaming(unsubscribe) = mem::replace(self.state.get_mut(), State::Closed) {
            unsubscribe();
        }
    }
}

/// One evaluator subscription for one template expression.
///
/// Closing is idempotent: a subscription closed while still pending is
/// unsubscribed exactly once when the evaluator acknowledges it, and a
/// streaming subscription is unsubscribed at most once.
#[derive(Clone)]
pub struct TemplateSubscription {
    inner: Arc<Inner>,
}

impl TemplateSubscription {
    fn pending(token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending {
                    close_requested: false,
                }),
                token,
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn phase(&self) -> SubscriptionPhase {
        match *self.inner.state.lock() {
            State::Pending { .. } => SubscriptionPhase::Pending,
            State::Streaming(_) => SubscriptionPhase::Streaming,
            State::Closed => SubscriptionPhase::Closed,
        }
    }

    /// Whether results are still being accepted.
    pub fn is_open(&self) -> bool {
        is_open(&self.inner)
    }

    pub fn close(&self) {
        let unsubscribe = {
            let mut state = self.inner.state.lock();
            match mem::replace(&mut *state, State::Closed) {
                State::Pending { .. } => {
                    *state = State::Pending {
                        close_requested: true,
                    };
                    None
                }
                State::Streaming(unsubscribe) => Some(unsubscribe),
                State::Closed => None,
            }
        };

        self.detach_listener();

        if let Some(unsubscribe) = unsubscribe {
            trace!("unsubscribing streaming template");
            unsubscribe();
        }
    }

    fn acknowledge(&self, unsubscribe: Unsubscribe) {
        let stale = {
            let mut state = self.inner.state.lock();
            if matches!(*state, State::Pending { close_requested: false }) {
                *state = State::Streaming(unsubscribe);
                None
            } else {
                *state = State::Closed;
                Some(unsubscribe)
            }
        };

        if let Some(unsubscribe) = stale {
            trace!("subscription closed before acknowledgment, unsubscribing");
            self.detach_listener();
            unsubscribe();
        }
    }

    fn fail(&self) {
        *self.inner.state.lock() = State::Closed;
        self.detach_listener();
    }

    fn detach_listener(&self) {
        if let Some(id) = self.inner.listener.lock().take() {
            self.inner.token.remove_listener(id);
        }
    }
}

fn is_open(inner: &Inner) -> bool {
    matches!(
        *inner.state.lock(),
        State::Pending {
            close_requested: false
        } | State::Streaming(_)
    )
}

/// Subscribe one template expression.
///
/// Every pushed message reaches `on_result` as `(Some(value), None)` or
/// `(None, Some(error))` while the subscription is open. Cancelling `token`
/// closes the subscription. A setup failure is returned as an error unless
/// the token was cancelled meanwhile, in which case it is swallowed and a
/// closed subscription is returned.
pub async fn subscribe_template<F>(
    evaluator: &dyn TemplateEvaluator,
    expression: &str,
    options: &RenderOptions,
    token: &CancellationToken,
    on_result: F,
) -> Result<TemplateSubscription>
where
    F: Fn(Option<Value>, Option<String>) + Send + Sync + 'static,
{
    let subscription = TemplateSubscription::pending(token.clone());
    if token.is_cancelled() {
        subscription.fail();
        return Ok(subscription);
    }

    let live: Weak<Inner> = Arc::downgrade(&subscription.inner);
    let on_message: MessageCallback = Arc::new(move |message: TemplateMessage| {
        match live.upgrade() {
            Some(inner) if is_open(&inner) => {}
            _ => return,
        }
        match message {
            TemplateMessage::Result { result } => on_result(Some(result), None),
            TemplateMessage::Error { error } => on_result(None, Some(error)),
        }
    });

    let closer = Arc::downgrade(&subscription.inner);
    let listener = token.on_cancel(move || {
        if let Some(inner) = closer.upgrade() {
            TemplateSubscription { inner }.close();
        }
    });
    *subscription.inner.listener.lock() = listener;

    debug!(template = expression, "subscribing to template");
    let request = RenderTemplateRequest::new(expression, options);

    match evaluator.subscribe(on_message, request).await {
        Ok(unsubscribe) => {
            subscription.acknowledge(unsubscribe);
            Ok(subscription)
        }
        Err(error) if token.is_cancelled() => {
            debug!(template = expression, %error, "subscribe failed after cancellation, ignoring");
            subscription.fail();
            Ok(subscription)
        }
        Err(error) => {
            warn!(template = expression, %error, "template subscription failed");
            subscription.fail();
            Err(PageError::Subscribe(error))
        }
    }
}
