//! In-memory evaluator for unit tests.

use super::types::{
    MessageCallback, RenderTemplateRequest, TemplateEvaluator, TemplateMessage, Unsubscribe,
};
use crate::error::EvaluatorError;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct MockState {
    next_id: u64,
    active: BTreeMap<u64, (String, MessageCallback)>,
    requests: Vec<RenderTemplateRequest>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    fail_with: Option<String>,
    hold_acks: bool,
    held: Vec<oneshot::Sender<()>>,
}

#[derive(Clone, Default)]
pub(crate) struct MockEvaluator {
    state: Arc<Mutex<MockState>>,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay acknowledgments until `release_acks`.
    pub fn hold_acks(&self) {
        self.state.lock().hold_acks = true;
    }

    pub fn release_acks(&self) {
        let held = {
            let mut state = self.state.lock();
            state.hold_acks = false;
            std::mem::take(&mut state.held)
        };
        for sender in held {
            let _ = sender.send(());
        }
    }

    /// Reject every following subscribe call.
    pub fn fail_with(&self, message: &str) {
        self.state.lock().fail_with = Some(message.to_string());
    }

    /// Push a message to every open subscription of `template`.
    pub fn push(&self, template: &str, message: TemplateMessage) {
        let callbacks: Vec<MessageCallback> = self
            .state
            .lock()
            .active
            .values()
            .filter(|(t, _)| t == template)
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(message.clone());
        }
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.lock().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.state.lock().unsubscribe_calls
    }

    pub fn requests(&self) -> Vec<RenderTemplateRequest> {
        self.state.lock().requests.clone()
    }
}

impl TemplateEvaluator for MockEvaluator {
    fn subscribe(
        &self,
        on_message: MessageCallback,
        request: RenderTemplateRequest,
    ) -> BoxFuture<'static, Result<Unsubscribe, EvaluatorError>> {
        let mut state = self.state.lock();
        state.subscribe_calls += 1;
        state.requests.push(request.clone());

        let outcome = match state.fail_with.clone() {
            Some(message) => Err(EvaluatorError::new(message)),
            None => {
                let id = state.next_id;
                state.next_id += 1;
                state.active.insert(id, (request.template, on_message));

                let shared = self.state.clone();
                let unsubscribe: Unsubscribe = Box::new(move || {
                    let mut state = shared.lock();
                    state.unsubscribe_calls += 1;
                    state.active.remove(&id);
                });
                Ok(unsubscribe)
            }
        };

        if state.hold_acks {
            let (sender, receiver) = oneshot::channel();
            state.held.push(sender);
            Box::pin(async move {
                let _ = receiver.await;
                outcome
            })
        } else {
            Box::pin(futures::future::ready(outcome))
        }
    }
}
