//! Resolve every template in a tree and keep the result live.

use super::coerce::coerce_result;
use super::collect::{collect_templates, TemplateField};
use super::subscription::{subscribe_template, CancellationToken, TemplateSubscription};
use super::types::{CloseReason, ResolveEvent, ResolverConfig, TemplateEvaluator};
use crate::error::{PageError, Result};
use crate::schema::{DocumentFieldLookup, FieldLookup, UserConfiguration};
use crate::tree::{Tree, TreePath};
use crate::types::PageDocument;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Opens resolve sessions against one evaluator.
pub struct TemplateResolver {
    evaluator: Arc<dyn TemplateEvaluator>,
    config: ResolverConfig,
}

impl TemplateResolver {
    pub fn new(evaluator: Arc<dyn TemplateEvaluator>) -> Self {
        Self::with_config(evaluator, ResolverConfig::default())
    }

    pub fn with_config(evaluator: Arc<dyn TemplateEvaluator>, config: ResolverConfig) -> Self {
        Self { evaluator, config }
    }

    /// Subscribe every template in `input`.
    ///
    /// Returns once the evaluator acknowledged (or rejected) every
    /// subscription. `lookup` supplies the field declarations used to
    /// coerce results; without it every result is text.
    pub async fn resolve(&self, input: Tree, lookup: Option<Arc<dyn FieldLookup>>) -> ResolveSession {
        let fields = collect_templates(&input);
        let (sender, receiver) = bounded(self.config.buffer_size);
        let token = CancellationToken::new();

        let shared = Arc::new(Shared {
            evaluator: self.evaluator.clone(),
            config: self.config.clone(),
            input: input.clone(),
            lookup,
            fields,
            sender,
            state: Mutex::new(SessionState::fresh(input, 0, token.clone(), 0)),
        });

        if shared.fields.is_empty() {
            debug!("no templates, skipping subscriptions");
        } else {
            {
                let mut state = shared.state.lock();
                state.awaiting = (0..shared.fields.len()).collect();
            }
            debug!(count = shared.fields.len(), "resolving templates");
            shared.emit(ResolveEvent::Loading);
            subscribe_all(&shared, 0, token).await;
        }

        ResolveSession { shared, receiver }
    }

    /// Resolve a page document, coercing results by the fields `config`
    /// declares for each node.
    pub async fn resolve_document(
        &self,
        document: &PageDocument,
        config: Arc<UserConfiguration>,
    ) -> Result<ResolveSession> {
        let tree = Tree::from(document.to_value()?);
        let lookup: Arc<dyn FieldLookup> = Arc::new(DocumentFieldLookup::new(config, tree.clone()));
        Ok(self.resolve(tree, Some(lookup)).await)
    }
}

struct Shared {
    evaluator: Arc<dyn TemplateEvaluator>,
    config: ResolverConfig,
    input: Tree,
    lookup: Option<Arc<dyn FieldLookup>>,
    fields: Vec<TemplateField>,
    sender: Sender<ResolveEvent>,
    state: Mutex<SessionState>,
}

struct SessionState {
    /// Bumped by every reload; results of older rounds are ignored.
    generation: u64,
    token: CancellationToken,
    working: Tree,
    /// Fields still waiting for their first message.
    awaiting: BTreeSet<usize>,
    ready: bool,
    error: Option<String>,
    field_errors: BTreeMap<usize, String>,
    subscriptions: Vec<TemplateSubscription>,
    closed: bool,
}

impl SessionState {
    fn fresh(input: Tree, generation: u64, token: CancellationToken, awaiting: usize) -> Self {
        Self {
            generation,
            token,
            working: input,
            awaiting: (0..awaiting).collect(),
            ready: false,
            error: None,
            field_errors: BTreeMap::new(),
            subscriptions: Vec::new(),
            closed: false,
        }
    }
}

impl Shared {
    fn emit(&self, event: ResolveEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "event buffer full, dropping event");
            }
            // Nobody listens after the session handle is gone.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn apply(&self, generation: u64, index: usize, value: Option<Value>, error: Option<String>) {
        let field = &self.fields[index];
        let leaf = match value {
            Some(raw) => {
                let schema = self.lookup.as_ref().and_then(|lookup| lookup.field_at(&field.path));
                Tree::from(coerce_result(&raw, schema))
            }
            None => Tree::Null,
        };

        let mut state = self.state.lock();
        if state.closed || state.generation != generation {
            return;
        }

        state.working.set(&field.path, leaf);
        state.awaiting.remove(&index);

        match error {
            Some(error) => {
                debug!(path = %field.path, %error, "template evaluation error");
                state.field_errors.insert(index, error.clone());
                self.emit(ResolveEvent::FieldError {
                    path: field.path.clone(),
                    error,
                });
            }
            None => {
                state.field_errors.remove(&index);
            }
        }

        if !state.ready {
            self.check_ready(&mut state);
        } else {
            self.emit(ResolveEvent::Updated {
                path: field.path.clone(),
                tree: state.working.clone(),
            });
        }
    }

    fn check_ready(&self, state: &mut SessionState) {
        if state.ready || !state.awaiting.is_empty() {
            return;
        }
        state.ready = true;
        debug!(generation = state.generation, "templates resolved");
        self.emit(ResolveEvent::Ready {
            tree: state.working.clone(),
        });
    }
}

async fn subscribe_all(shared: &Arc<Shared>, generation: u64, token: CancellationToken) {
    let token = &token;
    let pending = shared.fields.iter().enumerate().map(|(index, field)| {
        let weak: Weak<Shared> = Arc::downgrade(shared);
        let on_result = move |value: Option<Value>, error: Option<String>| {
            if let Some(shared) = weak.upgrade() {
                shared.apply(generation, index, value, error);
            }
        };
        subscribe_template(
            shared.evaluator.as_ref(),
            &field.expression,
            &shared.config.render,
            token,
            on_result,
        )
    });
    let results = join_all(pending).await;

    let mut stale = Vec::new();
    {
        let mut state = shared.state.lock();
        let current = !state.closed && state.generation == generation;

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(subscription) if current => state.subscriptions.push(subscription),
                Ok(subscription) => stale.push(subscription),
                Err(error) if current => {
                    let message = error.to_string();
                    let path = &shared.fields[index].path;
                    warn!(path = %path, error = %message, "could not subscribe template");

                    // The field will never deliver; resolve it to null.
                    state.working.set(path, Tree::Null);
                    state.awaiting.remove(&index);
                    state.error = Some(message.clone());
                    shared.emit(ResolveEvent::Failed { error: message });
                }
                Err(_) => {}
            }
        }

        if current {
            shared.check_ready(&mut state);
        }
    }

    for subscription in stale {
        subscription.close();
    }
}

/// Live resolution of one input tree.
///
/// Dropping the session closes every subscription.
pub struct ResolveSession {
    shared: Arc<Shared>,
    receiver: Receiver<ResolveEvent>,
}

impl ResolveSession {
    /// The input this session resolves. Never modified.
    pub fn input(&self) -> &Tree {
        &self.shared.input
    }

    /// Whether the input carries any template.
    pub fn has_templates(&self) -> bool {
        !self.shared.fields.is_empty()
    }

    /// The resolved tree.
    ///
    /// Without templates this is the input itself. Otherwise `None` until
    /// every template received its first result.
    pub fn current(&self) -> Option<Tree> {
        if !self.has_templates() {
            return Some(self.shared.input.clone());
        }
        let state = self.shared.state.lock();
        state.ready.then(|| state.working.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.has_templates() && !self.shared.state.lock().ready
    }

    /// Last subscription setup failure of the current round.
    pub fn error(&self) -> Option<String> {
        self.shared.state.lock().error.clone()
    }

    /// Latest evaluation error per path. Cleared by the next result.
    pub fn field_errors(&self) -> Vec<(TreePath, String)> {
        let state = self.shared.state.lock();
        state
            .field_errors
            .iter()
            .map(|(index, error)| (self.shared.fields[*index].path.clone(), error.clone()))
            .collect()
    }

    /// Number of open evaluator subscriptions.
    pub fn subscription_count(&self) -> usize {
        let state = self.shared.state.lock();
        state.subscriptions.iter().filter(|s| s.is_open()).count()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Tear down every subscription and subscribe the same input again.
    pub async fn reload(&self) -> Result<()> {
        if !self.has_templates() {
            return Ok(());
        }

        let (generation, token, previous) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(PageError::SessionClosed);
            }

            let generation = state.generation + 1;
            let token = CancellationToken::new();
            let fresh = SessionState::fresh(
                self.shared.input.clone(),
                generation,
                token.clone(),
                self.shared.fields.len(),
            );
            let previous = std::mem::replace(&mut *state, fresh);

            self.shared.emit(ResolveEvent::Closed {
                reason: CloseReason::Reloaded,
            });
            self.shared.emit(ResolveEvent::Loading);
            (generation, token, previous)
        };

        debug!(generation, "reloading templates");
        previous.token.cancel();
        drop(previous);

        subscribe_all(&self.shared, generation, token).await;
        Ok(())
    }

    /// Close every subscription. Later calls are no-ops.
    pub fn close(&self) {
        let previous = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            self.shared.emit(ResolveEvent::Closed {
                reason: CloseReason::Unsubscribed,
            });
            (state.token.clone(), std::mem::take(&mut state.subscriptions))
        };

        let (token, subscriptions) = previous;
        token.cancel();
        drop(subscriptions);
    }

    // --- Events ---

    /// Receive the next event (blocking).
    pub fn recv(&self) -> std::result::Result<ResolveEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<ResolveEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<ResolveEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every buffered event.
    pub fn drain_events(&self) -> Vec<ResolveEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for ResolveSession {
    fn drop(&mut self) {
        self.close();
    }
}
