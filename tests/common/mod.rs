//! Shared fixtures for integration tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use pagecraft::{
    EvaluatorError, PageDocument, RenderTemplateRequest, TemplateEvaluator, TemplateMessage,
    UserConfiguration, TEMPLATE_PREFIX,
};
use pagecraft::templates::{MessageCallback, Unsubscribe};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Route library logs to the test harness output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn tpl(expression: &str) -> String {
    format!("{}{}", TEMPLATE_PREFIX, expression)
}

/// Card/hero schema used across suites.
pub fn config() -> UserConfiguration {
    UserConfiguration::from_json_str(
        &json!({
            "components": {
                "Card": { "fields": {
                    "title": { "type": "text" },
                    "count": { "type": "number" },
                    "visible": { "type": "switch" },
                    "options": { "type": "object", "objectFields": {
                        "number": { "type": "number" },
                        "deep": { "type": "object", "objectFields": {
                            "deepText": { "type": "text" }
                        }}
                    }},
                    "items": { "type": "array", "arrayFields": { "label": { "type": "text" } } },
                    "body": { "type": "slot" }
                }},
                "Hero": { "fields": {
                    "heading": { "type": "text" },
                    "height": { "type": "slider" }
                }}
            },
            "root": { "fields": {
                "title": { "type": "text" },
                "theme": { "type": "select", "options": [
                    { "label": "Light", "value": "light" },
                    { "label": "Dark", "value": "dark" }
                ]}
            }}
        })
        .to_string(),
    )
    .unwrap()
}

pub fn stored_page() -> PageDocument {
    PageDocument::from_value(json!({
        "root": { "props": { "title": { "$xlg": "Home" }, "theme": { "$xlg": "light" } } },
        "content": [
            { "type": "Card", "props": {
                "id": "card-1",
                "title": { "$xlg": "First", "$md": "First (md)" },
                "options": { "number": { "$xlg": 16, "$sm": 14 }, "deep": { "deepText": { "$xlg": "deep" } } },
                "items": { "$xlg": [{ "label": "a" }] }
            }},
            { "type": "Hero", "props": {
                "id": "hero-1",
                "heading": { "$xlg": "Welcome", "$xs": "Hi" },
                "height": { "$xlg": 400, "$sm": 200 }
            }}
        ],
        "zones": {
            "card-1:body": [{ "type": "Hero", "props": { "id": "hero-2", "heading": { "$xlg": "Nested" } } }]
        }
    }))
    .unwrap()
}

#[derive(Default)]
struct State {
    next_id: u64,
    active: BTreeMap<u64, (String, MessageCallback)>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    failing: Option<String>,
}

/// Evaluator that acknowledges immediately and lets the test push results.
#[derive(Clone, Default)]
pub struct ScriptedEvaluator {
    state: Arc<Mutex<State>>,
}

impl ScriptedEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        let evaluator = Self::default();
        evaluator.state.lock().failing = Some(message.to_string());
        evaluator
    }

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

    pub fn push_result(&self, template: &str, result: Value) {
        self.push(template, TemplateMessage::result(result));
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.lock().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.state.lock().unsubscribe_calls
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }
}

impl TemplateEvaluator for ScriptedEvaluator {
    fn subscribe(
        &self,
        on_message: MessageCallback,
        request: RenderTemplateRequest,
    ) -> BoxFuture<'static, Result<Unsubscribe, EvaluatorError>> {
        let mut state = self.state.lock();
        state.subscribe_calls += 1;

        if let Some(message) = state.failing.clone() {
            return Box::pin(futures::future::ready(Err(EvaluatorError::new(message))));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.active.insert(id, (request.template, on_message));

        let shared = self.state.clone();
        let unsubscribe: Unsubscribe = Box::new(move || {
            let mut state = shared.lock();
            state.unsubscribe_calls += 1;
            state.active.remove(&id);
        });
        Box::pin(futures::future::ready(Ok(unsubscribe)))
    }
}
