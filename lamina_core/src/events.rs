// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event bubbling and method dispatch.
//!
//! Events bubble along the **source** chain rather than the parent chain: a
//! handler registered on a template layer fires for every mirror, clone, and
//! dynamic layer derived from it. Methods are single callbacks addressed by
//! layer and name.
//!
//! An [`EventBridge`] is an ordinary value owned next to the
//! [`LayerGraph`] it dispatches over; nothing is process-wide.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::error::BridgeError;
use crate::layer::{LayerGraph, LayerId, LayerKind};

/// What an event handler receives.
#[derive(Clone, Copy, Debug)]
pub struct EventArgs<'a> {
    /// Event name.
    pub event: &'a str,
    /// The layer the event was dispatched at.
    pub target: &'a LayerId,
    /// The layer the running handler is registered on.
    pub source: &'a LayerId,
    /// Event payload.
    pub payload: &'a Value,
}

/// An event handler.
pub type EventHandler = Rc<dyn Fn(&EventArgs<'_>)>;

/// A method implementation.
pub type MethodHandler = Box<dyn FnMut(&[Value]) -> Value>;

/// Identifies a registered event handler for later removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

/// Event handler and method registries.
#[derive(Default)]
pub struct EventBridge {
    handlers: BTreeMap<LayerId, BTreeMap<String, Vec<(HandlerId, EventHandler)>>>,
    methods: BTreeMap<LayerId, BTreeMap<String, MethodHandler>>,
    next_handler: u64,
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: usize = self
            .handlers
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum();
        let methods: usize = self.methods.values().map(BTreeMap::len).sum();
        f.debug_struct("EventBridge")
            .field("handlers", &handlers)
            .field("methods", &methods)
            .finish()
    }
}

impl EventBridge {
    /// Creates empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event` on `layer`. Handlers on one
    /// `(layer, event)` pair run in registration order.
    pub fn register_event(
        &mut self,
        layer: impl Into<LayerId>,
        event: impl Into<String>,
        handler: EventHandler,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.handlers
            .entry(layer.into())
            .or_default()
            .entry(event.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Removes a handler. Empty entries are pruned. Returns whether the
    /// handler was registered.
    pub fn unregister_event(&mut self, layer: &str, event: &str, handler: HandlerId) -> bool {
        let Some(events) = self.handlers.get_mut(layer) else {
            return false;
        };
        let Some(list) = events.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != handler);
        let removed = list.len() != before;
        if list.is_empty() {
            events.remove(event);
        }
        if events.is_empty() {
            self.handlers.remove(layer);
        }
        removed
    }

    /// Whether any handler is registered on `layer`.
    #[must_use]
    pub fn has_handlers(&self, layer: &str) -> bool {
        self.handlers.contains_key(layer)
    }

    /// Dispatches `event` at `target` and bubbles it up the source chain.
    ///
    /// Handlers registered on the target run first, then those of its
    /// source, and so on until a base layer has been handled. A layer that
    /// does not exist ends the walk. Returns how many handlers ran.
    pub fn dispatch(
        &self,
        graph: &LayerGraph,
        event: &str,
        target: &LayerId,
        payload: &Value,
    ) -> usize {
        let mut invoked = 0;
        let mut current = target;
        // A well-formed source chain is no longer than the graph.
        for _ in 0..=graph.len() {
            let Some(layer) = graph.layer(current.as_str()) else {
                break;
            };
            if let Some(list) = self.handlers.get(current).and_then(|e| e.get(event)) {
                let args = EventArgs {
                    event,
                    target,
                    source: current,
                    payload,
                };
                for (_, handler) in list {
                    handler(&args);
                    invoked += 1;
                }
            }
            match (layer.kind(), layer.source()) {
                (LayerKind::Base, _) | (_, None) => break,
                (_, Some(source)) => current = source,
            }
        }
        trace!(event, %target, invoked, "dispatched event");
        invoked
    }

    /// Registers the implementation of `method` on `layer`, replacing any
    /// previous one.
    pub fn register_method(
        &mut self,
        layer: impl Into<LayerId>,
        method: impl Into<String>,
        handler: MethodHandler,
    ) {
        self.methods
            .entry(layer.into())
            .or_default()
            .insert(method.into(), handler);
    }

    /// Removes a method. Empty entries are pruned. Returns whether the
    /// method was registered.
    pub fn unregister_method(&mut self, layer: &str, method: &str) -> bool {
        let Some(methods) = self.methods.get_mut(layer) else {
            return false;
        };
        let removed = methods.remove(method).is_some();
        if methods.is_empty() {
            self.methods.remove(layer);
        }
        removed
    }

    /// Calls `method` on `layer` with `args` and returns its result.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NoMethods`] when `layer` has no methods at all and
    /// [`BridgeError::UnknownMethod`] when it has others but not this one.
    pub fn call_method(
        &mut self,
        layer: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Value, BridgeError> {
        let methods = self.methods.get_mut(layer).ok_or_else(|| BridgeError::NoMethods {
            layer: LayerId::from(layer),
        })?;
        let handler = methods
            .get_mut(method)
            .ok_or_else(|| BridgeError::UnknownMethod {
                layer: LayerId::from(layer),
                method: method.to_owned(),
            })?;
        Ok(handler(args))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::layer::LayerSpec;

    fn chain() -> LayerGraph {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Button").id("button"));
        graph.create_layer(LayerSpec::mirror("button").id("primary"));
        graph.create_layer(LayerSpec::dynamic("primary").id("instance"));
        graph
    }

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> EventHandler {
        let log = Rc::clone(log);
        Rc::new(move |args: &EventArgs<'_>| {
            log.borrow_mut()
                .push(format!("{tag}:{}:{}:{}", args.event, args.target, args.source));
        })
    }

    #[test]
    fn events_bubble_through_source_chain() {
        let graph = chain();
        let mut bridge = EventBridge::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bridge.register_event("button", "click", recorder(&log, "base"));
        bridge.register_event("primary", "click", recorder(&log, "mirror"));
        bridge.register_event("instance", "click", recorder(&log, "dyn"));

        let ran = bridge.dispatch(&graph, "click", &LayerId::from("instance"), &json!({"x": 1}));

        assert_eq!(ran, 3, "one handler per layer on the chain");
        assert_eq!(
            *log.borrow(),
            vec![
                "dyn:click:instance:instance",
                "mirror:click:instance:primary",
                "base:click:instance:button",
            ],
            "target first, base last, target stays fixed"
        );
    }

    #[test]
    fn template_handler_fires_for_inherited_clone() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Card").id("card"));
        graph.create_layer(LayerSpec::base("Label").id("label").parent("card"));
        graph.create_layer(LayerSpec::mirror("card").id("copy"));
        let clone = graph.layer("copy").unwrap().inherited_clone(&"label".into()).unwrap().clone();

        let mut bridge = EventBridge::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bridge.register_event("label", "hover", recorder(&log, "t"));

        assert_eq!(bridge.dispatch(&graph, "hover", &clone, &Value::Null), 1);
        assert_eq!(log.borrow()[0], format!("t:hover:{clone}:label"));
    }

    #[test]
    fn dispatch_ignores_other_events_and_missing_targets() {
        let graph = chain();
        let mut bridge = EventBridge::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bridge.register_event("button", "click", recorder(&log, "base"));

        assert_eq!(bridge.dispatch(&graph, "focus", &LayerId::from("instance"), &Value::Null), 0);
        assert_eq!(bridge.dispatch(&graph, "click", &LayerId::from("ghost"), &Value::Null), 0);
        assert!(log.borrow().is_empty(), "no handler should have run");
    }

    #[test]
    fn unregister_prunes_empty_entries() {
        let mut bridge = EventBridge::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = bridge.register_event("button", "click", recorder(&log, "a"));
        let b = bridge.register_event("button", "click", recorder(&log, "b"));

        assert!(bridge.unregister_event("button", "click", a));
        assert!(!bridge.unregister_event("button", "click", a), "second removal is a no-op");
        assert!(bridge.has_handlers("button"), "b is still registered");
        assert!(bridge.unregister_event("button", "click", b));
        assert!(!bridge.has_handlers("button"), "empty layer entry should be pruned");
    }

    #[test]
    fn methods_dispatch_and_report_errors() {
        let mut bridge = EventBridge::new();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        bridge.register_method(
            "menu",
            "open",
            Box::new(move |args: &[Value]| {
                *counter.borrow_mut() += 1;
                json!(args.len())
            }),
        );

        assert_eq!(bridge.call_method("menu", "open", &[json!(1), json!(2)]), Ok(json!(2)));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(
            bridge.call_method("menu", "close", &[]),
            Err(BridgeError::UnknownMethod {
                layer: "menu".into(),
                method: "close".into(),
            })
        );
        assert_eq!(
            bridge.call_method("nav", "open", &[]),
            Err(BridgeError::NoMethods { layer: "nav".into() })
        );

        assert!(bridge.unregister_method("menu", "open"));
        assert_eq!(
            bridge.call_method("menu", "open", &[]),
            Err(BridgeError::NoMethods { layer: "menu".into() }),
            "last method removed prunes the layer entry"
        );
    }
}
