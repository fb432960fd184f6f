// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hook-call recording.
//!
//! [`HookRecorder`] wraps another [`Element`] and appends a [`HookCall`] to
//! its log before delegating each hook. Register the recorder in place of
//! the element it wraps:
//!
//! ```
//! use std::rc::Rc;
//!
//! use lamina_core::{LayerGraph, LayerSpec};
//! use lamina_debug::recorder::{Hook, HookRecorder};
//!
//! let recorder = Rc::new(HookRecorder::silent());
//! let mut graph = LayerGraph::new();
//! graph.register_element("Card", recorder.clone());
//! graph.create_layer(LayerSpec::base("Card").id("card"));
//!
//! assert!(recorder.calls().iter().any(|c| c.hook == Hook::Mount));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use lamina_core::element::HookContext;
use lamina_core::{Element, LayerId};
use serde::Serialize;

/// Which hook ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    /// [`Element::on_mount`].
    Mount,
    /// [`Element::on_input`].
    Input,
    /// [`Element::on_change_children`].
    ChangeChildren,
    /// [`Element::on_change_parent`].
    ChangeParent,
    /// [`Element::on_delete`].
    Delete,
    /// [`Element::on_rename`].
    Rename,
    /// [`Element::can_parent`].
    CanParent,
}

/// One recorded hook invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HookCall {
    /// The hook.
    pub hook: Hook,
    /// The layer it ran for.
    pub layer: LayerId,
    /// The hook's layer argument: changed child, old parent, old id, or
    /// parenting candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<LayerId>,
}

struct Inert;

impl Element for Inert {}

/// An [`Element`] that records every hook call and then delegates.
pub struct HookRecorder {
    inner: Rc<dyn Element>,
    calls: RefCell<Vec<HookCall>>,
}

impl fmt::Debug for HookRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecorder")
            .field("calls", &self.calls.borrow().len())
            .finish_non_exhaustive()
    }
}

impl HookRecorder {
    /// Records calls and forwards them to `inner`.
    #[must_use]
    pub fn new(inner: Rc<dyn Element>) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Records calls for an element with default behavior.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(Rc::new(Inert))
    }

    /// Returns a copy of the calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.borrow().clone()
    }

    /// Returns and clears the recorded calls.
    pub fn take(&self) -> Vec<HookCall> {
        self.calls.take()
    }

    /// Writes the recorded calls as a JSON array.
    ///
    /// # Errors
    ///
    /// Propagates serialization errors.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.calls.borrow())
    }

    fn record(&self, hook: Hook, layer: &LayerId, subject: Option<&LayerId>) {
        self.calls.borrow_mut().push(HookCall {
            hook,
            layer: layer.clone(),
            subject: subject.cloned(),
        });
    }
}

impl Element for HookRecorder {
    fn on_mount(&self, ctx: &mut HookContext<'_>) {
        self.record(Hook::Mount, ctx.id(), None);
        self.inner.on_mount(ctx);
    }

    fn on_input(&self, ctx: &mut HookContext<'_>) {
        self.record(Hook::Input, ctx.id(), None);
        self.inner.on_input(ctx);
    }

    fn on_change_children(&self, ctx: &mut HookContext<'_>, changed: Option<&LayerId>) {
        self.record(Hook::ChangeChildren, ctx.id(), changed);
        self.inner.on_change_children(ctx, changed);
    }

    fn on_change_parent(&self, ctx: &mut HookContext<'_>, old_parent: Option<&LayerId>) {
        self.record(Hook::ChangeParent, ctx.id(), old_parent);
        self.inner.on_change_parent(ctx, old_parent);
    }

    fn on_delete(&self, ctx: &mut HookContext<'_>) {
        self.record(Hook::Delete, ctx.id(), None);
        self.inner.on_delete(ctx);
    }

    fn on_rename(&self, ctx: &mut HookContext<'_>, old_id: &LayerId) {
        self.record(Hook::Rename, ctx.id(), Some(old_id));
        self.inner.on_rename(ctx, old_id);
    }

    fn can_parent(&self, ctx: &mut HookContext<'_>, candidate: &LayerId) -> bool {
        self.record(Hook::CanParent, ctx.id(), Some(candidate));
        self.inner.can_parent(ctx, candidate)
    }
}
