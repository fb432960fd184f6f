// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element behavior and the context handed to its hooks.
//!
//! An [`Element`] is the behavior shared by every layer whose resolved
//! element id names it. The graph invokes its hooks synchronously at fixed
//! points of the lifecycle and structural operations. Hooks receive a
//! [`HookContext`] scoped to the layer they run for and may call back into
//! the graph through it; every operation tolerates being entered while
//! another one is still unwinding.

use std::fmt;

use serde_json::Value;

use crate::layer::{InputPatch, Inputs, Layer, LayerGraph, LayerId, LayerKind, LayerSpec};

/// Hooks run by the graph for layers of one element.
///
/// All methods have default no-op implementations, so an element only
/// overrides the hooks it cares about. Hooks take `&self`; elements that
/// keep state use interior mutability.
pub trait Element {
    /// The layer finished mounting.
    fn on_mount(&self, ctx: &mut HookContext<'_>) {
        _ = ctx;
    }

    /// The layer's effective inputs changed.
    fn on_input(&self, ctx: &mut HookContext<'_>) {
        _ = ctx;
    }

    /// The layer's children were resynchronized or changed. `changed` names
    /// the child that was added, removed, or mounted, when there is one.
    fn on_change_children(&self, ctx: &mut HookContext<'_>, changed: Option<&LayerId>) {
        _ = (ctx, changed);
    }

    /// The layer moved away from `old_parent`.
    fn on_change_parent(&self, ctx: &mut HookContext<'_>, old_parent: Option<&LayerId>) {
        _ = (ctx, old_parent);
    }

    /// The layer is about to be deleted.
    fn on_delete(&self, ctx: &mut HookContext<'_>) {
        _ = ctx;
    }

    /// The layer was renamed from `old_id`.
    fn on_rename(&self, ctx: &mut HookContext<'_>, old_id: &LayerId) {
        _ = (ctx, old_id);
    }

    /// Whether `candidate` may become a child of the layer.
    fn can_parent(&self, ctx: &mut HookContext<'_>, candidate: &LayerId) -> bool {
        _ = (ctx, candidate);
        true
    }
}

/// A hook's view of the graph, scoped to one layer.
pub struct HookContext<'a> {
    graph: &'a mut LayerGraph,
    layer: LayerId,
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(graph: &'a mut LayerGraph, layer: LayerId) -> Self {
        Self { graph, layer }
    }

    /// The layer this hook runs for.
    #[must_use]
    pub fn id(&self) -> &LayerId {
        &self.layer
    }

    /// The record of this layer. `None` if a reentrant call deleted it.
    #[must_use]
    pub fn layer(&self) -> Option<&Layer> {
        self.graph.layer(self.layer.as_str())
    }

    /// This layer's effective inputs.
    #[must_use]
    pub fn effective_inputs(&self) -> Option<&Inputs> {
        self.graph.effective_inputs(self.layer.as_str())
    }

    /// One effective input of this layer.
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.effective_inputs()?.get(key)
    }

    /// This layer's children in render order: inherited clones, then
    /// explicit children.
    #[must_use]
    pub fn children(&self) -> Vec<LayerId> {
        self.graph.resolved_children(self.layer.as_str())
    }

    /// Read access to every other layer.
    #[must_use]
    pub fn graph(&self) -> &LayerGraph {
        &*self.graph
    }

    /// Creates a dynamic layer on behalf of this one; `spec.source` names
    /// its source layer whatever kind `spec` was built with. The new layer
    /// is recorded in this layer's creations and deleted with it.
    pub fn create_layer(&mut self, spec: LayerSpec) -> Option<LayerId> {
        let spec = LayerSpec {
            kind: LayerKind::Dynamic,
            creator: Some(self.layer.clone()),
            ..spec
        };
        self.graph.create_layer(spec)
    }

    /// See [`LayerGraph::delete_layer`].
    pub fn delete_layer(&mut self, id: &LayerId) -> bool {
        self.graph.delete_layer(id, false)
    }

    /// See [`LayerGraph::set_inputs`].
    pub fn set_inputs(
        &mut self,
        id: &LayerId,
        patch: InputPatch,
        replace_all: bool,
        persist_shadow: bool,
    ) -> bool {
        self.graph.set_inputs(id, patch, replace_all, persist_shadow)
    }

    /// See [`LayerGraph::set_parent`].
    pub fn set_parent(
        &mut self,
        id: &LayerId,
        parent: Option<&LayerId>,
        allow_orphan: bool,
    ) -> bool {
        self.graph.set_parent(id, parent, allow_orphan)
    }

    /// See [`LayerGraph::reorder_children`].
    pub fn reorder_children(&mut self, children: &[LayerId]) -> bool {
        self.graph.reorder_children(children)
    }

    /// See [`LayerGraph::rename_layer`].
    pub fn rename_layer(&mut self, id: &LayerId, new_id: &LayerId) -> bool {
        self.graph.rename_layer(id, new_id)
    }

    /// See [`LayerGraph::get_projection`].
    #[must_use]
    pub fn get_projection(&self, owner: &str, path: &str) -> Option<&LayerId> {
        self.graph.get_projection(owner, path)
    }
}
