// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer storage, element registry, read accessors, and slot bookkeeping.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use understory_dirty::{Channel, CycleHandling, DirtyTracker};

use crate::config::GraphConfig;
use crate::element::{Element, HookContext};

use super::id::{ElementId, IdAllocator, LayerId};
use super::record::{Inputs, Layer};

/// The layer graph: every layer record plus the elements they resolve to.
///
/// All mutation goes through the lifecycle and structural operations on
/// this type; records are only handed out by shared reference.
pub struct LayerGraph {
    // -- Records --
    pub(crate) layers: BTreeMap<LayerId, Layer>,
    pub(crate) elements: BTreeMap<ElementId, Rc<dyn Element>>,

    // -- Allocation --
    pub(crate) ids: IdAllocator,
    pub(crate) config: GraphConfig,
    pub(crate) slots: Vec<Option<LayerId>>,
    pub(crate) free_slots: Vec<u32>,

    // -- Change journal --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) pending_added: Vec<LayerId>,
    pub(crate) pending_removed: Vec<LayerId>,
    pub(crate) pending_renamed: Vec<(LayerId, LayerId)>,
}

impl fmt::Debug for LayerGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerGraph")
            .field("layers", &self.layers.len())
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for LayerGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerGraph {
    /// Creates an empty graph with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Creates an empty graph with the given configuration.
    #[must_use]
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            layers: BTreeMap::new(),
            elements: BTreeMap::new(),
            ids: IdAllocator::new(),
            config,
            slots: Vec::new(),
            free_slots: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            pending_renamed: Vec::new(),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // -- Element registry --

    /// Registers the behavior for `element`, replacing any previous one.
    ///
    /// Layers look their element up on every hook invocation, so an element
    /// may be registered before or after layers that use it.
    pub fn register_element(&mut self, element: impl Into<ElementId>, behavior: Rc<dyn Element>) {
        self.elements.insert(element.into(), behavior);
    }

    /// Removes the behavior for `element`. Its layers stop receiving hooks.
    pub fn unregister_element(&mut self, element: &str) -> bool {
        self.elements.remove(element).is_some()
    }

    // -- Read accessors --

    /// Returns whether a layer with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    /// Returns the record of a layer.
    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns whether the graph has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Iterates over all layer ids in sorted order.
    pub fn layer_ids(&self) -> impl Iterator<Item = &LayerId> + '_ {
        self.layers.keys()
    }

    /// Returns the effective inputs of a layer.
    #[must_use]
    pub fn effective_inputs(&self, id: &str) -> Option<&Inputs> {
        self.layers.get(id).map(Layer::effective_inputs)
    }

    /// Returns the children a renderer walks: inherited clones in inherited
    /// order, followed by explicit children.
    #[must_use]
    pub fn resolved_children(&self, id: &str) -> Vec<LayerId> {
        let Some(layer) = self.layers.get(id) else {
            return Vec::new();
        };
        layer
            .inherited_clones()
            .chain(layer.children.iter())
            .cloned()
            .collect()
    }

    /// Returns the live clone at `path` under `owner`.
    #[must_use]
    pub fn get_projection(&self, owner: &str, path: &str) -> Option<&LayerId> {
        self.layers.get(owner)?.projections.get(path)
    }

    /// Returns the layers that have neither a parent nor an owner.
    #[must_use]
    pub fn roots(&self) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|(_, l)| l.parent.is_none() && l.owner.is_none())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns whether `candidate` is `root` or lies below it along explicit
    /// children.
    pub(crate) fn is_in_subtree(&self, root: &LayerId, candidate: &LayerId) -> bool {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if id == candidate {
                return true;
            }
            if let Some(layer) = self.layers.get(id) {
                stack.extend(layer.children.iter());
            }
        }
        false
    }

    // -- Hooks --

    fn behavior_of(&self, id: &LayerId) -> Option<Rc<dyn Element>> {
        let element = self.layers.get(id)?.element.as_ref()?;
        self.elements.get(element).cloned()
    }

    /// Runs a hook of `id`'s element with a context scoped to `id`.
    ///
    /// Returns `None` when the layer is gone or its element is not
    /// registered.
    pub(crate) fn run_hook<R>(
        &mut self,
        id: &LayerId,
        hook: impl FnOnce(&dyn Element, &mut HookContext<'_>) -> R,
    ) -> Option<R> {
        let behavior = self.behavior_of(id)?;
        let mut ctx = HookContext::new(self, id.clone());
        Some(hook(behavior.as_ref(), &mut ctx))
    }

    // -- Slots and journal --

    pub(crate) fn allocate_slot(&mut self, id: &LayerId) -> u32 {
        let slot = if let Some(slot) = self.free_slots.pop() {
            self.slots[slot as usize] = Some(id.clone());
            slot
        } else {
            let slot = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Some(id.clone()));
            slot
        };
        self.pending_added.push(id.clone());
        slot
    }

    pub(crate) fn release_slot(&mut self, id: &LayerId, slot: u32) {
        self.dirty.remove_key(slot);
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = None;
            self.free_slots.push(slot);
        }
        self.pending_removed.push(id.clone());
    }

    pub(crate) fn mark(&mut self, id: &LayerId, channel: Channel) {
        if let Some(slot) = self.layers.get(id).map(|l| l.slot) {
            self.dirty.mark(slot, channel);
        }
    }

    /// Mirrors of `id`, cloned out so that callers may mutate the graph
    /// while iterating.
    pub(crate) fn mirrors_of(&self, id: &LayerId) -> Vec<LayerId> {
        self.layers
            .get(id)
            .map(|l| l.mirrors.iter().cloned().collect())
            .unwrap_or_default()
    }
}
