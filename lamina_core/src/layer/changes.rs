// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draining the change journal.

use crate::dirty;

use super::id::LayerId;
use super::store::LayerGraph;

/// Everything that changed since the previous [`LayerGraph::drain_changes`].
///
/// Dirty layer lists are in slot order, which follows creation order until
/// slots are reused. Every layer is named by its current id.
///
/// A layer that was created and deleted between two drains appears in both
/// `added` and `removed`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphChanges {
    /// Layers whose effective inputs changed.
    pub inputs: Vec<LayerId>,
    /// Layers whose explicit or inherited children changed.
    pub children: Vec<LayerId>,
    /// Layers that moved to another parent or were renamed.
    pub topology: Vec<LayerId>,
    /// Layers created.
    pub added: Vec<LayerId>,
    /// Layers deleted.
    pub removed: Vec<LayerId>,
    /// Renames as `(old, new)` pairs, in the order they happened.
    pub renamed: Vec<(LayerId, LayerId)>,
}

impl GraphChanges {
    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
            && self.children.is_empty()
            && self.topology.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.renamed.is_empty()
    }

    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.inputs.clear();
        self.children.clear();
        self.topology.clear();
        self.added.clear();
        self.removed.clear();
        self.renamed.clear();
    }
}

impl LayerGraph {
    /// Takes the accumulated changes and resets the journal.
    pub fn drain_changes(&mut self) -> GraphChanges {
        let mut changes = GraphChanges::default();
        self.drain_changes_into(&mut changes);
        changes
    }

    /// Like [`drain_changes`](Self::drain_changes), reusing the buffers of
    /// `changes`.
    pub fn drain_changes_into(&mut self, changes: &mut GraphChanges) {
        changes.clear();

        let inputs = self.dirty.drain(dirty::INPUTS).deterministic().run().collect();
        changes.inputs = self.ids_for(inputs);

        let children = self.dirty.drain(dirty::CHILDREN).deterministic().run().collect();
        changes.children = self.ids_for(children);

        let topology = self.dirty.drain(dirty::TOPOLOGY).deterministic().run().collect();
        changes.topology = self.ids_for(topology);

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
        core::mem::swap(&mut self.pending_renamed, &mut changes.renamed);

        // Creations recorded under an id that was renamed later.
        for (old, new) in &changes.renamed {
            for id in changes.added.iter_mut().filter(|id| **id == *old) {
                *id = new.clone();
            }
        }
    }

    fn ids_for(&self, mut slots: Vec<u32>) -> Vec<LayerId> {
        slots.sort_unstable();
        slots.dedup();
        slots
            .iter()
            .filter_map(|&slot| self.slots.get(slot as usize)?.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::layer::{InputPatch, LayerGraph, LayerId, LayerSpec};

    fn id(s: &str) -> LayerId {
        LayerId::from(s)
    }

    #[test]
    fn creation_is_reported_once() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("a"));
        graph.create_layer(LayerSpec::base("Box").id("b").parent("a"));

        let changes = graph.drain_changes();
        assert_eq!(changes.added, vec![id("a"), id("b")]);
        assert!(changes.children.contains(&id("a")), "a gained a child");

        assert!(graph.drain_changes().is_empty(), "journal resets after drain");
    }

    #[test]
    fn input_changes_include_every_affected_mirror() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("a"));
        graph.create_layer(LayerSpec::mirror("a").id("m"));
        graph.create_layer(LayerSpec::base("Box").id("other"));
        graph.drain_changes();

        let patch = InputPatch::from([("k".to_owned(), Some(json!(1)))]);
        graph.set_inputs(&id("a"), patch.clone(), false, false);
        assert_eq!(graph.drain_changes().inputs, vec![id("a"), id("m")]);

        graph.set_inputs(&id("a"), patch, false, false);
        assert!(graph.drain_changes().inputs.is_empty(), "same value, no change");
    }

    #[test]
    fn deletion_and_reparenting_are_reported() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("a"));
        graph.create_layer(LayerSpec::base("Box").id("b"));
        graph.create_layer(LayerSpec::base("Box").id("c").parent("a"));
        graph.drain_changes();

        graph.set_parent(&id("c"), Some(&id("b")), false);
        let changes = graph.drain_changes();
        assert_eq!(changes.topology, vec![id("c")]);
        assert_eq!(changes.children, vec![id("a"), id("b")]);

        graph.delete_layer(&id("b"), false);
        let changes = graph.drain_changes();
        assert_eq!(changes.removed, vec![id("c"), id("b")], "children go first");
    }

    #[test]
    fn renames_map_pending_ids() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("a"));
        graph.rename_layer(&id("a"), &id("z"));

        let changes = graph.drain_changes();
        assert_eq!(changes.added, vec![id("z")]);
        assert_eq!(changes.renamed, vec![(id("a"), id("z"))]);
        assert_eq!(changes.topology, vec![id("z")]);
    }

    #[test]
    fn freed_slots_do_not_leak_marks() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("a"));
        let patch = InputPatch::from([("k".to_owned(), Some(json!(1)))]);
        graph.set_inputs(&id("a"), patch, false, false);
        graph.delete_layer(&id("a"), false);
        graph.create_layer(LayerSpec::base("Box").id("b"));

        let changes = graph.drain_changes();
        assert!(changes.inputs.is_empty(), "b reuses a's slot but not its marks");
        assert_eq!(changes.added, vec![id("a"), id("b")]);
        assert_eq!(changes.removed, vec![id("a")]);
    }
}
