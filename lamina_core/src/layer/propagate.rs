// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recomputing derived state and pushing it through mirrors.
//!
//! Both passes are change-driven: a layer whose recomputed value equals the
//! stored one stops the propagation, so repeated calls converge and stay
//! quiet once nothing differs.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::dirty;

use super::id::LayerId;
use super::record::{LayerKind, LayerSpec};
use super::store::LayerGraph;

impl LayerGraph {
    /// Recomputes the effective inputs of `id` as its source's effective
    /// inputs overlaid with its own.
    ///
    /// When the result differs from the stored map it is stored, every mirror
    /// recomputes, and then the layer's `on_input` hook fires.
    pub fn compute_effective_inputs(&mut self, id: &LayerId) {
        let Some(layer) = self.layers.get(id) else {
            return;
        };
        if !layer.is_mounted {
            self.mount_layer_with(id, false);
        }

        let Some(layer) = self.layers.get(id) else {
            return;
        };
        let source = match layer.kind {
            LayerKind::Base => None,
            _ => layer.source.clone(),
        };
        if let Some(source) = &source {
            if self.layers.get(source).is_some_and(|s| !s.is_mounted) {
                self.mount_layer_with(source, false);
            }
        }

        let mut candidate = source
            .and_then(|s| self.layers.get(&s))
            .map(|s| s.effective_inputs.clone())
            .unwrap_or_default();
        let Some(layer) = self.layers.get_mut(id) else {
            return;
        };
        candidate.extend(layer.inputs.iter().map(|(k, v)| (k.clone(), v.clone())));
        if layer.effective_inputs == candidate {
            return;
        }
        layer.effective_inputs = candidate;
        self.mark(id, dirty::INPUTS);
        trace!(layer = %id, "effective inputs changed");

        for mirror in self.mirrors_of(id) {
            self.compute_effective_inputs(&mirror);
        }
        self.run_hook(id, |element, ctx| element.on_input(ctx));
    }

    /// Brings the inherited clones of `id` in line with its source's resolved
    /// children.
    ///
    /// Clones whose source child is still present keep their identity; new
    /// source children get a fresh inherited clone and vanished ones have
    /// their clone deleted. Base layers have no inherited children. Every
    /// mirror then resynchronizes and the layer's `on_change_children` hook
    /// fires with no specific child.
    pub fn compute_inherited_children(&mut self, id: &LayerId) {
        let Some(layer) = self.layers.get(id) else {
            return;
        };
        if !layer.is_mounted {
            self.mount_layer_with(id, false);
        }
        let Some(layer) = self.layers.get(id) else {
            return;
        };
        let source = match layer.kind {
            LayerKind::Base => None,
            _ => layer.source.clone(),
        };

        match source {
            None => self.clear_inherited_children(id),
            Some(source) => self.sync_inherited_children(id, &source),
        }

        for mirror in self.mirrors_of(id) {
            self.compute_inherited_children(&mirror);
        }
        self.run_hook(id, |element, ctx| element.on_change_children(ctx, None));
    }

    fn clear_inherited_children(&mut self, id: &LayerId) {
        let Some(layer) = self.layers.get(id) else {
            return;
        };
        if layer.inherited_children.is_empty() && layer.inherited_children_map.is_empty() {
            return;
        }
        let clones: Vec<LayerId> = layer.inherited_children_map.values().cloned().collect();
        for clone in &clones {
            self.delete_layer(clone, true);
        }
        if let Some(layer) = self.layers.get_mut(id) {
            layer.inherited_children.clear();
            layer.inherited_children_map.clear();
        }
        self.mark(id, dirty::CHILDREN);
    }

    fn sync_inherited_children(&mut self, id: &LayerId, source: &LayerId) {
        if self.layers.get(source).is_some_and(|s| !s.is_mounted) {
            self.mount_layer_with(source, false);
        }

        let mut seen = BTreeSet::new();
        let mut next: Vec<LayerId> = self
            .layers
            .get(source)
            .map(|s| {
                s.inherited_clones()
                    .chain(s.children.iter())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        next.retain(|child| seen.insert(child.clone()));

        let Some(layer) = self.layers.get(id) else {
            return;
        };
        let owner = layer.owner.clone().unwrap_or_else(|| id.clone());
        let previous_order = layer.inherited_children.clone();
        let previous = layer.inherited_children_map.clone();

        let mut map = BTreeMap::new();
        let mut changed = false;
        for child in &next {
            let existing = previous
                .get(child)
                .filter(|clone| self.layers.contains_key(*clone))
                .cloned();
            match existing {
                Some(clone) => {
                    map.insert(child.clone(), clone);
                }
                None => {
                    let spec = LayerSpec::inherited(child, id, &owner);
                    if let Some(clone) = self.insert_layer(spec) {
                        trace!(layer = %id, %child, %clone, "created inherited clone");
                        map.insert(child.clone(), clone);
                        changed = true;
                    }
                }
            }
        }
        for child in &previous_order {
            if map.contains_key(child) {
                continue;
            }
            if let Some(clone) = previous.get(child) {
                trace!(layer = %id, %child, %clone, "deleting inherited clone");
                self.delete_layer(clone, true);
            }
            changed = true;
        }

        next.retain(|child| map.contains_key(child));
        let Some(layer) = self.layers.get_mut(id) else {
            return;
        };
        if changed || layer.inherited_children != next {
            layer.inherited_children = next;
            layer.inherited_children_map = map;
            self.mark(id, dirty::CHILDREN);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use crate::element::counter::HookCounter;
    use crate::layer::{InputPatch, Inputs, LayerGraph, LayerId, LayerSpec};

    fn id(s: &str) -> LayerId {
        LayerId::from(s)
    }

    fn patch(key: &str, value: serde_json::Value) -> InputPatch {
        InputPatch::from([(key.to_owned(), Some(value))])
    }

    /// `button` <- `primary` <- `cta`, all sharing one counting element.
    fn mirror_chain(counter: &Rc<HookCounter>) -> LayerGraph {
        let mut graph = LayerGraph::new();
        graph.register_element("Button", counter.clone());
        graph.create_layer(LayerSpec::base("Button").id("button"));
        graph.create_layer(LayerSpec::mirror("button").id("primary"));
        graph.create_layer(LayerSpec::mirror("primary").id("cta"));
        counter.reset();
        graph
    }

    #[test]
    fn inputs_fan_out_through_mirrors() {
        let counter = Rc::new(HookCounter::default());
        let mut graph = mirror_chain(&counter);

        graph.set_inputs(&id("button"), patch("color", json!("blue")), false, false);

        for layer in ["button", "primary", "cta"] {
            assert_eq!(
                graph.effective_inputs(layer).and_then(|i| i.get("color")),
                Some(&json!("blue")),
                "{layer} should see the source input"
            );
            assert_eq!(counter.count("input", layer), 1, "{layer} input hook");
        }
    }

    #[test]
    fn unchanged_inputs_stop_propagation() {
        let counter = Rc::new(HookCounter::default());
        let mut graph = mirror_chain(&counter);
        graph.set_inputs(&id("button"), patch("color", json!("blue")), false, false);
        counter.reset();

        graph.set_inputs(&id("button"), patch("color", json!("blue")), false, false);
        graph.compute_effective_inputs(&id("primary"));

        assert_eq!(counter.total("input"), 0, "nothing changed, no hooks");
    }

    #[test]
    fn own_inputs_override_source_inputs() {
        let counter = Rc::new(HookCounter::default());
        let mut graph = mirror_chain(&counter);
        graph.set_inputs(&id("button"), patch("color", json!("blue")), false, false);
        graph.set_inputs(&id("primary"), patch("color", json!("red")), false, false);
        counter.reset();

        graph.set_inputs(&id("button"), patch("color", json!("green")), false, false);

        let color =
            |g: &LayerGraph, l: &str| g.effective_inputs(l).and_then(|i| i.get("color")).cloned();
        assert_eq!(color(&graph, "button"), Some(json!("green")));
        assert_eq!(color(&graph, "primary"), Some(json!("red")));
        assert_eq!(color(&graph, "cta"), Some(json!("red")));
        assert_eq!(counter.count("input", "primary"), 0, "override masks the change");
        assert_eq!(counter.count("input", "cta"), 0);
    }

    #[test]
    fn mirror_effective_inputs_merge_key_by_key() {
        let mut graph = LayerGraph::new();
        graph.create_layer(
            LayerSpec::base("Text")
                .id("t")
                .inputs(Inputs::from([("a".to_owned(), json!(1)), ("b".to_owned(), json!(2))])),
        );
        graph.create_layer(
            LayerSpec::mirror("t")
                .id("m")
                .inputs(Inputs::from([("b".to_owned(), json!(3))])),
        );

        let expected = Inputs::from([("a".to_owned(), json!(1)), ("b".to_owned(), json!(3))]);
        assert_eq!(graph.effective_inputs("m"), Some(&expected));
    }

    /// `list > [a, b]` mirrored by `copy`.
    fn list() -> LayerGraph {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("List").id("list"));
        graph.create_layer(LayerSpec::base("Item").id("a").parent("list"));
        graph.create_layer(LayerSpec::base("Item").id("b").parent("list"));
        graph.create_layer(LayerSpec::mirror("list").id("copy"));
        graph
    }

    fn clones(graph: &LayerGraph, mirror: &str) -> Vec<LayerId> {
        graph.resolved_children(mirror)
    }

    #[test]
    fn clone_identity_survives_resync() {
        let mut graph = list();
        let before = clones(&graph, "copy");
        assert_eq!(before.len(), 2);

        graph.create_layer(LayerSpec::base("Item").id("c").parent("list"));
        let after = clones(&graph, "copy");
        assert_eq!(&after[..2], &before[..], "existing clones keep their ids");
        assert_eq!(after.len(), 3);

        graph.compute_inherited_children(&id("copy"));
        graph.compute_inherited_children(&id("copy"));
        assert_eq!(clones(&graph, "copy"), after, "resync is idempotent");
    }

    #[test]
    fn clone_inputs_survive_sibling_changes() {
        let mut graph = list();
        let clone_a = graph.layer("copy").unwrap().inherited_clone(&id("a")).unwrap().clone();
        graph.set_inputs(&clone_a, patch("selected", json!(true)), false, false);

        graph.create_layer(LayerSpec::base("Item").id("c").parent("list"));
        graph.delete_layer(&id("b"), false);

        assert_eq!(
            graph.effective_inputs(clone_a.as_str()).and_then(|i| i.get("selected")),
            Some(&json!(true))
        );
        assert_eq!(graph.layer("copy").unwrap().inherited_children(), &[id("a"), id("c")]);
    }

    #[test]
    fn vanished_source_child_deletes_its_clone() {
        let mut graph = list();
        let clone_b = graph.layer("copy").unwrap().inherited_clone(&id("b")).unwrap().clone();

        graph.set_parent(&id("b"), None, false);

        assert!(!graph.contains(clone_b.as_str()));
        assert_eq!(graph.layer("copy").unwrap().inherited_children(), &[id("a")]);
    }

    #[test]
    fn second_level_mirror_clones_the_clones() {
        let mut graph = list();
        graph.create_layer(LayerSpec::mirror("copy").id("again"));

        let first = clones(&graph, "copy");
        let second = clones(&graph, "again");
        assert_eq!(second.len(), 2);
        for (outer, inner) in second.iter().zip(&first) {
            let layer = graph.layer(outer.as_str()).unwrap();
            assert_eq!(layer.source(), Some(inner), "clones follow the mirror chain");
            assert_eq!(layer.owner(), Some(&id("again")));
        }
    }

    #[test]
    fn mirror_renders_clones_before_own_children() {
        let mut graph = list();
        graph.create_layer(LayerSpec::base("Item").id("extra").parent("copy"));

        let resolved = clones(&graph, "copy");
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2], id("extra"));
    }

    #[test]
    fn base_layers_have_no_inherited_children() {
        let mut graph = list();
        graph.compute_inherited_children(&id("list"));
        assert!(graph.layer("list").unwrap().inherited_children().is_empty());
        assert_eq!(graph.resolved_children("list"), vec![id("a"), id("b")]);
    }
}
