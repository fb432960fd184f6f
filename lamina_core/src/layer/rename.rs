// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renaming a layer and rewriting every reference to it.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dirty;

use super::id::LayerId;
use super::record::{LayerKind, projection_path};
use super::store::LayerGraph;

impl LayerGraph {
    /// Gives layer `id` the new id `new_id`.
    ///
    /// Refused when either id is empty, they are equal, `new_id` is taken,
    /// or `id` does not exist. Otherwise every reference is rewritten:
    /// parent and child links, source and mirror links, inherited-children
    /// bookkeeping keyed by the old id, owner and creator links, shadow paths
    /// and the projection and shadow keys derived from them. The layer's
    /// `on_rename` hook fires once all of that is consistent.
    pub fn rename_layer(&mut self, id: &LayerId, new_id: &LayerId) -> bool {
        if id.is_empty() || new_id.is_empty() || id == new_id {
            return false;
        }
        if self.layers.contains_key(new_id) {
            debug!(layer = %id, new = %new_id, "rejected rename: id already exists");
            return false;
        }
        let Some(layer) = self.layers.remove(id) else {
            return false;
        };

        let parent = layer.parent.clone();
        let children = layer.children.clone();
        let source = layer.source.clone();
        let creator = layer.creator.clone();
        let clones: Vec<LayerId> = layer.inherited_children_map.values().cloned().collect();
        let mirrors: Vec<LayerId> = layer.mirrors.iter().cloned().collect();
        let projected: Vec<LayerId> = layer.projections.values().cloned().collect();
        let creations: Vec<LayerId> = layer.creations.iter().cloned().collect();
        if let Some(entry) = self.slots.get_mut(layer.slot as usize) {
            *entry = Some(new_id.clone());
        }
        self.layers.insert(new_id.clone(), layer);

        let swap = |slot: &mut LayerId| {
            if *slot == *id {
                *slot = new_id.clone();
            }
        };

        if let Some(p) = parent.as_ref().and_then(|p| self.layers.get_mut(p)) {
            p.children.iter_mut().for_each(swap);
            p.inherited_children_map.values_mut().for_each(swap);
        }
        for child in children.iter().chain(&clones) {
            if let Some(c) = self.layers.get_mut(child) {
                c.parent = Some(new_id.clone());
            }
        }
        if let Some(s) = source.as_ref().and_then(|s| self.layers.get_mut(s)) {
            s.mirrors.remove(id);
            s.mirrors.insert(new_id.clone());
        }

        // Clones of this layer are indexed by its id in their parents.
        for mirror in &mirrors {
            let Some(m) = self.layers.get(mirror) else {
                continue;
            };
            if m.kind != LayerKind::Inherited {
                continue;
            }
            let Some(holder) = m.parent.clone() else {
                continue;
            };
            if let Some(h) = self.layers.get_mut(&holder) {
                h.inherited_children.iter_mut().for_each(swap);
                if let Some(clone) = h.inherited_children_map.remove(id) {
                    h.inherited_children_map.insert(new_id.clone(), clone);
                }
            }
            self.mark(&holder, dirty::CHILDREN);
        }

        for clone in &projected {
            if let Some(c) = self.layers.get_mut(clone) {
                if c.owner.as_ref() == Some(id) {
                    c.owner = Some(new_id.clone());
                }
            }
        }
        for creation in &creations {
            if let Some(c) = self.layers.get_mut(creation) {
                c.creator = Some(new_id.clone());
            }
        }
        if let Some(c) = creator.as_ref().and_then(|c| self.layers.get_mut(c)) {
            c.creations.remove(id);
            c.creations.insert(new_id.clone());
        }

        self.rewrite_shadow_paths(new_id, id, new_id);
        for clone in &projected {
            self.rewrite_shadow_paths(clone, id, new_id);
        }

        self.mark(new_id, dirty::TOPOLOGY);
        self.pending_renamed.push((id.clone(), new_id.clone()));
        self.run_hook(new_id, |element, ctx| element.on_rename(ctx, id));
        true
    }

    /// Replaces `old` by `new` in the source link and shadow path of `start`
    /// and of everything mirroring it, moving projection and shadow entries
    /// of inherited clones to their new paths.
    fn rewrite_shadow_paths(&mut self, start: &LayerId, old: &LayerId, new: &LayerId) {
        let mut visited = BTreeSet::new();
        let mut stack = vec![start.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(layer) = self.layers.get_mut(&current) else {
                continue;
            };
            if layer.source.as_ref() == Some(old) {
                layer.source = Some(new.clone());
            }
            let old_path = projection_path(&layer.shadow_path);
            for entry in &mut layer.shadow_path {
                if entry == old {
                    *entry = new.clone();
                }
            }
            let new_path = projection_path(&layer.shadow_path);
            stack.extend(layer.mirrors.iter().cloned());

            if layer.kind != LayerKind::Inherited {
                continue;
            }
            let Some(owner) = layer.owner.clone().and_then(|o| self.layers.get_mut(&o)) else {
                continue;
            };
            let stale = owner
                .projections
                .get(&old_path)
                .is_some_and(|p| p == &current || p == old);
            if stale {
                owner.projections.remove(&old_path);
            }
            owner.projections.insert(new_path.clone(), current.clone());
            if old_path != new_path {
                if let Some(shadow) = owner.shadows.remove(&old_path) {
                    owner.shadows.insert(new_path, shadow);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use serde_json::json;

    use crate::element::counter::HookCounter;
    use crate::layer::{Inputs, LayerGraph, LayerId, LayerSpec, Shadow, Shadows};

    fn id(s: &str) -> LayerId {
        LayerId::from(s)
    }

    /// `frame > title`, `header` mirrors `frame`, `page` mirrors `header`
    /// and shadows `header/title`.
    fn nested() -> LayerGraph {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Frame").id("frame"));
        graph.create_layer(LayerSpec::base("Text").id("title").parent("frame"));
        graph.create_layer(LayerSpec::mirror("frame").id("header"));
        let shadow = Shadow {
            inputs: Some(Inputs::from([("text".to_owned(), json!("Custom"))])),
            children: None,
        };
        graph.create_layer(
            LayerSpec::mirror("header")
                .id("page")
                .shadows(Shadows::from([("header/title".to_owned(), shadow)])),
        );
        graph
    }

    #[test]
    fn rename_rewrites_links() {
        let counter = Rc::new(HookCounter::default());
        let mut graph = nested();
        graph.register_element("Frame", counter.clone());

        assert!(graph.rename_layer(&id("frame"), &id("shell")));

        assert!(!graph.contains("frame"));
        assert_eq!(graph.layer("title").unwrap().parent(), Some(&id("shell")));
        assert_eq!(graph.layer("header").unwrap().source(), Some(&id("shell")));
        assert!(graph.layer("shell").unwrap().mirrors().contains(&id("header")));
        assert_eq!(graph.layer("shell").unwrap().shadow_path(), &[id("shell")]);
        assert_eq!(counter.count("rename", "shell"), 1);
    }

    #[test]
    fn rename_refuses_bad_targets() {
        let mut graph = nested();
        assert!(!graph.rename_layer(&id("frame"), &id("frame")), "same id");
        assert!(!graph.rename_layer(&id("frame"), &id("")), "empty id");
        assert!(!graph.rename_layer(&id("frame"), &id("title")), "taken");
        assert!(!graph.rename_layer(&id("ghost"), &id("spirit")), "missing");
        assert!(graph.contains("frame"));
    }

    #[test]
    fn rename_moves_projection_and_shadow_keys() {
        let mut graph = nested();
        let outer = graph.get_projection("page", "header/title").cloned().unwrap();

        assert!(graph.rename_layer(&id("header"), &id("hdr")));

        assert_eq!(graph.get_projection("page", "hdr/title"), Some(&outer));
        assert_eq!(graph.get_projection("page", "header/title"), None);
        let page = graph.layer("page").unwrap();
        assert!(page.shadows().contains_key("hdr/title"));
        assert!(!page.shadows().contains_key("header/title"));
        assert_eq!(page.source(), Some(&id("hdr")));
        assert_eq!(
            graph.layer(outer.as_str()).unwrap().shadow_path(),
            &[id("page"), id("hdr"), id("title")]
        );
        let inner = graph.get_projection("hdr", "title").unwrap();
        assert_eq!(graph.layer(inner.as_str()).unwrap().owner(), Some(&id("hdr")));
    }

    #[test]
    fn renamed_source_child_keeps_its_clones() {
        let mut graph = nested();
        let inner = graph.get_projection("header", "title").cloned().unwrap();
        let outer = graph.get_projection("page", "header/title").cloned().unwrap();

        assert!(graph.rename_layer(&id("title"), &id("heading")));

        assert_eq!(graph.layer("frame").unwrap().children(), &[id("heading")]);
        assert_eq!(graph.layer("header").unwrap().inherited_children(), &[id("heading")]);
        assert_eq!(graph.get_projection("header", "heading"), Some(&inner));
        assert_eq!(graph.get_projection("page", "header/heading"), Some(&outer));
        assert!(graph.layer("page").unwrap().shadows().contains_key("header/heading"));

        // A resync must not rebuild the clones.
        graph.create_layer(LayerSpec::base("Text").id("subtitle").parent("frame"));
        assert_eq!(graph.layer("header").unwrap().inherited_clone(&id("heading")), Some(&inner));
        assert_eq!(graph.layer(inner.as_str()).unwrap().source(), Some(&id("heading")));
        assert_eq!(
            graph.effective_inputs(outer.as_str()).and_then(|i| i.get("text")),
            Some(&json!("Custom"))
        );
    }

    #[test]
    fn renamed_clone_stays_indexed() {
        let mut graph = nested();
        let inner = graph.get_projection("header", "title").cloned().unwrap();
        let outer = graph.get_projection("page", "header/title").cloned().unwrap();

        assert!(graph.rename_layer(&inner, &id("custom")));

        assert_eq!(graph.get_projection("header", "title"), Some(&id("custom")));
        assert_eq!(
            graph.layer("header").unwrap().inherited_clone(&id("title")),
            Some(&id("custom"))
        );
        assert_eq!(graph.layer("page").unwrap().inherited_children(), &[id("custom")]);
        assert_eq!(graph.layer(outer.as_str()).unwrap().source(), Some(&id("custom")));

        graph.compute_inherited_children(&id("page"));
        assert_eq!(graph.get_projection("page", "header/title"), Some(&outer), "no rebuild");
    }

    #[test]
    fn rename_updates_creator_links() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("host"));
        graph.create_layer(LayerSpec::dynamic("host").id("made").creator("host"));

        assert!(graph.rename_layer(&id("host"), &id("owner")));
        assert_eq!(graph.layer("made").unwrap().creator(), Some(&id("owner")));
        assert!(graph.rename_layer(&id("made"), &id("built")));
        assert!(graph.layer("owner").unwrap().creations().contains(&id("built")));
    }
}
