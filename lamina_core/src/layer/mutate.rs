// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural edits and input writes.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::MirrorCycleCheck;
use crate::dirty;

use super::id::LayerId;
use super::record::{InputPatch, LayerKind, LayerSpec, projection_path};
use super::store::LayerGraph;

impl LayerGraph {
    /// Moves `id` under `new_parent`, or detaches it when `new_parent` is
    /// `None`.
    ///
    /// The move is refused when the layer already has that parent or when
    /// [`can_parent`](Self::can_parent) says no. On success both the old and
    /// the new parent's mirrors resynchronize, the moved layer's
    /// `on_change_parent` hook fires, and then both parents'
    /// `on_change_children` hooks.
    pub fn set_parent(
        &mut self,
        id: &LayerId,
        new_parent: Option<&LayerId>,
        allow_orphan: bool,
    ) -> bool {
        let Some(layer) = self.layers.get(id) else {
            return false;
        };
        let old_parent = layer.parent.clone();
        if old_parent.as_ref() == new_parent {
            debug!(layer = %id, "rejected reparent: parent unchanged");
            return false;
        }
        if !self.can_parent(id, new_parent, allow_orphan) {
            return false;
        }

        if let Some(old) = &old_parent {
            if let Some(p) = self.layers.get_mut(old) {
                p.children.retain(|c| c != id);
            }
            self.mark(old, dirty::CHILDREN);
            for mirror in self.mirrors_of(old) {
                self.compute_inherited_children(&mirror);
            }
        }

        if let Some(layer) = self.layers.get_mut(id) {
            layer.parent = new_parent.cloned();
        }
        self.mark(id, dirty::TOPOLOGY);

        if let Some(new) = new_parent {
            if let Some(p) = self.layers.get_mut(new) {
                p.children.push(id.clone());
            }
            self.mark(new, dirty::CHILDREN);
            for mirror in self.mirrors_of(new) {
                self.compute_inherited_children(&mirror);
            }
        }

        self.run_hook(id, |element, ctx| {
            element.on_change_parent(ctx, old_parent.as_ref());
        });
        if let Some(old) = &old_parent {
            self.run_hook(old, |element, ctx| element.on_change_children(ctx, Some(id)));
        }
        if let Some(new) = new_parent {
            self.run_hook(new, |element, ctx| element.on_change_children(ctx, Some(id)));
        }
        true
    }

    /// Whether `id` may be placed under `new_parent`.
    ///
    /// Detaching (`None`) is always allowed. Otherwise the move must not
    /// create a structural or mirror cycle, inherited clones never move, and
    /// an inherited target is only accepted with `allow_orphan`. The target's
    /// element gets the last word through its `can_parent` hook.
    pub fn can_parent(
        &mut self,
        id: &LayerId,
        new_parent: Option<&LayerId>,
        allow_orphan: bool,
    ) -> bool {
        let Some(target) = new_parent else {
            return true;
        };
        if let Some(reason) = self.parent_conflict(id, target, allow_orphan) {
            debug!(layer = %id, parent = %target, reason, "rejected reparent");
            return false;
        }
        if self.run_hook(target, |element, ctx| element.can_parent(ctx, id)) == Some(false) {
            debug!(layer = %id, parent = %target, "rejected reparent: vetoed by parent element");
            return false;
        }
        true
    }

    fn parent_conflict(
        &self,
        id: &LayerId,
        target: &LayerId,
        allow_orphan: bool,
    ) -> Option<&'static str> {
        if id == target {
            return Some("layer cannot parent itself");
        }
        let (Some(layer), Some(parent)) = (self.layers.get(id), self.layers.get(target)) else {
            return Some("layer or parent does not exist");
        };
        if layer.parent.as_ref() == Some(target) {
            return Some("already a child of that parent");
        }
        if layer.kind == LayerKind::Inherited {
            return Some("inherited layers cannot be moved");
        }
        if parent.kind == LayerKind::Inherited && !allow_orphan {
            return Some("parent is an inherited layer");
        }
        if parent.shadow_path.contains(id) || layer.shadow_path.contains(target) {
            return Some("shadow paths overlap");
        }
        if self.is_in_subtree(id, target) {
            return Some("parent is a descendant of the layer");
        }
        let mirror_cycle = match self.config.mirror_cycle_check {
            MirrorCycleCheck::Direct => {
                layer.mirrors.contains(target) || parent.mirrors.contains(id)
            }
            MirrorCycleCheck::Transitive => self.mirrors_reach(id, target),
        };
        if mirror_cycle {
            return Some("the move would create a mirror cycle");
        }
        None
    }

    /// Whether placing `id` under `target` lets a mirror chain reach itself.
    ///
    /// Everything rendered under `id` moves along, so each of those layers
    /// is checked: `target` must not mirror it at any depth, and `target`
    /// must not sit in the rendered subtree of anything it mirrors.
    fn mirrors_reach(&self, id: &LayerId, target: &LayerId) -> bool {
        let target_chain = self.source_chain(target);
        self.rendered_subtree(id).iter().any(|moved| {
            target_chain.contains(moved) || self.renders_inside_template(moved, target)
        })
    }

    /// Whether `candidate` is in the rendered subtree of `id` or of any
    /// layer `id` mirrors.
    fn renders_inside_template(&self, id: &LayerId, candidate: &LayerId) -> bool {
        self.source_chain(id)
            .iter()
            .any(|template| self.is_in_rendered_subtree(template, candidate))
    }

    /// Why a layer built from `spec` would break the tree, if it would.
    ///
    /// The new layer must not land in the rendered subtree of its own
    /// templates, and its explicit children must pass the same checks a
    /// move under `spec.parent` would.
    pub(crate) fn creation_conflict(&self, spec: &LayerSpec) -> Option<&'static str> {
        let templates = match spec.kind {
            LayerKind::Base => Vec::new(),
            _ => self.source_chain(&LayerId::from(spec.source.as_str())),
        };
        let parent = spec.parent.as_ref();
        if let Some(parent) = parent {
            if templates.iter().any(|t| self.is_in_rendered_subtree(t, parent)) {
                return Some("the layer would render inside its own template");
            }
        }
        for child in &spec.children {
            let Some(layer) = self.layers.get(child) else {
                continue;
            };
            if layer.kind == LayerKind::Inherited {
                return Some("inherited layers cannot be adopted");
            }
            if templates.contains(child) {
                return Some("a child is a template of the layer");
            }
            let Some(parent) = parent else {
                continue;
            };
            if self.is_in_subtree(child, parent) {
                return Some("a child is an ancestor of the parent");
            }
            if self.mirrors_reach(child, parent) {
                return Some("a child would render inside its own template");
            }
        }
        None
    }

    /// `id` followed by its source, that layer's source, and so on.
    fn source_chain(&self, id: &LayerId) -> Vec<LayerId> {
        let mut chain = vec![id.clone()];
        let mut current = id;
        while let Some(source) = self.layers.get(current).and_then(|l| l.source.as_ref()) {
            if chain.contains(source) {
                break;
            }
            chain.push(source.clone());
            current = source;
        }
        chain
    }

    fn is_in_rendered_subtree(&self, root: &LayerId, candidate: &LayerId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            if &id == candidate {
                return true;
            }
            if visited.insert(id.clone()) {
                stack.extend(self.resolved_children(id.as_str()));
            }
        }
        false
    }

    /// `root` and everything rendered below it, clones included.
    fn rendered_subtree(&self, root: &LayerId) -> Vec<LayerId> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            if visited.insert(id.clone()) {
                stack.extend(self.resolved_children(id.as_str()));
            }
        }
        visited.into_iter().collect()
    }

    /// Replaces the child order of a parent.
    ///
    /// `children` must be a permutation of the current child list of the
    /// first entry's parent: same length, no duplicates, every entry a child
    /// of that parent. Anything else is refused and leaves the graph
    /// untouched.
    pub fn reorder_children(&mut self, children: &[LayerId]) -> bool {
        let Some(parent) = children
            .first()
            .and_then(|first| self.layers.get(first))
            .and_then(|l| l.parent.clone())
        else {
            debug!("rejected reorder: first child has no parent");
            return false;
        };
        let Some(current) = self.layers.get(&parent).map(|p| p.children.len()) else {
            return false;
        };
        let unique: BTreeSet<&LayerId> = children.iter().collect();
        let all_siblings = children
            .iter()
            .all(|c| self.layers.get(c).and_then(|l| l.parent.as_ref()) == Some(&parent));
        if current != children.len() || unique.len() != children.len() || !all_siblings {
            debug!(%parent, "rejected reorder: not a permutation of the current children");
            return false;
        }

        if let Some(p) = self.layers.get_mut(&parent) {
            p.children = children.to_vec();
        }
        self.mark(&parent, dirty::CHILDREN);
        for mirror in self.mirrors_of(&parent) {
            self.compute_inherited_children(&mirror);
        }
        true
    }

    /// Writes explicit inputs of `id` and propagates the effective result.
    ///
    /// With `replace_all` the patch becomes the whole input map, otherwise
    /// it is merged key by key; `None` values delete keys either way. With
    /// `persist_shadow` on an inherited clone the resulting inputs are also
    /// stored in the owner's shadow at the clone's projection path, so they
    /// survive the clone being rebuilt.
    pub fn set_inputs(
        &mut self,
        id: &LayerId,
        patch: InputPatch,
        replace_all: bool,
        persist_shadow: bool,
    ) -> bool {
        let Some(layer) = self.layers.get_mut(id) else {
            return false;
        };
        if replace_all {
            layer.inputs = patch
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect();
        } else {
            for (key, value) in patch {
                match value {
                    Some(value) => {
                        layer.inputs.insert(key, value);
                    }
                    None => {
                        layer.inputs.remove(&key);
                    }
                }
            }
        }

        if persist_shadow && layer.kind == LayerKind::Inherited {
            if let Some(owner) = layer.owner.clone() {
                let path = projection_path(&layer.shadow_path);
                let inputs = layer.inputs.clone();
                if let Some(owner) = self.layers.get_mut(&owner) {
                    owner.shadows.entry(path).or_default().inputs = Some(inputs);
                }
            }
        }

        self.compute_effective_inputs(id);
        true
    }

    /// [`set_inputs`](Self::set_inputs) on the clone projected at `path`
    /// under `owner`. Returns `false` when there is no such clone.
    pub fn set_projection_inputs(
        &mut self,
        owner: &str,
        path: &str,
        patch: InputPatch,
        replace_all: bool,
        persist_shadow: bool,
    ) -> bool {
        let Some(clone) = self.get_projection(owner, path).cloned() else {
            debug!(owner, path, "no projection to write inputs to");
            return false;
        };
        self.set_inputs(&clone, patch, replace_all, persist_shadow)
    }
}
