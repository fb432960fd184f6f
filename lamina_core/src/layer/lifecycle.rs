// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Creating, mounting, and deleting layers.

use tracing::{debug, warn};

use crate::dirty;

use super::id::LayerId;
use super::record::{Layer, LayerKind, LayerSpec, projection_path};
use super::store::LayerGraph;

impl LayerGraph {
    /// Creates a layer and mounts it.
    ///
    /// Without an explicit id one is generated: base layers are seeded with
    /// their element id, other kinds with the configured prefix.
    ///
    /// Creating a layer under an id that is already taken logs a warning and
    /// returns the existing id unchanged. Returns `None` (and creates
    /// nothing) when the parent or, for non-base kinds, the source layer
    /// does not exist.
    ///
    /// Inherited clones are made by the graph alone, so a spec of that kind
    /// is refused. So is a spec whose parent or children would put the new
    /// layer inside the rendered subtree of its own template.
    ///
    /// The new layer is appended to its parent's children, and every mirror
    /// of the parent resynchronizes its inherited children.
    pub fn create_layer(&mut self, spec: LayerSpec) -> Option<LayerId> {
        if spec.kind == LayerKind::Inherited {
            debug!(source = %spec.source, "rejected create: inherited kind");
            return None;
        }
        self.insert_layer(spec)
    }

    /// [`create_layer`](Self::create_layer) without the kind restriction.
    /// Inherited clones are attached to their parent but not listed among
    /// its children.
    pub(crate) fn insert_layer(&mut self, spec: LayerSpec) -> Option<LayerId> {
        let id = match spec.id.clone() {
            Some(id) if !id.is_empty() => id,
            _ => {
                let prefix = match spec.kind {
                    LayerKind::Base => spec.source.clone(),
                    LayerKind::Mirror => self.config.mirror_prefix.clone(),
                    LayerKind::Inherited => self.config.inherited_prefix.clone(),
                    LayerKind::Dynamic => self.config.dynamic_prefix.clone(),
                };
                let layers = &self.layers;
                self.ids.allocate(&prefix, |candidate| layers.contains_key(candidate))
            }
        };

        if self.layers.contains_key(&id) {
            warn!(layer = %id, "could not create layer, id already exists");
            return Some(id);
        }
        if spec.kind != LayerKind::Base && !self.layers.contains_key(spec.source.as_str()) {
            debug!(layer = %id, source = %spec.source, "rejected create: source does not exist");
            return None;
        }
        if let Some(parent) = &spec.parent {
            if !self.layers.contains_key(parent) {
                debug!(layer = %id, %parent, "rejected create: parent does not exist");
                return None;
            }
        }
        if spec.kind != LayerKind::Inherited {
            if let Some(reason) = self.creation_conflict(&spec) {
                debug!(layer = %id, reason, "rejected create");
                return None;
            }
        }

        let kind = spec.kind;
        let parent = spec.parent.clone();
        let children = spec.children.clone();
        let slot = self.allocate_slot(&id);
        self.layers.insert(id.clone(), Layer::new(spec, slot));

        let children = self.adopt_children(&id, &children);
        if let Some(layer) = self.layers.get_mut(&id) {
            layer.children = children;
        }

        if let Some(parent) = parent {
            if kind != LayerKind::Inherited {
                if let Some(p) = self.layers.get_mut(&parent) {
                    p.children.push(id.clone());
                }
                self.mark(&parent, dirty::CHILDREN);
            }
            for mirror in self.mirrors_of(&parent) {
                self.compute_inherited_children(&mirror);
            }
        }

        self.mount_layer_with(&id, false);
        Some(id)
    }

    /// Deletes a layer together with everything that depends on it.
    ///
    /// Inherited clones can only go as part of a cascade, and a layer that is
    /// the source of a mirror or dynamic layer is kept while that layer
    /// exists. Pass `is_cascade = false` from outside the graph.
    ///
    /// Teardown is post-order: the delete hook runs first, then clones,
    /// explicit children, and creations are deleted, and the record itself
    /// goes last. Returns whether the layer was deleted.
    pub fn delete_layer(&mut self, id: &LayerId, is_cascade: bool) -> bool {
        let Some(layer) = self.layers.get(id) else {
            return false;
        };

        if !is_cascade {
            if layer.kind == LayerKind::Inherited {
                debug!(layer = %id, "rejected delete: inherited layers only go by cascade");
                return false;
            }
            let pinned_by = layer.mirrors.iter().find(|m| {
                self.layers
                    .get(*m)
                    .is_some_and(|l| l.kind.is_live_reference())
            });
            if let Some(mirror) = pinned_by {
                debug!(layer = %id, %mirror, "rejected delete: layer is the source of a mirror");
                return false;
            }
        }

        self.run_hook(id, |element, ctx| element.on_delete(ctx));

        // The hook may have removed us already.
        let Some(layer) = self.layers.get(id) else {
            return true;
        };
        let kind = layer.kind;
        let source = layer.source.clone();
        let owner = layer.owner.clone();
        let path = projection_path(&layer.shadow_path);
        let creator = layer.creator.clone();
        let parent = layer.parent.clone();
        let clones: Vec<LayerId> = layer.inherited_children_map.values().cloned().collect();
        let children = layer.children.clone();
        let creations: Vec<LayerId> = layer.creations.iter().cloned().collect();

        if let Some(source) = source.and_then(|s| self.layers.get_mut(&s)) {
            source.mirrors.remove(id);
        }
        if kind == LayerKind::Inherited {
            if let Some(owner) = owner.and_then(|o| self.layers.get_mut(&o)) {
                if owner.projections.get(&path) == Some(id) {
                    owner.projections.remove(&path);
                }
            }
        }
        if let Some(creator) = creator.and_then(|c| self.layers.get_mut(&c)) {
            creator.creations.remove(id);
        }

        for clone in &clones {
            self.delete_layer(clone, true);
        }
        for child in &children {
            self.delete_layer(child, true);
        }
        for creation in &creations {
            self.delete_layer(creation, true);
        }

        if let Some(parent) = parent {
            if let Some(p) = self.layers.get_mut(&parent) {
                p.children.retain(|c| c != id);
            }
            // A cascading ancestor resynchronizes for the whole subtree.
            if !is_cascade {
                self.mark(&parent, dirty::CHILDREN);
                for mirror in self.mirrors_of(&parent) {
                    self.compute_inherited_children(&mirror);
                }
                self.run_hook(&parent, |element, ctx| {
                    element.on_change_children(ctx, Some(id));
                });
            }
        }

        if let Some(layer) = self.layers.remove(id) {
            self.release_slot(id, layer.slot);
        }
        true
    }

    /// Materializes the derived fields of a layer. Does nothing if it is
    /// already mounted.
    ///
    /// Layers are mounted by [`create_layer`](Self::create_layer); this is
    /// for records that were inserted unmounted or to force a mount before
    /// reading derived state.
    pub fn mount_layer(&mut self, id: &LayerId) {
        self.mount_layer_with(id, false);
    }

    /// Mounts every layer that is not mounted yet.
    pub fn mount_all(&mut self) {
        let ids: Vec<LayerId> = self.layers.keys().cloned().collect();
        for id in &ids {
            self.mount_layer_with(id, false);
        }
    }

    /// `nested` is set when an ancestor's mount drives this one; the parent
    /// then learns about its children from its own mount instead.
    pub(crate) fn mount_layer_with(&mut self, id: &LayerId, nested: bool) {
        let Some(layer) = self.layers.get_mut(id) else {
            return;
        };
        if layer.is_mounted {
            return;
        }
        layer.is_mounted = true;
        layer.effective_inputs.clear();
        layer.inherited_children.clear();
        layer.inherited_children_map.clear();

        let kind = layer.kind;
        let creator = layer.creator.clone();
        match (kind, layer.source.clone()) {
            (LayerKind::Base, _) | (_, None) => {
                layer.owner = None;
                layer.shadow_path = vec![id.clone()];
            }
            (_, Some(source)) => {
                layer.shadow_path = vec![id.clone()];
                self.attach_to_source(id, &source, kind);
            }
        }

        if let Some(creator) = creator.and_then(|c| self.layers.get_mut(&c)) {
            creator.creations.insert(id.clone());
        }

        self.compute_effective_inputs(id);
        self.compute_inherited_children(id);

        let children = self
            .layers
            .get(id)
            .map(|l| l.children.clone())
            .unwrap_or_default();
        for child in &children {
            self.mount_layer_with(child, true);
        }

        self.run_hook(id, |element, ctx| element.on_mount(ctx));

        if !nested {
            if let Some(parent) = self.layers.get(id).and_then(|l| l.parent.clone()) {
                self.run_hook(&parent, |element, ctx| {
                    element.on_change_children(ctx, Some(id));
                });
            }
        }
    }

    /// Resolves the element from `source`, registers `id` as its mirror, and
    /// for inherited clones anchors the projection and applies the owner's
    /// shadow.
    fn attach_to_source(&mut self, id: &LayerId, source: &LayerId, kind: LayerKind) {
        if !self.layers.contains_key(source) {
            warn!(layer = %id, %source, "mounting layer whose source does not exist");
            return;
        }
        self.mount_layer_with(source, false);

        let Some(src) = self.layers.get_mut(source) else {
            return;
        };
        src.mirrors.insert(id.clone());
        let element = src.element.clone();
        let source_path = src.shadow_path.clone();

        let Some(layer) = self.layers.get_mut(id) else {
            return;
        };
        layer.element = element;
        if kind != LayerKind::Inherited {
            return;
        }
        let Some(owner) = layer.owner.clone() else {
            return;
        };
        let mut shadow_path = Vec::with_capacity(source_path.len() + 1);
        shadow_path.push(owner.clone());
        shadow_path.extend(source_path);
        let path = projection_path(&shadow_path);
        layer.shadow_path = shadow_path;

        let Some(owner) = self.layers.get_mut(&owner) else {
            return;
        };
        owner.projections.insert(path.clone(), id.clone());
        let Some(shadow) = owner.shadows.get(&path).cloned() else {
            return;
        };

        if let Some(mut inputs) = shadow.inputs {
            if let Some(layer) = self.layers.get_mut(id) {
                inputs.extend(std::mem::take(&mut layer.inputs));
                layer.inputs = inputs;
            }
        }
        let has_children = self.layers.get(id).is_some_and(|l| !l.children.is_empty());
        if let Some(adopted) = shadow.children.filter(|c| !c.is_empty() && !has_children) {
            let adopted = self.adopt_children(id, &adopted);
            if let Some(layer) = self.layers.get_mut(id) {
                layer.children = adopted;
            }
        }
    }

    /// Points each existing layer in `children` at `parent`, detaching it
    /// from any other parent's child list. Returns the ids that were kept.
    pub(crate) fn adopt_children(
        &mut self,
        parent: &LayerId,
        children: &[LayerId],
    ) -> Vec<LayerId> {
        let mut kept: Vec<LayerId> = Vec::with_capacity(children.len());
        for child in children {
            if child == parent || kept.contains(child) {
                continue;
            }
            let Some(old_parent) = self.layers.get(child).map(|l| l.parent.clone()) else {
                debug!(%parent, %child, "skipping child that does not exist");
                continue;
            };
            if let Some(old_parent) = old_parent.filter(|p| p != parent) {
                if let Some(p) = self.layers.get_mut(&old_parent) {
                    p.children.retain(|c| c != child);
                }
                self.mark(&old_parent, dirty::CHILDREN);
            }
            if let Some(c) = self.layers.get_mut(child) {
                c.parent = Some(parent.clone());
            }
            self.mark(child, dirty::TOPOLOGY);
            kept.push(child.clone());
        }
        kept
    }
}
