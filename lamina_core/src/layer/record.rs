// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer records and the plain data types stored in them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{ElementId, LayerId};

/// Explicit or effective inputs of a layer.
pub type Inputs = BTreeMap<String, Value>;

/// A sparse update to a layer's inputs.
///
/// `Some(value)` sets a key; `None` is the delete marker and removes it.
/// In serialized form the delete marker is JSON `null`.
pub type InputPatch = BTreeMap<String, Option<Value>>;

/// Builds an [`InputPatch`] that sets every key of `inputs`.
#[must_use]
pub fn patch_from(inputs: Inputs) -> InputPatch {
    inputs.into_iter().map(|(k, v)| (k, Some(v))).collect()
}

/// How a layer relates to the rest of the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Defines an element directly and has no source layer.
    Base,
    /// An explicitly created live reference to a source layer.
    Mirror,
    /// A clone of one child of a mirrored layer, created and destroyed only
    /// by inherited-children synchronization.
    Inherited,
    /// A live reference created at runtime by an element hook.
    Dynamic,
}

impl LayerKind {
    /// Mirrors and dynamic layers pin their source: it cannot be deleted
    /// while they exist.
    pub(crate) const fn is_live_reference(self) -> bool {
        matches!(self, Self::Mirror | Self::Dynamic)
    }
}

/// Persisted customization for one position inside an owner's cloned
/// subtree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    /// Inputs merged under the clone's own explicit inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Inputs>,
    /// Layers adopted as the clone's explicit children when it has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LayerId>>,
}

/// Shadow data of one owner, keyed by projection path.
pub type Shadows = BTreeMap<String, Shadow>;

/// Joins the owner-relative part of a shadow path into a projection path.
///
/// The first entry of a shadow path is the owner itself and is not part of
/// the key.
#[must_use]
pub fn projection_path(shadow_path: &[LayerId]) -> String {
    let mut path = String::new();
    for (i, id) in shadow_path.iter().skip(1).enumerate() {
        if i > 0 {
            path.push('/');
        }
        path.push_str(id.as_str());
    }
    path
}

/// Arguments for [`LayerGraph::create_layer`](super::LayerGraph::create_layer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Explicit id; one is generated when absent.
    #[serde(default)]
    pub id: Option<LayerId>,
    /// What kind of layer to create.
    pub kind: LayerKind,
    /// For [`LayerKind::Base`] the element id, otherwise the source layer id.
    pub source: String,
    /// Layer to append the new layer to.
    #[serde(default)]
    pub parent: Option<LayerId>,
    /// Owner of an inherited clone. Only the graph sets it.
    #[serde(skip)]
    pub(crate) owner: Option<LayerId>,
    /// Explicit inputs.
    #[serde(default)]
    pub inputs: Inputs,
    /// Explicit children, already existing.
    #[serde(default)]
    pub children: Vec<LayerId>,
    /// Shadow data this layer owns.
    #[serde(default)]
    pub shadows: Shadows,
    /// Layer on whose behalf this layer is created.
    #[serde(default)]
    pub creator: Option<LayerId>,
}

impl LayerSpec {
    fn with_kind(kind: LayerKind, source: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            source: source.into(),
            parent: None,
            owner: None,
            inputs: Inputs::new(),
            children: Vec::new(),
            shadows: Shadows::new(),
            creator: None,
        }
    }

    /// A base layer of `element`.
    #[must_use]
    pub fn base(element: impl Into<String>) -> Self {
        Self::with_kind(LayerKind::Base, element)
    }

    /// A mirror of `source`.
    #[must_use]
    pub fn mirror(source: impl Into<String>) -> Self {
        Self::with_kind(LayerKind::Mirror, source)
    }

    /// A dynamic layer sourced from `source`.
    #[must_use]
    pub fn dynamic(source: impl Into<String>) -> Self {
        Self::with_kind(LayerKind::Dynamic, source)
    }

    pub(crate) fn inherited(source: &LayerId, parent: &LayerId, owner: &LayerId) -> Self {
        Self {
            parent: Some(parent.clone()),
            owner: Some(owner.clone()),
            ..Self::with_kind(LayerKind::Inherited, source.as_str())
        }
    }

    /// Sets an explicit id.
    #[must_use]
    pub fn id(mut self, id: impl Into<LayerId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the parent.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<LayerId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets explicit inputs.
    #[must_use]
    pub fn inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets explicit children.
    #[must_use]
    pub fn children(mut self, children: Vec<LayerId>) -> Self {
        self.children = children;
        self
    }

    /// Sets owned shadow data.
    #[must_use]
    pub fn shadows(mut self, shadows: Shadows) -> Self {
        self.shadows = shadows;
        self
    }

    /// Sets the creator.
    #[must_use]
    pub fn creator(mut self, creator: impl Into<LayerId>) -> Self {
        self.creator = Some(creator.into());
        self
    }
}

/// One node of the graph.
///
/// Fields from `is_mounted` on are derived and maintained by the graph; they
/// are only meaningful once the layer has been mounted.
#[derive(Clone, Debug)]
pub struct Layer {
    pub(crate) kind: LayerKind,
    pub(crate) source: Option<LayerId>,
    pub(crate) element: Option<ElementId>,
    pub(crate) parent: Option<LayerId>,
    pub(crate) children: Vec<LayerId>,
    pub(crate) owner: Option<LayerId>,
    pub(crate) inputs: Inputs,
    pub(crate) shadows: Shadows,
    pub(crate) creator: Option<LayerId>,
    pub(crate) slot: u32,

    pub(crate) is_mounted: bool,
    pub(crate) shadow_path: Vec<LayerId>,
    pub(crate) effective_inputs: Inputs,
    pub(crate) inherited_children: Vec<LayerId>,
    pub(crate) inherited_children_map: BTreeMap<LayerId, LayerId>,
    pub(crate) mirrors: BTreeSet<LayerId>,
    pub(crate) projections: BTreeMap<String, LayerId>,
    pub(crate) creations: BTreeSet<LayerId>,
}

impl Layer {
    pub(crate) fn new(spec: LayerSpec, slot: u32) -> Self {
        let (source, element) = match spec.kind {
            LayerKind::Base => (None, Some(ElementId::new(spec.source))),
            _ => (Some(LayerId::new(spec.source)), None),
        };
        Self {
            kind: spec.kind,
            source,
            element,
            parent: spec.parent,
            children: spec.children,
            owner: spec.owner,
            inputs: spec.inputs,
            shadows: spec.shadows,
            creator: spec.creator,
            slot,
            is_mounted: false,
            shadow_path: Vec::new(),
            effective_inputs: Inputs::new(),
            inherited_children: Vec::new(),
            inherited_children_map: BTreeMap::new(),
            mirrors: BTreeSet::new(),
            projections: BTreeMap::new(),
            creations: BTreeSet::new(),
        }
    }

    /// Returns the layer kind.
    #[must_use]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Returns the source layer, absent for base layers.
    #[must_use]
    pub fn source(&self) -> Option<&LayerId> {
        self.source.as_ref()
    }

    /// Returns the resolved element, once mounted.
    #[must_use]
    pub fn element(&self) -> Option<&ElementId> {
        self.element.as_ref()
    }

    /// Returns the parent layer.
    #[must_use]
    pub fn parent(&self) -> Option<&LayerId> {
        self.parent.as_ref()
    }

    /// Returns the explicit children in order.
    #[must_use]
    pub fn children(&self) -> &[LayerId] {
        &self.children
    }

    /// Returns the owner of an inherited clone.
    #[must_use]
    pub fn owner(&self) -> Option<&LayerId> {
        self.owner.as_ref()
    }

    /// Returns the owner-rooted path through the mirror chain.
    #[must_use]
    pub fn shadow_path(&self) -> &[LayerId] {
        &self.shadow_path
    }

    /// Returns the explicit inputs.
    #[must_use]
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    /// Returns the merged inputs used by this layer.
    #[must_use]
    pub fn effective_inputs(&self) -> &Inputs {
        &self.effective_inputs
    }

    /// Returns the source-side ids of the inherited children, in order.
    #[must_use]
    pub fn inherited_children(&self) -> &[LayerId] {
        &self.inherited_children
    }

    /// Returns the clone that stands in for `source_child`, if any.
    #[must_use]
    pub fn inherited_clone(&self, source_child: &LayerId) -> Option<&LayerId> {
        self.inherited_children_map.get(source_child)
    }

    /// Returns the layers whose source is this layer.
    #[must_use]
    pub fn mirrors(&self) -> &BTreeSet<LayerId> {
        &self.mirrors
    }

    /// Returns the persisted shadow data this layer owns.
    #[must_use]
    pub fn shadows(&self) -> &Shadows {
        &self.shadows
    }

    /// Returns the live clones under this owner, keyed by projection path.
    #[must_use]
    pub fn projections(&self) -> &BTreeMap<String, LayerId> {
        &self.projections
    }

    /// Returns the layers created on this layer's behalf.
    #[must_use]
    pub fn creations(&self) -> &BTreeSet<LayerId> {
        &self.creations
    }

    /// Returns the layer this one was created on behalf of.
    #[must_use]
    pub fn creator(&self) -> Option<&LayerId> {
        self.creator.as_ref()
    }

    /// Returns whether derived fields have been materialized.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.is_mounted
    }

    /// Returns the clone ids of the inherited children, in inherited order.
    pub fn inherited_clones(&self) -> impl Iterator<Item = &LayerId> + '_ {
        self.inherited_children
            .iter()
            .filter_map(|src| self.inherited_children_map.get(src))
    }
}
