// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of layer subtrees.

use std::collections::{BTreeMap, BTreeSet};

use lamina_core::layer::{Inputs, Shadows};
use lamina_core::{LayerGraph, LayerId, LayerKind};
use serde::Serialize;

/// One layer and, recursively, its children in render order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerSnapshot {
    /// Layer id.
    pub id: LayerId,
    /// Layer kind.
    pub kind: LayerKind,
    /// Source layer, for every kind but base.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<LayerId>,
    /// Resolved element id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    /// Explicit inputs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: Inputs,
    /// Effective inputs.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub effective_inputs: Inputs,
    /// Shadow data owned by this layer.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub shadows: Shadows,
    /// Projection path to clone id, for clones this layer owns.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub projections: BTreeMap<String, LayerId>,
    /// Inherited clones followed by explicit children.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayerSnapshot>,
}

/// Captures the subtree under `root`, or `None` if it does not exist.
#[must_use]
pub fn snapshot(graph: &LayerGraph, root: &str) -> Option<LayerSnapshot> {
    capture(graph, &LayerId::from(root), &mut BTreeSet::new())
}

/// Captures the subtree under `root` as pretty-printed JSON. A missing root
/// serializes as `null`.
///
/// # Errors
///
/// Propagates serialization errors.
pub fn to_json(graph: &LayerGraph, root: &str) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&snapshot(graph, root))
}

fn capture(
    graph: &LayerGraph,
    id: &LayerId,
    visited: &mut BTreeSet<LayerId>,
) -> Option<LayerSnapshot> {
    let layer = graph.layer(id.as_str())?;
    if !visited.insert(id.clone()) {
        return None;
    }
    let children = graph
        .resolved_children(id.as_str())
        .iter()
        .filter_map(|child| capture(graph, child, visited))
        .collect();
    Some(LayerSnapshot {
        id: id.clone(),
        kind: layer.kind(),
        source: layer.source().cloned(),
        element: layer.element().map(|e| e.as_str().to_owned()),
        inputs: layer.inputs().clone(),
        effective_inputs: layer.effective_inputs().clone(),
        shadows: layer.shadows().clone(),
        projections: layer.projections().clone(),
        children,
    })
}
