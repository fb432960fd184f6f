// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graph configuration.

use serde::{Deserialize, Serialize};

/// How [`can_parent`](crate::layer::LayerGraph::can_parent) guards against
/// parenting that would make inherited-children synchronization recurse
/// forever.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorCycleCheck {
    /// Only reject when one layer directly mirrors the other.
    Direct,
    /// Check every layer rendered under the moved one: reject when the
    /// candidate parent sits inside the template subtree of anything that
    /// layer mirrors, or when the parent transitively mirrors it.
    #[default]
    Transitive,
}

/// Configuration for a [`LayerGraph`](crate::layer::LayerGraph).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Seed for generated ids of mirror layers.
    pub mirror_prefix: String,
    /// Seed for generated ids of inherited clones.
    pub inherited_prefix: String,
    /// Seed for generated ids of dynamic layers.
    pub dynamic_prefix: String,
    /// Mirror-cycle guard used when reparenting.
    pub mirror_cycle_check: MirrorCycleCheck,
}

impl GraphConfig {
    /// The historical behavior: single-letter prefixes and the direct-only
    /// mirror check.
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            mirror_cycle_check: MirrorCycleCheck::Direct,
            ..Self::default()
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            mirror_prefix: "l".to_owned(),
            inherited_prefix: "i".to_owned(),
            dynamic_prefix: "u".to_owned(),
            mirror_cycle_check: MirrorCycleCheck::Transitive,
        }
    }
}
