// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-journal channel constants.
//!
//! Every layer owns a numeric slot. Operations that change what an observer
//! would render mark the layer's slot on one of these channels (via
//! [`understory_dirty`]). Propagation itself is explicit and already
//! fans out through the mirror relation, so all channels are local-only:
//! the layers that actually changed are the ones marked.
//!
//! # Consumption
//!
//! [`LayerGraph::drain_changes`](crate::layer::LayerGraph::drain_changes)
//! drains all channels and reports the results as
//! [`GraphChanges`](crate::layer::GraphChanges).

use understory_dirty::Channel;

/// Effective inputs changed.
pub const INPUTS: Channel = Channel::new(0);

/// Resolved children changed (explicit order or inherited clones).
pub const CHILDREN: Channel = Channel::new(1);

/// Parent pointer or id changed.
pub const TOPOLOGY: Channel = Channel::new(2);
