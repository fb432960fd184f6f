// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer graph data model.
//!
//! A *layer* is a node in a UI composition graph. Each layer has:
//!
//! - An identity ([`LayerId`]), a string that stays stable until the layer is
//!   [renamed](LayerGraph::rename_layer).
//! - A [`LayerKind`]: base layers name an element directly, every other kind
//!   takes its element from a source layer.
//! - **Explicit state** set by the caller: parent, ordered children, and
//!   [inputs](LayerGraph::set_inputs).
//! - **Derived state** maintained by the graph: effective inputs (the source
//!   chain's inputs overlaid in order), inherited children (clones of the
//!   source's resolved children), shadow path, mirror set, and projections.
//!
//! # Mirrors and inherited children
//!
//! A mirror renders its source's subtree as if it were its own. For every
//! resolved child of the source the mirror holds an [`Inherited`] clone
//! whose identity survives resynchronization, so per-instance inputs written
//! to a clone stay with it. The clone's position relative to the mirror that
//! caused it is its *projection path*; the owning mirror indexes clones by
//! that path and keeps [`Shadow`] data under the same key.
//!
//! # Change journal
//!
//! Mutations mark dirty channels (see [`dirty`](crate::dirty)) and record
//! created, deleted, and renamed layers. [`LayerGraph::drain_changes`]
//! collects all of it as [`GraphChanges`].
//!
//! [`Inherited`]: LayerKind::Inherited

mod changes;
mod id;
mod lifecycle;
mod mutate;
mod propagate;
mod record;
mod rename;
mod store;

pub use changes::GraphChanges;
pub use id::{ElementId, IdAllocator, LayerId};
pub use record::{
    InputPatch, Inputs, Layer, LayerKind, LayerSpec, Shadow, Shadows, patch_from, projection_path,
};
pub use store::LayerGraph;
