// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A live layer graph for component-based UI composition.
//!
//! `lamina_core` maintains a graph of *layers*: nodes that either define an
//! element directly or mirror another layer. Mirrors render their source's
//! subtree as their own, and per-instance customization of that inherited
//! subtree is kept as *shadows* on the mirror, keyed by stable projection
//! paths.
//!
//! # Architecture
//!
//! Every operation runs synchronously to completion. Hooks of the affected
//! layers' elements run inline and may call back into the graph:
//!
//! ```text
//!   Action / direct call
//!       │
//!       ▼
//!   LayerGraph::create_layer / set_parent / set_inputs / rename_layer ...
//!       │
//!       ├──► compute_effective_inputs ──► mirrors ──► Element::on_input
//!       │
//!       └──► compute_inherited_children ──► mirrors ──► Element::on_change_children
//!                                                          │
//!                 ┌────────────────────────────────────────┘
//!                 ▼
//!   LayerGraph::drain_changes() ──► GraphChanges ──► renderer
//! ```
//!
//! **[`layer`]**: Layer records, the [`LayerGraph`] store, and the
//! lifecycle, propagation, and structural operations on it.
//!
//! **[`element`]**: The [`Element`] trait whose hooks the graph invokes,
//! and the [`HookContext`](element::HookContext) they receive.
//!
//! **[`events`]**: Event bubbling along the source chain and per-layer method
//! dispatch through [`EventBridge`](events::EventBridge).
//!
//! **[`action`]**: Serializable [`Action`](action::Action)s for every
//! mutation.
//!
//! **[`dirty`]**: Change-journal channels via `understory_dirty`.
//!
//! **[`config`]**: Id prefixes and the mirror-cycle policy in
//! [`GraphConfig`](config::GraphConfig).
//!
//! # Logging
//!
//! Rejected operations are reported through `tracing` at `debug` level with
//! the reason; creating a layer under an existing id is a `warn`. The crate
//! installs no subscriber.

pub mod action;
pub mod config;
pub mod dirty;
pub mod element;
pub mod error;
pub mod events;
pub mod layer;

pub use element::Element;
pub use error::BridgeError;
pub use layer::{LayerGraph, LayerId, LayerKind, LayerSpec};
