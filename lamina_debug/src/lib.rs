// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree dumps, hook recording, and JSON snapshots for lamina diagnostics.
//!
//! - [`pretty::write_tree`]: indented one-line-per-layer dump of a subtree.
//! - [`recorder::HookRecorder`]: an [`Element`](lamina_core::Element) wrapper
//!   that logs every hook call before delegating.
//! - [`snapshot::to_json`]: a serde_json export of a subtree in render order,
//!   including shadows and projections.

pub mod pretty;
pub mod recorder;
pub mod snapshot;

use lamina_core::LayerKind;

fn kind_name(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Base => "base",
        LayerKind::Mirror => "mirror",
        LayerKind::Inherited => "inherited",
        LayerKind::Dynamic => "dynamic",
    }
}
