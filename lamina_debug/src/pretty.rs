// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable tree output.
//!
//! One line per layer, indented two spaces per level, children in render
//! order:
//!
//! ```text
//! header [mirror] source=frame element=Frame
//!   i4 [inherited] source=title element=Text path=title {"text":"Hi"}
//! ```

use std::collections::BTreeSet;
use std::io::{self, Write};

use lamina_core::layer::{Layer, projection_path};
use lamina_core::{LayerGraph, LayerId};

use crate::kind_name;

/// Writes the subtree under `root`. Writes nothing if `root` does not exist.
///
/// # Errors
///
/// Propagates errors from `writer`.
pub fn write_tree<W: Write>(graph: &LayerGraph, root: &str, writer: &mut W) -> io::Result<()> {
    let mut visited = BTreeSet::new();
    write_layer(graph, &LayerId::from(root), 0, &mut visited, writer)
}

/// Writes every root of the graph, in id order.
///
/// # Errors
///
/// Propagates errors from `writer`.
pub fn write_graph<W: Write>(graph: &LayerGraph, writer: &mut W) -> io::Result<()> {
    let mut visited = BTreeSet::new();
    for root in graph.roots() {
        write_layer(graph, &root, 0, &mut visited, writer)?;
    }
    Ok(())
}

fn write_layer<W: Write>(
    graph: &LayerGraph,
    id: &LayerId,
    depth: usize,
    visited: &mut BTreeSet<LayerId>,
    writer: &mut W,
) -> io::Result<()> {
    let Some(layer) = graph.layer(id.as_str()) else {
        return Ok(());
    };
    if !visited.insert(id.clone()) {
        return writeln!(writer, "{:indent$}{id} (cycle)", "", indent = depth * 2);
    }
    writeln!(writer, "{:indent$}{}", "", describe(id, layer), indent = depth * 2)?;
    for child in graph.resolved_children(id.as_str()) {
        write_layer(graph, &child, depth + 1, visited, writer)?;
    }
    Ok(())
}

fn describe(id: &LayerId, layer: &Layer) -> String {
    let mut line = format!("{id} [{}]", kind_name(layer.kind()));
    if let Some(source) = layer.source() {
        line.push_str(&format!(" source={source}"));
    }
    if let Some(element) = layer.element() {
        line.push_str(&format!(" element={element}"));
    }
    if layer.owner().is_some() {
        line.push_str(&format!(" path={}", projection_path(layer.shadow_path())));
    }
    if !layer.effective_inputs().is_empty() {
        let inputs = serde_json::to_string(layer.effective_inputs()).unwrap_or_default();
        line.push(' ');
        line.push_str(&inputs);
    }
    line
}
