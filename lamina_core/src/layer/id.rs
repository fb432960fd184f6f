// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and element identity types, and the identifier allocator.

use core::fmt;
use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

/// The name of a layer in a [`LayerGraph`](super::LayerGraph).
///
/// Identifiers are plain strings so that they stay human-readable in
/// shadow paths and snapshots. A layer keeps its id for its whole lifetime
/// unless it is explicitly [renamed](super::LayerGraph::rename_layer).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Creates a layer id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty id, which never names a layer.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for LayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The name of an [`Element`](crate::element::Element) registered with a
/// graph.
///
/// `Base` layers name their element directly; every other layer resolves
/// its element through its source chain at mount time.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Creates an element id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl Borrow<str> for ElementId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Generates fresh layer ids of the form `<prefix><n>`.
///
/// The counter is shared across prefixes and only ever grows, so an id that
/// was handed out once is never produced again by the same allocator. Ids
/// that are already taken (for instance because a caller chose them
/// explicitly) are skipped.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    counter: u64,
}

impl IdAllocator {
    /// Creates an allocator starting at `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Returns the next free id for `prefix`.
    ///
    /// `is_taken` reports whether a candidate id already names a layer.
    pub fn allocate(&mut self, prefix: &str, is_taken: impl Fn(&str) -> bool) -> LayerId {
        loop {
            self.counter += 1;
            let candidate = format!("{prefix}{}", self.counter);
            if !is_taken(&candidate) {
                return LayerId(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn allocator_uses_prefix_and_counts_up() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate("l", |_| false).as_str(), "l1");
        assert_eq!(ids.allocate("button", |_| false).as_str(), "button2");
    }

    #[test]
    fn allocator_skips_taken_ids() {
        let taken: BTreeSet<&str> = ["i1", "i2"].into_iter().collect();
        let mut ids = IdAllocator::new();
        let id = ids.allocate("i", |c| taken.contains(c));
        assert_eq!(id.as_str(), "i3");
    }

    #[test]
    fn layer_id_serializes_as_plain_string() {
        let id = LayerId::from("header");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"header\"");
        let back: LayerId = serde_json::from_str("\"header\"").unwrap();
        assert_eq!(back, id);
    }
}
