// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serializable mutation requests.
//!
//! An [`Action`] names one graph operation with its arguments, so hosts can
//! queue, log, or replay mutations as data:
//!
//! ```json
//! {"type": "set_inputs", "layer": "title", "inputs": {"text": "Hi", "color": null}}
//! ```
//!
//! A `null` input value deletes that key.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layer::{InputPatch, LayerGraph, LayerId, LayerSpec};

/// One mutation of a [`LayerGraph`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// [`LayerGraph::create_layer`].
    Create(LayerSpec),
    /// [`LayerGraph::delete_layer`], never as a cascade.
    Delete {
        /// Layer to delete.
        layer: LayerId,
    },
    /// [`LayerGraph::mount_layer`].
    Mount {
        /// Layer to mount.
        layer: LayerId,
    },
    /// [`LayerGraph::mount_all`].
    MountAll,
    /// [`LayerGraph::set_parent`].
    SetParent {
        /// Layer to move.
        layer: LayerId,
        /// New parent, or `None` to detach.
        parent: Option<LayerId>,
        /// Accept an inherited layer as the new parent.
        #[serde(default)]
        allow_orphan: bool,
    },
    /// [`LayerGraph::reorder_children`].
    ReorderChildren {
        /// The complete new child order.
        children: Vec<LayerId>,
    },
    /// [`LayerGraph::set_inputs`].
    SetInputs {
        /// Layer to write.
        layer: LayerId,
        /// Input patch; `null` deletes a key.
        inputs: InputPatch,
        /// Replace the whole input map.
        #[serde(default)]
        replace_all: bool,
        /// Also persist into the owner's shadow.
        #[serde(default)]
        persist_shadow: bool,
    },
    /// [`LayerGraph::set_projection_inputs`].
    SetProjectionInputs {
        /// Owner of the projection.
        owner: LayerId,
        /// Projection path under the owner.
        path: String,
        /// Input patch; `null` deletes a key.
        inputs: InputPatch,
        /// Replace the whole input map.
        #[serde(default)]
        replace_all: bool,
        /// Also persist into the owner's shadow.
        #[serde(default)]
        persist_shadow: bool,
    },
    /// [`LayerGraph::rename_layer`].
    Rename {
        /// Current id.
        layer: LayerId,
        /// New id.
        new_id: LayerId,
    },
}

impl LayerGraph {
    /// Applies one action. Returns whether it changed anything it was asked
    /// to; for [`Action::Create`] that means a layer exists under the
    /// resulting id.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Create(spec) => self.create_layer(spec).is_some(),
            Action::Delete { layer } => self.delete_layer(&layer, false),
            Action::Mount { layer } => {
                self.mount_layer(&layer);
                self.layers.get(&layer).is_some_and(|l| l.is_mounted)
            }
            Action::MountAll => {
                self.mount_all();
                true
            }
            Action::SetParent {
                layer,
                parent,
                allow_orphan,
            } => self.set_parent(&layer, parent.as_ref(), allow_orphan),
            Action::ReorderChildren { children } => self.reorder_children(&children),
            Action::SetInputs {
                layer,
                inputs,
                replace_all,
                persist_shadow,
            } => self.set_inputs(&layer, inputs, replace_all, persist_shadow),
            Action::SetProjectionInputs {
                owner,
                path,
                inputs,
                replace_all,
                persist_shadow,
            } => self.set_projection_inputs(
                owner.as_str(),
                &path,
                inputs,
                replace_all,
                persist_shadow,
            ),
            Action::Rename { layer, new_id } => self.rename_layer(&layer, &new_id),
        }
    }

    /// Applies actions in order and returns how many succeeded. A rejected
    /// action does not stop the batch.
    pub fn apply_all(&mut self, actions: impl IntoIterator<Item = Action>) -> usize {
        let mut applied = 0;
        for (index, action) in actions.into_iter().enumerate() {
            if self.apply(action) {
                applied += 1;
            } else {
                debug!(index, "action rejected");
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Vec<Action> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn json_batch_builds_a_graph() {
        let actions = parse(json!([
            {"type": "create", "id": "card", "kind": "base", "source": "Card"},
            {"type": "create", "id": "title", "kind": "base", "source": "Text", "parent": "card",
             "inputs": {"text": "Hello"}},
            {"type": "create", "id": "copy", "kind": "mirror", "source": "card"},
            {"type": "set_inputs", "layer": "copy", "inputs": {"theme": "dark"}},
        ]));
        let mut graph = LayerGraph::new();

        assert_eq!(graph.apply_all(actions), 4);
        assert_eq!(graph.resolved_children("copy").len(), 1, "mirror clones the title");
        assert_eq!(
            graph.effective_inputs("copy").and_then(|i| i.get("theme")),
            Some(&json!("dark"))
        );
    }

    #[test]
    fn null_input_deletes_key() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Text").id("t"));
        let actions = parse(json!([
            {"type": "set_inputs", "layer": "t", "inputs": {"a": 1, "b": 2}},
            {"type": "set_inputs", "layer": "t", "inputs": {"a": null}},
        ]));
        graph.apply_all(actions);

        let inputs = graph.layer("t").unwrap().inputs();
        assert!(!inputs.contains_key("a"), "null should delete the key");
        assert_eq!(inputs.get("b"), Some(&json!(2)));
    }

    #[test]
    fn rejected_actions_are_counted_out() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Box").id("a"));
        let actions = parse(json!([
            {"type": "delete", "layer": "missing"},
            {"type": "rename", "layer": "a", "new_id": "a"},
            {"type": "reorder_children", "children": []},
            {"type": "set_parent", "layer": "a", "parent": "a"},
            {"type": "mount_all"},
        ]));

        assert_eq!(graph.apply_all(actions), 1, "only mount_all succeeds");
        assert!(graph.contains("a"));
    }

    #[test]
    fn json_cannot_forge_an_inherited_clone() {
        let mut graph = LayerGraph::new();
        graph.create_layer(LayerSpec::base("Frame").id("frame"));
        graph.create_layer(LayerSpec::base("Text").id("title").parent("frame"));
        graph.create_layer(LayerSpec::mirror("frame").id("header"));
        let real = graph.get_projection("header", "title").cloned();
        assert!(real.is_some());

        let actions = parse(json!([
            {"type": "create", "id": "fake", "kind": "inherited", "source": "title",
             "owner": "header"},
            {"type": "create", "id": "spare", "kind": "mirror", "source": "title",
             "owner": "header"},
        ]));

        assert_eq!(graph.apply_all(actions), 1, "only the mirror is created");
        assert!(!graph.contains("fake"));
        assert_eq!(graph.get_projection("header", "title").cloned(), real);
        assert_eq!(graph.layer("spare").unwrap().owner(), None, "owner is not deserialized");
    }

    #[test]
    fn serializes_with_snake_case_tag() {
        let action = Action::Rename {
            layer: "a".into(),
            new_id: "b".into(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "rename", "layer": "a", "new_id": "b"})
        );
    }
}
