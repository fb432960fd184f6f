// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reported errors.
//!
//! Structural operations never fail loudly: they return `false` or `None`
//! and leave the graph untouched. The only errors surfaced to callers come
//! from the method bridge.

use thiserror::Error;

use crate::layer::LayerId;

/// An error calling a layer method through the
/// [`EventBridge`](crate::events::EventBridge).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No method is registered for the layer, or the layer does not exist.
    #[error("no methods exist for layer '{layer}' or layer does not exist")]
    NoMethods {
        /// The layer that was called.
        layer: LayerId,
    },

    /// The layer has methods, but not this one.
    #[error("method '{method}' does not exist for layer '{layer}'")]
    UnknownMethod {
        /// The layer that was called.
        layer: LayerId,
        /// The requested method name.
        method: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_layer_and_method() {
        let e = BridgeError::UnknownMethod {
            layer: LayerId::from("menu"),
            method: "open".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'open'"), "message should name the method");
        assert!(msg.contains("'menu'"), "message should name the layer");
    }

    #[test]
    fn is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(BridgeError::NoMethods {
            layer: LayerId::from("x"),
        });
        assert!(!e.to_string().is_empty(), "display must not be empty");
    }
}
