//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the engine:
//! - Graph identifiers (`NodeId`, `LinkId`, `PortRef`)
//! - Geometry and colour values exchanged with device backends (`Rgb`, `Region`, `Position`)
//! - Error taxonomy (`PixelgateError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! Identifiers implement `Ord` so that every arena in the crate can live in a
//! `BTreeMap` and every iteration order is reproducible.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// GRAPH IDENTIFIERS
// =============================================================================

/// Stable identifier of a node.
///
/// Assigned once at creation and preserved across serialization.
/// Unique within one graph; every nested sub-graph is its own namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create an identifier from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a link, local to the graph that owns it.
///
/// Link ids are not persisted; links are rebuilt from their endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Identity of a port: owning node plus port name.
///
/// Links reference ports through this value, never through pointers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

impl PortRef {
    #[must_use]
    pub fn new(node: NodeId, port: impl Into<String>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

// =============================================================================
// GEOMETRY & COLOUR
// =============================================================================

/// An RGB colour, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Sum of absolute per-channel differences (0..=765).
    #[must_use]
    pub fn distance(self, other: Rgb) -> u32 {
        let dr = u32::from(self.0.abs_diff(other.0));
        let dg = u32::from(self.1.abs_diff(other.1));
        let db = u32::from(self.2.abs_diff(other.2));
        dr + dg + db
    }

    /// True when `other` is within `tolerance` of this colour.
    #[must_use]
    pub fn matches(self, other: Rgb, tolerance: u32) -> bool {
        self.distance(other) <= tolerance
    }
}

/// A screen rectangle `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region(pub i32, pub i32, pub i32, pub i32);

/// Editor-only canvas position `[x, y]`. Opaque to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

/// Mouse button used by click actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::Middle => f.write_str("middle"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of a `PixelgateError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Graph,
    Serialization,
    Engine,
    Provider,
    Io,
}

/// Errors that can occur anywhere in the engine.
///
/// - Node and rule failures are recovered locally by the scheduler and engine
/// - Serialization failures are always surfaced to the caller
/// - The CORE never panics on these paths
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PixelgateError {
    // --- graph ---
    /// A cycle without any memory node; the ids are the unresolved nodes.
    #[error("Unbreakable cycle among {} node(s): {unresolved:?}", .unresolved.len())]
    UnbreakableCycle { unresolved: Vec<NodeId> },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Port not found: {0}")]
    PortNotFound(PortRef),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Graph size exceeded: limit is {limit} nodes")]
    GraphTooLarge { limit: usize },

    #[error("Node '{name}' ({node}) failed: {message}")]
    NodeEvaluation {
        node: NodeId,
        name: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // --- serialization ---
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unknown {kind} type tag: '{tag}'")]
    UnknownTypeTag { kind: &'static str, tag: String },

    #[error("Incompatible document version {found} (serializer is {expected})")]
    IncompatibleVersion { found: String, expected: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- engine ---
    #[error("Engine failed to start: {0}")]
    EngineStart(String),

    #[error("Engine failed to stop: {0}")]
    EngineStop(String),

    #[error("Rule '{rule}' failed: {message}")]
    RuleExecution { rule: String, message: String },

    // --- collaborators ---
    #[error("Device provider error: {0}")]
    Provider(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl PixelgateError {
    /// The taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnbreakableCycle { .. }
            | Self::NodeNotFound(_)
            | Self::PortNotFound(_)
            | Self::DuplicateNode(_)
            | Self::InvalidLink(_)
            | Self::GraphTooLarge { .. }
            | Self::NodeEvaluation { .. }
            | Self::InvalidConfig(_) => ErrorKind::Graph,
            Self::MalformedDocument(_)
            | Self::UnknownTypeTag { .. }
            | Self::IncompatibleVersion { .. }
            | Self::SerializationError(_) => ErrorKind::Serialization,
            Self::EngineStart(_) | Self::EngineStop(_) | Self::RuleExecution { .. } => {
                ErrorKind::Engine
            }
            Self::Provider(_) => ErrorKind::Provider,
            Self::IoError(_) => ErrorKind::Io,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
