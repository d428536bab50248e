//! # Formats
//!
//! Interchange formats for graphs. The only format is the versioned JSON
//! document; file I/O lives in the app layer.

pub mod document;
pub(crate) mod seconds;

pub use document::{
    GraphBody, GraphDocument, LinkRecord, graph_from_json, graph_to_json, is_compatible_version,
};
