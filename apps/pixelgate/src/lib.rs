//! # pixelgate
//!
//! Library half of the pixelgate binary: command implementations, the TOML
//! configuration layer and the dry-run device providers. Exposed as a
//! library so integration tests can drive the commands directly.

pub mod cli;
pub mod config;
pub mod dry_run;
