//! # pixelgate-core
//!
//! The deterministic Function Block Diagram engine for pixelgate - THE LOGIC.
//!
//! Screen-driven automation is expressed as a directed graph of blocks:
//! Input nodes sample the screen or the blackboard, Process / Timer / Toggle
//! nodes combine signals, Output nodes fire synthetic input on rising edges
//! and Group nodes nest whole sub-graphs. A fixed-rate engine evaluates the
//! graph once per frame in dependency order.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is deterministic: arenas are `BTreeMap`s, ties break by `NodeId`,
//!   timing uses integer milliseconds
//! - Is closed: node, condition and action variants are closed enums
//! - Never talks to devices directly; screen sampling and input injection
//!   are the `VisionProvider` / `InputProvider` seams
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod action;
pub mod blackboard;
pub mod clock;
pub mod condition;
pub mod config;
pub mod engine;
pub mod formats;
pub mod graph;
pub mod node;
pub mod primitives;
pub mod providers;
pub mod rules;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ErrorKind, LinkId, MouseButton, NodeId, PixelgateError, PortDirection, PortRef, Position,
    Region, Rgb,
};

// =============================================================================
// RE-EXPORTS: Graph & Nodes
// =============================================================================

pub use action::Action;
pub use blackboard::Blackboard;
pub use condition::Condition;
pub use graph::{Graph, Link, NodeFault, ScheduleStatus, TickReport};
pub use node::{GroupState, LogicType, Node, NodeKind, Port, TickContext, TimerState, TimerType};
pub use providers::{InputProvider, VisionProvider};
pub use rules::{Rule, RuleLogic};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use config::EngineConfig;
pub use engine::{Engine, EngineEvent, EngineState, EngineStats, RunMode, SharedGraph};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{GraphDocument, graph_from_json, graph_to_json, is_compatible_version};
