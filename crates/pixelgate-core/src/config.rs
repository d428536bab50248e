//! # Engine Configuration
//!
//! Tunables for the tick loop. Every field has a default so partial
//! configuration files deserialize.

use crate::PixelgateError;
use crate::primitives::{DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_TARGET_HZ, MAX_GRAPH_NODES, MAX_TARGET_HZ};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick frequency in Hz (1..=1000).
    pub target_hz: u32,
    /// Node limit applied to graphs installed with `Engine::set_graph`.
    pub max_graph_nodes: usize,
    /// Per-subscriber event buffer; a full buffer drops events.
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_hz: DEFAULT_TARGET_HZ,
            max_graph_nodes: MAX_GRAPH_NODES,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_target_hz(mut self, target_hz: u32) -> Self {
        self.target_hz = target_hz;
        self
    }

    pub fn validate(&self) -> Result<(), PixelgateError> {
        if !(1..=MAX_TARGET_HZ).contains(&self.target_hz) {
            return Err(PixelgateError::InvalidConfig(format!(
                "target_hz must be within 1..={}, got {}",
                MAX_TARGET_HZ, self.target_hz
            )));
        }
        if self.max_graph_nodes == 0 {
            return Err(PixelgateError::InvalidConfig(
                "max_graph_nodes must be positive".to_string(),
            ));
        }
        if self.event_queue_capacity == 0 {
            return Err(PixelgateError::InvalidConfig(
                "event_queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Duration of one frame: `1s / target_hz`.
    #[must_use]
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.target_hz.max(1)
    }
}
