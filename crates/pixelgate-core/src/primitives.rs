//! # Engine Primitives
//!
//! Hardcoded runtime constants for the pixelgate CORE.
//!
//! These values are compiled into the binary. Anything an operator may tune
//! lives in `config::EngineConfig` instead and uses these as defaults.

// =============================================================================
// DOCUMENT FORMAT
// =============================================================================

/// Current interchange document version.
///
/// Documents load when their major component equals this one's.
pub const FORMAT_VERSION: &str = "1.0";

/// Marker stored in the document `type` field.
pub const DOCUMENT_TYPE: &str = "PixelPilot_Graph";

// =============================================================================
// SCHEDULING
// =============================================================================

/// Default engine tick rate in Hz.
pub const DEFAULT_TARGET_HZ: u32 = 30;

/// Highest accepted tick rate in Hz.
pub const MAX_TARGET_HZ: u32 = 1000;

/// Number of passes over Process nodes in degraded (cyclic) execution.
pub const FALLBACK_PROCESS_PASSES: usize = 3;

/// Default maximum number of nodes in one graph (sub-graphs counted separately).
pub const MAX_GRAPH_NODES: usize = 1000;

/// Default capacity of each engine event subscriber queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

// =============================================================================
// NODE DEFAULTS
// =============================================================================

/// Default on-delay / off-delay time for timer nodes (ms).
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Default BLINK high phase (ms).
pub const DEFAULT_TIME_ON_MS: u64 = 500;

/// Default BLINK low phase (ms).
pub const DEFAULT_TIME_OFF_MS: u64 = 500;

/// Default colour-match tolerance.
pub const DEFAULT_TOLERANCE: u32 = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Largest accepted screen coordinate on either axis.
pub const MAX_COORDINATE: i32 = 9999;

/// Largest meaningful tolerance (3 channels x 255).
pub const MAX_TOLERANCE: u32 = 765;

/// Maximum length of a key code after trimming.
pub const MAX_KEY_CODE_LENGTH: usize = 20;

// =============================================================================
// BLACKBOARD KEYS
// =============================================================================

/// Prefix of the blackboard key holding a timer condition's epoch (ms).
pub const TIMER_KEY_PREFIX: &str = "timer_";

/// Prefix of the blackboard key holding a key's pressed state (bool).
pub const KEY_STATE_PREFIX: &str = "key_pressed_";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_version_has_major_component() {
        assert_eq!(FORMAT_VERSION.split('.').next(), Some("1"));
    }

    #[test]
    fn fallback_runs_three_passes() {
        assert_eq!(FALLBACK_PROCESS_PASSES, 3);
    }
}
