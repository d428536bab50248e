//! Monotonic millisecond clock shared by timers, conditions and the engine.
//!
//! Values are milliseconds since the first call in this process, so they fit
//! in a `u64`, can be stored on the blackboard, and never go backwards.

use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed since the process-wide anchor.
pub fn now_ms() -> u64 {
    let anchor = ANCHOR.get_or_init(Instant::now);
    u64::try_from(anchor.elapsed().as_millis()).unwrap_or(u64::MAX)
}
