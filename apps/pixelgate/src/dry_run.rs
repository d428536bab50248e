//! # Dry-Run Providers
//!
//! Device backends for running a graph without touching the machine:
//! the vision side sees nothing, the input side only logs.
//!
//! Input actions are logged at `info` under the `pixelgate::dry_run` target
//! so they can be filtered independently of engine logs.

use pixelgate_core::{InputProvider, MouseButton, PixelgateError, Region, Rgb, VisionProvider};
use std::sync::atomic::{AtomicU64, Ordering};

/// Reports every pixel as unavailable.
#[derive(Debug, Default)]
pub struct DryRunVision;

impl VisionProvider for DryRunVision {
    fn get_pixel(&self, _x: i32, _y: i32) -> Option<Rgb> {
        None
    }

    fn search_color(&self, _region: Region, _target: Rgb, _tolerance: u32) -> Option<(i32, i32)> {
        None
    }
}

/// Logs every action and counts them.
#[derive(Debug, Default)]
pub struct DryRunInput {
    actions: AtomicU64,
}

impl DryRunInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions received so far.
    pub fn action_count(&self) -> u64 {
        self.actions.load(Ordering::Relaxed)
    }

    fn record(&self) {
        self.actions.fetch_add(1, Ordering::Relaxed);
    }
}

impl InputProvider for DryRunInput {
    fn press_key(&self, code: &str) -> Result<(), PixelgateError> {
        self.record();
        tracing::info!(target: "pixelgate::dry_run", key = code, "press key");
        Ok(())
    }

    fn click_mouse(&self, x: i32, y: i32, button: MouseButton) -> Result<(), PixelgateError> {
        self.record();
        tracing::info!(target: "pixelgate::dry_run", x, y, button = ?button, "click mouse");
        Ok(())
    }

    fn move_mouse(&self, x: i32, y: i32) -> Result<(), PixelgateError> {
        self.record();
        tracing::info!(target: "pixelgate::dry_run", x, y, "move mouse");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_sees_nothing() {
        let vision = DryRunVision;
        assert_eq!(vision.get_pixel(10, 10), None);
        assert_eq!(
            vision.search_color(Region(0, 0, 100, 100), Rgb(0, 0, 0), 765),
            None
        );
    }

    #[test]
    fn input_counts_every_action() {
        let input = DryRunInput::new();
        input.press_key("a").expect("key");
        input.click_mouse(1, 2, MouseButton::Right).expect("click");
        input.move_mouse(3, 4).expect("move");
        assert_eq!(input.action_count(), 3);
    }
}
