//! # Device Providers
//!
//! The two device backends the graph's leaf nodes call into:
//! - `VisionProvider`: screen sampling, consumed by Input node conditions
//! - `InputProvider`: synthetic input, consumed by Output node actions
//!
//! # Extension Point
//!
//! These traits are intentionally defined without platform implementations.
//! Backends live outside the CORE (the binary ships dry-run versions).
//! Implementations are shared with the tick thread and must be `Send + Sync`.

use crate::{MouseButton, PixelgateError, Region, Rgb};

/// Screen sampling backend.
pub trait VisionProvider: Send + Sync {
    /// Colour of one pixel, or `None` if it cannot be sampled.
    fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb>;

    /// First pixel in `region` within `tolerance` of `target`, if any.
    fn search_color(&self, region: Region, target: Rgb, tolerance: u32) -> Option<(i32, i32)>;
}

/// Synthetic input backend.
///
/// Failures are returned so the scheduler can attribute them to the node
/// (or rule) that triggered the action.
pub trait InputProvider: Send + Sync {
    fn press_key(&self, code: &str) -> Result<(), PixelgateError>;

    fn click_mouse(&self, x: i32, y: i32, button: MouseButton) -> Result<(), PixelgateError>;

    fn move_mouse(&self, x: i32, y: i32) -> Result<(), PixelgateError>;
}
