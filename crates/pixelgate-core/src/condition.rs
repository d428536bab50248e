//! # Conditions
//!
//! Predicates that turn device or blackboard state into a boolean signal.
//! Input nodes wrap exactly one condition; legacy rules hold a list.
//!
//! The `type` tag of each variant is the stable name used in documents.

use crate::blackboard::Blackboard;
use crate::primitives::{
    DEFAULT_TOLERANCE, KEY_STATE_PREFIX, MAX_COORDINATE, MAX_KEY_CODE_LENGTH, MAX_TOLERANCE,
    TIMER_KEY_PREFIX,
};
use crate::providers::VisionProvider;
use crate::{PixelgateError, Region, Rgb};
use serde::{Deserialize, Serialize};

fn default_tolerance() -> u32 {
    DEFAULT_TOLERANCE
}

/// A boolean predicate over the screen or the blackboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    /// One pixel matches a colour.
    #[serde(rename = "PixelColorCondition")]
    PixelColor {
        x: i32,
        y: i32,
        target_rgb: Rgb,
        #[serde(default = "default_tolerance")]
        tolerance: u32,
    },

    /// Some pixel in a region matches a colour.
    #[serde(rename = "RegionColorCondition")]
    RegionColor {
        region: Region,
        target_rgb: Rgb,
        #[serde(default = "default_tolerance")]
        tolerance: u32,
    },

    /// At least `interval_ms` elapsed since the timer was last reset.
    ///
    /// Documents carry the interval as `interval_seconds`.
    #[serde(rename = "TimerCondition")]
    Timer {
        #[serde(rename = "interval_seconds", with = "crate::formats::seconds")]
        interval_ms: u64,
        timer_id: String,
    },

    /// A key is currently held, as reported on the blackboard.
    #[serde(rename = "KeyPressCondition")]
    KeyPress { key_code: String },
}

impl Condition {
    /// Every tag accepted in documents.
    pub const TAGS: [&'static str; 4] = [
        "PixelColorCondition",
        "RegionColorCondition",
        "TimerCondition",
        "KeyPressCondition",
    ];

    /// Stable document tag of this variant.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PixelColor { .. } => "PixelColorCondition",
            Self::RegionColor { .. } => "RegionColorCondition",
            Self::Timer { .. } => "TimerCondition",
            Self::KeyPress { .. } => "KeyPressCondition",
        }
    }

    /// Pixel condition with the default tolerance.
    #[must_use]
    pub fn pixel(x: i32, y: i32, target_rgb: Rgb) -> Self {
        Self::PixelColor {
            x,
            y,
            target_rgb,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Evaluate against the process clock.
    pub fn evaluate(&self, blackboard: &Blackboard, vision: Option<&dyn VisionProvider>) -> bool {
        self.evaluate_at(blackboard, vision, crate::clock::now_ms())
    }

    /// Evaluate with an explicit monotonic timestamp (ms).
    ///
    /// A missing vision provider makes screen conditions false.
    pub fn evaluate_at(
        &self,
        blackboard: &Blackboard,
        vision: Option<&dyn VisionProvider>,
        now_ms: u64,
    ) -> bool {
        match self {
            Self::PixelColor {
                x,
                y,
                target_rgb,
                tolerance,
            } => vision
                .and_then(|v| v.get_pixel(*x, *y))
                .is_some_and(|color| color.matches(*target_rgb, *tolerance)),
            Self::RegionColor {
                region,
                target_rgb,
                tolerance,
            } => vision
                .and_then(|v| v.search_color(*region, *target_rgb, *tolerance))
                .is_some(),
            Self::Timer {
                interval_ms,
                timer_id,
            } => match blackboard.get_u64(&timer_key(timer_id)) {
                // Never reset: the timer counts as expired.
                None => true,
                Some(epoch) => now_ms.saturating_sub(epoch) >= *interval_ms,
            },
            Self::KeyPress { key_code } => {
                blackboard.get_bool(&format!("{}{}", KEY_STATE_PREFIX, key_code), false)
            }
        }
    }

    /// Restart a timer condition at `now_ms`. Other variants ignore this.
    pub fn reset_timer(&self, blackboard: &Blackboard, now_ms: u64) {
        if let Self::Timer { timer_id, .. } = self {
            blackboard.set(timer_key(timer_id), now_ms);
        }
    }

    /// Check parameters against the input limits.
    pub fn validate(&self) -> Result<(), PixelgateError> {
        match self {
            Self::PixelColor {
                x, y, tolerance, ..
            } => {
                check_coordinates(*x, *y)?;
                check_tolerance(*tolerance)
            }
            Self::RegionColor {
                region, tolerance, ..
            } => {
                check_region(*region)?;
                check_tolerance(*tolerance)
            }
            Self::Timer { timer_id, .. } => {
                if timer_id.trim().is_empty() {
                    return Err(PixelgateError::InvalidConfig(
                        "timer id cannot be empty".to_string(),
                    ));
                }
                Ok(())
            }
            Self::KeyPress { key_code } => check_key_code(key_code),
        }
    }
}

fn timer_key(timer_id: &str) -> String {
    format!("{}{}", TIMER_KEY_PREFIX, timer_id)
}

// =============================================================================
// PARAMETER CHECKS (shared with actions)
// =============================================================================

pub(crate) fn check_coordinates(x: i32, y: i32) -> Result<(), PixelgateError> {
    let range = 0..=MAX_COORDINATE;
    if !range.contains(&x) || !range.contains(&y) {
        return Err(PixelgateError::InvalidConfig(format!(
            "coordinates ({}, {}) out of bounds [0, {}]",
            x, y, MAX_COORDINATE
        )));
    }
    Ok(())
}

fn check_region(region: Region) -> Result<(), PixelgateError> {
    let Region(x, y, width, height) = region;
    check_coordinates(x, y)?;
    if width <= 0 || height <= 0 {
        return Err(PixelgateError::InvalidConfig(format!(
            "region size {}x{} must be positive",
            width, height
        )));
    }
    if x.saturating_add(width) > MAX_COORDINATE || y.saturating_add(height) > MAX_COORDINATE {
        return Err(PixelgateError::InvalidConfig(format!(
            "region {:?} extends beyond {}",
            region, MAX_COORDINATE
        )));
    }
    Ok(())
}

fn check_tolerance(tolerance: u32) -> Result<(), PixelgateError> {
    if tolerance > MAX_TOLERANCE {
        return Err(PixelgateError::InvalidConfig(format!(
            "tolerance {} exceeds {}",
            tolerance, MAX_TOLERANCE
        )));
    }
    Ok(())
}

pub(crate) fn check_key_code(key_code: &str) -> Result<(), PixelgateError> {
    let trimmed = key_code.trim();
    if trimmed.is_empty() {
        return Err(PixelgateError::InvalidConfig(
            "key code cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_KEY_CODE_LENGTH {
        return Err(PixelgateError::InvalidConfig(format!(
            "key code too long: {}",
            trimmed
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScreen(Rgb);

    impl VisionProvider for FixedScreen {
        fn get_pixel(&self, _x: i32, _y: i32) -> Option<Rgb> {
            Some(self.0)
        }

        fn search_color(&self, region: Region, target: Rgb, tolerance: u32) -> Option<(i32, i32)> {
            self.0
                .matches(target, tolerance)
                .then_some((region.0, region.1))
        }
    }

    #[test]
    fn pixel_condition_uses_tolerance() {
        let board = Blackboard::new();
        let screen = FixedScreen(Rgb(252, 252, 252));
        let close = Condition::pixel(10, 10, Rgb(255, 255, 255));
        let strict = Condition::PixelColor {
            x: 10,
            y: 10,
            target_rgb: Rgb(255, 255, 255),
            tolerance: 5,
        };
        assert!(close.evaluate_at(&board, Some(&screen), 0));
        assert!(!strict.evaluate_at(&board, Some(&screen), 0));
    }

    #[test]
    fn screen_conditions_false_without_vision() {
        let board = Blackboard::new();
        let cond = Condition::RegionColor {
            region: Region(0, 0, 10, 10),
            target_rgb: Rgb(0, 0, 0),
            tolerance: 10,
        };
        assert!(!cond.evaluate_at(&board, None, 0));
    }

    #[test]
    fn timer_condition_expires_and_resets() {
        let board = Blackboard::new();
        let cond = Condition::Timer {
            interval_ms: 100,
            timer_id: "t".to_string(),
        };
        assert!(cond.evaluate_at(&board, None, 5));

        cond.reset_timer(&board, 1000);
        assert!(!cond.evaluate_at(&board, None, 1050));
        assert!(cond.evaluate_at(&board, None, 1100));
    }

    #[test]
    fn key_press_reads_blackboard() {
        let board = Blackboard::new();
        let cond = Condition::KeyPress {
            key_code: "space".to_string(),
        };
        assert!(!cond.evaluate_at(&board, None, 0));
        board.set("key_pressed_space", true);
        assert!(cond.evaluate_at(&board, None, 0));
    }

    #[test]
    fn serialized_tag_matches_variant() {
        let cond = Condition::pixel(100, 200, Rgb(255, 128, 0));
        let value = serde_json::to_value(&cond).expect("serialize");
        assert_eq!(value["type"], cond.tag());
        assert_eq!(value["target_rgb"], serde_json::json!([255, 128, 0]));
    }

    #[test]
    fn validation_limits() {
        assert!(Condition::pixel(-1, 0, Rgb(0, 0, 0)).validate().is_err());
        assert!(Condition::pixel(0, 0, Rgb(0, 0, 0)).validate().is_ok());
        let region = Condition::RegionColor {
            region: Region(9990, 0, 20, 20),
            target_rgb: Rgb(0, 0, 0),
            tolerance: 10,
        };
        assert!(region.validate().is_err());
        let key = Condition::KeyPress {
            key_code: "   ".to_string(),
        };
        assert!(key.validate().is_err());
    }
}
