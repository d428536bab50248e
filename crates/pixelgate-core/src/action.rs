//! # Actions
//!
//! Side effects fired by Output nodes and legacy rules.

use crate::blackboard::Blackboard;
use crate::condition::{check_coordinates, check_key_code};
use crate::providers::InputProvider;
use crate::{MouseButton, PixelgateError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A synthetic input or blackboard side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "KeyPressAction")]
    KeyPress { key_code: String },

    #[serde(rename = "MouseClickAction")]
    MouseClick {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
    },

    #[serde(rename = "MouseMoveAction")]
    MouseMove { x: i32, y: i32 },

    /// Block the tick thread. Delays every later node in the same tick.
    ///
    /// Documents carry the duration as `seconds`.
    #[serde(rename = "WaitAction")]
    Wait {
        #[serde(rename = "seconds", with = "crate::formats::seconds")]
        millis: u64,
    },

    #[serde(rename = "SetStateAction")]
    SetState { key: String, value: Value },
}

impl Action {
    /// Every tag accepted in documents.
    pub const TAGS: [&'static str; 5] = [
        "KeyPressAction",
        "MouseClickAction",
        "MouseMoveAction",
        "WaitAction",
        "SetStateAction",
    ];

    /// Stable document tag of this variant.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::KeyPress { .. } => "KeyPressAction",
            Self::MouseClick { .. } => "MouseClickAction",
            Self::MouseMove { .. } => "MouseMoveAction",
            Self::Wait { .. } => "WaitAction",
            Self::SetState { .. } => "SetStateAction",
        }
    }

    #[must_use]
    pub fn key(key_code: impl Into<String>) -> Self {
        Self::KeyPress {
            key_code: key_code.into(),
        }
    }

    /// Run the action. Input actions are no-ops without a provider.
    pub fn execute(
        &self,
        blackboard: &Blackboard,
        input: Option<&dyn InputProvider>,
    ) -> Result<(), PixelgateError> {
        match self {
            Self::KeyPress { key_code } => match input {
                Some(provider) => provider.press_key(key_code),
                None => Ok(()),
            },
            Self::MouseClick { x, y, button } => match input {
                Some(provider) => provider.click_mouse(*x, *y, *button),
                None => Ok(()),
            },
            Self::MouseMove { x, y } => match input {
                Some(provider) => provider.move_mouse(*x, *y),
                None => Ok(()),
            },
            Self::Wait { millis } => {
                std::thread::sleep(Duration::from_millis(*millis));
                Ok(())
            }
            Self::SetState { key, value } => {
                blackboard.set(key.clone(), value.clone());
                Ok(())
            }
        }
    }

    /// Check parameters against the input limits.
    pub fn validate(&self) -> Result<(), PixelgateError> {
        match self {
            Self::KeyPress { key_code } => check_key_code(key_code),
            Self::MouseClick { x, y, .. } | Self::MouseMove { x, y } => check_coordinates(*x, *y),
            Self::Wait { .. } => Ok(()),
            Self::SetState { key, .. } => {
                if key.trim().is_empty() {
                    return Err(PixelgateError::InvalidConfig(
                        "state key cannot be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl InputProvider for Recorder {
        fn press_key(&self, code: &str) -> Result<(), PixelgateError> {
            self.calls.lock().expect("lock").push(format!("key:{}", code));
            Ok(())
        }

        fn click_mouse(&self, x: i32, y: i32, button: MouseButton) -> Result<(), PixelgateError> {
            self.calls
                .lock()
                .expect("lock")
                .push(format!("click:{}:{}:{}", x, y, button));
            Ok(())
        }

        fn move_mouse(&self, x: i32, y: i32) -> Result<(), PixelgateError> {
            self.calls
                .lock()
                .expect("lock")
                .push(format!("move:{}:{}", x, y));
            Ok(())
        }
    }

    #[test]
    fn input_actions_reach_provider() {
        let board = Blackboard::new();
        let recorder = Recorder::default();
        Action::key("space")
            .execute(&board, Some(&recorder))
            .expect("key");
        Action::MouseClick {
            x: 5,
            y: 6,
            button: MouseButton::Right,
        }
        .execute(&board, Some(&recorder))
        .expect("click");
        Action::MouseMove { x: 1, y: 2 }
            .execute(&board, Some(&recorder))
            .expect("move");

        let calls = recorder.calls.lock().expect("lock").clone();
        assert_eq!(calls, vec!["key:space", "click:5:6:right", "move:1:2"]);
    }

    #[test]
    fn input_actions_without_provider_are_noops() {
        let board = Blackboard::new();
        assert!(Action::key("a").execute(&board, None).is_ok());
    }

    #[test]
    fn set_state_writes_blackboard() {
        let board = Blackboard::new();
        Action::SetState {
            key: "mode".to_string(),
            value: Value::from("farm"),
        }
        .execute(&board, None)
        .expect("set");
        assert_eq!(board.get("mode", Value::Null), Value::from("farm"));
    }

    #[test]
    fn click_button_defaults_to_left() {
        let action: Action =
            serde_json::from_str(r#"{"type":"MouseClickAction","x":1,"y":2}"#).expect("parse");
        assert_eq!(
            action,
            Action::MouseClick {
                x: 1,
                y: 2,
                button: MouseButton::Left
            }
        );
    }
}
