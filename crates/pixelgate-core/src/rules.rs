//! # Legacy Rules
//!
//! Flat condition → action rules, evaluated by the engine after the graph
//! stage on every tick.

use crate::blackboard::Blackboard;
use crate::providers::{InputProvider, VisionProvider};
use crate::{Action, Condition, PixelgateError};
use serde::{Deserialize, Serialize};

/// How a rule combines its conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleLogic {
    #[default]
    And,
    Or,
}

/// A named list of conditions guarding a list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub logic: RuleLogic,
}

impl Rule {
    #[must_use]
    pub fn new(name: impl Into<String>, logic: RuleLogic) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            actions: Vec::new(),
            logic,
        }
    }

    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn then(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Evaluate the conditions and, on a match, run the actions in order.
    ///
    /// Returns whether the rule matched. After the actions ran, every timer
    /// condition of the rule restarts at `now_ms`, including timers that had
    /// not expired yet under OR. An action error skips the remaining actions
    /// and the timer reset.
    pub fn check_and_execute(
        &self,
        blackboard: &Blackboard,
        vision: Option<&dyn VisionProvider>,
        input: Option<&dyn InputProvider>,
        now_ms: u64,
    ) -> Result<bool, PixelgateError> {
        let holds = |c: &Condition| c.evaluate_at(blackboard, vision, now_ms);
        let matched = match self.logic {
            RuleLogic::And => self.conditions.iter().all(holds),
            RuleLogic::Or => self.conditions.iter().any(holds),
        };
        if !matched {
            return Ok(false);
        }

        for action in &self.actions {
            action
                .execute(blackboard, input)
                .map_err(|e| PixelgateError::RuleExecution {
                    rule: self.name.clone(),
                    message: e.to_string(),
                })?;
        }

        for condition in &self.conditions {
            condition.reset_timer(blackboard, now_ms);
        }
        Ok(true)
    }

    pub fn validate(&self) -> Result<(), PixelgateError> {
        for condition in &self.conditions {
            condition.validate()?;
        }
        for action in &self.actions {
            action.validate()?;
        }
        Ok(())
    }
}
