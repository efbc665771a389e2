//! Step outcomes and the per-scenario phase machine

use serde::{Deserialize, Serialize};

use crate::error::{StepError, StepResult};
use crate::spec::Keyword;

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Skipped(String),
    Failed(String),
}

impl From<StepResult> for StepOutcome {
    fn from(result: StepResult) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(StepError::Skip(reason)) => Self::Skipped(reason),
            Err(StepError::Fail(reason)) => Self::Failed(reason),
        }
    }
}

/// ```text
/// NotStarted -> GivenSatisfied -> WhenExecuted -> ThenVerified -> Completed
///      \______________\_______________\_______________\-> Skipped | Failed
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPhase {
    #[default]
    NotStarted,
    GivenSatisfied,
    WhenExecuted,
    ThenVerified,
    Completed,
    Skipped,
    Failed,
}

impl ScenarioPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }

    /// Phase after a step with `keyword` produced `outcome`
    pub fn advance(self, keyword: Keyword, outcome: &StepOutcome) -> Self {
        if self.is_terminal() {
            return self;
        }
        match outcome {
            StepOutcome::Skipped(_) => Self::Skipped,
            StepOutcome::Failed(_) => Self::Failed,
            StepOutcome::Passed => match keyword {
                Keyword::Given => Self::GivenSatisfied,
                Keyword::When => Self::WhenExecuted,
                Keyword::Then => Self::ThenVerified,
                Keyword::And | Keyword::But => match self {
                    // A leading conjunction behaves like a precondition
                    Self::NotStarted => Self::GivenSatisfied,
                    other => other,
                },
            },
        }
    }

    /// Called once every step has run
    pub fn finish(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            Self::Completed
        }
    }
}
