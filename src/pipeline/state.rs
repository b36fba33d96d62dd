use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// A step in a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Parsed,
    Reconstructed,
    Validated,
    Meshed,
    Exported,
    Encoded,
    Decoded,
    Done,
    Failed,
}

impl Stage {
    /// Lowercase name used in logs and responses.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Parsed => "parsed",
            Self::Reconstructed => "reconstructed",
            Self::Validated => "validated",
            Self::Meshed => "meshed",
            Self::Exported => "exported",
            Self::Encoded => "encoded",
            Self::Decoded => "decoded",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine.
    #[must_use]
    pub fn can_advance(self, next: Self) -> bool {
        use Stage::{
            Decoded, Done, Encoded, Exported, Failed, Meshed, Parsed, Received, Reconstructed,
            Validated,
        };
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Received, Parsed)
                | (Parsed, Reconstructed | Encoded | Decoded)
                | (Encoded, Decoded | Done)
                | (Decoded, Reconstructed | Done)
                | (Reconstructed, Validated)
                | (Validated, Meshed)
                | (Meshed, Exported)
                | (Exported, Done)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered record of the stages a run has passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrail {
    stages: Vec<Stage>,
}

impl Default for StageTrail {
    fn default() -> Self {
        Self {
            stages: vec![Stage::Received],
        }
    }
}

impl StageTrail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stage most recently entered.
    #[must_use]
    pub fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Received)
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] if the edge does not exist.
    pub fn advance(&mut self, next: Stage) -> Result<(), Error> {
        let from = self.current();
        if !from.can_advance(next) {
            return Err(Error::IllegalTransition { from, to: next });
        }
        self.stages.push(next);
        Ok(())
    }

    /// Stages entered so far, starting with [`Stage::Received`].
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}
