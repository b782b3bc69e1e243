//! Domain types shared between the counter controller and its front ends.

use serde::{Deserialize, Serialize};

use crate::error::{BoundField, BoundInputError};

pub const DEFAULT_MIN: i64 = 0;
pub const DEFAULT_MAX: i64 = 100;

/// Optional user-entered bounds. Unset values resolve to [`DEFAULT_MIN`] and
/// [`DEFAULT_MAX`] when a run starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Bounds {
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    pub fn resolved_min(&self) -> i64 {
        self.min.unwrap_or(DEFAULT_MIN)
    }

    pub fn resolved_max(&self) -> i64 {
        self.max.unwrap_or(DEFAULT_MAX)
    }

    pub fn resolve(&self) -> (i64, i64) {
        (self.resolved_min(), self.resolved_max())
    }

    /// Position of `value` inside the resolved range as a fraction in `[0, 1]`.
    pub fn fraction(&self, value: i64) -> f32 {
        let (min, max) = self.resolve();
        if max <= min {
            return if value >= max { 1.0 } else { 0.0 };
        }
        let span = (max as f64) - (min as f64);
        let offset = (value as f64) - (min as f64);
        (offset / span).clamp(0.0, 1.0) as f32
    }
}

/// Parses a bound typed by the user. Empty input clears the bound.
pub fn parse_bound(field: BoundField, input: &str) -> Result<Option<i64>, BoundInputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| BoundInputError::new(field, trimmed))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl RunStatus {
    pub fn can_start(self) -> bool {
        self != Self::Running
    }

    pub fn can_stop(self) -> bool {
        self == Self::Running
    }

    pub fn can_pause(self) -> bool {
        self == Self::Running
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelKind {
    Stop,
    Pause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CounterEvent {
    ValueChanged { value: i64 },
    MinChanged { min: Option<i64> },
    MaxChanged { max: Option<i64> },
    StatusChanged { status: RunStatus },
    RunCancelled { kind: CancelKind, value: i64 },
    RunCompleted { value: i64 },
}

impl CounterEvent {
    /// One-line text for a user-visible notice, if this event warrants one.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::RunCancelled {
                kind: CancelKind::Stop,
                value,
            } => Some(format!("Run was cancelled at {value}.")),
            Self::RunCancelled {
                kind: CancelKind::Pause,
                value,
            } => Some(format!("Run was paused at {value}; start resumes it.")),
            Self::RunCompleted { value } => Some(format!("Run completed at {value}.")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub value: i64,
    pub bounds: Bounds,
    pub status: RunStatus,
}
