use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundField {
    Min,
    Max,
}

impl BoundField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} must be an integer or empty, got '{input}'", field.label())]
pub struct BoundInputError {
    pub field: BoundField,
    pub input: String,
}

impl BoundInputError {
    pub fn new(field: BoundField, input: impl Into<String>) -> Self {
        Self {
            field,
            input: input.into(),
        }
    }
}
