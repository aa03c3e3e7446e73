use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Phase, RatingField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    PhaseClosed,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExperimentError {
    #[error("participant text must not be empty")]
    EmptyText,
    #[error("unknown survey item '{item_id}'")]
    UnknownItem { item_id: String },
    #[error("rating {value} for {field} is outside the {min}-{max} scale")]
    RatingOutOfRange {
        field: RatingField,
        value: i32,
        min: u8,
        max: u8,
    },
    #[error("invalid experiment configuration: {0}")]
    InvalidConfig(String),
    #[error("{operation} is not accepted during the {phase} phase")]
    PhaseClosed {
        operation: &'static str,
        phase: Phase,
    },
    #[error("the conversation has ended; the survey is about to start")]
    ConversationClosed,
    #[error("experiment controller has been shut down")]
    ShutDown,
}

impl ExperimentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExperimentError::PhaseClosed { .. }
            | ExperimentError::ConversationClosed
            | ExperimentError::ShutDown => ErrorCode::PhaseClosed,
            _ => ErrorCode::InvalidInput,
        }
    }

    pub fn is_ignorable(&self) -> bool {
        self.code() == ErrorCode::PhaseClosed
    }
}
