//! UI/backend events and error modeling for the terminal controller.

use shared::{
    error::{ErrorCode, ExperimentError},
    protocol::{ExperimentEvent, ExperimentReport, ExperimentSnapshot},
};

use crate::backend_bridge::commands::BackendCommand;

#[derive(Debug)]
pub enum UiEvent {
    Ready(ExperimentSnapshot),
    Info(String),
    Experiment(ExperimentEvent),
    Report(ExperimentReport),
    Error(UiError),
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Validation,
    LateInput,
    Startup,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Conversation,
    Survey,
    Report,
    General,
}

impl UiErrorContext {
    pub fn for_command(cmd: &BackendCommand) -> Self {
        match cmd {
            BackendCommand::UpdateDraft { .. } | BackendCommand::SubmitText { .. } => {
                UiErrorContext::Conversation
            }
            BackendCommand::RecordRating { .. }
            | BackendCommand::RecordChallengeReason { .. }
            | BackendCommand::SubmitSurvey => UiErrorContext::Survey,
            BackendCommand::RequestReport => UiErrorContext::Report,
            BackendCommand::Shutdown => UiErrorContext::General,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_experiment(context: UiErrorContext, err: &ExperimentError) -> Self {
        let category = match err.code() {
            ErrorCode::InvalidInput => UiErrorCategory::Validation,
            ErrorCode::PhaseClosed => UiErrorCategory::LateInput,
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let category = if context == UiErrorContext::BackendStartup {
            UiErrorCategory::Startup
        } else {
            UiErrorCategory::Unknown
        };
        Self {
            category,
            context,
            message: message.into(),
        }
    }

    /// Input that arrived after its phase ended; nothing to show the participant.
    pub fn is_ignorable(&self) -> bool {
        self.category == UiErrorCategory::LateInput
    }

    pub fn is_fatal(&self) -> bool {
        self.category == UiErrorCategory::Startup
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn user_message(&self) -> String {
        match (self.category, self.context) {
            (UiErrorCategory::Validation, UiErrorContext::Conversation) => {
                "Please type a response before sending.".to_string()
            }
            (UiErrorCategory::Validation, UiErrorContext::Survey) => {
                format!("{}. Please pick a value on the scale shown.", self.message)
            }
            (UiErrorCategory::Startup, _) => {
                format!("Experiment could not start: {}", self.message)
            }
            _ => self.message.clone(),
        }
    }
}
