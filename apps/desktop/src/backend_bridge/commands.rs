//! Commands queued from the UI to the controller worker.

use shared::domain::RatingField;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    UpdateDraft {
        text: String,
    },
    SubmitText {
        text: String,
    },
    RecordRating {
        item_id: String,
        field: RatingField,
        value: i32,
    },
    RecordChallengeReason {
        item_id: String,
        reason: String,
    },
    SubmitSurvey,
    RequestReport,
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::UpdateDraft { .. } => "update_draft",
            BackendCommand::SubmitText { .. } => "submit_text",
            BackendCommand::RecordRating { .. } => "record_rating",
            BackendCommand::RecordChallengeReason { .. } => "record_challenge_reason",
            BackendCommand::SubmitSurvey => "submit_survey",
            BackendCommand::RequestReport => "request_report",
            BackendCommand::Shutdown => "shutdown",
        }
    }
}
