use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccuracyScore, ConversationEntry, ItemResponse, Phase, Predictions, Responses, RunId,
    ScoreTally,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ExperimentEvent {
    TurnAppended {
        entry: ConversationEntry,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    ResponseRecorded {
        item_id: String,
        response: ItemResponse,
    },
    ScoringCompleted {
        accuracy: AccuracyScore,
        tally: ScoreTally,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSnapshot {
    pub run_id: RunId,
    pub phase: Phase,
    pub transcript: Vec<ConversationEntry>,
    pub draft: String,
    pub question_cursor: usize,
    pub responses: Responses,
    #[serde(default, skip_serializing_if = "Predictions::is_empty")]
    pub predictions: Predictions,
    pub accuracy: AccuracyScore,
}

impl ExperimentSnapshot {
    pub fn status_line(&self) -> &'static str {
        self.phase.status_line()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub run_id: RunId,
    pub accuracy: AccuracyScore,
    pub tally: ScoreTally,
    pub summary: String,
    pub turns: usize,
    pub responses: Responses,
    pub predictions: Predictions,
    pub generated_at: DateTime<Utc>,
}
