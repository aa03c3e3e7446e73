//! Synchronous experiment state machine. Timing lives in the controller.

use chrono::Utc;
use shared::{
    catalog,
    domain::{
        AccuracyScore, ConversationEntry, ItemResponse, Phase, Predictions, RatingField,
        Responses, RunId, ScoreTally,
    },
    error::ExperimentError,
    protocol::{ExperimentReport, ExperimentSnapshot},
};
use tracing::{debug, info};

use crate::{random::RandomSource, scoring};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentReply {
    /// Follow-up on the current question; the cursor stays put.
    Probe,
    /// Next scripted question, by index.
    Question { index: usize },
    /// Script exhausted; the survey follows after the closing delay.
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringOutcome {
    pub tally: ScoreTally,
    pub accuracy: AccuracyScore,
}

#[derive(Debug)]
pub struct ExperimentState {
    run_id: RunId,
    phase: Phase,
    transcript: Vec<ConversationEntry>,
    draft: String,
    cursor: usize,
    conversation_closed: bool,
    responses: Responses,
    predictions: Predictions,
    tally: ScoreTally,
    accuracy: AccuracyScore,
    probe_probability: f64,
}

impl ExperimentState {
    pub fn new(probe_probability: f64) -> Self {
        let mut state = Self {
            run_id: RunId::new(),
            phase: Phase::Conversation,
            transcript: Vec::new(),
            draft: String::new(),
            cursor: 0,
            conversation_closed: false,
            responses: Responses::new(),
            predictions: Predictions::new(),
            tally: ScoreTally::default(),
            accuracy: AccuracyScore::Pending,
            probe_probability,
        };
        state.open_conversation();
        state
    }

    fn open_conversation(&mut self) {
        if self.phase == Phase::Conversation && self.transcript.is_empty() {
            self.transcript.push(ConversationEntry::agent(format!(
                "{} {}",
                catalog::GREETING,
                catalog::SCRIPTED_QUESTIONS[0]
            )));
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &[ConversationEntry] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_conversation_closed(&self) -> bool {
        self.conversation_closed
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn predictions(&self) -> &Predictions {
        &self.predictions
    }

    pub fn accuracy(&self) -> AccuracyScore {
        self.accuracy
    }

    pub fn tally(&self) -> ScoreTally {
        self.tally
    }

    pub fn update_draft(&mut self, text: &str) -> Result<(), ExperimentError> {
        self.require_open_conversation("update_draft")?;
        self.draft.clear();
        self.draft.push_str(text);
        Ok(())
    }

    pub fn submit_participant_text(
        &mut self,
        text: &str,
    ) -> Result<ConversationEntry, ExperimentError> {
        self.require_open_conversation("submit_participant_text")?;
        if text.trim().is_empty() {
            return Err(ExperimentError::EmptyText);
        }

        let entry = ConversationEntry::participant(text);
        self.transcript.push(entry.clone());
        self.draft.clear();
        Ok(entry)
    }

    /// Produces the agent's turn after a participant message. Returns `None`
    /// once the conversation is over.
    pub fn agent_reply(
        &mut self,
        rng: &mut dyn RandomSource,
    ) -> Option<(AgentReply, ConversationEntry)> {
        if self.phase != Phase::Conversation || self.conversation_closed {
            return None;
        }

        let questions = &catalog::SCRIPTED_QUESTIONS;
        // The last question is always followed by the closing remark.
        let probe_eligible = self.cursor + 1 < questions.len();
        let reply = if probe_eligible && rng.chance(self.probe_probability) {
            AgentReply::Probe
        } else {
            self.cursor += 1;
            if self.cursor < questions.len() {
                AgentReply::Question { index: self.cursor }
            } else {
                self.conversation_closed = true;
                AgentReply::Closing
            }
        };
        debug!(run_id = %self.run_id, ?reply, cursor = self.cursor, "agent reply");

        let text = match reply {
            AgentReply::Probe => catalog::PROBE_LINE,
            AgentReply::Question { index } => questions[index],
            AgentReply::Closing => catalog::CLOSING_REMARK,
        };
        let entry = ConversationEntry::agent(text);
        self.transcript.push(entry.clone());
        Some((reply, entry))
    }

    pub fn begin_survey(&mut self) -> Result<PhaseChange, ExperimentError> {
        self.require_phase(Phase::Conversation, "begin_survey")?;
        if !self.conversation_closed {
            return Err(ExperimentError::PhaseClosed {
                operation: "begin_survey",
                phase: self.phase,
            });
        }
        self.transition(Phase::Survey)
    }

    pub fn record_rating(
        &mut self,
        item_id: &str,
        field: RatingField,
        value: i32,
    ) -> Result<&ItemResponse, ExperimentError> {
        self.require_phase(Phase::Survey, "record_rating")?;
        let item = catalog::find_item(item_id).ok_or_else(|| ExperimentError::UnknownItem {
            item_id: item_id.to_string(),
        })?;

        let scale = field.scale();
        let out_of_range = || ExperimentError::RatingOutOfRange {
            field,
            value,
            min: scale.min,
            max: scale.max,
        };
        if !scale.contains(value) {
            return Err(out_of_range());
        }
        let value = u8::try_from(value).map_err(|_| out_of_range())?;

        let response = self.responses.entry(item.id.to_string()).or_default();
        response.set(field, value);
        debug!(run_id = %self.run_id, item_id = item.id, %field, value, "rating recorded");
        Ok(response)
    }

    pub fn record_challenge_reason(
        &mut self,
        item_id: &str,
        reason: &str,
    ) -> Result<&ItemResponse, ExperimentError> {
        self.require_phase(Phase::Survey, "record_challenge_reason")?;
        let item = catalog::find_item(item_id).ok_or_else(|| ExperimentError::UnknownItem {
            item_id: item_id.to_string(),
        })?;

        let response = self.responses.entry(item.id.to_string()).or_default();
        response.challenge_reason = Some(reason.to_string());
        Ok(response)
    }

    /// Closes the survey and scores it in the same step.
    pub fn submit_survey(
        &mut self,
        rng: &mut dyn RandomSource,
    ) -> Result<(PhaseChange, ScoringOutcome), ExperimentError> {
        let change = self.transition(Phase::Scoring)?;
        let outcome = self.run_scoring(rng);
        Ok((change, outcome))
    }

    fn run_scoring(&mut self, rng: &mut dyn RandomSource) -> ScoringOutcome {
        self.predictions = scoring::generate_predictions(rng);
        self.tally = scoring::tally(&self.responses, &self.predictions);
        self.accuracy = scoring::accuracy(self.tally);
        info!(
            run_id = %self.run_id,
            correct = self.tally.correct,
            total = self.tally.total,
            accuracy = ?self.accuracy,
            "simulated scoring finished"
        );
        ScoringOutcome {
            tally: self.tally,
            accuracy: self.accuracy,
        }
    }

    pub fn finish_scoring(&mut self) -> Result<PhaseChange, ExperimentError> {
        self.transition(Phase::Results)
    }

    pub fn snapshot(&self) -> ExperimentSnapshot {
        ExperimentSnapshot {
            run_id: self.run_id,
            phase: self.phase,
            transcript: self.transcript.clone(),
            draft: self.draft.clone(),
            question_cursor: self.cursor,
            responses: self.responses.clone(),
            predictions: self.predictions.clone(),
            accuracy: self.accuracy,
        }
    }

    /// Final summary, available once scoring has run.
    pub fn report(&self) -> Option<ExperimentReport> {
        if self.accuracy == AccuracyScore::Pending {
            return None;
        }
        Some(ExperimentReport {
            run_id: self.run_id,
            accuracy: self.accuracy,
            tally: self.tally,
            summary: self.accuracy.summary(),
            turns: self.transcript.len(),
            responses: self.responses.clone(),
            predictions: self.predictions.clone(),
            generated_at: Utc::now(),
        })
    }

    fn transition(&mut self, to: Phase) -> Result<PhaseChange, ExperimentError> {
        let from = self.phase;
        if !from.can_transition_to(to) {
            return Err(ExperimentError::PhaseClosed {
                operation: "advance",
                phase: from,
            });
        }
        self.phase = to;
        info!(run_id = %self.run_id, %from, %to, "phase changed");
        Ok(PhaseChange { from, to })
    }

    fn require_phase(&self, phase: Phase, operation: &'static str) -> Result<(), ExperimentError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(ExperimentError::PhaseClosed {
                operation,
                phase: self.phase,
            })
        }
    }

    fn require_open_conversation(&self, operation: &'static str) -> Result<(), ExperimentError> {
        self.require_phase(Phase::Conversation, operation)?;
        if self.conversation_closed {
            return Err(ExperimentError::ConversationClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
