//! Walks the participant through the survey matrix one item at a time.

use shared::{
    catalog,
    domain::{Category, ItemResponse, SurveyItem},
};

use crate::backend_bridge::commands::BackendCommand;

/// Difficulty ratings at or below this are followed by a "why" question.
pub const CHALLENGE_REASON_THRESHOLD: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStep {
    Rating { index: usize },
    Reason { index: usize },
    Confirm,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurveyAction {
    Dispatch(BackendCommand),
    Skipped,
    Invalid(String),
    Waiting,
}

pub struct SurveyPrompter {
    items: Vec<&'static SurveyItem>,
    step: PromptStep,
    awaiting_confirmation: bool,
}

impl Default for SurveyPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl SurveyPrompter {
    pub fn new() -> Self {
        Self {
            items: catalog::all_items().collect(),
            step: PromptStep::Rating { index: 0 },
            awaiting_confirmation: false,
        }
    }

    pub fn step(&self) -> PromptStep {
        self.step
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    pub fn current_item(&self) -> Option<&'static SurveyItem> {
        match self.step {
            PromptStep::Rating { index } | PromptStep::Reason { index } => {
                self.items.get(index).copied()
            }
            PromptStep::Confirm | PromptStep::Done => None,
        }
    }

    /// Category whose header should be shown before the current prompt, if
    /// the current item starts a new catalog.
    pub fn entering_category(&self) -> Option<Category> {
        let PromptStep::Rating { index } = self.step else {
            return None;
        };
        let item = self.items.get(index)?;
        let previous = index.checked_sub(1).and_then(|i| self.items.get(i));
        match previous {
            Some(previous) if previous.category == item.category => None,
            _ => Some(item.category),
        }
    }

    pub fn handle_line(&mut self, line: &str) -> SurveyAction {
        if self.awaiting_confirmation {
            return SurveyAction::Waiting;
        }
        let line = line.trim();

        match self.step {
            PromptStep::Rating { index } => {
                let Some(item) = self.items.get(index).copied() else {
                    self.step = PromptStep::Confirm;
                    return SurveyAction::Skipped;
                };
                if line.is_empty() {
                    self.advance_from(index);
                    return SurveyAction::Skipped;
                }
                let scale = item.category.scale();
                match line.parse::<i32>() {
                    Ok(value) => {
                        self.awaiting_confirmation = true;
                        SurveyAction::Dispatch(BackendCommand::RecordRating {
                            item_id: item.id.to_string(),
                            field: item.category.rated_field(),
                            value,
                        })
                    }
                    Err(_) => SurveyAction::Invalid(format!(
                        "Enter a number from {} to {}, or press Enter to skip.",
                        scale.min, scale.max
                    )),
                }
            }
            PromptStep::Reason { index } => {
                self.advance_from(index);
                match self.items.get(index) {
                    Some(item) if !line.is_empty() => {
                        SurveyAction::Dispatch(BackendCommand::RecordChallengeReason {
                            item_id: item.id.to_string(),
                            reason: line.to_string(),
                        })
                    }
                    _ => SurveyAction::Skipped,
                }
            }
            PromptStep::Confirm => {
                self.step = PromptStep::Done;
                SurveyAction::Dispatch(BackendCommand::SubmitSurvey)
            }
            PromptStep::Done => SurveyAction::Waiting,
        }
    }

    /// Called when the controller confirms a rating for `item_id`.
    pub fn rating_accepted(&mut self, item_id: &str, response: &ItemResponse) {
        let PromptStep::Rating { index } = self.step else {
            return;
        };
        let Some(item) = self.items.get(index).copied() else {
            return;
        };
        if item.id != item_id || !self.awaiting_confirmation {
            return;
        }
        self.awaiting_confirmation = false;

        let needs_reason = item.category == Category::Difficulty
            && response
                .get(item.category.rated_field())
                .is_some_and(|value| value <= CHALLENGE_REASON_THRESHOLD);
        if needs_reason {
            self.step = PromptStep::Reason { index };
        } else {
            self.advance_from(index);
        }
    }

    /// Called when the controller refuses the pending rating; the same item is asked again.
    pub fn rating_rejected(&mut self) {
        self.awaiting_confirmation = false;
    }

    fn advance_from(&mut self, index: usize) {
        self.step = if index + 1 < self.items.len() {
            PromptStep::Rating { index: index + 1 }
        } else {
            PromptStep::Confirm
        };
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::RatingField;

    use super::*;

    fn accept(prompter: &mut SurveyPrompter, action: SurveyAction) {
        let SurveyAction::Dispatch(BackendCommand::RecordRating {
            item_id,
            field,
            value,
        }) = action
        else {
            panic!("expected a rating, got {action:?}");
        };
        let mut response = ItemResponse::default();
        response.set(field, value as u8);
        prompter.rating_accepted(&item_id, &response);
    }

    #[test]
    fn starts_with_the_agreement_header() {
        let prompter = SurveyPrompter::new();
        assert_eq!(prompter.current_item().map(|item| item.id), Some("q1"));
        assert_eq!(prompter.entering_category(), Some(Category::Agreement));
    }

    #[test]
    fn rating_waits_for_confirmation_before_moving_on() {
        let mut prompter = SurveyPrompter::new();
        let action = prompter.handle_line("6");
        assert_eq!(
            action,
            SurveyAction::Dispatch(BackendCommand::RecordRating {
                item_id: "q1".into(),
                field: RatingField::Agreement,
                value: 6,
            })
        );
        assert_eq!(prompter.handle_line("3"), SurveyAction::Waiting);

        accept(&mut prompter, action);
        assert_eq!(prompter.step(), PromptStep::Rating { index: 1 });
        assert_eq!(prompter.entering_category(), None);
    }

    #[test]
    fn rejected_rating_asks_the_same_item_again() {
        let mut prompter = SurveyPrompter::new();
        prompter.handle_line("12");
        prompter.rating_rejected();
        assert_eq!(prompter.step(), PromptStep::Rating { index: 0 });
        assert!(!prompter.is_awaiting_confirmation());
    }

    #[test]
    fn non_numbers_are_rejected_locally() {
        let mut prompter = SurveyPrompter::new();
        assert_eq!(
            prompter.handle_line("agree"),
            SurveyAction::Invalid("Enter a number from 1 to 7, or press Enter to skip.".into())
        );
        assert_eq!(prompter.handle_line(""), SurveyAction::Skipped);
        assert_eq!(prompter.current_item().map(|item| item.id), Some("q2"));
    }

    #[test]
    fn hard_activities_ask_for_a_reason() {
        let mut prompter = SurveyPrompter::new();
        for _ in 0..10 {
            prompter.handle_line("");
        }
        assert_eq!(prompter.current_item().map(|item| item.id), Some("d1"));
        assert_eq!(prompter.entering_category(), Some(Category::Difficulty));

        let action = prompter.handle_line("1");
        accept(&mut prompter, action);
        assert_eq!(prompter.step(), PromptStep::Reason { index: 10 });

        assert_eq!(
            prompter.handle_line("two left feet"),
            SurveyAction::Dispatch(BackendCommand::RecordChallengeReason {
                item_id: "d1".into(),
                reason: "two left feet".into(),
            })
        );
        assert_eq!(prompter.current_item().map(|item| item.id), Some("d2"));

        let action = prompter.handle_line("4");
        accept(&mut prompter, action);
        assert_eq!(prompter.current_item().map(|item| item.id), Some("d3"));
    }

    #[test]
    fn ends_with_submission() {
        let mut prompter = SurveyPrompter::new();
        for _ in 0..catalog::item_count() {
            prompter.handle_line("");
        }
        assert_eq!(prompter.step(), PromptStep::Confirm);
        assert_eq!(
            prompter.handle_line(""),
            SurveyAction::Dispatch(BackendCommand::SubmitSurvey)
        );
        assert_eq!(prompter.handle_line(""), SurveyAction::Waiting);
    }
}
