use std::{collections::BTreeMap, fmt, ops::RangeInclusive};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Conversation,
    Survey,
    Scoring,
    Results,
}

impl Phase {
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Conversation => Some(Phase::Survey),
            Phase::Survey => Some(Phase::Scoring),
            Phase::Scoring => Some(Phase::Results),
            Phase::Results => None,
        }
    }

    pub fn can_transition_to(self, target: Phase) -> bool {
        self.next() == Some(target)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Conversation => "conversation",
            Phase::Survey => "survey",
            Phase::Scoring => "scoring",
            Phase::Results => "results",
        }
    }

    pub fn status_line(self) -> &'static str {
        match self {
            Phase::Conversation => "Answer the questions in the chat below.",
            Phase::Survey => "Rate each statement and activity on the scale shown.",
            Phase::Scoring => "Generating simulated predictions based on the conversation...",
            Phase::Results => "Simulated prediction accuracy",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Participant,
}

impl Speaker {
    pub fn prefix(self) -> &'static str {
        match self {
            Speaker::Agent => "AI",
            Speaker::Participant => "You",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn participant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Participant,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingScale {
    pub min: u8,
    pub max: u8,
    pub low_label: &'static str,
    pub high_label: &'static str,
}

impl RatingScale {
    pub fn contains(&self, value: i32) -> bool {
        value >= i32::from(self.min) && value <= i32::from(self.max)
    }

    pub fn values(&self) -> RangeInclusive<u8> {
        self.min..=self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingField {
    Agreement,
    Liking,
    Difficulty,
}

impl RatingField {
    pub const ALL: [RatingField; 3] = [
        RatingField::Agreement,
        RatingField::Liking,
        RatingField::Difficulty,
    ];

    pub fn category(self) -> Category {
        match self {
            RatingField::Agreement => Category::Agreement,
            RatingField::Liking => Category::Activity,
            RatingField::Difficulty => Category::Difficulty,
        }
    }

    pub fn scale(self) -> RatingScale {
        self.category().scale()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RatingField::Agreement => "agreement",
            RatingField::Liking => "liking",
            RatingField::Difficulty => "difficulty",
        }
    }
}

impl fmt::Display for RatingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Agreement,
    Activity,
    Difficulty,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Agreement, Category::Activity, Category::Difficulty];

    pub fn scale(self) -> RatingScale {
        match self {
            Category::Agreement => RatingScale {
                min: 1,
                max: 7,
                low_label: "Strongly Disagree",
                high_label: "Strongly Agree",
            },
            Category::Activity => RatingScale {
                min: 1,
                max: 5,
                low_label: "Dislike Very Much",
                high_label: "Like Very Much",
            },
            Category::Difficulty => RatingScale {
                min: 1,
                max: 5,
                low_label: "Very Difficult",
                high_label: "Very Easy",
            },
        }
    }

    pub fn rated_field(self) -> RatingField {
        match self {
            Category::Agreement => RatingField::Agreement,
            Category::Activity => RatingField::Liking,
            Category::Difficulty => RatingField::Difficulty,
        }
    }

    pub fn column_header(self) -> &'static str {
        match self {
            Category::Agreement => "Statement",
            Category::Activity | Category::Difficulty => "Activity",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Agreement => "How much do you agree with each statement?",
            Category::Activity => "How much do you like each activity?",
            Category::Difficulty => "How easy is it for you to do each activity?",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurveyItem {
    pub id: &'static str,
    pub text: &'static str,
    pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liking: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_reason: Option<String>,
}

impl ItemResponse {
    pub fn get(&self, field: RatingField) -> Option<u8> {
        match field {
            RatingField::Agreement => self.agreement,
            RatingField::Liking => self.liking,
            RatingField::Difficulty => self.difficulty,
        }
    }

    pub fn set(&mut self, field: RatingField, value: u8) {
        let slot = match field {
            RatingField::Agreement => &mut self.agreement,
            RatingField::Liking => &mut self.liking,
            RatingField::Difficulty => &mut self.difficulty,
        };
        *slot = Some(value);
    }

    pub fn rated_fields(&self) -> impl Iterator<Item = (RatingField, u8)> + '_ {
        RatingField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|value| (field, value)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedRatings {
    pub agreement: u8,
    pub liking: u8,
    pub difficulty: u8,
}

impl PredictedRatings {
    pub fn get(&self, field: RatingField) -> u8 {
        match field {
            RatingField::Agreement => self.agreement,
            RatingField::Liking => self.liking,
            RatingField::Difficulty => self.difficulty,
        }
    }
}

pub type Responses = BTreeMap<String, ItemResponse>;
pub type Predictions = BTreeMap<String, PredictedRatings>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTally {
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccuracyScore {
    #[default]
    Pending,
    Measured {
        percent: u8,
    },
    NoScoredFields,
}

impl AccuracyScore {
    pub fn percent(self) -> u8 {
        match self {
            AccuracyScore::Measured { percent } => percent,
            AccuracyScore::Pending | AccuracyScore::NoScoredFields => 0,
        }
    }

    pub fn summary(self) -> String {
        match self {
            AccuracyScore::Pending => "Predictions have not been generated yet.".to_string(),
            AccuracyScore::Measured { percent } => format!(
                "The simulated predictor matched {percent}% of your responses within a margin of 1 point."
            ),
            AccuracyScore::NoScoredFields => {
                "No ratings were recorded, so there was nothing to compare; accuracy is reported as 0%."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_one_step_at_a_time() {
        assert!(Phase::Conversation.can_transition_to(Phase::Survey));
        assert!(!Phase::Conversation.can_transition_to(Phase::Scoring));
        assert!(!Phase::Survey.can_transition_to(Phase::Conversation));
        assert_eq!(Phase::Results.next(), None);
        assert_eq!(Phase::default(), Phase::Conversation);
    }

    #[test]
    fn each_category_rates_its_own_field_on_its_own_scale() {
        for category in Category::ALL {
            assert_eq!(category.rated_field().category(), category);
        }
        assert_eq!(Category::Agreement.scale().values(), 1..=7);
        assert_eq!(RatingField::Liking.scale().max, 5);
        assert!(!Category::Difficulty.scale().contains(6));
        assert!(!Category::Difficulty.scale().contains(0));
    }

    #[test]
    fn setting_one_field_keeps_the_others() {
        let mut response = ItemResponse {
            challenge_reason: Some("no car".into()),
            ..Default::default()
        };
        response.set(RatingField::Difficulty, 2);
        response.set(RatingField::Liking, 4);
        response.set(RatingField::Difficulty, 3);

        assert_eq!(response.difficulty, Some(3));
        assert_eq!(response.liking, Some(4));
        assert_eq!(response.challenge_reason.as_deref(), Some("no car"));
        assert_eq!(response.rated_fields().count(), 2);
    }

    #[test]
    fn accuracy_reads_zero_until_measured() {
        assert_eq!(AccuracyScore::default().percent(), 0);
        assert_eq!(AccuracyScore::NoScoredFields.percent(), 0);
        assert_eq!(AccuracyScore::Measured { percent: 40 }.percent(), 40);
        assert!(AccuracyScore::Measured { percent: 40 }
            .summary()
            .contains("40%"));
    }

    #[test]
    fn accuracy_serializes_with_kind_tag() {
        let json = serde_json::to_value(AccuracyScore::Measured { percent: 75 }).expect("json");
        assert_eq!(json["kind"], "measured");
        assert_eq!(json["percent"], 75);
    }
}
