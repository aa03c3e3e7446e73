//! Simulated prediction step.
//!
//! Nothing here models the participant. Predictions are uniform random draws
//! on each field's scale, and accuracy is how often a draw landed within one
//! point of what the participant actually answered.

use shared::{
    catalog,
    domain::{AccuracyScore, PredictedRatings, Predictions, RatingField, Responses, ScoreTally},
};
use tracing::debug;

use crate::random::RandomSource;

/// Largest distance between prediction and answer that still counts as a hit.
pub const HIT_MARGIN: u8 = 1;

/// Draws a prediction for every catalog item, answered or not.
pub fn generate_predictions(rng: &mut dyn RandomSource) -> Predictions {
    catalog::all_items()
        .map(|item| {
            let prediction = PredictedRatings {
                agreement: roll_field(rng, RatingField::Agreement),
                liking: roll_field(rng, RatingField::Liking),
                difficulty: roll_field(rng, RatingField::Difficulty),
            };
            debug!(item_id = item.id, ?prediction, "simulated prediction");
            (item.id.to_string(), prediction)
        })
        .collect()
}

fn roll_field(rng: &mut dyn RandomSource, field: RatingField) -> u8 {
    let scale = field.scale();
    rng.roll(scale.min, scale.max)
}

pub fn tally(responses: &Responses, predictions: &Predictions) -> ScoreTally {
    let mut tally = ScoreTally::default();
    for (item_id, response) in responses {
        let Some(prediction) = predictions.get(item_id) else {
            continue;
        };
        for (field, answered) in response.rated_fields() {
            tally.total += 1;
            if answered.abs_diff(prediction.get(field)) <= HIT_MARGIN {
                tally.correct += 1;
            }
        }
    }
    tally
}

/// Percentage of hits, rounded half up. An empty tally is reported as
/// [`AccuracyScore::NoScoredFields`] rather than dividing by zero.
pub fn accuracy(tally: ScoreTally) -> AccuracyScore {
    if tally.total == 0 {
        return AccuracyScore::NoScoredFields;
    }
    let correct = u64::from(tally.correct.min(tally.total));
    let total = u64::from(tally.total);
    let percent = (200 * correct + total) / (2 * total);
    AccuracyScore::Measured {
        percent: percent as u8,
    }
}
