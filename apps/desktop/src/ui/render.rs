//! Plain-text rendering for the terminal front end.

use shared::domain::{AccuracyScore, Category, ConversationEntry, SurveyItem};

const BAR_WIDTH: usize = 20;

pub fn entry_line(entry: &ConversationEntry) -> String {
    format!("{}: {}", entry.speaker.prefix(), entry.text)
}

pub fn category_header(category: Category) -> String {
    let scale = category.scale();
    let points = scale
        .values()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "\n{}\n  {} | {}  ({} = {}, {} = {})",
        category.title(),
        category.column_header(),
        points,
        scale.min,
        scale.low_label,
        scale.max,
        scale.high_label
    )
}

pub fn item_prompt(item: &SurveyItem) -> String {
    let scale = item.category.scale();
    format!(
        "  {} [{}-{}, Enter to skip]: ",
        item.text, scale.min, scale.max
    )
}

pub fn reason_prompt(item: &SurveyItem) -> String {
    format!(
        "  What makes \"{}\" hard for you? (optional, Enter to skip): ",
        item.text
    )
}

pub const SUBMIT_PROMPT: &str = "\nAll items shown. Press Enter to submit your responses: ";

/// `[#########...........]  45%`
pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = usize::from(percent) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn results(accuracy: AccuracyScore) -> String {
    format!(
        "\nPrediction accuracy\n  {}\n  {}",
        progress_bar(accuracy.percent()),
        accuracy.summary()
    )
}
