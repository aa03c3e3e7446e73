//! Compiled-in script and survey catalogs.

use crate::domain::{Category, SurveyItem};

pub const GREETING: &str = "Hello! Let's start our conversation.";

pub const PROBE_LINE: &str = "That's interesting! Can you tell me more about that?";

pub const CLOSING_REMARK: &str =
    "Thank you for sharing your thoughts. Let's move on to the survey.";

pub const SCRIPTED_QUESTIONS: [&str; 5] = [
    "If you could change anything about the way you were raised, what would it be?",
    "What would constitute a \"perfect\" day for you?",
    "For what in your life do you feel most grateful?",
    "If you could wake up tomorrow having gained one quality or ability, what would it be?",
    "Is there something that you've dreamed of doing for a long time? Why haven't you done it?",
];

const fn item(id: &'static str, text: &'static str, category: Category) -> SurveyItem {
    SurveyItem { id, text, category }
}

pub const AGREEMENT_ITEMS: [SurveyItem; 5] = [
    item("q1", "I would like to spend a year in London or Paris.", Category::Agreement),
    item(
        "q2",
        "If I had my life to live over, I would sure do things differently.",
        Category::Agreement,
    ),
    item("q3", "I am an impulse buyer.", Category::Agreement),
    item("q4", "I am a homebody.", Category::Agreement),
    item(
        "q5",
        "A nationally advertised brand is usually a better buy than a generic brand.",
        Category::Agreement,
    ),
];

pub const ACTIVITY_ITEMS: [SurveyItem; 5] = [
    item("a1", "Go to a party", Category::Activity),
    item("a2", "Go dancing", Category::Activity),
    item("a3", "Go to a movie at a theater", Category::Activity),
    item(
        "a4",
        "Go to a live theater performance or to the opera",
        Category::Activity,
    ),
    item("a5", "Go for a walk", Category::Activity),
];

pub const DIFFICULTY_ITEMS: [SurveyItem; 7] = [
    item("d1", "Go dancing", Category::Difficulty),
    item("d2", "Go to a movie at a theater", Category::Difficulty),
    item("d3", "Go for a walk", Category::Difficulty),
    item("d4", "Play video or computer games", Category::Difficulty),
    item("d5", "Visit with friends", Category::Difficulty),
    item("d6", "Read books, magazines, or newspapers", Category::Difficulty),
    item("d7", "Go for a weekend trip", Category::Difficulty),
];

pub fn items_in(category: Category) -> &'static [SurveyItem] {
    match category {
        Category::Agreement => &AGREEMENT_ITEMS,
        Category::Activity => &ACTIVITY_ITEMS,
        Category::Difficulty => &DIFFICULTY_ITEMS,
    }
}

pub fn all_items() -> impl Iterator<Item = &'static SurveyItem> {
    Category::ALL
        .into_iter()
        .flat_map(|category| items_in(category).iter())
}

pub fn find_item(id: &str) -> Option<&'static SurveyItem> {
    all_items().find(|item| item.id == id)
}

pub fn item_count() -> usize {
    AGREEMENT_ITEMS.len() + ACTIVITY_ITEMS.len() + DIFFICULTY_ITEMS.len()
}
