//! Terminal front end: conversation transcript, survey prompts, and results.

pub mod render;
pub mod survey;
pub mod terminal;
