//! Bridge between the terminal UI thread and the experiment controller runtime.

pub mod commands;
pub mod runtime;
