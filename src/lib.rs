//! Story markup sanitizer, dialog stack and terminal previewer

pub mod cli;
pub mod config;
pub mod markup;
pub mod story;
pub mod tui;
pub mod version;
