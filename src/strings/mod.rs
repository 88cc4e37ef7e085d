//! # Strings Module
//!
//! Centralizes user-facing strings, prompts and project templates.
//! Keeps tool results, log lines and model instructions consistent.

pub mod logs;
pub mod messages;
pub mod prompts;
pub mod templates;
