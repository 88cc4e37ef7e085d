//! # Application Layer
//!
//! Orchestration on top of the tool executor: the shadow state, the automode
//! loop, chat sessions and project scaffolding.

pub mod chat;
pub mod engine;
pub mod project;
pub mod state;
