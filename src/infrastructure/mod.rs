//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (`LlmProvider`, `SearchProvider`)
//! and owns the sandboxed tool executor.

pub mod llm;
pub mod search;
pub mod tools;
