//! # Tools Module
//!
//! In-process file and search tools, confined to the project root and backed
//! by the shadow state.

pub mod executor;
pub mod schema;
