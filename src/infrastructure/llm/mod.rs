//! Language-model client
//!
//! A thin wrapper over the Anthropic Messages API: typed request context,
//! tool definitions, and response blocks split into text and tool uses.

mod client;
pub mod providers;
mod types;

pub use client::Client;

pub use types::{
    ContentPart, Context, Error, Message, Response, ResponseBlock, TokenUsage, ToolSchema,
};
