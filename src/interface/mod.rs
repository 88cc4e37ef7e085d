//! # Interface Layer
//!
//! The HTTP surface: axum routes, error mapping and the automode SSE stream.

pub mod error;
pub mod http;
mod sse;
