//! Chat-completion client used by the text stages.
//!
//! Provides the [`api::TextGenerator`] seam the pipeline depends on, an
//! OpenAI-compatible HTTP implementation ([`api::ChatApi`]) and the wire
//! types it exchanges.

pub mod api;
pub mod messages;
