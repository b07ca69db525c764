//! Domain types and pure helpers shared by every Quill crate.
//!
//! This crate has no internal dependencies and performs no I/O. It holds
//! the content data model, immutable configuration, the model-response
//! extractor, request signing, prompt templates and file naming rules.

pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod naming;
pub mod signing;
pub mod templates;
pub mod types;
