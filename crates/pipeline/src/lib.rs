//! Event-to-content generation pipeline.
//!
//! Turns a free-text event into themes, copy, image prompts and finished
//! images. The three text stages call a [`quill_llm::api::TextGenerator`];
//! the image stage drives a [`quill_imagegen::api::ImageJobGateway`] and
//! writes results through an [`storage::ImageStore`]. The
//! [`orchestrator::PipelineOrchestrator`] fans work out across branches
//! and isolates per-branch failures.

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod stages;
pub mod storage;
