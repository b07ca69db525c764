//! Client for the remote image-generation service.
//!
//! Provides typed request/response payloads, the signed HTTP gateway
//! ([`api::ImageApi`]) behind the [`api::ImageJobGateway`] trait, and the
//! cancellable status-polling loop that drives a job to completion.

pub mod api;
pub mod job;
pub mod messages;
