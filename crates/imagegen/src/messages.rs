//! Image service payloads and status parsing.
//!
//! Every response has the envelope `{"code": 0, "msg": "...", "data": {...}}`.
//! A non-zero `code` means the service rejected the call. Job status is
//! reported as a small integer which [`JobStatus::from_code`] maps to a
//! typed state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `auditStatus` value for an image that passed content review.
pub const AUDIT_PASSED: i64 = 3;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of a text-to-image submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest<'a> {
    pub template_uuid: &'a str,
    pub generate_params: GenerateParams<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams<'a> {
    pub prompt: &'a str,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub img_count: u32,
    /// `-1` asks the service for a random seed.
    pub seed: i64,
    pub restore_faces: u8,
}

/// Body of a status query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest<'a> {
    pub generate_uuid: &'a str,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Common response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitData {
    #[serde(default)]
    pub generate_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    #[serde(default)]
    pub generate_status: Option<i64>,
    #[serde(default)]
    pub generate_msg: Option<String>,
    #[serde(default)]
    pub percent_completed: Option<f64>,
    #[serde(default)]
    pub points_cost: Option<f64>,
    #[serde(default)]
    pub account_balance: Option<f64>,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub audit_status: Option<i64>,
}

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle state of a remote image job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Generated,
    Auditing,
    Success,
    Failed,
    /// The service itself gave up on the job.
    Timeout,
}

impl JobStatus {
    /// Map the service's `generateStatus` code. Missing or unknown codes
    /// are treated as [`JobStatus::Failed`].
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Self::Pending,
            Some(2) => Self::Processing,
            Some(3) => Self::Generated,
            Some(4) => Self::Auditing,
            Some(5) => Self::Success,
            Some(7) => Self::Timeout,
            _ => Self::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Generated => "GENERATED",
            Self::Auditing => "AUDITING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image that passed the service audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditedImage {
    pub url: String,
    pub seed: Option<i64>,
}

/// Parsed result of one status query.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusReport {
    pub status: JobStatus,
    pub message: Option<String>,
    pub percent: Option<f64>,
    pub cost: Option<f64>,
    pub balance: Option<f64>,
    /// First image with an audit pass, if any.
    pub image: Option<AuditedImage>,
}

impl JobStatusReport {
    /// A report carrying only a status, for callers that build reports
    /// by hand.
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            message: None,
            percent: None,
            cost: None,
            balance: None,
            image: None,
        }
    }
}

impl From<StatusData> for JobStatusReport {
    fn from(data: StatusData) -> Self {
        let image = data
            .images
            .into_iter()
            .filter(|entry| entry.audit_status == Some(AUDIT_PASSED))
            .find_map(|entry| {
                entry
                    .image_url
                    .filter(|url| !url.is_empty())
                    .map(|url| AuditedImage {
                        url,
                        seed: entry.seed,
                    })
            });

        Self {
            status: JobStatus::from_code(data.generate_status),
            message: data.generate_msg,
            percent: data.percent_completed,
            cost: data.points_cost,
            balance: data.account_balance,
            image,
        }
    }
}
