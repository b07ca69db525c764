//! Fixed-interval polling of a submitted image job.
//!
//! [`poll_until_terminal`] queries the job status until the service
//! reports a terminal state, the attempt budget runs out, or the
//! [`CancellationToken`] fires. A status query that fails outright
//! (network error, rejection) uses up an attempt but does not end the
//! loop.

use quill_core::config::PollPolicy;
use tokio_util::sync::CancellationToken;

use crate::api::ImageJobGateway;
use crate::messages::{AuditedImage, JobStatus, JobStatusReport};

/// Why a job did not yield an image.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    /// The service reported `FAILED` or its own `TIMEOUT`.
    #[error("Image job ended with status {status}: {message}")]
    Failed { status: JobStatus, message: String },

    /// The job succeeded but no image passed the audit.
    #[error("Image job succeeded but no image passed audit")]
    NoAuditedImage,

    /// The job never reached a terminal state within the poll budget.
    #[error("Image job did not finish after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Image job polling was cancelled")]
    Cancelled,
}

/// Poll `generate_id` until it reaches a terminal state.
///
/// Waits `policy.interval` between attempts; no wait follows the final
/// attempt.
pub async fn poll_until_terminal<G>(
    gateway: &G,
    generate_id: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<AuditedImage, JobError>
where
    G: ImageJobGateway + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        match gateway.query_status(generate_id).await {
            Ok(report) if report.status.is_terminal() => {
                return finish(generate_id, attempt, report);
            }
            Ok(report) => {
                tracing::debug!(
                    generate_id,
                    attempt,
                    status = %report.status,
                    percent = report.percent,
                    "Image job in progress",
                );
            }
            Err(e) => {
                tracing::warn!(generate_id, attempt, error = %e, "Status query failed");
            }
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(JobError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    tracing::warn!(
        generate_id,
        attempts = policy.max_attempts,
        "Image job timed out",
    );
    Err(JobError::Timeout {
        attempts: policy.max_attempts,
    })
}

/// Turn a terminal status report into the job's outcome.
fn finish(generate_id: &str, attempt: u32, report: JobStatusReport) -> Result<AuditedImage, JobError> {
    if report.status != JobStatus::Success {
        let message = report.message.unwrap_or_default();
        tracing::warn!(generate_id, status = %report.status, message = %message, "Image job failed");
        return Err(JobError::Failed {
            status: report.status,
            message,
        });
    }

    let Some(image) = report.image else {
        tracing::warn!(generate_id, "Job succeeded without an audited image");
        return Err(JobError::NoAuditedImage);
    };
    tracing::info!(
        generate_id,
        attempt,
        cost = report.cost,
        balance = report.balance,
        "Image job succeeded",
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::api::{ImageApiError, ImageParams};

    /// Gateway that replays scripted status results, then reports PENDING.
    struct ScriptedGateway {
        script: Mutex<VecDeque<Result<JobStatusReport, ImageApiError>>>,
        queries: AtomicU32,
    }

    impl ScriptedGateway {
        fn new(script: Vec<Result<JobStatusReport, ImageApiError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                queries: AtomicU32::new(0),
            }
        }

        fn queries(&self) -> u32 {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageJobGateway for ScriptedGateway {
        async fn submit(&self, _: &str, _: &ImageParams) -> Result<String, ImageApiError> {
            Ok("gen-1".into())
        }

        async fn query_status(&self, _: &str) -> Result<JobStatusReport, ImageApiError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(JobStatusReport::with_status(JobStatus::Pending)))
        }

        async fn fetch_image(&self, _: &str) -> Result<Vec<u8>, ImageApiError> {
            Ok(vec![])
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    fn status(status: JobStatus) -> Result<JobStatusReport, ImageApiError> {
        Ok(JobStatusReport::with_status(status))
    }

    fn success_with_image() -> Result<JobStatusReport, ImageApiError> {
        Ok(JobStatusReport {
            image: Some(AuditedImage {
                url: "https://cdn/a.png".into(),
                seed: Some(9),
            }),
            ..JobStatusReport::with_status(JobStatus::Success)
        })
    }

    #[tokio::test]
    async fn progresses_through_states_to_success() {
        let gateway = ScriptedGateway::new(vec![
            status(JobStatus::Pending),
            status(JobStatus::Processing),
            status(JobStatus::Auditing),
            success_with_image(),
        ]);

        let image = poll_until_terminal(&gateway, "gen-1", &policy(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(image.url, "https://cdn/a.png");
        assert_eq!(gateway.queries(), 4);
    }

    #[tokio::test]
    async fn never_finishing_job_times_out_after_budget() {
        let gateway = ScriptedGateway::new(vec![]);

        let err = poll_until_terminal(&gateway, "gen-1", &policy(3), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, JobError::Timeout { attempts: 3 });
        assert_eq!(gateway.queries(), 3);
    }

    #[tokio::test]
    async fn failed_status_is_terminal() {
        let gateway = ScriptedGateway::new(vec![
            status(JobStatus::Processing),
            Ok(JobStatusReport {
                message: Some("nsfw".into()),
                ..JobStatusReport::with_status(JobStatus::Failed)
            }),
        ]);

        let err = poll_until_terminal(&gateway, "gen-1", &policy(10), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(err, JobError::Failed { status: JobStatus::Failed, message } if message == "nsfw");
        assert_eq!(gateway.queries(), 2);
    }

    #[tokio::test]
    async fn service_timeout_is_a_failure() {
        let gateway = ScriptedGateway::new(vec![status(JobStatus::Timeout)]);

        let err = poll_until_terminal(&gateway, "gen-1", &policy(10), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_matches!(err, JobError::Failed { status: JobStatus::Timeout, .. });
    }

    #[tokio::test]
    async fn success_without_audited_image_fails() {
        let gateway = ScriptedGateway::new(vec![status(JobStatus::Success)]);

        let err = poll_until_terminal(&gateway, "gen-1", &policy(10), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, JobError::NoAuditedImage);
    }

    #[tokio::test]
    async fn query_errors_use_attempts_but_polling_continues() {
        let gateway = ScriptedGateway::new(vec![
            Err(ImageApiError::Rejected {
                code: Some(1),
                message: "busy".into(),
            }),
            success_with_image(),
        ]);

        let result =
            poll_until_terminal(&gateway, "gen-1", &policy(2), &CancellationToken::new()).await;
        assert!(result.is_ok());

        let failing = ScriptedGateway::new(vec![
            Err(ImageApiError::Rejected {
                code: Some(1),
                message: "busy".into(),
            }),
            Err(ImageApiError::Rejected {
                code: Some(1),
                message: "busy".into(),
            }),
        ]);
        let err = poll_until_terminal(&failing, "gen-1", &policy(2), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, JobError::Timeout { attempts: 2 });
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_query() {
        let gateway = ScriptedGateway::new(vec![success_with_image()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poll_until_terminal(&gateway, "gen-1", &policy(10), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, JobError::Cancelled);
        assert_eq!(gateway.queries(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_wait() {
        let gateway = ScriptedGateway::new(vec![]);
        let cancel = CancellationToken::new();
        let slow = PollPolicy {
            interval: Duration::from_secs(3600),
            max_attempts: 5,
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = poll_until_terminal(&gateway, "gen-1", &slow, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, JobError::Cancelled);
        assert_eq!(gateway.queries(), 1);
    }
}
