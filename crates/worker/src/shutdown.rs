//! Cancellation triggers for a run: Ctrl-C, SIGTERM and an optional
//! wall-clock deadline all cancel the same token.

use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Environment variable holding the optional per-event deadline.
pub const DEADLINE_ENV: &str = "QUILL_EVENT_DEADLINE_SECS";

/// Parse a deadline in whole seconds. Unset or blank means no deadline.
pub fn parse_deadline(value: Option<String>) -> anyhow::Result<Option<Duration>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{DEADLINE_ENV} must be a whole number of seconds, got '{raw}'"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
    }
}

/// Spawn a task that cancels `cancel` on the first termination signal or
/// when `deadline` elapses. Abort the returned handle once the run is over.
pub fn spawn_cancel_triggers(cancel: CancellationToken, deadline: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let deadline = async move {
            match deadline {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = termination_signal() => {
                tracing::warn!("Termination signal received, cancelling event");
            }
            () = deadline => {
                tracing::warn!("Event deadline reached, cancelling event");
            }
            () = cancel.cancelled() => return,
        }
        cancel.cancel();
    })
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_is_optional() {
        assert_eq!(parse_deadline(None).unwrap(), None);
        assert_eq!(parse_deadline(Some("  ".into())).unwrap(), None);
        assert_eq!(
            parse_deadline(Some("90".into())).unwrap(),
            Some(Duration::from_secs(90))
        );
    }

    #[test]
    fn malformed_deadline_names_the_variable() {
        let err = parse_deadline(Some("soon".into())).unwrap_err();
        assert!(err.to_string().contains(DEADLINE_ENV));
    }

    #[tokio::test]
    async fn deadline_cancels_the_token() {
        let cancel = CancellationToken::new();
        let handle = spawn_cancel_triggers(cancel.clone(), Some(Duration::from_millis(10)));

        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("deadline should cancel the token");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn trigger_exits_when_token_is_cancelled_elsewhere() {
        let cancel = CancellationToken::new();
        let handle = spawn_cancel_triggers(cancel.clone(), None);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("trigger task should finish")
            .unwrap();
    }
}
