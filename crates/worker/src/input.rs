//! Event description intake.

use std::io::Read;

use anyhow::{bail, Context};

/// Return the event description from command-line arguments, or from
/// `stdin` when no arguments were given.
///
/// Arguments are joined with single spaces. Surrounding whitespace is
/// trimmed and an empty description is rejected.
pub fn read_event_description<R: Read>(args: &[String], mut stdin: R) -> anyhow::Result<String> {
    let raw = if args.is_empty() {
        let mut buf = String::new();
        stdin
            .read_to_string(&mut buf)
            .context("Failed to read event description from stdin")?;
        buf
    } else {
        args.join(" ")
    };

    let description = raw.trim();
    if description.is_empty() {
        bail!("Event description is empty; pass it as arguments or on stdin");
    }
    Ok(description.to_string())
}

/// [`read_event_description`] run on the blocking thread pool, so a
/// reader such as `stdin` never stalls the runtime.
pub async fn load_event_description<R>(args: Vec<String>, stdin: R) -> anyhow::Result<String>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || read_event_description(&args, stdin))
        .await
        .context("Event description reader task failed")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_are_joined() {
        let args = vec!["Port".to_string(), "workers".to_string(), "strike".to_string()];
        let description = read_event_description(&args, std::io::empty()).unwrap();
        assert_eq!(description, "Port workers strike");
    }

    #[test]
    fn stdin_is_used_without_arguments() {
        let stdin = "  A heatwave hits the city.\n".as_bytes();
        let description = read_event_description(&[], stdin).unwrap();
        assert_eq!(description, "A heatwave hits the city.");
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(read_event_description(&[], "   \n".as_bytes()).is_err());
        assert!(read_event_description(&[" ".to_string()], std::io::empty()).is_err());
    }

    #[tokio::test]
    async fn loading_reads_off_the_runtime() {
        let stdin = std::io::Cursor::new(b"Flood warning upstream\n".to_vec());
        let description = load_event_description(Vec::new(), stdin).await.unwrap();
        assert_eq!(description, "Flood warning upstream");
    }

    #[tokio::test]
    async fn loading_reports_blank_input() {
        let err = load_event_description(Vec::new(), std::io::empty()).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
