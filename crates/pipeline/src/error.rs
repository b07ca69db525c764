use quill_core::error::CoreError;
use quill_core::extract::ExtractError;
use quill_imagegen::api::ImageApiError;
use quill_imagegen::job::JobError;
use quill_llm::api::LlmApiError;

/// Failure of one text stage call.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Prompt template error: {0}")]
    Template(#[from] CoreError),

    #[error("Text generation failed: {0}")]
    Generation(#[from] LlmApiError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

/// Failure of one image job, from submission to storage.
#[derive(Debug, thiserror::Error)]
pub enum ImageTaskError {
    #[error("Image submission failed: {0}")]
    Submit(#[source] ImageApiError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Image download failed: {0}")]
    Fetch(#[source] ImageApiError),

    #[error("Image storage failed: {0}")]
    Store(#[from] std::io::Error),
}

impl ImageTaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Job(JobError::Cancelled))
    }
}

/// Errors that end a whole event run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Theme extraction failed")]
    ThemeExtraction(#[source] StageError),

    #[error("Event processing was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn theme_extraction_leaves_the_cause_to_source() {
        let err = PipelineError::ThemeExtraction(StageError::Extraction(ExtractError::NoArray));

        assert_eq!(err.to_string(), "Theme extraction failed");
        let cause = err.source().expect("stage error as source");
        assert_eq!(cause.to_string(), ExtractError::NoArray.to_string());
    }
}
