//! REST client for the image-generation service.
//!
//! Wraps job submission, status queries and image download using
//! [`reqwest`]. Submission and status calls are signed through an
//! injected [`RequestSigner`]; image downloads go to the CDN URL the
//! service reports and are not signed.

use std::sync::Arc;

use async_trait::async_trait;
use quill_core::config::{join_url, ImageApiConfig};
use quill_core::error::CoreError;
use quill_core::signing::RequestSigner;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::messages::{
    Envelope, GenerateParams, JobStatusReport, StatusData, StatusRequest, SubmitData,
    SubmitRequest,
};

/// Errors from the image service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ImageApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Image API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered 2xx but refused the call (non-zero `code` or
    /// missing payload).
    #[error("Image API rejected the request (code {code:?}): {message}")]
    Rejected { code: Option<i64>, message: String },

    /// The request could not be signed.
    #[error("Request signing failed: {0}")]
    Signing(#[from] CoreError),
}

/// Per-job rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageParams {
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    /// Images requested per job.
    pub img_count: u32,
}

impl ImageParams {
    pub fn new(config: &ImageApiConfig, img_count: u32) -> Self {
        Self {
            steps: config.steps,
            width: config.width,
            height: config.height,
            img_count,
        }
    }
}

/// The three calls the pipeline makes against an image service.
#[async_trait]
pub trait ImageJobGateway: Send + Sync {
    /// Submit a job and return the service-assigned generate id.
    async fn submit(&self, prompt: &str, params: &ImageParams) -> Result<String, ImageApiError>;

    /// Query the current state of a job.
    async fn query_status(&self, generate_id: &str) -> Result<JobStatusReport, ImageApiError>;

    /// Download a finished image.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ImageApiError>;
}

/// HTTP client for a single image service account.
pub struct ImageApi {
    client: reqwest::Client,
    api_base: String,
    submit_path: String,
    status_path: String,
    template_uuid: String,
    signer: Arc<dyn RequestSigner>,
}

impl ImageApi {
    /// Build a client from configuration, applying the request timeout.
    pub fn new(config: &ImageApiConfig, signer: Arc<dyn RequestSigner>) -> Result<Self, ImageApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config, signer))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        config: &ImageApiConfig,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            submit_path: config.submit_path.clone(),
            status_path: config.status_path.clone(),
            template_uuid: config.template_uuid.clone(),
            signer,
        }
    }

    // ---- private helpers ----

    /// POST a JSON body to `path` with signature query parameters and
    /// decode the response envelope.
    async fn signed_post<B, T>(&self, path: &str, body: &B) -> Result<Envelope<T>, ImageApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let signed = self.signer.sign(path)?;
        let response = self
            .client
            .post(join_url(&self.api_base, path))
            .query(&signed.as_query_pairs())
            .json(body)
            .send()
            .await?;

        Ok(Self::ensure_success(response).await?.json().await?)
    }

    /// Return the response unchanged on success, or an
    /// [`ImageApiError::ApiError`] carrying status and body on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ImageApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ImageApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Unwrap `data` from an envelope whose `code` is zero.
    fn accepted<T>(envelope: Envelope<T>) -> Result<T, ImageApiError> {
        match (envelope.code, envelope.data) {
            (Some(0), Some(data)) => Ok(data),
            (code, _) => Err(ImageApiError::Rejected {
                code,
                message: envelope.msg.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl ImageJobGateway for ImageApi {
    async fn submit(&self, prompt: &str, params: &ImageParams) -> Result<String, ImageApiError> {
        let body = SubmitRequest {
            template_uuid: &self.template_uuid,
            generate_params: GenerateParams {
                prompt,
                steps: params.steps,
                width: params.width,
                height: params.height,
                img_count: params.img_count,
                seed: -1,
                restore_faces: 0,
            },
        };

        let envelope: Envelope<SubmitData> = self.signed_post(&self.submit_path, &body).await?;
        let data = Self::accepted(envelope)?;
        data.generate_uuid
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ImageApiError::Rejected {
                code: Some(0),
                message: "response has no generateUuid".into(),
            })
    }

    async fn query_status(&self, generate_id: &str) -> Result<JobStatusReport, ImageApiError> {
        let body = StatusRequest {
            generate_uuid: generate_id,
        };
        let envelope: Envelope<StatusData> = self.signed_post(&self.status_path, &body).await?;
        Ok(Self::accepted(envelope)?.into())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ImageApiError> {
        let response = self.client.get(url).send().await?;
        let bytes = Self::ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
