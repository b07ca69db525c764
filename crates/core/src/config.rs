//! Immutable run configuration.
//!
//! [`AppConfig`] is built once at startup (normally via
//! [`AppConfig::from_env`]) and handed to the gateways and the
//! orchestrator. Nothing here touches the filesystem; output directories
//! are created lazily by the writers that need them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;
use crate::templates::PromptTemplates;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Themes requested per event.
pub const DEFAULT_TOPICS_PER_EVENT: usize = 3;
/// Copies requested per theme.
pub const DEFAULT_COPIES_PER_TOPIC: usize = 5;
/// Image prompts requested per copy.
pub const DEFAULT_PROMPTS_PER_COPY: usize = 3;
/// Prompts consumed by the image stage per copy.
pub const DEFAULT_IMAGES_PER_COPY: usize = 3;
/// `imgCount` sent with each image job.
pub const DEFAULT_IMAGES_PER_PROMPT: u32 = 1;

/// Seconds between two status polls of one image job.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Status polls before an image job is declared timed out.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// Image batches allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;
/// Upper bound accepted for `max_concurrent_batches`.
pub const MAX_CONCURRENT_BATCHES_LIMIT: usize = 1024;

const DEFAULT_LLM_API_BASE: &str = "https://api.deepseek.com";
const DEFAULT_LLM_COMPLETIONS_PATH: &str = "/chat/completions";
const DEFAULT_LLM_MODEL: &str = "deepseek-reasoner";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 180;

const DEFAULT_IMAGE_API_BASE: &str = "https://openapi.liblibai.cloud";
const DEFAULT_IMAGE_SUBMIT_PATH: &str = "/api/generate/webui/text2img";
const DEFAULT_IMAGE_STATUS_PATH: &str = "/api/generate/webui/status";
const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IMAGE_STEPS: u32 = 20;
const DEFAULT_IMAGE_SIZE: u32 = 1024;

const DEFAULT_OUTPUT_DIR: &str = "output";

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Fan-out counts and sampling temperatures for the text stages.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub topics_per_event: usize,
    pub copies_per_topic: usize,
    /// Prompts requested from the prompt stage for each copy.
    pub prompts_per_copy: usize,
    /// Upper bound on prompts actually rendered for each copy.
    pub images_per_copy: usize,
    pub images_per_prompt: u32,
    pub theme_temperature: f32,
    pub copy_temperature: f32,
    pub prompt_temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            topics_per_event: DEFAULT_TOPICS_PER_EVENT,
            copies_per_topic: DEFAULT_COPIES_PER_TOPIC,
            prompts_per_copy: DEFAULT_PROMPTS_PER_COPY,
            images_per_copy: DEFAULT_IMAGES_PER_COPY,
            images_per_prompt: DEFAULT_IMAGES_PER_PROMPT,
            theme_temperature: 0.7,
            copy_temperature: 0.8,
            prompt_temperature: 0.7,
        }
    }
}

/// Fixed-interval polling policy for image jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Bounds on concurrent work across independent branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    pub max_concurrent_batches: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
        }
    }
}

// ---------------------------------------------------------------------------
// External services
// ---------------------------------------------------------------------------

/// Chat-completion service settings.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    pub api_base: String,
    pub completions_path: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl LlmConfig {
    /// Full URL of the completions endpoint.
    pub fn endpoint(&self) -> String {
        join_url(&self.api_base, &self.completions_path)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_LLM_API_BASE.into(),
            completions_path: DEFAULT_LLM_COMPLETIONS_PATH.into(),
            api_key: String::new(),
            model: DEFAULT_LLM_MODEL.into(),
            request_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("completions_path", &self.completions_path)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Image-generation service settings.
#[derive(Clone, PartialEq)]
pub struct ImageApiConfig {
    pub api_base: String,
    pub submit_path: String,
    pub status_path: String,
    pub access_key: String,
    pub secret_key: String,
    /// Parameter template the service renders every job with.
    pub template_uuid: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub request_timeout: Duration,
}

impl Default for ImageApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_IMAGE_API_BASE.into(),
            submit_path: DEFAULT_IMAGE_SUBMIT_PATH.into(),
            status_path: DEFAULT_IMAGE_STATUS_PATH.into(),
            access_key: String::new(),
            secret_key: String::new(),
            template_uuid: String::new(),
            steps: DEFAULT_IMAGE_STEPS,
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            request_timeout: Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for ImageApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageApiConfig")
            .field("api_base", &self.api_base)
            .field("submit_path", &self.submit_path)
            .field("status_path", &self.status_path)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("template_uuid", &self.template_uuid)
            .field("steps", &self.steps)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Where images, result documents and run logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub images_dir: PathBuf,
    pub results_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl OutputConfig {
    /// Standard layout under a single output root.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            images_dir: root.join("images"),
            results_dir: root.join("logs"),
            log_dir: root.join("logs"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::under(DEFAULT_OUTPUT_DIR)
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one worker process.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub poll: PollPolicy,
    pub concurrency: ConcurrencyConfig,
    pub llm: LlmConfig,
    pub image_api: ImageApiConfig,
    pub output: OutputConfig,
    pub templates: PromptTemplates,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    ///
    /// | Env Var                        | Default                          |
    /// |--------------------------------|----------------------------------|
    /// | `QUILL_TOPICS_PER_EVENT`       | `3`                              |
    /// | `QUILL_COPIES_PER_TOPIC`       | `5`                              |
    /// | `QUILL_PROMPTS_PER_COPY`       | `3`                              |
    /// | `QUILL_IMAGES_PER_COPY`        | `3`                              |
    /// | `QUILL_IMAGES_PER_PROMPT`      | `1`                              |
    /// | `QUILL_POLL_INTERVAL_SECS`     | `5`                              |
    /// | `QUILL_POLL_MAX_ATTEMPTS`      | `60`                             |
    /// | `QUILL_MAX_CONCURRENT_BATCHES` | `4`                              |
    /// | `QUILL_OUTPUT_DIR`             | `output`                         |
    /// | `LLM_API_BASE`                 | `https://api.deepseek.com`       |
    /// | `LLM_COMPLETIONS_PATH`         | `/chat/completions`              |
    /// | `LLM_API_KEY`                  | -- (required)                    |
    /// | `LLM_MODEL`                    | `deepseek-reasoner`              |
    /// | `LLM_TIMEOUT_SECS`             | `180`                            |
    /// | `IMAGE_API_BASE`               | `https://openapi.liblibai.cloud` |
    /// | `IMAGE_API_SUBMIT_PATH`        | `/api/generate/webui/text2img`   |
    /// | `IMAGE_API_STATUS_PATH`        | `/api/generate/webui/status`     |
    /// | `IMAGE_API_ACCESS_KEY`         | -- (required)                    |
    /// | `IMAGE_API_SECRET_KEY`         | -- (required)                    |
    /// | `IMAGE_API_TEMPLATE_UUID`      | -- (required)                    |
    /// | `IMAGE_API_TIMEOUT_SECS`       | `30`                             |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to defaults; present keys that fail to parse
    /// are reported as [`CoreError::Config`]. The result is validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gen_defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            topics_per_event: parse_or(&lookup, "QUILL_TOPICS_PER_EVENT", gen_defaults.topics_per_event)?,
            copies_per_topic: parse_or(&lookup, "QUILL_COPIES_PER_TOPIC", gen_defaults.copies_per_topic)?,
            prompts_per_copy: parse_or(&lookup, "QUILL_PROMPTS_PER_COPY", gen_defaults.prompts_per_copy)?,
            images_per_copy: parse_or(&lookup, "QUILL_IMAGES_PER_COPY", gen_defaults.images_per_copy)?,
            images_per_prompt: parse_or(&lookup, "QUILL_IMAGES_PER_PROMPT", gen_defaults.images_per_prompt)?,
            ..gen_defaults
        };

        let poll = PollPolicy {
            interval: Duration::from_secs(parse_or(
                &lookup,
                "QUILL_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            max_attempts: parse_or(&lookup, "QUILL_POLL_MAX_ATTEMPTS", DEFAULT_POLL_MAX_ATTEMPTS)?,
        };

        let concurrency = ConcurrencyConfig {
            max_concurrent_batches: parse_or(
                &lookup,
                "QUILL_MAX_CONCURRENT_BATCHES",
                DEFAULT_MAX_CONCURRENT_BATCHES,
            )?,
        };

        let llm = LlmConfig {
            api_base: string_or(&lookup, "LLM_API_BASE", DEFAULT_LLM_API_BASE),
            completions_path: string_or(&lookup, "LLM_COMPLETIONS_PATH", DEFAULT_LLM_COMPLETIONS_PATH),
            api_key: string_or(&lookup, "LLM_API_KEY", ""),
            model: string_or(&lookup, "LLM_MODEL", DEFAULT_LLM_MODEL),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
        };

        let image_api = ImageApiConfig {
            api_base: string_or(&lookup, "IMAGE_API_BASE", DEFAULT_IMAGE_API_BASE),
            submit_path: string_or(&lookup, "IMAGE_API_SUBMIT_PATH", DEFAULT_IMAGE_SUBMIT_PATH),
            status_path: string_or(&lookup, "IMAGE_API_STATUS_PATH", DEFAULT_IMAGE_STATUS_PATH),
            access_key: string_or(&lookup, "IMAGE_API_ACCESS_KEY", ""),
            secret_key: string_or(&lookup, "IMAGE_API_SECRET_KEY", ""),
            template_uuid: string_or(&lookup, "IMAGE_API_TEMPLATE_UUID", ""),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "IMAGE_API_TIMEOUT_SECS",
                DEFAULT_IMAGE_TIMEOUT_SECS,
            )?),
            ..ImageApiConfig::default()
        };

        let output = OutputConfig::under(string_or(&lookup, "QUILL_OUTPUT_DIR", DEFAULT_OUTPUT_DIR));

        let config = Self {
            generation,
            poll,
            concurrency,
            llm,
            image_api,
            output,
            templates: PromptTemplates::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), CoreError> {
        let g = &self.generation;
        require_positive("copies_per_topic", g.copies_per_topic)?;
        require_positive("prompts_per_copy", g.prompts_per_copy)?;
        require_positive("images_per_copy", g.images_per_copy)?;
        require_positive("images_per_prompt", g.images_per_prompt as usize)?;
        require_positive("poll.max_attempts", self.poll.max_attempts as usize)?;
        require_positive(
            "concurrency.max_concurrent_batches",
            self.concurrency.max_concurrent_batches,
        )?;
        if self.concurrency.max_concurrent_batches > MAX_CONCURRENT_BATCHES_LIMIT {
            return Err(CoreError::Validation(format!(
                "concurrency.max_concurrent_batches must be at most {MAX_CONCURRENT_BATCHES_LIMIT}"
            )));
        }

        require_non_empty("LLM_API_KEY", &self.llm.api_key)?;
        require_non_empty("IMAGE_API_ACCESS_KEY", &self.image_api.access_key)?;
        require_non_empty("IMAGE_API_SECRET_KEY", &self.image_api.secret_key)?;
        require_non_empty("IMAGE_API_TEMPLATE_UUID", &self.image_api.template_uuid)?;

        self.templates.validate()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn string_or<F>(lookup: &F, var: &'static str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| CoreError::Config {
            var,
            message: format!("'{v}': {e}"),
        }),
    }
}

fn require_positive(field: &str, value: usize) -> Result<(), CoreError> {
    if value == 0 {
        return Err(CoreError::Validation(format!("{field} must be greater than zero")));
    }
    Ok(())
}

fn require_non_empty(var: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{var} must be set")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
