//! In-memory fakes shared by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quill_core::config::{AppConfig, GenerationConfig, PollPolicy};
use quill_core::templates::PromptTemplates;
use quill_imagegen::api::{ImageApiError, ImageJobGateway, ImageParams};
use quill_imagegen::messages::{AuditedImage, JobStatus, JobStatusReport};
use quill_llm::api::{LlmApiError, TextGenerator};
use quill_llm::messages::ChatMessage;
use quill_pipeline::orchestrator::PipelineOrchestrator;
use quill_pipeline::storage::LocalImageStore;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Which stage a request came from, recovered from the test templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Themes,
    Copy,
    Prompts,
}

/// Templates whose first word names the stage and whose payload follows `|`.
pub fn test_templates() -> PromptTemplates {
    PromptTemplates {
        theme: "THEMES {count}|{event_description}".into(),
        copy: "COPY {count}|{topic}".into(),
        image_prompt: "PROMPTS {count}|{copy}".into(),
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub stage: Stage,
    pub count: usize,
    pub payload: String,
    pub temperature: f32,
}

type Responder = dyn Fn(Stage, &str) -> Result<String, LlmApiError> + Send + Sync;

/// Text generator answering through a test-supplied closure.
pub struct FakeTextGenerator {
    respond: Box<Responder>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTextGenerator {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(Stage, &str) -> Result<String, LlmApiError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: Stage) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.stage == stage).collect()
    }
}

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmApiError> {
        let prompt = &messages[0].content;
        let (head, payload) = prompt.split_once('|').expect("test template");
        let (word, count) = head.split_once(' ').expect("test template");
        let stage = match word {
            "THEMES" => Stage::Themes,
            "COPY" => Stage::Copy,
            "PROMPTS" => Stage::Prompts,
            other => panic!("unexpected prompt kind {other}"),
        };

        self.calls.lock().unwrap().push(Call {
            stage,
            count: count.parse().expect("numeric count"),
            payload: payload.to_string(),
            temperature,
        });
        (self.respond)(stage, payload)
    }
}

/// Render `items` the way a well-behaved model would: a fenced JSON array.
pub fn fenced(items: &[&str]) -> Result<String, LlmApiError> {
    Ok(format!(
        "```json\n{}\n```",
        serde_json::to_string(items).expect("serializable")
    ))
}

pub fn llm_failure() -> Result<String, LlmApiError> {
    Err(LlmApiError::ApiError {
        status: 500,
        body: "upstream exploded".into(),
    })
}

// ---------------------------------------------------------------------------
// Image service
// ---------------------------------------------------------------------------

/// Image gateway whose behaviour is chosen by keywords in the prompt:
///
/// - `stuck`: never leaves PENDING
/// - `hold`: PENDING until some other job has finished
/// - `noaudit`: SUCCESS with no audited image
/// - `reject`: FAILED
/// - `nosubmit`: submission is refused
/// - anything else: SUCCESS with one audited image
///
/// Jobs count as in flight from submission until a terminal status is
/// reported; `peak_in_flight` keeps the high-water mark.
#[derive(Default)]
pub struct FakeImageGateway {
    jobs: Mutex<HashMap<String, String>>,
    submitted: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    queries: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeImageGateway {
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Prompts of jobs that reached a terminal status, in completion order.
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageJobGateway for FakeImageGateway {
    async fn submit(&self, prompt: &str, _params: &ImageParams) -> Result<String, ImageApiError> {
        if prompt.contains("nosubmit") {
            return Err(ImageApiError::Rejected {
                code: Some(1),
                message: "template disabled".into(),
            });
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(prompt.to_string());
        let id = format!("gen-{}", submitted.len());
        self.jobs.lock().unwrap().insert(id.clone(), prompt.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(id)
    }

    async fn query_status(&self, generate_id: &str) -> Result<JobStatusReport, ImageApiError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let prompt = self
            .jobs
            .lock()
            .unwrap()
            .get(generate_id)
            .cloned()
            .expect("known job");

        let held = prompt.contains("hold") && self.finished.lock().unwrap().is_empty();
        let report = if prompt.contains("stuck") || held {
            JobStatusReport::with_status(JobStatus::Pending)
        } else if prompt.contains("noaudit") {
            JobStatusReport::with_status(JobStatus::Success)
        } else if prompt.contains("reject") {
            JobStatusReport {
                message: Some("content rejected".into()),
                ..JobStatusReport::with_status(JobStatus::Failed)
            }
        } else {
            JobStatusReport {
                image: Some(AuditedImage {
                    url: format!("https://cdn.test/{generate_id}.png"),
                    seed: Some(1234),
                }),
                ..JobStatusReport::with_status(JobStatus::Success)
            }
        };

        if report.status.is_terminal() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().unwrap().push(prompt);
        }
        Ok(report)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ImageApiError> {
        Ok(url.as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub fn generation(topics: usize, copies: usize, prompts: usize, images: usize) -> GenerationConfig {
    GenerationConfig {
        topics_per_event: topics,
        copies_per_topic: copies,
        prompts_per_copy: prompts,
        images_per_copy: images,
        ..GenerationConfig::default()
    }
}

pub fn test_config(generation: GenerationConfig) -> AppConfig {
    AppConfig {
        generation,
        poll: PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 3,
        },
        templates: test_templates(),
        ..AppConfig::default()
    }
}

pub struct Harness {
    pub generator: Arc<FakeTextGenerator>,
    pub gateway: Arc<FakeImageGateway>,
    pub dir: TempDir,
    pub orchestrator: PipelineOrchestrator,
}

pub fn harness<F>(config: AppConfig, respond: F) -> Harness
where
    F: Fn(Stage, &str) -> Result<String, LlmApiError> + Send + Sync + 'static,
{
    let generator = Arc::new(FakeTextGenerator::new(respond));
    let gateway = Arc::new(FakeImageGateway::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(LocalImageStore::new(dir.path().join("images")));

    let orchestrator = PipelineOrchestrator::new(
        generator.clone(),
        gateway.clone(),
        store,
        &config,
    );

    Harness {
        generator,
        gateway,
        dir,
        orchestrator,
    }
}
