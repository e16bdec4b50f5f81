//! Scriptable extractor for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::extractor::{Artifact, ExtractError, Extractor, Job, JobState};

/// What the next `run` call should do.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Write `payload` to the job's output path and succeed.
    Succeed { payload: Vec<u8> },
    /// Sleep for `delay`, then write `payload` and succeed. Lets tests hold a
    /// job slot long enough to observe queueing behind the concurrency bound.
    SucceedSlowly { delay: Duration, payload: Vec<u8> },
    /// Fail without producing a file.
    Fail,
    /// Report a deadline kill without producing a file.
    TimeOut,
}

/// Extractor that replays a scripted queue of outcomes.
///
/// Outcomes are consumed in order; once the queue is empty every further
/// call succeeds with a small default payload. Calls are recorded so tests
/// can assert how often and with which URLs the extractor ran.
#[derive(Debug, Default)]
pub struct MockExtractor {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<Url>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for a future `run` call.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// URLs passed to `run`, in call order.
    pub fn calls(&self) -> Vec<Url> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, job: &mut Job) -> Result<Artifact, ExtractError> {
        self.calls.lock().unwrap().push(job.source_url.clone());
        job.state = JobState::Running;

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockOutcome::Succeed {
                payload: b"mock media payload".to_vec(),
            });

        match outcome {
            MockOutcome::Succeed { payload } => write_payload(job, &payload).await,
            MockOutcome::SucceedSlowly { delay, payload } => {
                tokio::time::sleep(delay).await;
                write_payload(job, &payload).await
            }
            MockOutcome::Fail => {
                job.state = JobState::Failed;
                Err(ExtractError::extraction_failed(
                    "scripted failure",
                    Some("ERROR: scripted failure".to_string()),
                ))
            }
            MockOutcome::TimeOut => {
                job.state = JobState::TimedOut;
                Err(ExtractError::Timeout { timeout_secs: 1 })
            }
        }
    }
}

async fn write_payload(job: &mut Job, payload: &[u8]) -> Result<Artifact, ExtractError> {
    if let Some(parent) = job.output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&job.output_path, payload).await?;
    job.state = JobState::Succeeded;
    Ok(Artifact {
        path: job.output_path.clone(),
        size_bytes: payload.len() as u64,
    })
}
