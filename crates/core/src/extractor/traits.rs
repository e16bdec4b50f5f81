//! The extractor trait, the seam between the HTTP layer and the external tool.

use async_trait::async_trait;

use super::error::ExtractError;
use super::types::{Artifact, Job};

/// Runs one extraction job to completion.
///
/// Implementations own the full lifecycle of the subprocess: spawn, deadline
/// enforcement, outcome classification and partial-output cleanup. On return
/// the job is in a terminal state and, on success, a readable non-empty file
/// exists at `job.output_path`.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Run the job, updating its state in place.
    async fn run(&self, job: &mut Job) -> Result<Artifact, ExtractError>;
}
