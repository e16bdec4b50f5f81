use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

/// One tracked attempt to produce a media artifact for a URL.
///
/// The id namespaces the output file, so no two jobs ever share a path.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source_url: Url,
    pub output_path: PathBuf,
    pub state: JobState,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job for `source_url` with an output path derived
    /// from a fresh id under `artifact_dir`.
    pub fn new(source_url: Url, artifact_dir: &Path) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        let output_path = artifact_dir.join(format!("dl_{}.mp4", id));
        Self {
            id,
            source_url,
            output_path,
            state: JobState::Pending,
            started_at: None,
            deadline: None,
        }
    }
}

/// Job lifecycle: `Pending -> Running -> Succeeded | Failed | TimedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobState {
    pub fn state_type(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

/// A file produced by a successful extraction.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_output_path_derived_from_id() {
        let url = Url::parse("https://www.youtube.com/watch?v=abc").unwrap();
        let job = Job::new(url, Path::new("/tmp/artifacts"));

        assert_eq!(job.state, JobState::Pending);
        let name = job.output_path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, format!("dl_{}.mp4", job.id));
        assert!(job.output_path.starts_with("/tmp/artifacts"));
    }

    #[test]
    fn test_job_ids_are_unique() {
        let url = Url::parse("https://youtu.be/x").unwrap();
        let a = Job::new(url.clone(), Path::new("/tmp"));
        let b = Job::new(url, Path::new("/tmp"));
        assert_ne!(a.id, b.id);
        assert_ne!(a.output_path, b.output_path);
    }

    #[test]
    fn test_state_terminality() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
    }
}
