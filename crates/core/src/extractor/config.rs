//! Configuration for the extractor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp backed extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to the extraction binary.
    #[serde(default = "default_bin")]
    pub bin: PathBuf,

    /// Netscape-format cookies file passed to the tool when present.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Hard wall-clock deadline for a single extraction, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional arguments appended to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_bin() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_timeout() -> u64 {
    1800 // 30 minutes
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            bin: default_bin(),
            cookies_file: None,
            timeout_secs: default_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Creates a new config with a custom binary path.
    pub fn with_bin(bin: PathBuf) -> Self {
        Self {
            bin,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the cookies file.
    pub fn with_cookies_file(mut self, path: PathBuf) -> Self {
        self.cookies_file = Some(path);
        self
    }
}
