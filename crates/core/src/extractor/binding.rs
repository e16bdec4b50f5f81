//! One-time capability probe of the extraction binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::config::ExtractorConfig;
use super::error::ExtractError;

/// An immutable handle to a verified extraction binary.
///
/// Produced once at startup and injected into the invoker, so no per-request
/// probing or mutable global selection happens later.
#[derive(Debug, Clone)]
pub struct ExtractorBinding {
    bin: PathBuf,
    version: String,
}

impl ExtractorBinding {
    /// Probe the configured binary by asking it for its version.
    pub async fn probe(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let output = Command::new(&config.bin)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::BinaryNotFound {
                        path: config.bin.clone(),
                    }
                } else {
                    ExtractError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ExtractError::ProbeFailed {
                reason: format!(
                    "{} --version exited with {:?}",
                    config.bin.display(),
                    output.status.code()
                ),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown")
            .trim()
            .to_string();

        Ok(Self {
            bin: config.bin.clone(),
            version,
        })
    }

    /// Build a binding without probing, for callers that have already
    /// verified the binary (mostly tests).
    pub fn new_unchecked(bin: PathBuf, version: impl Into<String>) -> Self {
        Self {
            bin,
            version: version.into(),
        }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}
