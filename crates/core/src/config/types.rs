use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::extractor::ExtractorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Request gate configuration: rate limiting and URL admission rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    /// Max admitted requests per client per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Rate limit window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Source domains requests may target (suffix match).
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,
    /// Maximum accepted URL length in bytes.
    #[serde(default = "default_max_url_len")]
    pub max_url_len: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            allowed_domains: default_allowed_domains(),
            max_url_len: default_max_url_len(),
        }
    }
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_allowed_domains() -> Vec<String> {
    [
        "youtube.com",
        "youtu.be",
        "vimeo.com",
        "soundcloud.com",
        "tiktok.com",
        "instagram.com",
        "twitter.com",
        "x.com",
        "facebook.com",
        "twitch.tv",
        "dailymotion.com",
        "reddit.com",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect()
}

fn default_max_url_len() -> usize {
    2048
}

/// Artifact storage and lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Directory holding produced artifacts.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Age after which an artifact not in use is swept, in seconds.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Delay between stream completion and file deletion, in seconds.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
    /// Interval between retention sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Maximum simultaneous extraction processes.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            retention_secs: default_retention_secs(),
            grace_secs: default_grace_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_grace_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_max_concurrent_jobs() -> usize {
    4
}

/// Sanitized config for API responses (filesystem secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub gate: GateConfig,
    pub extractor: SanitizedExtractorConfig,
    pub downloads: DownloadsConfig,
}

/// Sanitized extractor config (cookie file path hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedExtractorConfig {
    pub bin: String,
    pub cookies_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            gate: config.gate.clone(),
            extractor: SanitizedExtractorConfig {
                bin: config.extractor.bin.display().to_string(),
                cookies_configured: config.extractor.cookies_file.is_some(),
                timeout_secs: config.extractor.timeout_secs,
            },
            downloads: config.downloads.clone(),
        }
    }
}
