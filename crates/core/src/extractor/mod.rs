//! Extractor module: supervises the external media extraction tool.
//!
//! This module provides the `Extractor` trait and the yt-dlp backed
//! implementation. The tool is consumed purely through its command-line
//! contract: given a URL and an output path it either produces exactly one
//! file there and exits 0, or it exits non-zero / writes nothing. The invoker
//! enforces a hard wall-clock deadline and cleans up partial output.
//!
//! # Example
//!
//! ```ignore
//! use vidl_core::extractor::{ExtractorBinding, ExtractorConfig, Extractor, Job, YtDlpExtractor};
//!
//! let config = ExtractorConfig::default();
//! let binding = ExtractorBinding::probe(&config).await?;
//! let extractor = YtDlpExtractor::new(binding, config);
//!
//! let mut job = Job::new(url, Path::new("downloads"));
//! let artifact = extractor.run(&mut job).await?;
//! println!("produced {} ({} bytes)", artifact.path.display(), artifact.size_bytes);
//! ```

mod binding;
mod config;
mod error;
mod traits;
mod types;
mod ytdlp;

pub use binding::ExtractorBinding;
pub use config::ExtractorConfig;
pub use error::ExtractError;
pub use traits::Extractor;
pub use types::{Artifact, Job, JobState};
pub use ytdlp::YtDlpExtractor;
