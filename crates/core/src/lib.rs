pub mod config;
pub mod extractor;
pub mod gate;
pub mod metrics;
pub mod registry;
pub mod sweeper;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DownloadsConfig,
    GateConfig, SanitizedConfig, ServerConfig,
};
pub use extractor::{
    Artifact, ExtractError, Extractor, ExtractorBinding, ExtractorConfig, Job, JobState,
    YtDlpExtractor,
};
pub use gate::{Admission, RejectReason, RequestGate};
pub use registry::{ArtifactRegistry, InUseGuard};
pub use sweeper::{RetentionSweeper, SweepStats};
