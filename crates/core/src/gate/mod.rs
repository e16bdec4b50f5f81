//! Request admission: rate limiting, URL validation and sanitization.
//!
//! Every inbound request passes through [`RequestGate::admit`] before any
//! resource is committed. Content rejections (bad scheme, wrong host) still
//! consume a rate-limit slot so a client cannot probe the allow-list for free;
//! a rate-limit rejection itself never double-counts.

mod limiter;
mod sanitize;
mod types;

pub use limiter::RateLimitTable;
pub use sanitize::strip_shell_metacharacters;
pub use types::{Admission, RejectReason};

use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::GateConfig;

/// Validates and rate-limits inbound download requests.
pub struct RequestGate {
    table: RateLimitTable,
    allowed_domains: Vec<String>,
    max_url_len: usize,
}

impl RequestGate {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            table: RateLimitTable::new(
                config.max_requests,
                Duration::from_secs(config.window_secs),
            ),
            allowed_domains: config.allowed_domains.clone(),
            max_url_len: config.max_url_len,
        }
    }

    /// Admit or reject a request for `raw_url` from `client_id`.
    ///
    /// The rate-limit slot is consumed first, so content rejections count
    /// against the window exactly like admissions do.
    pub fn admit(&self, client_id: &str, raw_url: &str) -> Result<Admission, RejectReason> {
        if let Err(retry_after) = self.table.try_acquire(client_id) {
            debug!(client_id, "request rate limited");
            return Err(RejectReason::RateLimited { retry_after });
        }

        if raw_url.len() > self.max_url_len {
            return Err(RejectReason::InvalidUrl);
        }

        let parsed = Url::parse(raw_url).map_err(|_| RejectReason::InvalidUrl)?;

        // Metacharacters are stripped from the normalized serialization and
        // the result re-parsed; the re-parsed URL is the one jobs carry, so
        // nothing downstream ever sees a shell metacharacter.
        let stripped = strip_shell_metacharacters(parsed.as_str());
        let url = Url::parse(&stripped).map_err(|_| RejectReason::InvalidUrl)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RejectReason::InvalidUrl);
        }

        let host = url
            .host_str()
            .ok_or(RejectReason::InvalidUrl)?
            .to_ascii_lowercase();

        if !self.host_allowed(&host) {
            debug!(host, "request for unsupported domain");
            return Err(RejectReason::UnsupportedDomain);
        }

        Ok(Admission {
            command_safe_url: url.as_str().to_string(),
            url,
        })
    }

    /// Drop expired rate-limit entries; called on a timer.
    pub fn purge_expired(&self) -> usize {
        self.table.purge_expired()
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)))
    }
}
