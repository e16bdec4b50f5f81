use std::time::Duration;
use url::Url;

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// URL failed to parse, used a non-http(s) scheme, or was too long.
    InvalidUrl,
    /// URL parsed but its host is not on the allow-list.
    UnsupportedDomain,
    /// The client exhausted its window.
    RateLimited { retry_after: Duration },
}

impl RejectReason {
    /// Stable reason code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::UnsupportedDomain => "unsupported_domain",
            Self::RateLimited { .. } => "rate_limited",
        }
    }
}

/// An admitted request. `url` is already stripped of shell metacharacters
/// and is what jobs carry; `command_safe_url` is its serialized form.
#[derive(Debug, Clone)]
pub struct Admission {
    pub url: Url,
    pub command_safe_url: String,
}
