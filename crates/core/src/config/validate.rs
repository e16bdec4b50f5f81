use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Rate limit and window are non-zero
/// - Domain allow-list is non-empty
/// - Extraction timeout and job cap are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.gate.max_requests == 0 {
        return Err(ConfigError::ValidationError(
            "gate.max_requests cannot be 0".to_string(),
        ));
    }

    if config.gate.window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "gate.window_secs cannot be 0".to_string(),
        ));
    }

    if config.gate.allowed_domains.is_empty() {
        return Err(ConfigError::ValidationError(
            "gate.allowed_domains cannot be empty".to_string(),
        ));
    }

    if config.extractor.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "extractor.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.downloads.max_concurrent_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.max_concurrent_jobs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_rate_limit_fails() {
        let mut config = Config::default();
        config.gate.max_requests = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_allow_list_fails() {
        let mut config = Config::default();
        config.gate.allowed_domains.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_job_cap_fails() {
        let mut config = Config::default();
        config.downloads.max_concurrent_jobs = 0;
        assert!(validate_config(&config).is_err());
    }
}
