//! Engine and provider configuration.

use std::time::Duration;

use fxhistory_common::ProviderId;

/// Frankfurter API configuration.
#[derive(Debug, Clone)]
pub struct FrankfurterConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for FrankfurterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.frankfurter.app".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FrankfurterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("FRANKFURTER_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(secs) = std::env::var("FRANKFURTER_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.timeout = Duration::from_secs(secs);
            }
        }

        config
    }
}

/// Configuration for the history engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Provider used when a request names none or an unknown one.
    pub default_provider: ProviderId,
    /// TTL of per-day records. `None` keeps them forever.
    pub history_ttl: Option<Duration>,
    /// TTL of stored page groups.
    pub page_ttl: Option<Duration>,
    /// Fetch MISS segments concurrently.
    pub parallel_backfill: bool,
    /// Largest accepted range in days.
    pub max_range_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderId::new("frankfurter"),
            history_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            page_ttl: Some(Duration::from_secs(60 * 60)),
            parallel_backfill: true,
            max_range_days: 3660,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("FXHISTORY_DEFAULT_PROVIDER") {
            config.default_provider = ProviderId::new(id);
        }

        if let Ok(hours) = std::env::var("FXHISTORY_HISTORY_TTL_HOURS") {
            if let Ok(hours) = hours.parse::<u64>() {
                config.history_ttl = (hours > 0).then(|| Duration::from_secs(hours * 60 * 60));
            }
        }

        if let Ok(secs) = std::env::var("FXHISTORY_PAGE_TTL_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.page_ttl = (secs > 0).then(|| Duration::from_secs(secs));
            }
        }

        if let Ok(parallel) = std::env::var("FXHISTORY_PARALLEL_BACKFILL") {
            if let Ok(parallel) = parallel.parse() {
                config.parallel_backfill = parallel;
            }
        }

        if let Ok(days) = std::env::var("FXHISTORY_MAX_RANGE_DAYS") {
            if let Ok(days) = days.parse() {
                config.max_range_days = days;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_provider.is_valid() {
            return Err(format!(
                "Default provider id '{}' is not a valid key segment",
                self.default_provider
            ));
        }

        if self.max_range_days == 0 {
            return Err("Max range days cannot be 0".to_string());
        }

        if self.history_ttl == Some(Duration::ZERO) || self.page_ttl == Some(Duration::ZERO) {
            return Err("TTL cannot be zero, use None for no expiry".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_ttl, Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = EngineConfig::default();
        config.max_range_days = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.default_provider = ProviderId::new("bad:id");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frankfurter_default() {
        let config = FrankfurterConfig::default();
        assert!(config.base_url.starts_with("https://"));
        assert!(!config.base_url.ends_with('/'));
    }
}
