use std::time::Duration;

/// How to reach the backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme, host and optional path prefix, e.g. `https://api.example.org`.
    pub base_url: String,
    /// Per-request timeout. Default: 30 seconds.
    pub timeout: Duration,
    /// Timeout of the `/health` probe. Default: 5 seconds.
    pub health_timeout: Duration,
    /// `limit` sent when a query doesn't set one. Default: 50.
    pub default_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
            default_limit: 50,
        }
    }
}

impl ApiConfig {
    /// Default config pointed at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Joins the base URL and an absolute endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ApiConfig::with_base_url("https://api.example.org/v1/");
        assert_eq!(
            config.endpoint("/map/events"),
            "https://api.example.org/v1/map/events"
        );
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.health_timeout, Duration::from_secs(5));
        assert_eq!(config.default_limit, 50);
    }
}
