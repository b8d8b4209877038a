//! Application configuration.
//!
//! Every layer has its own config struct with a `Default`; [`AppConfig`]
//! bundles them. [`AppConfig::from_env`] starts from the defaults and
//! overrides from `WAYPOST_*` environment variables.

use std::time::Duration;

use waypost_api::ApiConfig;
use waypost_events::CacheConfig;
use waypost_geo::GeoOptions;
use waypost_launch::VerifierConfig;
use waypost_protocol::DeepLinkConfig;
use waypost_session::SessionConfig;

/// A configuration value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub verifier: VerifierConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub geo: GeoOptions,
    pub deeplink: DeepLinkConfig,

    /// Shared secret the launch payload is signed with. Without it the
    /// payload cannot be verified and protected actions stay blocked.
    pub bot_token: Option<String>,

    /// How long startup waits for the host to install its bridge before
    /// falling back to limited mode. Default: 500 ms.
    pub bridge_wait: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            verifier: VerifierConfig::default(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            geo: GeoOptions::default(),
            deeplink: DeepLinkConfig::default(),
            bot_token: None,
            bridge_wait: Duration::from_millis(500),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment:
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `WAYPOST_BASE_URL` | `api.base_url` |
    /// | `WAYPOST_BOT_TOKEN` | `bot_token` |
    /// | `WAYPOST_MAX_AGE_MINUTES` | `verifier.max_age_minutes` |
    /// | `WAYPOST_DEEPLINK_BASE` | `deeplink.base` |
    ///
    /// # Errors
    /// [`ConfigError`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let lookup = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup("WAYPOST_BASE_URL") {
            config.api.base_url = url;
        }

        if let Some(token) = lookup("WAYPOST_BOT_TOKEN") {
            config.bot_token = Some(token);
        }

        if let Some(value) = lookup("WAYPOST_MAX_AGE_MINUTES") {
            config.verifier.max_age_minutes =
                value.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError {
                    var: "WAYPOST_MAX_AGE_MINUTES",
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
        }

        if let Some(base) = lookup("WAYPOST_DEEPLINK_BASE") {
            config.deeplink.base = base;
        }

        Ok(config)
    }

    /// The shared secret, or `""` when none is configured.
    pub fn secret(&self) -> &str {
        self.bot_token.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.verifier.max_age_minutes, 60);
        assert_eq!(config.session.storage_key, "max_auth_session");
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.bridge_wait, Duration::from_millis(500));
        assert_eq!(config.secret(), "");
    }

    #[test]
    fn test_from_lookup_overrides_fields() {
        let config = AppConfig::from_lookup(lookup(&[
            ("WAYPOST_BASE_URL", "https://api.example.org"),
            ("WAYPOST_BOT_TOKEN", "123:ABC"),
            ("WAYPOST_MAX_AGE_MINUTES", " 15 "),
            ("WAYPOST_DEEPLINK_BASE", "https://max.ru/other_bot"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.example.org");
        assert_eq!(config.secret(), "123:ABC");
        assert_eq!(config.verifier.max_age_minutes, 15);
        assert_eq!(config.deeplink.base, "https://max.ru/other_bot");
    }

    #[test]
    fn test_from_lookup_blank_values_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[("WAYPOST_BOT_TOKEN", "  ")])).unwrap();
        assert_eq!(config.bot_token, None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_number() {
        let err = AppConfig::from_lookup(lookup(&[("WAYPOST_MAX_AGE_MINUTES", "soon")]))
            .unwrap_err();
        assert_eq!(err.var, "WAYPOST_MAX_AGE_MINUTES");
        assert_eq!(err.value, "soon");
    }
}
