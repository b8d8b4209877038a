//! [`ApiClient`] over HTTP, via `reqwest`.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use waypost_protocol::{EventQuery, MapEventsResponse, SessionGrant, UserId};

use crate::{ApiClient, ApiConfig, ApiError, event_query_pairs, server_message};

/// The production backend client.
///
/// Cheap to share behind an `Arc`: `reqwest::Client` pools connections
/// internally, and the bearer credential lives in a `watch` cell so it can
/// be swapped from `&self` without locking.
pub struct HttpApi {
    client: reqwest::Client,
    config: ApiConfig,
    bearer: watch::Sender<Option<String>>,
}

impl HttpApi {
    /// Builds a client for the given backend.
    ///
    /// # Errors
    /// [`ApiError::Setup`] if the TLS backend can't be initialized.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        let (bearer, _) = watch::channel(None);
        Ok(Self {
            client,
            config,
            bearer,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Whether a bearer credential is currently attached.
    pub fn has_bearer(&self) -> bool {
        self.bearer.borrow().is_some()
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut request = self.client.get(self.config.endpoint(path)).query(query);
        let bearer = self.bearer.borrow().clone();
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%path, error = %e, "backend unreachable");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = server_message(&body)
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            tracing::warn!(%path, status = status.as_u16(), %message, "backend request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl ApiClient for HttpApi {
    async fn create_session(&self, launch: &str) -> Result<SessionGrant, ApiError> {
        self.get("/auth/session", &[("session", launch.to_string())])
            .await
    }

    async fn map_events(&self, query: &EventQuery) -> Result<MapEventsResponse, ApiError> {
        let pairs = event_query_pairs(query, self.config.default_limit);
        self.get("/map/events", &pairs).await
    }

    async fn user_map_events(
        &self,
        user: UserId,
        query: &EventQuery,
    ) -> Result<MapEventsResponse, ApiError> {
        let pairs = event_query_pairs(query, self.config.default_limit);
        self.get(&format!("/map/users/{user}/events"), &pairs).await
    }

    async fn health(&self) -> bool {
        let result = self
            .client
            .get(self.config.endpoint("/health"))
            .timeout(self.config.health_timeout)
            .send()
            .await;

        match result {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    fn set_bearer(&self, token: Option<String>) {
        self.bearer.send_replace(token);
    }
}
