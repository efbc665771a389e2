//! HTTP probe layer - one call per tested capability
//!
//! Every call returns a normalized [`ProbeResponse`] or a [`ProbeError`].
//! Connection-level failures surface as `ProbeError::Unreachable` so that the
//! caller can skip a scenario instead of failing it.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Endpoints;
use crate::error::HarnessResult;
use crate::fixtures::TestUser;

/// Longest body excerpt placed in failure messages
pub const EXCERPT_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("service unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProbeError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        // Refused connections and connect timeouts mean the service is not up
        if err.is_connect() || (err.is_timeout() && !err.is_body()) {
            Self::Unreachable {
                url: url.to_string(),
                source: err,
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

pub type ProbeResult = Result<ProbeResponse, ProbeError>;

/// Status, body and headers of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl ProbeResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Body parsed as JSON, if it is JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn excerpt(&self) -> &str {
        excerpt(&self.body)
    }
}

/// First [`EXCERPT_LEN`] characters of `raw`, cut on a char boundary
pub fn excerpt(raw: &str) -> &str {
    match raw.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => &raw[..idx],
        None => raw,
    }
}

/// HTTP client bound to the configured service endpoints
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: Client,
    endpoints: Endpoints,
}

impl ProbeClient {
    pub fn new(endpoints: Endpoints, timeout: Option<Duration>) -> HarnessResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `POST {auth}/v1/usuarios`
    pub async fn register(&self, user: &TestUser) -> ProbeResult {
        let url = format!("{}/usuarios", self.endpoints.auth_api());
        self.send(Method::POST, &url, None, Some(&user.registration_body()))
            .await
    }

    /// `POST {gateway}/api/v1/auth/register`
    pub async fn register_via_gateway(&self, user: &TestUser) -> ProbeResult {
        let url = join(&self.endpoints.gateway, "/api/v1/auth/register");
        self.send(Method::POST, &url, None, Some(&user.registration_body()))
            .await
    }

    /// `POST {auth}/v1/sesiones`
    pub async fn login(&self, username: &str, password: &str) -> ProbeResult {
        let url = format!("{}/sesiones", self.endpoints.auth_api());
        let body = serde_json::json!({ "usuario": username, "clave": password });
        self.send(Method::POST, &url, None, Some(&body)).await
    }

    /// `POST {auth}/v1/codigos`
    pub async fn request_recovery_code(&self, username: &str) -> ProbeResult {
        let url = format!("{}/codigos", self.endpoints.auth_api());
        let body = serde_json::json!({ "usuario": username });
        self.send(Method::POST, &url, None, Some(&body)).await
    }

    /// `GET {auth}/v1/usuarios?page=N`
    pub async fn list_users(&self, token: Option<&str>, page: i64) -> ProbeResult {
        let url = format!("{}/usuarios?page={page}", self.endpoints.auth_api());
        self.send(Method::GET, &url, token, None).await
    }

    /// `DELETE {auth}/v1/usuarios/{username}`
    pub async fn delete_user(&self, token: Option<&str>, username: &str) -> ProbeResult {
        let url = format!("{}/usuarios/{username}", self.endpoints.auth_api());
        self.send(Method::DELETE, &url, token, None).await
    }

    /// `GET {base_uri}{path}`
    pub async fn health(&self, base_uri: &str, path: &str) -> ProbeResult {
        let url = join(base_uri, path);
        self.send(Method::GET, &url, None, None).await
    }

    /// `GET {monitor}/health`
    pub async fn global_health(&self) -> ProbeResult {
        let monitor = self.endpoints.monitor.clone();
        self.health(&monitor, "/health").await
    }

    /// `GET {log_backend}/ready`
    pub async fn log_backend_ready(&self) -> ProbeResult {
        let backend = self.endpoints.log_backend.clone();
        self.health(&backend, "/ready").await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> ProbeResult {
        debug!("{} {}", method, url);

        let mut request: RequestBuilder = self.client.request(method, url);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProbeError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|e| {
            warn!("Failed to read body from {}: {}", url, e);
            ProbeError::from_reqwest(url, e)
        })?;

        debug!("{} -> {}", url, status);
        Ok(ProbeResponse {
            status,
            body,
            headers,
        })
    }
}

fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
