//! REST transport for the auth backend.
//!
//! ARCHITECTURE
//! ============
//! `AuthApi` is the seam between the session manager and the network: it
//! sends one [`Endpoint`] and hands back the raw status and body. Decoding
//! and the 401 policy live in the session manager, so test doubles only
//! have to script status codes and JSON text.
//!
//! ERROR HANDLING
//! ==============
//! Only failures before a status line is received are errors here. Any HTTP
//! status, including 4xx/5xx, is a successful round trip.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::types::{SignInRequest, SignUpRequest};

/// One backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    SignUp(SignUpRequest),
    SignIn(SignInRequest),
    Logout { token: String },
    Me { token: String },
    Dashboard { token: String },
    Health,
}

impl Endpoint {
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::SignUp(_) | Self::SignIn(_) | Self::Logout { .. } => Method::POST,
            Self::Me { .. } | Self::Dashboard { .. } | Self::Health => Method::GET,
        }
    }

    /// Path relative to the configured base URL.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::SignUp(_) => "/auth/signup",
            Self::SignIn(_) => "/auth/signin",
            Self::Logout { .. } => "/auth/logout",
            Self::Me { .. } => "/auth/me",
            Self::Dashboard { .. } => "/dashboard",
            Self::Health => "/health",
        }
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        match self {
            Self::Logout { token } | Self::Me { token } | Self::Dashboard { token } => Some(token),
            Self::SignUp(_) | Self::SignIn(_) | Self::Health => None,
        }
    }

    fn json_body(&self) -> Option<Result<Value, serde_json::Error>> {
        match self {
            Self::SignUp(request) => Some(serde_json::to_value(request)),
            Self::SignIn(request) => Some(serde_json::to_value(request)),
            Self::Logout { .. } | Self::Me { .. } | Self::Dashboard { .. } | Self::Health => None,
        }
    }
}

/// Status and body text of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Sends auth backend requests.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Perform one round trip.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no HTTP response was received.
    async fn send(&self, endpoint: Endpoint) -> Result<RawReply, TransportError>;
}

#[async_trait::async_trait]
impl<T: AuthApi + ?Sized> AuthApi for Arc<T> {
    async fn send(&self, endpoint: Endpoint) -> Result<RawReply, TransportError> {
        (**self).send(endpoint).await
    }
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// `reqwest`-backed [`AuthApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client for the configured base URL and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn send(&self, endpoint: Endpoint) -> Result<RawReply, TransportError> {
        let mut request = self.http.request(endpoint.method(), self.url(&endpoint));
        if let Some(token) = endpoint.bearer() {
            request = request.bearer_auth(token);
        }
        match endpoint.json_body() {
            Some(body) => {
                let body = body.map_err(|e| TransportError::Request(e.to_string()))?;
                request = request.json(&body);
            }
            None if endpoint.method() == Method::POST => {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            None => {}
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        tracing::debug!(path = endpoint.path(), status, "auth backend replied");
        Ok(RawReply { status, body })
    }
}
