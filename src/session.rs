//! Authentication session manager.
//!
//! ARCHITECTURE
//! ============
//! The manager holds `token` and `user` in memory and mirrors both into a
//! [`KeyValueStore`] on every mutation. It is hydrated from the store once,
//! at construction. `token` alone decides whether the session counts as
//! authenticated.
//!
//! ERROR HANDLING
//! ==============
//! Sign-up/sign-in report backend rejections as `AuthOutcome` and transport
//! or decode failures as `NetworkError`; neither mutates the session. Reads
//! return `None` on failure. Only a 401 from a bearer-authenticated read
//! clears the session; ambiguous failures are logged and leave it alone.
//!
//! TRADE-OFFS
//! ==========
//! Token validity is discovered lazily, on the next 401. There is no retry
//! and no background refresh.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::api::{AuthApi, Endpoint, RawReply};
use crate::error::NetworkError;
use crate::storage::{KeyValueStore, TOKEN_KEY, USER_KEY};
use crate::types::{
    ApiEnvelope, AuthGrant, DashboardData, HealthStatus, SignInRequest, SignUpRequest, UserData, UserProfile,
};

/// Result of a sign-up or sign-in that reached the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOutcome {
    /// True only when a token and profile were adopted into the session.
    pub success: bool,
    /// Backend message, verbatim; empty when the backend sent none.
    pub message: String,
    pub user: Option<UserProfile>,
}

/// Owner of the current authentication token and cached profile.
pub struct SessionManager<A, S> {
    api: A,
    store: S,
    token: Option<String>,
    user: Option<UserProfile>,
}

impl<A: AuthApi, S: KeyValueStore> SessionManager<A, S> {
    /// Construct a manager and hydrate it from `store`.
    ///
    /// A persisted user record that fails to parse is deleted; the persisted
    /// token is kept regardless.
    pub fn new(api: A, store: S) -> Self {
        let token = match store.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted auth token");
                None
            }
        };
        let user = match store.get(USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unparseable persisted user");
                    if let Err(e) = store.remove(USER_KEY) {
                        tracing::warn!(error = %e, "failed to remove persisted user");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted user");
                None
            }
        };
        tracing::debug!(authenticated = token.is_some(), cached_user = user.is_some(), "session hydrated");
        Self { api, store, token, user }
    }

    /// Register a new account and adopt the issued session on success.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] when the backend is unreachable, replies with
    /// a body that is not JSON, or the granted session cannot be persisted.
    pub async fn sign_up(&mut self, request: SignUpRequest) -> Result<AuthOutcome, NetworkError> {
        self.authenticate(Endpoint::SignUp(request)).await
    }

    /// Sign in with an email or username and adopt the issued session on success.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SessionManager::sign_up`].
    pub async fn sign_in(&mut self, request: SignInRequest) -> Result<AuthOutcome, NetworkError> {
        self.authenticate(Endpoint::SignIn(request)).await
    }

    /// Notify the backend (best effort) and clear the session.
    pub async fn sign_out(&mut self) {
        if let Some(token) = self.token.clone() {
            match self.api.send(Endpoint::Logout { token }).await {
                Ok(reply) => tracing::debug!(status = reply.status, "logout acknowledged"),
                Err(e) => tracing::warn!(error = %e, "logout notification failed"),
            }
        }
        self.clear();
    }

    /// Fetch the current profile from the backend, refreshing the cache.
    ///
    /// Returns `None` without a network call when no token is held.
    pub async fn current_user(&mut self) -> Option<UserProfile> {
        let token = self.token.clone()?;
        let envelope = self.authorized_read(Endpoint::Me { token }).await?;
        let Some(UserData { user }) = envelope.data_as::<UserData>() else {
            tracing::warn!("current user reply carried no profile");
            return None;
        };
        self.user = Some(user.clone());
        self.persist_user(&user);
        Some(user)
    }

    /// Fetch protected dashboard data. Same token and 401 policy as
    /// [`SessionManager::current_user`].
    pub async fn dashboard(&mut self) -> Option<DashboardData> {
        let token = self.token.clone()?;
        let envelope = self.authorized_read(Endpoint::Dashboard { token }).await?;
        let Some(data) = envelope.data_as::<UserData>() else {
            tracing::warn!("dashboard reply carried no profile");
            return None;
        };
        Some(DashboardData { message: envelope.message_text(), user: data.user })
    }

    /// Query backend liveness. Does not touch the session.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] on transport failure, a non-2xx status, or a malformed body.
    pub async fn health(&self) -> Result<HealthStatus, NetworkError> {
        let reply = self.api.send(Endpoint::Health).await?;
        let envelope = decode(&reply)?;
        if !reply.is_success() {
            return Err(NetworkError::MalformedBody {
                status: reply.status,
                reason: envelope.message_text(),
            });
        }
        envelope.data_as::<HealthStatus>().ok_or_else(|| NetworkError::MalformedBody {
            status: reply.status,
            reason: "missing health data".to_owned(),
        })
    }

    /// True iff a token is held. Says nothing about its validity on the backend.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Cached profile, possibly stale.
    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn authenticate(&mut self, endpoint: Endpoint) -> Result<AuthOutcome, NetworkError> {
        let path = endpoint.path();
        let reply = self.api.send(endpoint).await.inspect_err(|e| {
            tracing::warn!(path, error = %e, "auth request failed");
        })?;
        let envelope = decode(&reply).inspect_err(|e| {
            tracing::warn!(path, error = %e, "auth reply was not JSON");
        })?;
        let message = envelope.message_text();

        let grant = if reply.is_success() && envelope.success {
            envelope.data_as::<AuthGrant>()
        } else {
            None
        };
        let Some(grant) = grant else {
            tracing::debug!(path, status = reply.status, "auth request rejected");
            return Ok(AuthOutcome { success: false, message, user: None });
        };

        self.adopt(&grant)?;
        tracing::info!(username = %grant.user.username, "session established");
        Ok(AuthOutcome { success: true, message, user: Some(grant.user) })
    }

    /// Send a bearer-authenticated read, clearing the session on 401. Only a
    /// 2xx reply with `success: true` yields an envelope.
    async fn authorized_read(&mut self, endpoint: Endpoint) -> Option<ApiEnvelope> {
        let path = endpoint.path();
        let reply = match self.api.send(endpoint).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(path, error = %e, "authorized read could not reach backend");
                return None;
            }
        };
        if reply.is_unauthorized() {
            tracing::info!(path, "token rejected by backend; clearing session");
            self.clear();
            return None;
        }
        if !reply.is_success() {
            tracing::warn!(path, status = reply.status, "authorized read failed");
            return None;
        }
        match decode(&reply) {
            Ok(envelope) if envelope.success => Some(envelope),
            Ok(envelope) => {
                tracing::warn!(path, message = %envelope.message_text(), "authorized read reported failure");
                None
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "authorized read returned malformed body");
                None
            }
        }
    }

    /// Persist then swap in a granted session. On a storage failure neither
    /// memory nor storage keeps the new session.
    fn adopt(&mut self, grant: &AuthGrant) -> Result<(), NetworkError> {
        let user_json = serde_json::to_string(&grant.user).map_err(|e| NetworkError::MalformedBody {
            status: 200,
            reason: e.to_string(),
        })?;
        let written = self
            .store
            .set(TOKEN_KEY, &grant.access_token)
            .and_then(|()| self.store.set(USER_KEY, &user_json));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to persist session; rolling back");
            self.restore_persisted();
            return Err(e.into());
        }
        self.token = Some(grant.access_token.clone());
        self.user = Some(grant.user.clone());
        Ok(())
    }

    /// Best-effort rewrite of storage to match the current in-memory pair.
    fn restore_persisted(&self) {
        let token = match &self.token {
            Some(token) => self.store.set(TOKEN_KEY, token),
            None => self.store.remove(TOKEN_KEY),
        };
        let user = match &self.user {
            Some(user) => match serde_json::to_string(user) {
                Ok(raw) => self.store.set(USER_KEY, &raw),
                Err(_) => self.store.remove(USER_KEY),
            },
            None => self.store.remove(USER_KEY),
        };
        if let Err(e) = token.and(user) {
            tracing::warn!(error = %e, "failed to restore persisted session");
        }
    }

    fn persist_user(&self, user: &UserProfile) {
        let written = serde_json::to_string(user)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.store.set(USER_KEY, &raw).map_err(|e| e.to_string()));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to persist refreshed user");
        }
    }

    /// Drop token and user together, in memory and in storage.
    fn clear(&mut self) {
        self.token = None;
        self.user = None;
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "failed to remove persisted session key");
            }
        }
    }
}

fn decode(reply: &RawReply) -> Result<ApiEnvelope, NetworkError> {
    ApiEnvelope::parse(&reply.body)
        .map_err(|e| NetworkError::MalformedBody { status: reply.status, reason: e.to_string() })
}
