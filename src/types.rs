//! Wire DTOs for the auth backend and the cached profile record.
//!
//! DESIGN
//! ======
//! Every backend reply is decoded into one lenient [`ApiEnvelope`]. The
//! `data` payload stays raw JSON until a caller asks for a typed view, so a
//! success body with a broken payload degrades to "no grant" instead of a
//! decode failure for the whole reply.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile of the signed-in user as returned by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    /// ISO-8601 creation timestamp, only parsed for display.
    pub created_at: String,
}

/// Registration payload for `POST /auth/signup`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Credentials for `POST /auth/signin`. `identifier` is an email or a username.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SignInRequest {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInRequest")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Token and profile issued by a successful sign-up or sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserProfile,
}

/// `data` payload of `/auth/me` and `/dashboard`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UserData {
    pub user: UserProfile,
}

/// Dashboard payload returned by `GET /dashboard`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardData {
    pub message: String,
    pub user: UserProfile,
}

/// `data` payload of `GET /health`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Common `{success, message, data}` reply shape.
///
/// Framework-generated failures arrive as `{"detail": ...}` instead, so that
/// field is accepted too.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ApiEnvelope {
    /// Decode a reply body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not a JSON object of this shape.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Typed view of `data`, or `None` when absent or of another shape.
    #[must_use]
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        let data = self.data.as_ref()?;
        serde_json::from_value(data.clone()).ok()
    }

    /// Human-readable message: `message`, else `detail`, else empty.
    #[must_use]
    pub fn message_text(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_owned();
        }
        self.detail.as_ref().map(detail_text).unwrap_or_default()
    }
}

/// Render a `detail` value: plain strings as-is, validation lists as
/// `"<field>: <msg>"` joined by `"; "`.
fn detail_text(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let msg = item.get("msg").and_then(Value::as_str)?;
                let field = item
                    .get("loc")
                    .and_then(Value::as_array)
                    .and_then(|loc| loc.last())
                    .map(|last| match last {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    });
                Some(match field {
                    Some(field) => format!("{field}: {msg}"),
                    None => msg.to_owned(),
                })
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
