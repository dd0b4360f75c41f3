//! Login and signup submission flows.
//!
//! Each flow turns a session-manager result into the single notification
//! banner the user sees. Backend messages win; the fallbacks below only
//! apply when the backend sent an empty message.

#[cfg(test)]
#[path = "forms_test.rs"]
mod forms_test;

use std::fmt;

use crate::api::AuthApi;
use crate::error::NetworkError;
use crate::session::{AuthOutcome, SessionManager};
use crate::storage::KeyValueStore;
use crate::validation::{SignUpForm, ValidationError, sign_in_request};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

/// Notification banner content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Warning, message: message.into() }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
            NoticeKind::Warning => "warning",
        };
        write!(f, "[{label}] {}", self.message)
    }
}

struct Fallbacks {
    success: &'static str,
    failure: &'static str,
}

const SIGN_IN: Fallbacks = Fallbacks { success: "Login successful", failure: "Invalid credentials" };
const SIGN_UP: Fallbacks =
    Fallbacks { success: "Account created successfully", failure: "Signup failed. Please try again." };

/// Submit the login form.
pub async fn submit_sign_in<A: AuthApi, S: KeyValueStore>(
    session: &mut SessionManager<A, S>,
    identifier: &str,
    password: &str,
) -> Notice {
    let result = session.sign_in(sign_in_request(identifier, password)).await;
    notice_for(result, &SIGN_IN)
}

/// Validate and submit the signup form.
///
/// # Errors
///
/// Returns the field errors without contacting the backend when the form is invalid.
pub async fn submit_sign_up<A: AuthApi, S: KeyValueStore>(
    session: &mut SessionManager<A, S>,
    form: &SignUpForm,
) -> Result<Notice, ValidationError> {
    let request = form.validate()?;
    let result = session.sign_up(request).await;
    Ok(notice_for(result, &SIGN_UP))
}

fn notice_for(result: Result<AuthOutcome, NetworkError>, fallbacks: &Fallbacks) -> Notice {
    match result {
        Ok(outcome) if outcome.success => Notice::success(or_fallback(outcome.message, fallbacks.success)),
        Ok(outcome) => Notice::error(or_fallback(outcome.message, fallbacks.failure)),
        Err(e) => Notice::error(e.user_message()),
    }
}

fn or_fallback(message: String, fallback: &str) -> String {
    if message.is_empty() { fallback.to_owned() } else { message }
}
