//! Client-side form validation. Failures here never reach the backend.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{SignInRequest, SignUpRequest};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("static regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("static regex"));

/// Raw sign-up form input as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Username,
    Email,
    Password,
    ConfirmPassword,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// One message per invalid field, in form order.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("form has {} invalid field(s)", .errors.len())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    #[must_use]
    pub fn message_for(&self, field: Field) -> Option<&'static str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

impl SignUpForm {
    /// Validate and trim into a wire request. Passwords are never trimmed.
    ///
    /// # Errors
    ///
    /// Returns every failing field's message when any rule is violated.
    pub fn validate(&self) -> Result<SignUpRequest, ValidationError> {
        let mut errors = Vec::new();
        let mut fail = |field, message| errors.push(FieldError { field, message });

        let name = self.name.trim();
        if name.is_empty() {
            fail(Field::Name, "Name is required");
        }

        let username = self.username.trim();
        if username.is_empty() {
            fail(Field::Username, "Username is required");
        } else if self.username.chars().count() < MIN_USERNAME_LEN {
            fail(Field::Username, "Username must be at least 3 characters");
        } else if !USERNAME_RE.is_match(&self.username) {
            fail(Field::Username, "Username can only contain letters, numbers, and underscores");
        }

        if self.email.is_empty() {
            fail(Field::Email, "Email is required");
        } else if !EMAIL_RE.is_match(&self.email) {
            fail(Field::Email, "Email is invalid");
        }

        if self.password.is_empty() {
            fail(Field::Password, "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            fail(Field::Password, "Password must be at least 8 characters");
        }

        if self.password != self.confirm_password {
            fail(Field::ConfirmPassword, "Passwords do not match");
        }

        if !errors.is_empty() {
            return Err(ValidationError { errors });
        }
        Ok(SignUpRequest {
            name: name.to_owned(),
            username: username.to_owned(),
            email: self.email.trim().to_owned(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        })
    }
}

/// Build sign-in credentials; only the identifier is trimmed.
#[must_use]
pub fn sign_in_request(identifier: &str, password: &str) -> SignInRequest {
    SignInRequest { identifier: identifier.trim().to_owned(), password: password.to_owned() }
}
