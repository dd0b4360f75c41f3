//! Route guard for protected views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected routes apply identical unauthenticated redirect behavior. The
//! decision only checks that a token is held; an expired token is caught
//! later when the view's first authorized read gets a 401.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use crate::api::AuthApi;
use crate::session::SessionManager;
use crate::storage::KeyValueStore;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Outcome of guarding a protected location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Replace the current location with `to`, remembering where the visitor came from.
    Redirect { to: &'static str, from: String },
}

/// Grant `location` when a token is held, else redirect to the login view.
pub fn require_auth<A: AuthApi, S: KeyValueStore>(session: &SessionManager<A, S>, location: &str) -> Access {
    if session.is_authenticated() {
        Access::Granted
    } else {
        tracing::debug!(location, "unauthenticated visit; redirecting to login");
        Access::Redirect { to: LOGIN_PATH, from: location.to_owned() }
    }
}
