//! Dashboard view model: the authenticated landing view.
//!
//! SYSTEM CONTEXT
//! ==============
//! On mount it shows the cached profile when one exists and otherwise asks
//! the backend who is signed in. A 401 on that call has already cleared the
//! session by the time the view sees `None`.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::api::AuthApi;
use crate::forms::Notice;
use crate::guard::LOGIN_PATH;
use crate::session::SessionManager;
use crate::storage::KeyValueStore;
use crate::types::UserProfile;

pub const UNAVAILABLE_MESSAGE: &str = "Could not load user information.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardState {
    Ready(UserProfile),
    Unavailable,
}

/// Resolve the profile to display.
pub async fn load<A: AuthApi, S: KeyValueStore>(session: &mut SessionManager<A, S>) -> DashboardState {
    if let Some(user) = session.user() {
        return DashboardState::Ready(user.clone());
    }
    match session.current_user().await {
        Some(user) => DashboardState::Ready(user),
        None => DashboardState::Unavailable,
    }
}

/// Banner to show alongside an unavailable dashboard, if any.
pub fn unavailable_notice<A: AuthApi, S: KeyValueStore>(session: &SessionManager<A, S>) -> Notice {
    if session.is_authenticated() {
        Notice::error(UNAVAILABLE_MESSAGE)
    } else {
        Notice::warning(SESSION_EXPIRED_MESSAGE)
    }
}

/// Labelled profile rows in display order.
#[must_use]
pub fn profile_rows(user: &UserProfile) -> Vec<(&'static str, String)> {
    vec![
        ("Name", user.name.clone()),
        ("Username", user.username.clone()),
        ("Email", user.email.clone()),
        ("Joined", format_joined(&user.created_at)),
    ]
}

/// Sign out and return the banner plus the location to navigate to.
pub async fn logout<A: AuthApi, S: KeyValueStore>(session: &mut SessionManager<A, S>) -> (Notice, &'static str) {
    session.sign_out().await;
    (Notice::success("Logged out successfully"), LOGIN_PATH)
}

/// Format a backend timestamp for display in UTC.
///
/// Accepts RFC 3339 and offset-less ISO-8601 (read as UTC); anything else is
/// returned unchanged.
#[must_use]
pub fn format_joined(created_at: &str) -> String {
    let display = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");

    let parsed = OffsetDateTime::parse(created_at, &Rfc3339)
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .or_else(|_| PrimitiveDateTime::parse(created_at, naive).map(PrimitiveDateTime::assume_utc));
    match parsed.ok().and_then(|dt| dt.format(display).ok()) {
        Some(formatted) => formatted,
        None => created_at.to_owned(),
    }
}
