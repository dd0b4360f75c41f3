//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const STORAGE_DIR_NAME: &str = "authsession";
const STORAGE_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,
    pub timeouts: Timeouts,
    /// File backing the durable session store.
    pub storage_path: PathBuf,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `AUTH_API_BASE_URL`: default `http://localhost:8000/api`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `AUTH_STORAGE_PATH`: default `<data dir>/authsession/session.json`
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = normalize_base_url(
            &std::env::var("AUTH_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
        );
        let timeouts = Timeouts {
            request_secs: env_parse_u64("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let storage_path = std::env::var_os("AUTH_STORAGE_PATH")
            .filter(|p| !p.is_empty())
            .map_or_else(default_storage_path, PathBuf::from);

        Self { api_base_url, timeouts, storage_path }
    }

    /// Replace the base URL, normalizing it the same way as [`ClientConfig::from_env`].
    #[must_use]
    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = normalize_base_url(url);
        self
    }

    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Per-user data directory, or the working directory when none is known.
fn default_storage_path() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from(format!(".{STORAGE_DIR_NAME}.json")),
        |dir| dir.join(STORAGE_DIR_NAME).join(STORAGE_FILE_NAME),
    )
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
