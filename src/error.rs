use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The server answered but flagged the request as unsuccessful.
    ///
    /// The auth flags are passed through as the server sent them; acting on
    /// them (redirecting to login, etc.) is up to the caller.
    #[error("request rejected by server: {message}")]
    Rejected {
        message: String,
        login_required: bool,
        signup_confirm_required: bool,
    },

    #[error("listings fetch timed out after {0:?}")]
    Timeout(Duration),

    /// A shared in-flight fetch failed. Every consumer attached to that fetch
    /// receives the same underlying error.
    #[error("listings fetch failed: {0}")]
    Fetch(#[source] Arc<ListingsError>),

    #[error("listings fetch task failed: {0}")]
    TaskFailed(String),

    #[error("invalid route '{0}'")]
    InvalidRoute(String),

    #[error("invalid filters: {0}")]
    InvalidFilters(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ListingsError {
    /// True when the server requires the user to log in or confirm signup
    /// before the request can succeed.
    pub fn requires_auth(&self) -> bool {
        match self {
            ListingsError::Rejected {
                login_required,
                signup_confirm_required,
                ..
            } => *login_required || *signup_confirm_required,
            ListingsError::Fetch(inner) => inner.requires_auth(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ListingsError>;
