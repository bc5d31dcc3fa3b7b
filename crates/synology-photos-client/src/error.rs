//! Error types for the Synology Photos client

use std::fmt;

#[derive(Debug)]
pub enum SynologyError {
    Http(Box<reqwest::Error>),
    /// The API answered with `success: false`
    Api { api: String, code: i64 },
    /// A successful response was missing the data we asked for
    MissingData(String),
    Decode(String),
}

impl SynologyError {
    /// Whether the error means our session id is no longer accepted
    pub fn is_session_error(&self) -> bool {
        matches!(self, SynologyError::Api { code, .. } if is_session_code(*code))
    }
}

/// Codes returned when the session id is missing, expired or revoked
pub(crate) fn is_session_code(code: i64) -> bool {
    matches!(code, 105 | 106 | 107 | 119)
}

impl fmt::Display for SynologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynologyError::Http(err) => write!(f, "HTTP error: {}", err),
            SynologyError::Api { api, code } => {
                write!(f, "{} failed with error code {}", api, code)
            }
            SynologyError::MissingData(msg) => write!(f, "Missing data: {}", msg),
            SynologyError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for SynologyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynologyError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SynologyError {
    fn from(err: reqwest::Error) -> Self {
        SynologyError::Http(Box::new(err))
    }
}

impl From<serde_json::Error> for SynologyError {
    fn from(err: serde_json::Error) -> Self {
        SynologyError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SynologyError>;
