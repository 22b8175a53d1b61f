//! Search Errors
//!
//! Error taxonomy for the search job protocol. Every protocol call returns
//! one of these as a tagged result.

use thiserror::Error;

/// Errors surfaced by the search job protocol
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// Network failure, malformed response, or a non-2xx status on a job call
    #[error("{}", transport_message(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Search job could not be created
    #[error("Search job submission failed: {0}")]
    Submission(String),

    #[error("Search job {id} was cancelled")]
    Cancelled { id: String },

    #[error("Search job {id} did not finish after {attempts} status checks")]
    Timeout { id: String, attempts: u32 },

    /// Best-effort delete failed after another error; never returned in place of it
    #[error("Failed to delete search job {id}: {message}")]
    Cleanup { id: String, message: String },
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("API error ({}): {}", code, message),
        None => format!("Request failed: {}", message),
    }
}

impl SearchError {
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn http<T: Into<String>>(status: u16, message: T) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Remote system no longer knows the job; callers must not retry
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Transport { status: Some(404), .. })
    }
}
