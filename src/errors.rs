// src/errors.rs
use thiserror::Error;

use crate::payload::Payload;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Server { status: u16, body: Payload },

    #[error("Max retries reached")]
    MaxRetries,

    #[error("Failed to handle JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid header name: {0}")]
    HeaderName(#[from] reqwest::header::InvalidHeaderName),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command provided. Must be one of {0}")]
    InvalidCommand(String),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl RunnerError {
    /// The HTTP status of a server error, `None` for every other failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            RunnerError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
