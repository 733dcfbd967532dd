//! Page-level error types

use thiserror::Error;

/// Errors surfaced by the external browser engine.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Input dispatch failed: {0}")]
    InputFailed(String),
}

impl From<PageError> for String {
    fn from(err: PageError) -> String {
        err.to_string()
    }
}
