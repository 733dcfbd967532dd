//! Journey error taxonomy.
//!
//! A target that is simply not found is NOT an error - it is a successful
//! run with a negative outcome and never appears here.

use thiserror::Error;

/// Errors that can end a journey attempt or a job.
#[derive(Error, Debug)]
pub enum JourneyError {
    /// Deadline exceeded. Always recorded, never retried within the same
    /// attempt.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Solvable challenge that stayed unresolved; triggers the
    /// fresh-identity retry loop.
    #[error("CAPTCHA challenge: {0}")]
    CaptchaChallenge(String),

    /// Challenge page with no solvable widget. The identity is burned and
    /// must be rotated, not "solved".
    #[error("Egress IP blocked: {0}")]
    IpBlocked(String),

    /// Selector/navigation failure during scanning.
    #[error("Transient navigation failure: {0}")]
    TransientNavigation(String),

    /// Session could not be created; fatal for this attempt.
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    /// Writing the result failed. Logged locally, never thrown back into
    /// the execution path.
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl JourneyError {
    /// Whether this failure invalidates the whole identity and should be
    /// retried with a fresh session.
    pub fn is_captcha_flag(&self) -> bool {
        matches!(self, JourneyError::CaptchaChallenge(_) | JourneyError::IpBlocked(_))
    }
}

impl From<crate::engine::PageError> for JourneyError {
    fn from(err: crate::engine::PageError) -> Self {
        JourneyError::TransientNavigation(err.to_string())
    }
}

impl From<crate::captcha::CaptchaError> for JourneyError {
    fn from(err: crate::captcha::CaptchaError) -> Self {
        JourneyError::CaptchaChallenge(err.to_string())
    }
}
