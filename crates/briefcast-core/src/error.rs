//! Briefcast error taxonomy.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BriefcastError>;

/// Top-level error type shared across all Briefcast crates.
#[derive(Error, Debug)]
pub enum BriefcastError {
    #[error("Config error: {0}")]
    Config(String),

    /// A schedule time string could not be parsed as 24-hour HH:MM.
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// A tenant cannot be started because it lacks required credentials.
    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// Every content source failed or returned nothing.
    #[error("No content available from any source")]
    NoContentAvailable,

    /// Structured model output could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Content generation exhausted its retry budget.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Chart rendering failed (never fatal to a run).
    #[error("Render error: {0}")]
    Render(String),

    #[error("History error: {0}")]
    History(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl BriefcastError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

/// Failure of a single publish attempt, scoped to one platform.
///
/// Never aborts the surrounding run; the coordinator records it and moves
/// on to the next platform.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// Credentials rejected (401/403).
    Auth,
    /// Rate limited (429).
    RateLimit,
    /// Platform-side failure (5xx).
    Server,
    Other,
}

impl std::fmt::Display for PlatformErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformErrorKind::Auth => write!(f, "auth"),
            PlatformErrorKind::RateLimit => write!(f, "rate-limit"),
            PlatformErrorKind::Server => write!(f, "server"),
            PlatformErrorKind::Other => write!(f, "other"),
        }
    }
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify an HTTP status code into a platform error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => PlatformErrorKind::Auth,
            429 => PlatformErrorKind::RateLimit,
            500..=599 => PlatformErrorKind::Server,
            _ => PlatformErrorKind::Other,
        };
        Self::new(kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            PlatformError::from_status(401, "x").kind,
            PlatformErrorKind::Auth
        );
        assert_eq!(
            PlatformError::from_status(429, "x").kind,
            PlatformErrorKind::RateLimit
        );
        assert_eq!(
            PlatformError::from_status(503, "x").kind,
            PlatformErrorKind::Server
        );
        assert_eq!(
            PlatformError::from_status(404, "x").kind,
            PlatformErrorKind::Other
        );
    }
}
