//! BrandPulse error type.

use thiserror::Error;

/// Errors surfaced anywhere in the BrandPulse stack.
#[derive(Error, Debug)]
pub enum BrandPulseError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A backend collaborator service call failed (network, timeout, non-2xx).
    #[error("Service error: {0}")]
    Service(String),

    /// A task could not run against its configuration (e.g. missing brand).
    #[error("Task error: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrandPulseError>;
