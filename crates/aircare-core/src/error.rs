use thiserror::Error;

/// Top-level error type shared across the conversation-engine crates.
///
/// Per the propagation policy: LLM/network errors are recovered locally by
/// callers and never reach this type in the turn loop. What does surface
/// here is persistence failure (logged, not surfaced to the user),
/// config failure (fatal at startup), and admin auth failure.
#[derive(Debug, Error)]
pub enum AircareError {
    #[error("config error: {0}")]
    Config(String),

    #[error("admin auth failed")]
    AdminAuthFailed,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AircareError {
    pub fn code(&self) -> &'static str {
        match self {
            AircareError::Config(_) => "CONFIG",
            AircareError::AdminAuthFailed => "ADMIN_AUTH_FAILED",
            AircareError::Persistence(_) => "PERSISTENCE",
            AircareError::Invariant(_) => "INVARIANT",
            AircareError::Serialization(_) => "SERIALIZATION",
            AircareError::Io(_) => "IO",
        }
    }
}

pub type Result<T> = std::result::Result<T, AircareError>;
